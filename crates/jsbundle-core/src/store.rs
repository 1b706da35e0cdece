//! Collection de modules en mémoire.
//!
//! Un `ModuleStore` associe chaque `ModuleId` à son contenu brut, **sans**
//! l’octet terminal. L’ordre d’itération est celui du conteneur : `startup`
//! d’abord, puis les index croissants.

use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::{BundleError, BundleResult, STARTUP_ID};

/// Identifiant d’un module.
///
/// `Startup` précède tous les index (dérivation `Ord` dans l’ordre des variantes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleId {
    /// Bloc de démarrage (pas de ligne dans la table).
    Startup,
    /// Module numéroté : son index dans la table d’entrées.
    Index(u32),
}

impl ModuleId {
    /// Index numérique, `None` pour `startup`.
    pub const fn index(self) -> Option<u32> {
        match self {
            ModuleId::Startup => None,
            ModuleId::Index(i) => Some(i),
        }
    }

    /// Vrai pour le bloc de démarrage.
    pub const fn is_startup(self) -> bool { matches!(self, ModuleId::Startup) }
}

impl From<u32> for ModuleId {
    fn from(i: u32) -> Self { ModuleId::Index(i) }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::Startup => f.write_str(STARTUP_ID),
            ModuleId::Index(i) => write!(f, "{i}"),
        }
    }
}

impl FromStr for ModuleId {
    type Err = BundleError;

    fn from_str(s: &str) -> BundleResult<Self> {
        if s == STARTUP_ID {
            return Ok(ModuleId::Startup);
        }
        // forme décimale canonique uniquement : "07" ou "+7" sont refusés
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) || (s.len() > 1 && s.starts_with('0')) {
            return Err(BundleError::InvalidModuleId(s.to_owned()));
        }
        s.parse::<u32>().map(ModuleId::Index).map_err(|_| BundleError::InvalidModuleId(s.to_owned()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ModuleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ModuleId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Collection possédée `ModuleId → octets`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleStore {
    modules: BTreeMap<ModuleId, Vec<u8>>,
}

impl ModuleStore {
    /// Collection vide.
    pub fn new() -> Self { Self::default() }

    /// Nombre de modules, `startup` compris.
    pub fn len(&self) -> usize { self.modules.len() }

    /// Vrai si aucun module.
    pub fn is_empty(&self) -> bool { self.modules.is_empty() }

    /// Insère (ou remplace) un module ; renvoie l’ancien contenu.
    pub fn insert(&mut self, id: impl Into<ModuleId>, content: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.modules.insert(id.into(), content.into())
    }

    /// Contenu d’un module.
    pub fn get(&self, id: ModuleId) -> Option<&[u8]> { self.modules.get(&id).map(Vec::as_slice) }

    /// Accès mutable au contenu d’un module.
    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Vec<u8>> { self.modules.get_mut(&id) }

    /// Bloc de démarrage, s’il existe.
    pub fn startup(&self) -> Option<&[u8]> { self.get(ModuleId::Startup) }

    /// Ids dans l’ordre du conteneur (`startup` puis index croissants).
    pub fn ids(&self) -> Vec<ModuleId> { self.modules.keys().copied().collect() }

    /// Itère `(id, contenu)` dans l’ordre du conteneur.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &[u8])> + '_ {
        self.modules.iter().map(|(id, content)| (*id, content.as_slice()))
    }

    /// Itère les seuls modules numérotés, index croissants.
    pub fn numbered(&self) -> impl Iterator<Item = (u32, &[u8])> + '_ {
        self.modules.iter().filter_map(|(id, content)| id.index().map(|i| (i, content.as_slice())))
    }

    /// Plus grand index présent.
    pub fn max_index(&self) -> Option<u32> { self.numbered().map(|(i, _)| i).last() }

    /// Taille cumulée des contenus (sans terminateurs).
    pub fn total_bytes(&self) -> usize { self.modules.values().map(Vec::len).sum() }
}

impl FromIterator<(ModuleId, Vec<u8>)> for ModuleStore {
    fn from_iter<I: IntoIterator<Item = (ModuleId, Vec<u8>)>>(iter: I) -> Self {
        Self { modules: iter.into_iter().collect() }
    }
}

impl IntoIterator for ModuleStore {
    type Item = (ModuleId, Vec<u8>);
    type IntoIter = std::collections::btree_map::IntoIter<ModuleId, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter { self.modules.into_iter() }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn startup_sorts_first() {
        let mut store = ModuleStore::new();
        store.insert(2u32, "b");
        store.insert(ModuleId::Startup, "boot");
        store.insert(0u32, "a");
        assert_eq!(store.ids(), vec![ModuleId::Startup, ModuleId::Index(0), ModuleId::Index(2)]);
        assert_eq!(store.max_index(), Some(2));
        assert_eq!(store.numbered().count(), 2);
        assert_eq!(store.total_bytes(), 6);
    }

    #[test]
    fn id_text_form() {
        assert_eq!("startup".parse::<ModuleId>().unwrap(), ModuleId::Startup);
        assert_eq!("42".parse::<ModuleId>().unwrap(), ModuleId::Index(42));
        assert_eq!(ModuleId::Index(7).to_string(), "7");
        assert_eq!(ModuleId::Startup.to_string(), "startup");
        for bad in ["", "07", "+1", "-1", "x1", "4294967296", "Startup"] {
            assert!(bad.parse::<ModuleId>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn id_serde_as_string() {
        let json = serde_json::to_string(&vec![ModuleId::Startup, ModuleId::Index(3)]).unwrap();
        assert_eq!(json, r#"["startup","3"]"#);
        let back: Vec<ModuleId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![ModuleId::Startup, ModuleId::Index(3)]);
    }
}
