//! jsbundle-core — primitives partagées du format « indexed bundle »
//!
//! Fournit :
//! - Constantes du conteneur (`BUNDLE_MAGIC`, `HEADER_LEN`, `ENTRY_LEN`, `TERMINATOR`)
//! - `Entry` : une ligne de la table d’entrées
//! - `ModuleId` + `ModuleStore` (module `store`)
//! - IO mémoire (little-endian) : `ByteReader` (positionnel), `ByteWriter` (préalloué)
//! - Erreurs `BundleError` + alias `BundleResult<T>`
//!
//! Features :
//! - `serde` (par défaut) : (dé)sérialisation textuelle de `ModuleId`

#![deny(missing_docs)]

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Identifiants de modules et collection en mémoire.
pub mod store;

pub use store::{ModuleId, ModuleStore};

use std::{io, path::PathBuf};

use thiserror::Error;

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type BundleResult<T> = core::result::Result<T, BundleError>;

/* ─────────────────────────── Constantes du conteneur ─────────────────────────── */

/// Magic d’un indexed bundle (u32 little-endian à l’offset 0).
pub const BUNDLE_MAGIC: u32 = 0xfb0b_d1e5;

/// Taille d’un u32 sur disque.
pub const U32_LEN: usize = 4;

/// En-tête : magic + entryCount + startupLength.
pub const HEADER_LEN: usize = U32_LEN * 3;

/// Une ligne de table : offset + length.
pub const ENTRY_LEN: usize = U32_LEN * 2;

/// Octet terminal ajouté après chaque module sur disque.
pub const TERMINATOR: u8 = 0;

/// Identifiant textuel réservé du bloc de démarrage.
pub const STARTUP_ID: &str = "startup";

/// Placement d’un module dans la région des modules.
///
/// `offset` est relatif au premier octet suivant la table ; `length` inclut
/// l’octet terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Entry {
    /// Décalage depuis le début de la région des modules.
    pub offset: u32,
    /// Longueur sur disque, terminateur compris.
    pub length: u32,
}

impl Entry {
    /// Slot vide (id absent de la collection).
    pub const EMPTY: Self = Self { offset: 0, length: 0 };

    /// Vrai si le slot ne porte aucun octet.
    pub const fn is_empty(&self) -> bool { self.length == 0 }
}

/* ─────────────────────────── Byte Writer (LE) ─────────────────────────── */

/// Buffer d’écriture préalloué à sa taille finale, rempli par écritures positionnelles.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Crée un buffer de `len` octets nuls.
    pub fn zeroed(len: usize) -> Self { Self { buf: vec![0; len] } }
    /// Taille totale du buffer.
    pub fn len(&self) -> usize { self.buf.len() }
    /// Vrai si le buffer est vide.
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }
    /// Accès en lecture au contenu.
    pub fn as_slice(&self) -> &[u8] { &self.buf }
    /// Récupère le buffer (consomme).
    pub fn into_vec(self) -> Vec<u8> { self.buf }

    /// Copie `bytes` à l’offset `at`.
    pub fn write_bytes_at(&mut self, at: usize, bytes: &[u8]) -> BundleResult<()> {
        let end = at.checked_add(bytes.len()).filter(|&end| end <= self.buf.len()).ok_or(
            BundleError::UnexpectedEof { needed: bytes.len() as u64, at: at as u64 },
        )?;
        self.buf[at..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Écrit un u32 little-endian à l’offset `at`.
    pub fn write_u32_le_at(&mut self, at: usize, v: u32) -> BundleResult<()> {
        self.write_bytes_at(at, &v.to_le_bytes())
    }

    /// Écrit une entrée de table (offset puis length) à l’offset `at`.
    pub fn write_entry_at(&mut self, at: usize, entry: Entry) -> BundleResult<()> {
        self.write_u32_le_at(at, entry.offset)?;
        self.write_u32_le_at(at + U32_LEN, entry.length)
    }
}

/* ─────────────────────────── Byte Reader (LE) ─────────────────────────── */

/// Lecteur sur un slice d’octets : curseur séquentiel + accès positionnel.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> ByteReader<'a> {
    /// Construit un lecteur.
    pub fn new(data: &'a [u8]) -> Self { Self { data, off: 0 } }
    /// Offset courant.
    pub fn offset(&self) -> usize { self.off }

    /// Renvoie `n` octets à partir de `at` sans bouger le curseur (ou erreur si EOF).
    pub fn bytes_at(&self, at: usize, n: usize) -> BundleResult<&'a [u8]> {
        match at.checked_add(n) {
            Some(end) if end <= self.data.len() => Ok(&self.data[at..end]),
            _ => Err(BundleError::UnexpectedEof { needed: n as u64, at: at as u64 }),
        }
    }

    /// Lit `n` octets (ou erreur si EOF).
    pub fn read_bytes(&mut self, n: usize) -> BundleResult<&'a [u8]> {
        let bytes = self.bytes_at(self.off, n)?;
        self.off += n;
        Ok(bytes)
    }

    /// Lit un u32 LE.
    pub fn read_u32_le(&mut self) -> BundleResult<u32> {
        let b = self.read_bytes(U32_LEN)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Lit une entrée de table.
    pub fn read_entry(&mut self) -> BundleResult<Entry> {
        Ok(Entry { offset: self.read_u32_le()?, length: self.read_u32_le()? })
    }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs du conteneur (lecture, écriture, identifiants).
#[derive(Debug, Error)]
pub enum BundleError {
    /// Magic invalide (attendu `0xfb0bd1e5`).
    #[error("invalid bundle magic: 0x{found:08x} (expected 0x{:08x})", BUNDLE_MAGIC)]
    InvalidMagic {
        /// Valeur lue à l’offset 0.
        found: u32,
    },
    /// Fin de buffer inattendue (fichier tronqué).
    #[error("unexpected EOF: need {needed} bytes at {at}")]
    UnexpectedEof {
        /// Nombre d’octets demandés.
        needed: u64,
        /// Offset de la lecture.
        at: u64,
    },
    /// Pas de bloc `startup` dans la collection à encoder.
    #[error("module store has no `startup` block")]
    MissingStartup,
    /// Une taille dépasse la capacité d’un u32.
    #[error("{what} too large for the container: {len}")]
    TooLarge {
        /// Grandeur concernée.
        what: &'static str,
        /// Valeur fautive.
        len: u64,
    },
    /// Identifiant de module ni numérique ni `startup`.
    #[error("invalid module id `{0}`")]
    InvalidModuleId(String),
    /// Erreur d’E/S sur un fichier.
    #[error("io error on {}: {source}", .path.display())]
    Io {
        /// Fichier concerné.
        path: PathBuf,
        /// Cause.
        #[source]
        source: io::Error,
    },
}

impl BundleError {
    /// Construit une erreur d’E/S rattachée à un chemin.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BundleError::Io { path: path.into(), source }
    }
}

/// Convertit une taille en u32 ou signale `TooLarge`.
pub fn checked_u32(what: &'static str, len: usize) -> BundleResult<u32> {
    u32::try_from(len).map_err(|_| BundleError::TooLarge { what, len: len as u64 })
}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        checked_u32, BundleError, BundleResult, ByteReader, ByteWriter, Entry, ModuleId,
        ModuleStore, BUNDLE_MAGIC, ENTRY_LEN, HEADER_LEN, STARTUP_ID, TERMINATOR, U32_LEN,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_reader_le() -> BundleResult<()> {
        let mut w = ByteWriter::zeroed(16);
        w.write_u32_le_at(0, BUNDLE_MAGIC)?;
        w.write_entry_at(4, Entry { offset: 5, length: 4 })?;
        w.write_bytes_at(12, b"foo\0")?;

        let mut r = ByteReader::new(w.as_slice());
        assert_eq!(r.read_u32_le()?, BUNDLE_MAGIC);
        assert_eq!(r.read_entry()?, Entry { offset: 5, length: 4 });
        assert_eq!(r.offset(), 12);
        assert_eq!(r.bytes_at(12, 3)?, b"foo");
        Ok(())
    }

    #[test]
    fn writer_rejects_out_of_bounds() {
        let mut w = ByteWriter::zeroed(4);
        assert!(matches!(
            w.write_bytes_at(2, b"abc"),
            Err(BundleError::UnexpectedEof { needed: 3, at: 2 })
        ));
    }

    #[test]
    fn reader_reports_truncation() {
        let r = ByteReader::new(&[1, 2, 3]);
        assert!(matches!(r.bytes_at(1, 8), Err(BundleError::UnexpectedEof { needed: 8, at: 1 })));
        assert!(matches!(r.bytes_at(usize::MAX, 2), Err(BundleError::UnexpectedEof { .. })));
    }

    #[test]
    fn magic_is_little_endian_on_disk() {
        assert_eq!(BUNDLE_MAGIC.to_le_bytes(), [0xe5, 0xd1, 0x0b, 0xfb]);
    }

    #[test]
    fn u32_overflow_is_reported() {
        assert!(checked_u32("x", 12).is_ok());
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(
            checked_u32("module", u32::MAX as usize + 1),
            Err(BundleError::TooLarge { what: "module", .. })
        ));
    }
}
