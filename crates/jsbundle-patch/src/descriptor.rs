//! Descripteurs de patch (JSON) et leur résolution en `PatchSet`.
//!
//! ```json
//! {
//!   "patches": [
//!     { "find": "foo", "replace": "bar" },
//!     { "find": "x=(\\w+);", "isRegex": true, "replace": "x=$1();" },
//!     { "find": "init();", "appendFromLine": 2 }
//!   ],
//!   "moduleImport": { "searchStrings": ["LIB_MARKER"] }
//! }
//! ```
//!
//! Le nom du set vient de l’appelant (nom du fichier), jamais du JSON.

use serde::Deserialize;

use crate::{Literal, PatchError, PatchResult, PatchRule};

/// Forme brute d’un descripteur.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchDescriptor {
    /// Règles, dans l’ordre d’application.
    #[serde(default)]
    pub patches: Vec<RuleDescriptor>,
    /// Imports inter-modules optionnels.
    #[serde(default)]
    pub module_import: Option<ModuleImportDescriptor>,
}

/// Forme brute d’une règle.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescriptor {
    /// Texte (ou motif) recherché.
    pub find: String,
    /// `find` est une expression régulière.
    #[serde(default)]
    pub is_regex: bool,
    /// Remplacement littéral.
    #[serde(default)]
    pub replace: Option<String>,
    /// Remplacement = ligne N (base 1) de la ressource auxiliaire.
    #[serde(default)]
    pub replace_from_line: Option<usize>,
    /// Remplacement = `find` + ce texte.
    #[serde(default)]
    pub append_literal: Option<String>,
    /// Remplacement = `find` + ligne N (base 1) de la ressource auxiliaire.
    #[serde(default)]
    pub append_from_line: Option<usize>,
}

/// Forme brute de `moduleImport`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleImportDescriptor {
    /// Chaînes identifiant les modules à importer, dans l’ordre.
    #[serde(default)]
    pub search_strings: Vec<String>,
}

/// Ressource auxiliaire adressée par numéro de ligne (base 1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSource {
    lines: Vec<String>,
}

impl LineSource {
    /// Découpe un texte en lignes (`\n` ou `\r\n`).
    pub fn from_text(text: &str) -> Self { Self { lines: text.lines().map(str::to_owned).collect() } }

    /// Nombre de lignes.
    pub fn len(&self) -> usize { self.lines.len() }

    /// Vrai si aucune ligne.
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    /// Ligne `n` (base 1).
    pub fn line(&self, n: usize) -> Option<&str> {
        n.checked_sub(1).and_then(|i| self.lines.get(i)).map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for LineSource {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { lines: iter.into_iter().map(Into::into).collect() }
    }
}

/// Chaînes de recherche compilées d’un `moduleImport`.
#[derive(Debug, Clone)]
pub struct ModuleImportSpec {
    searches: Vec<Literal>,
}

impl ModuleImportSpec {
    /// Compile les chaînes de recherche.
    pub fn new<I, S>(searches: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self { searches: searches.into_iter().map(Literal::new).collect::<Result<_, _>>()? })
    }

    /// Chaînes de recherche, dans l’ordre.
    pub fn searches(&self) -> &[Literal] { &self.searches }
}

/// Patch set résolu, prêt à appliquer.
#[derive(Debug, Clone)]
pub struct PatchSet {
    /// Nom (dérivé du fichier du descripteur).
    pub name: String,
    /// Règles, dans l’ordre.
    pub rules: Vec<PatchRule>,
    /// Imports à injecter dans les modules modifiés.
    pub module_import: Option<ModuleImportSpec>,
}

impl PatchSet {
    /// Parse un descripteur JSON puis le résout.
    pub fn from_json(name: impl Into<String>, json: &str, lines: &LineSource) -> PatchResult<Self> {
        let name = name.into();
        let descriptor: PatchDescriptor = serde_json::from_str(json)
            .map_err(|source| PatchError::Descriptor { set: name.clone(), source })?;
        Self::from_descriptor(name, &descriptor, lines)
    }

    /// Résout un descripteur : regex compilées, remplacements calculés.
    ///
    /// Toute règle invalide (regex, remplacement absent/ambigu, ligne hors
    /// bornes) fait échouer le chargement, avant tout accès aux modules.
    pub fn from_descriptor(
        name: impl Into<String>,
        descriptor: &PatchDescriptor,
        lines: &LineSource,
    ) -> PatchResult<Self> {
        let name = name.into();
        let rules = descriptor
            .patches
            .iter()
            .enumerate()
            .map(|(index, rule)| rule.resolve(&name, index, lines))
            .collect::<PatchResult<Vec<_>>>()?;

        let module_import = match &descriptor.module_import {
            Some(import) => Some(ModuleImportSpec::new(import.search_strings.iter().cloned()).map_err(
                |source| PatchError::InvalidRegex {
                    set: name.clone(),
                    rule: 0,
                    pattern: import.search_strings.join(", "),
                    source,
                },
            )?),
            None => None,
        };

        tracing::debug!(set = %name, rules = rules.len(), imports = module_import.is_some(), "patch set loaded");
        Ok(Self { name, rules, module_import })
    }
}

impl RuleDescriptor {
    fn resolve(&self, set: &str, index: usize, lines: &LineSource) -> PatchResult<PatchRule> {
        if self.find.is_empty() {
            return Err(PatchError::EmptyFind { set: set.to_owned(), rule: index });
        }

        let replacement = self.replacement(set, index, lines)?;
        let compiled = if self.is_regex {
            PatchRule::regex(&self.find, replacement)
        } else {
            PatchRule::literal(&self.find, replacement)
        };
        compiled.map_err(|source| PatchError::InvalidRegex {
            set: set.to_owned(),
            rule: index,
            pattern: self.find.clone(),
            source,
        })
    }

    fn replacement(&self, set: &str, index: usize, lines: &LineSource) -> PatchResult<String> {
        let given: Vec<&'static str> = [
            ("replace", self.replace.is_some()),
            ("replaceFromLine", self.replace_from_line.is_some()),
            ("appendLiteral", self.append_literal.is_some()),
            ("appendFromLine", self.append_from_line.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect();

        match given.len() {
            0 => return Err(PatchError::MissingReplacement { set: set.to_owned(), rule: index }),
            1 => {},
            _ => {
                return Err(PatchError::AmbiguousReplacement {
                    set: set.to_owned(),
                    rule: index,
                    fields: given,
                })
            },
        }

        let line = |n: usize| {
            lines.line(n).ok_or_else(|| PatchError::LineOutOfRange {
                set: set.to_owned(),
                rule: index,
                line: n,
                available: lines.len(),
            })
        };

        if let Some(text) = &self.replace {
            Ok(text.clone())
        } else if let Some(n) = self.replace_from_line {
            Ok(line(n)?.to_owned())
        } else if let Some(tail) = &self.append_literal {
            Ok(format!("{}{tail}", self.find))
        } else if let Some(n) = self.append_from_line {
            Ok(format!("{}{}", self.find, line(n)?))
        } else {
            Err(PatchError::MissingReplacement { set: set.to_owned(), rule: index })
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines() -> LineSource { LineSource::from_text("first()\nsecond();\r\nthird") }

    #[test]
    fn line_source_is_one_based() {
        let src = lines();
        assert_eq!(src.len(), 3);
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(1), Some("first()"));
        assert_eq!(src.line(2), Some("second();"));
        assert_eq!(src.line(4), None);
    }

    #[test]
    fn resolves_all_replacement_kinds() {
        let json = r#"{
            "patches": [
                { "find": "a", "replace": "b" },
                { "find": "c", "replaceFromLine": 1 },
                { "find": "d", "appendLiteral": ";e" },
                { "find": "f", "appendFromLine": 2 },
                { "find": "x=(\\w+);", "isRegex": true, "replace": "x=$1();" }
            ]
        }"#;
        let set = PatchSet::from_json("demo", json, &lines()).unwrap();
        let got: Vec<(&str, &[u8], bool)> =
            set.rules.iter().map(|r| (r.find_text(), r.replacement(), r.is_regex())).collect();
        assert_eq!(
            got,
            vec![
                ("a", &b"b"[..], false),
                ("c", &b"first()"[..], false),
                ("d", &b"d;e"[..], false),
                ("f", &b"fsecond();"[..], false),
                (r"x=(\w+);", &b"x=$1();"[..], true),
            ]
        );
        assert_eq!(set.name, "demo");
        assert!(set.module_import.is_none());
    }

    #[test]
    fn capitalised_fields_are_not_read() {
        // `Find` était toujours une regex : le lire en littéral changerait son sens
        let json = r#"{ "patches": [ { "Find": "foo", "Replace": "bar" } ] }"#;
        let err = PatchSet::from_json("legacy", json, &LineSource::default()).unwrap_err();
        assert!(matches!(err, PatchError::Descriptor { .. }), "{err}");

        let json = r#"{ "Patches": [ { "find": "foo", "replace": "bar" } ] }"#;
        let set = PatchSet::from_json("legacy", json, &LineSource::default()).unwrap();
        assert!(set.rules.is_empty());
    }

    #[test]
    fn module_import_is_compiled() {
        let json = r#"{ "patches": [], "moduleImport": { "searchStrings": ["LIB_MARKER", "a.b("] } }"#;
        let set = PatchSet::from_json("imp", json, &LineSource::default()).unwrap();
        let spec = set.module_import.unwrap();
        let searches: Vec<&str> = spec.searches().iter().map(Literal::as_str).collect();
        assert_eq!(searches, vec!["LIB_MARKER", "a.b("]);
    }

    #[test]
    fn missing_replacement_fails_eagerly() {
        let json = r#"{ "patches": [ { "find": "ok", "replace": "" }, { "find": "foo" } ] }"#;
        let err = PatchSet::from_json("p", json, &LineSource::default()).unwrap_err();
        assert!(matches!(err, PatchError::MissingReplacement { rule: 1, .. }), "{err}");
    }

    #[test]
    fn ambiguous_replacement_fails() {
        let json = r#"{ "patches": [ { "find": "foo", "replace": "x", "appendLiteral": "y" } ] }"#;
        match PatchSet::from_json("p", json, &LineSource::default()).unwrap_err() {
            PatchError::AmbiguousReplacement { fields, .. } => {
                assert_eq!(fields, vec!["replace", "appendLiteral"]);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn line_out_of_range_fails() {
        let json = r#"{ "patches": [ { "find": "foo", "replaceFromLine": 9 } ] }"#;
        let err = PatchSet::from_json("p", json, &lines()).unwrap_err();
        assert!(matches!(err, PatchError::LineOutOfRange { line: 9, available: 3, .. }));
    }

    #[test]
    fn bad_regex_fails_at_load() {
        let json = r#"{ "patches": [ { "find": "(", "isRegex": true, "replace": "x" } ] }"#;
        let err = PatchSet::from_json("p", json, &LineSource::default()).unwrap_err();
        assert!(matches!(err, PatchError::InvalidRegex { rule: 0, .. }));
        assert!(err.to_string().contains("patch `p`"));
    }

    #[test]
    fn malformed_json_fails() {
        let err = PatchSet::from_json("p", "{ not json", &LineSource::default()).unwrap_err();
        assert!(matches!(err, PatchError::Descriptor { .. }));
    }

    #[test]
    fn empty_find_fails() {
        let json = r#"{ "patches": [ { "find": "", "replace": "x" } ] }"#;
        assert!(matches!(
            PatchSet::from_json("p", json, &LineSource::default()),
            Err(PatchError::EmptyFind { rule: 0, .. })
        ));
    }
}
