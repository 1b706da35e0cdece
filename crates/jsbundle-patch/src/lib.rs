//! jsbundle-patch — réécriture des modules extraits d’un bundle
//!
//! Un `PatchSet` est une liste ordonnée de règles find/replace, chargée depuis
//! un descripteur JSON et **entièrement résolue au chargement** (regex
//! compilées, textes de remplacement calculés). `apply()` l’applique ensuite à
//! chaque module d’un `ModuleStore`, en place.
//!
//! Si le descripteur déclare un `moduleImport`, chaque module modifié reçoit
//! aussi des imports vers les modules repérés par leurs chaînes de recherche
//! (voir `inject`).
//!
//! - `descriptor` : forme JSON + `LineSource` + résolution en `PatchSet`
//! - `rule`       : `PatchRule`, `Literal`
//! - `inject`     : reconnaissance de l’appel `__d(...)` et injection
//! - `engine`     : `apply`, `apply_set`, `resolve_imports`

#![deny(missing_docs)]

/// Descripteurs JSON et résolution.
pub mod descriptor;
/// Application des patch sets.
pub mod engine;
/// Injection d’imports dans l’appel de fabrique.
pub mod inject;
/// Règles compilées.
pub mod rule;

pub use descriptor::{LineSource, ModuleImportSpec, PatchDescriptor, PatchSet, RuleDescriptor};
pub use engine::{apply, apply_set, resolve_imports, PatchReport};
pub use rule::{Literal, PatchRule};

use jsbundle_core::ModuleId;
use thiserror::Error;

/// Alias résultat du moteur de patch.
pub type PatchResult<T> = core::result::Result<T, PatchError>;

/// Erreurs de chargement ou d’application d’un patch set.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Descripteur JSON illisible.
    #[error("patch `{set}`: invalid descriptor: {source}")]
    Descriptor {
        /// Nom du patch set.
        set: String,
        /// Cause.
        #[source]
        source: serde_json::Error,
    },
    /// Expression régulière invalide.
    #[error("patch `{set}`: patches[{rule}]: invalid regex `{pattern}`: {source}")]
    InvalidRegex {
        /// Nom du patch set.
        set: String,
        /// Position de la règle.
        rule: usize,
        /// Motif fautif.
        pattern: String,
        /// Cause.
        #[source]
        source: regex::Error,
    },
    /// Texte de recherche vide.
    #[error("patch `{set}`: patches[{rule}]: empty `find`")]
    EmptyFind {
        /// Nom du patch set.
        set: String,
        /// Position de la règle.
        rule: usize,
    },
    /// Aucun des champs de remplacement n’est renseigné.
    #[error("patch `{set}`: patches[{rule}]: no replacement (expected one of replace, replaceFromLine, appendLiteral, appendFromLine)")]
    MissingReplacement {
        /// Nom du patch set.
        set: String,
        /// Position de la règle.
        rule: usize,
    },
    /// Plusieurs champs de remplacement renseignés.
    #[error("patch `{set}`: patches[{rule}]: several replacements given: {}", .fields.join(", "))]
    AmbiguousReplacement {
        /// Nom du patch set.
        set: String,
        /// Position de la règle.
        rule: usize,
        /// Champs renseignés.
        fields: Vec<&'static str>,
    },
    /// Ligne demandée absente de la ressource auxiliaire.
    #[error("patch `{set}`: patches[{rule}]: line {line} out of range (resource has {available} lines)")]
    LineOutOfRange {
        /// Nom du patch set.
        set: String,
        /// Position de la règle.
        rule: usize,
        /// Ligne demandée (base 1).
        line: usize,
        /// Nombre de lignes disponibles.
        available: usize,
    },
    /// Appel `__d(function(...){...},id,[...])` introuvable dans un module à patcher.
    #[error("patch `{set}`: module {module}: factory registration call not found, cannot inject imports")]
    FactoryNotFound {
        /// Nom du patch set.
        set: String,
        /// Module concerné.
        module: ModuleId,
    },
}

/// Prélude pratique.
pub mod prelude {
    /// Réexports usuels.
    pub use crate::{
        apply, apply_set, resolve_imports, LineSource, Literal, ModuleImportSpec, PatchDescriptor,
        PatchError, PatchReport, PatchResult, PatchRule, PatchSet, RuleDescriptor,
    };
}
