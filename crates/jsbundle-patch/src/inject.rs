//! Injection d’imports dans l’appel de fabrique d’un module.
//!
//! Chaque module du bundle est enregistré par un appel de la forme :
//!
//! ```text
//! __d(function(global, require, importDefault, importAll, module, exports, dependencyMap) {
//!     <body>
//! }, <id>, [<deps>]);
//! ```
//!
//! Le second paramètre résout un module, le dernier est la table des
//! dépendances. Pour chaque module importé on ajoute, juste avant la `}` qui
//! ferme `<body>`, une liaison `var _patchImport<k>=<require>(<dependencyMap>[<N+k-1>]);`
//! (`N` = nombre de dépendances d’origine, `k` base 1) et on ajoute son id à
//! `[<deps>]`.
//!
//! La reconnaissance est une unique regex sur le texte : une mise en forme
//! différente de l’appel n’est pas reconnue.

use std::sync::LazyLock;

use regex::bytes::Regex;

/// Préfixe des liaisons injectées.
pub const IMPORT_BINDING_PREFIX: &str = "_patchImport";

/// `__d(function(<params>){<body>},<id>,[<deps>]` ; corps glouton : la dernière
/// occurrence de `},<id>,[` ferme l’appel. Mode octets (`-u`) : le corps peut
/// contenir de l’UTF-8 invalide.
static FACTORY_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s-u)__d\(\s*function\s*\(([^)]*)\)\s*\{(.*)\}\s*,\s*(\d+)\s*,\s*\[([^\]]*)\]")
        .expect("factory call pattern")
});

/// Appel de fabrique reconnu dans un module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryCall {
    /// Nom du paramètre de résolution (`require`).
    pub require: String,
    /// Nom du paramètre table de dépendances.
    pub dependency_map: String,
    /// Id déclaré dans l’appel.
    pub id: u32,
    /// Nombre de dépendances déclarées.
    pub dependency_count: usize,
    body_end: usize,
    deps_start: usize,
    deps_end: usize,
}

impl FactoryCall {
    /// Repère l’appel de fabrique dans `content`.
    pub fn find(content: &[u8]) -> Option<Self> {
        let caps = FACTORY_CALL.captures(content)?;
        let params: Vec<String> = String::from_utf8_lossy(caps.get(1)?.as_bytes())
            .split(',')
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty())
            .collect();
        if params.len() < 2 {
            return None;
        }

        let id = std::str::from_utf8(caps.get(3)?.as_bytes()).ok()?.parse().ok()?;
        let deps = caps.get(4)?;
        let dependency_count = deps
            .as_bytes()
            .split(|&b| b == b',')
            .filter(|d| d.iter().any(|b| !b.is_ascii_whitespace()))
            .count();

        Some(Self {
            require: params[1].clone(),
            dependency_map: params[params.len() - 1].clone(),
            id,
            dependency_count,
            body_end: caps.get(2)?.end(),
            deps_start: deps.start(),
            deps_end: deps.end(),
        })
    }

    /// Réécrit `content` avec un import par id de `imports`, dans l’ordre.
    ///
    /// `content` doit être le texte sur lequel `find` a été appelé.
    ///
    /// Le k-ième import (base 1) lit `<dependencyMap>[N + k - 1]` et non
    /// `[N + k]` : c’est la position que prend son id, ajouté à la fin de
    /// `[<deps>]`.
    pub fn inject(&self, content: &[u8], imports: &[u32]) -> Vec<u8> {
        let mut bindings = String::new();
        for (k, module) in (1..).zip(imports) {
            let slot = self.dependency_count + k - 1;
            bindings.push_str(&format!(
                ";var {IMPORT_BINDING_PREFIX}{k}={}({}[{slot}]);",
                self.require, self.dependency_map
            ));
            tracing::trace!(module, slot, "import binding");
        }

        let ids: Vec<String> = imports.iter().map(u32::to_string).collect();
        let deps = &content[self.deps_start..self.deps_end];
        let separator = if self.dependency_count == 0 { "" } else { "," };

        let mut out = Vec::with_capacity(content.len() + bindings.len() + ids.len() * 8);
        out.extend_from_slice(&content[..self.body_end]);
        out.extend_from_slice(bindings.as_bytes());
        out.extend_from_slice(&content[self.body_end..self.deps_start]);
        // `[ ]` vide : les blancs sont remplacés par les ids
        if self.dependency_count > 0 {
            out.extend_from_slice(deps);
        }
        out.extend_from_slice(separator.as_bytes());
        out.extend_from_slice(ids.join(",").as_bytes());
        out.extend_from_slice(&content[self.deps_end..]);
        out
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
