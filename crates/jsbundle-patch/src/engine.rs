use std::borrow::Cow;

use jsbundle_core::{ModuleId, ModuleStore};

use crate::inject::FactoryCall;
use crate::{ModuleImportSpec, PatchError, PatchResult, PatchSet};

/// Bilan d’application, pour les journaux.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Patch sets appliqués.
    pub sets: usize,
    /// Modules dont le contenu a changé (comptés une fois par set).
    pub modules_changed: usize,
    /// Imports injectés au total.
    pub injections: usize,
}

impl PatchReport {
    fn absorb(&mut self, other: PatchReport) {
        self.sets += other.sets;
        self.modules_changed += other.modules_changed;
        self.injections += other.injections;
    }
}

/// Résout chaque chaîne de recherche vers le premier module numéroté qui la
/// contient. Une chaîne sans module est ignorée.
///
/// `startup` n’est jamais candidat : il n’a pas d’identifiant importable.
pub fn resolve_imports(store: &ModuleStore, spec: &ModuleImportSpec) -> Vec<u32> {
    spec.searches()
        .iter()
        .filter_map(|search| {
            let found = store.numbered().find(|(_, content)| search.is_in(content)).map(|(i, _)| i);
            if found.is_none() {
                tracing::warn!(search = search.as_str(), "no module matches import search string");
            }
            found
        })
        .collect()
}

/// Applique un patch set à tous les modules, en place.
pub fn apply_set(store: &mut ModuleStore, set: &PatchSet) -> PatchResult<PatchReport> {
    let imports = set.module_import.as_ref().map(|spec| resolve_imports(store, spec)).unwrap_or_default();
    tracing::info!(set = %set.name, rules = set.rules.len(), imports = ?imports, "applying patch set");

    let mut report = PatchReport { sets: 1, ..PatchReport::default() };
    for id in store.ids() {
        let Some(content) = store.get_mut(id) else { continue };
        let mut changed = false;

        for (index, rule) in set.rules.iter().enumerate() {
            if !rule.matches(content) {
                continue;
            }
            tracing::debug!(set = %set.name, module = %id, rule = index, "rule matched");

            if !imports.is_empty() {
                *content = inject(&set.name, id, content, &imports)?;
                report.injections += imports.len();
                changed = true;
            }
            let next = match rule.apply(content) {
                Cow::Owned(next) => next,
                Cow::Borrowed(_) => continue,
            };
            changed |= next != *content;
            *content = next;
        }

        if changed {
            report.modules_changed += 1;
        }
    }

    tracing::debug!(set = %set.name, ?report, "patch set applied");
    Ok(report)
}

fn inject(set: &str, id: ModuleId, content: &[u8], imports: &[u32]) -> PatchResult<Vec<u8>> {
    let call = FactoryCall::find(content)
        .ok_or_else(|| PatchError::FactoryNotFound { set: set.to_owned(), module: id })?;
    tracing::debug!(module = %id, declared = call.id, deps = call.dependency_count, "injecting imports");
    Ok(call.inject(content, imports))
}

/// Applique les patch sets dans l’ordre ; chaque set voit les modifications
/// des précédents. La première erreur interrompt tout.
pub fn apply(store: &mut ModuleStore, sets: &[PatchSet]) -> PatchResult<PatchReport> {
    let mut total = PatchReport::default();
    for set in sets {
        total.absorb(apply_set(store, set)?);
    }
    Ok(total)
}

/* ─────────────────────────── Tests ─────────────────────────── */
