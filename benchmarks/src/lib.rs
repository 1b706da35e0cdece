//! Jeux de données synthétiques partagés par les benches.
//!
//! Les modules imitent la sortie d’un bundler : un appel
//! `__d(function(...){...},<id>,[<deps>])` par module, un corps de taille
//! réglable, et un marqueur repérable dans le module 0.

use jsbundle_core::{ModuleId, ModuleStore};
use jsbundle_patch::{PatchRule, PatchSet};

/// Marqueur présent uniquement dans le module 0.
pub const LIB_MARKER: &str = "__BENCH_LIB__";

/// Corps JS d’environ `body_len` octets pour le module `id`.
pub fn module_source(id: u32, body_len: usize) -> String {
    let deps = if id == 0 { String::new() } else { format!("{},{}", id / 2, id - 1) };
    let marker = if id == 0 { LIB_MARKER } else { "" };
    let mut body = format!("var x=foo({id});{marker}");
    while body.len() < body_len {
        body.push_str("if(a){b.push(c[0]);}else{d=e&&f;}");
    }
    format!("__d(function(g,r,i,a,m,e,d){{{body}}},{id},[{deps}]);")
}

/// Bundle de `modules` modules contigus plus un bloc `startup`.
pub fn synthetic_store(modules: u32, body_len: usize) -> ModuleStore {
    let mut store = ModuleStore::new();
    store.insert(ModuleId::Startup, "var __BUNDLE_START_TIME__=Date.now();");
    for id in 0..modules {
        store.insert(id, module_source(id, body_len));
    }
    store
}

/// Patch set réécrivant `foo(` en `bar(` ; avec `inject`, chaque module
/// modifié importe le module marqué.
pub fn rename_set(inject: bool) -> PatchSet {
    let json = if inject {
        format!(
            r#"{{ "patches": [ {{ "find": "foo(", "replace": "bar(" }} ],
                 "moduleImport": {{ "searchStrings": ["{LIB_MARKER}"] }} }}"#
        )
    } else {
        r#"{ "patches": [ { "find": "foo\\((\\d+)\\)", "isRegex": true, "replace": "bar($1)" } ] }"#.to_owned()
    };
    PatchSet::from_json("bench", &json, &Default::default()).unwrap_or_else(|e| panic!("bench patch set: {e}"))
}

/// Règle littérale seule, pour mesurer `PatchRule::apply` hors moteur.
pub fn literal_rule() -> PatchRule {
    PatchRule::literal("foo(", "bar(").unwrap_or_else(|e| panic!("bench rule: {e}"))
}
