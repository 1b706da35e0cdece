//! jsbundle-cli — bibliothèque interne du binaire `jsbundle`
//!
//! `main.rs` ne fait que parser les arguments ; tout le reste est ici, testable
//! sans processus :
//! - `Command` + `*Task` : configuration figée d’une exécution
//! - `execute()` : pipeline **lecture → (patch) → écriture**, une seule passe
//! - matérialisation répertoire (`<id>.js`, `startup.js`) et chargement des
//!   descripteurs de patch (`*.json` + `*.txt` voisin)
//! - Traces (`feature = "trace"`) et couleurs (`feature = "color"`) optionnelles

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{anyhow, Context, Result};
use jsbundle_core::{ModuleId, ModuleStore};
use jsbundle_format::{read_layout, Layout};
use jsbundle_patch::{LineSource, PatchSet};

#[cfg(feature = "color")]
use owo_colors::OwoColorize;

/// Répertoire de modules par défaut.
pub const DEFAULT_MODULES_DIR: &str = "out";
/// Bundle produit par défaut.
pub const DEFAULT_OUTPUT_BUNDLE: &str = "patched.jsbundle";

const MODULE_EXT: &str = "js";
const DESCRIPTOR_EXT: &str = "json";
const LINES_EXT: &str = "txt";

// ───────────────────────────── Types publics ─────────────────────────────

/// Commande haut-niveau (sans parsing CLI — réservé à main.rs).
#[derive(Clone, Debug)]
pub enum Command {
    /// Bundle → un fichier par module.
    Unpack(UnpackTask),
    /// Répertoire de modules → bundle.
    Pack(PackTask),
    /// Bundle → patchs → bundle.
    Patch(PatchTask),
    /// Affiche l’en-tête et la table d’entrées d’un bundle.
    Inspect(InspectTask),
}

#[derive(Clone, Debug)]
pub struct UnpackTask {
    pub bundle: PathBuf,
    pub output_dir: PathBuf,
    pub time: bool,
}

#[derive(Clone, Debug)]
pub struct PackTask {
    pub modules_dir: PathBuf,
    pub output: PathBuf,
    pub time: bool,
}

#[derive(Clone, Debug)]
pub struct PatchTask {
    pub bundle: PathBuf,
    pub patches_dir: PathBuf,
    pub output: PathBuf,
    pub time: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InspectFormat {
    #[default]
    Table,
    Json,
}

#[derive(Clone, Debug)]
pub struct InspectTask {
    pub bundle: PathBuf,
    pub format: InspectFormat,
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Initialise le logger selon la feature `trace`.
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .try_init();
    }
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Exécute une commande. Retourne un code de sortie.
///
/// Toute erreur interrompt la commande avant l’écriture de l’artefact final.
pub fn execute(cmd: Command) -> Result<i32> {
    match cmd {
        Command::Unpack(t) => unpack_entry(t)?,
        Command::Pack(t) => pack_entry(t)?,
        Command::Patch(t) => patch_entry(t)?,
        Command::Inspect(t) => inspect_entry(&t)?,
    }
    Ok(0)
}

fn unpack_entry(task: UnpackTask) -> Result<()> {
    let start = Instant::now();
    let store = read_bundle(&task.bundle)?;
    let written = write_modules_to_dir(&store, &task.output_dir)?;
    status_ok(
        "UNPACK",
        &format!("{} → {} ({written} fichiers)", display(&task.bundle), display(&task.output_dir)),
    );
    report_time(task.time, "unpack", start);
    Ok(())
}

fn pack_entry(task: PackTask) -> Result<()> {
    let start = Instant::now();
    let store = read_modules_from_dir(&task.modules_dir)?;
    let size = write_bundle(&store, &task.output)?;
    status_ok(
        "PACK",
        &format!("{} ({} modules, {size} octets)", display(&task.output), store.len()),
    );
    report_time(task.time, "pack", start);
    Ok(())
}

fn patch_entry(task: PatchTask) -> Result<()> {
    let start = Instant::now();
    let mut store = read_bundle(&task.bundle)?;
    let sets = load_patch_sets(&task.patches_dir)?;
    if sets.is_empty() {
        status_info("PATCH", &format!("aucun descripteur dans {}", display(&task.patches_dir)));
    }
    for set in &sets {
        status_info("PATCH", &format!("{} ({} règles)", set.name, set.rules.len()));
    }

    let report = jsbundle_patch::apply(&mut store, &sets).context("application des patchs")?;
    status_ok(
        "PATCH",
        &format!(
            "{} sets, {} modules modifiés, {} imports injectés",
            report.sets, report.modules_changed, report.injections
        ),
    );

    let size = write_bundle(&store, &task.output)?;
    status_ok("PACK", &format!("{} ({size} octets)", display(&task.output)));
    report_time(task.time, "patch", start);
    Ok(())
}

fn inspect_entry(task: &InspectTask) -> Result<()> {
    let bytes = fs::read(&task.bundle)
        .with_context(|| format!("lecture du bundle: {}", display(&task.bundle)))?;
    let text = render_inspect(&bytes, task.format)
        .with_context(|| format!("bundle invalide: {}", display(&task.bundle)))?;

    let mut w = BufWriter::new(io::stdout().lock());
    w.write_all(text.as_bytes())?;
    w.flush()?;
    Ok(())
}

/// Décrit l’en-tête et la table d’entrées d’un bundle.
///
/// Le bundle est entièrement décodé : un fichier tronqué est signalé ici.
pub fn render_inspect(bytes: &[u8], format: InspectFormat) -> Result<String> {
    let layout = read_layout(bytes)?;
    let store = jsbundle_format::decode(bytes)?;

    match format {
        InspectFormat::Table => Ok(inspect_table(&layout, &store, bytes.len())),
        InspectFormat::Json => {
            let entries: Vec<_> = (0u32..)
                .zip(&layout.entries)
                .map(|(id, e)| {
                    serde_json::json!({
                        "id": id,
                        "offset": e.offset,
                        "length": e.length,
                        "empty": e.is_empty(),
                    })
                })
                .collect();
            let payload = serde_json::json!({
                "size": bytes.len(),
                "entryCount": layout.entry_count,
                "startupLength": layout.startup_length,
                "moduleStart": layout.module_start,
                "moduleBytes": store.total_bytes(),
                "entries": entries,
            });
            Ok(format!("{}\n", serde_json::to_string_pretty(&payload)?))
        },
    }
}

fn inspect_table(layout: &Layout, store: &ModuleStore, size: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("taille          {size} octets\n"));
    out.push_str(&format!("entrées         {}\n", layout.entry_count));
    out.push_str(&format!("startup         {} octets\n", layout.startup_length));
    out.push_str(&format!("début modules   {}\n", layout.module_start));
    out.push_str(&format!("contenu total   {} octets\n", store.total_bytes()));
    out.push_str(&format!("{:>8} {:>10} {:>10}\n", "id", "offset", "longueur"));
    for (id, e) in (0u32..).zip(&layout.entries) {
        let mark = if e.is_empty() { "  (vide)" } else { "" };
        out.push_str(&format!("{id:>8} {:>10} {:>10}{mark}\n", e.offset, e.length));
    }
    out
}

// ───────────────────────────── Bundle / répertoires ─────────────────────────────

fn read_bundle(path: &Path) -> Result<ModuleStore> {
    jsbundle_format::read_file(path).with_context(|| format!("lecture du bundle: {}", display(path)))
}

fn write_bundle(store: &ModuleStore, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("création du dossier: {}", display(parent)))?;
    }
    jsbundle_format::write_file(store, path)
        .with_context(|| format!("écriture du bundle: {}", display(path)))
}

/// Nom de fichier d’un module matérialisé : `<id>.js`.
pub fn module_file_name(id: ModuleId) -> String { format!("{id}.{MODULE_EXT}") }

/// Écrit un fichier par module dans `dir` (créé au besoin, fichiers écrasés).
/// Retourne le nombre de fichiers écrits.
pub fn write_modules_to_dir(store: &ModuleStore, dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("création du dossier: {}", display(dir)))?;
    for (id, content) in store.iter() {
        let path = dir.join(module_file_name(id));
        fs::write(&path, content).with_context(|| format!("écriture du module: {}", display(&path)))?;
    }
    Ok(store.len())
}

/// Relit un répertoire produit par `write_modules_to_dir`.
///
/// Seuls les fichiers `*.js` sont lus ; leur nom doit être `startup` ou un
/// index décimal.
pub fn read_modules_from_dir(dir: &Path) -> Result<ModuleStore> {
    let mut store = ModuleStore::new();
    for path in files_with_extension(dir, MODULE_EXT)? {
        let id: ModuleId = file_stem(&path)?
            .parse()
            .with_context(|| format!("nom de module invalide: {}", display(&path)))?;
        let content =
            fs::read(&path).with_context(|| format!("lecture du module: {}", display(&path)))?;
        store.insert(id, content);
    }
    Ok(store)
}

/// Charge et résout tous les descripteurs `*.json` de `dir`, par ordre de nom.
///
/// Le nom d’un set est le nom du fichier sans extension ; `foo.txt`, s’il
/// existe, fournit les lignes référencées par `foo.json`.
pub fn load_patch_sets(dir: &Path) -> Result<Vec<PatchSet>> {
    files_with_extension(dir, DESCRIPTOR_EXT)?
        .into_iter()
        .map(|path| {
            let name = file_stem(&path)?;
            let json = fs::read_to_string(&path)
                .with_context(|| format!("lecture du descripteur: {}", display(&path)))?;
            let lines = read_line_source(&path.with_extension(LINES_EXT))?;
            PatchSet::from_json(name, &json, &lines)
                .with_context(|| format!("descripteur invalide: {}", display(&path)))
        })
        .collect()
}

fn read_line_source(path: &Path) -> Result<LineSource> {
    if !path.is_file() {
        return Ok(LineSource::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("lecture des lignes: {}", display(path)))?;
    Ok(LineSource::from_text(&text))
}

/// Fichiers de `dir` portant l’extension `ext`, triés par nom.
fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("lecture du dossier: {}", display(dir)))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("lecture du dossier: {}", display(dir)))?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("nom de fichier illisible: {}", display(path)))
}

fn display(p: &Path) -> String { p.to_string_lossy().to_string() }

// ───────────────────────────── Sorties jolies ─────────────────────────────

fn report_time(enabled: bool, what: &str, start: Instant) {
    if enabled {
        status_info("TIME", &format!("{what}: {} ms", start.elapsed().as_millis()));
    }
}

fn status_ok(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.green().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{} {}", tag, msg);
    }
}

fn status_info(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.blue().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{} {}", tag, msg);
    }
}

// ───────────────────────────── Tests ─────────────────────────────
