//! jsbundle-format — lecture/écriture du conteneur « indexed bundle »
//!
//! Format (little-endian) :
//! ```text
//! Header : magic u32 (0xfb0bd1e5) + entryCount u32 + startupLength u32
//! Table  : entryCount × { offset u32, length u32 }
//! Région : startup + \0, puis module 0 + \0, module 1 + \0, …
//! ```
//!
//! Les `offset` sont relatifs au début de la région des modules : le bloc
//! `startup` en occupe les `startupLength` premiers octets, le module 0 commence
//! donc à `startupLength`. Les `length` incluent le terminateur `\0`.
//!
//! API :
//! - `decode()` / `encode()` : octets ⇄ `ModuleStore`
//! - `read_layout()` : en-tête + table seuls (inspection)
//! - `read_file()` / `write_file()` : variantes fichier (écriture atomique)

#![deny(missing_docs)]

/// Décodage du conteneur.
pub mod reader;
/// Encodage du conteneur.
pub mod writer;

pub use reader::{decode, read_layout, Layout};
pub use writer::encode;

use std::{
    fs,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use jsbundle_core::{BundleError, BundleResult, ModuleStore};

/// Lit et décode un bundle depuis un fichier.
pub fn read_file<P: AsRef<Path>>(path: P) -> BundleResult<ModuleStore> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| BundleError::io(path, e))?;
    tracing::debug!(path = %path.display(), len = bytes.len(), "bundle read");
    decode(&bytes)
}

/// Encode `store` et l’écrit dans `path`.
///
/// L’encodage complet précède toute écriture ; le fichier final n’apparaît
/// qu’une fois le contenu intégralement écrit (fichier temporaire + rename).
pub fn write_file<P: AsRef<Path>>(store: &ModuleStore, path: P) -> BundleResult<usize> {
    let path = path.as_ref();
    let bytes = encode(store)?;
    write_bytes_atomic(path, &bytes)?;
    tracing::debug!(path = %path.display(), len = bytes.len(), "bundle written");
    Ok(bytes.len())
}

/// Écriture atomique : temporaire dans le même dossier puis rename.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> BundleResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let base = path.file_name().ok_or_else(|| {
        BundleError::io(path, io::Error::new(io::ErrorKind::InvalidInput, "no file name"))
    })?;
    let tmp = unique_tmp_path(parent, base);

    if let Err(e) = write_synced(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(BundleError::io(&tmp, e));
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(BundleError::io(path, e));
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(bytes)?;
    w.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()
}

fn unique_tmp_path(dir: &Path, base: &std::ffi::OsStr) -> PathBuf {
    let mut i = 0u32;
    loop {
        let candidate = dir.join(format!("{}.tmp{}", base.to_string_lossy(), i));
        if !candidate.exists() {
            return candidate;
        }
        i = i.wrapping_add(1);
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use jsbundle_core::ModuleId;
    use pretty_assertions::assert_eq;

    fn sample() -> ModuleStore {
        let mut store = ModuleStore::new();
        store.insert(ModuleId::Startup, "boot");
        store.insert(0u32, "foo");
        store.insert(1u32, "__d(function(){},1,[]);");
        store
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.jsbundle");
        let store = sample();

        let len = write_file(&store, &path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), len as u64);
        assert_eq!(read_file(&path).unwrap(), store);

        // pas de temporaire résiduel
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names, vec![std::ffi::OsString::from("main.jsbundle")]);
    }

    #[test]
    fn write_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsbundle");
        fs::write(&path, b"stale").unwrap();
        write_file(&sample(), &path).unwrap();
        assert_eq!(read_file(&path).unwrap(), sample());
    }

    #[test]
    fn failed_encode_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsbundle");
        let mut store = ModuleStore::new();
        store.insert(0u32, "no startup");
        assert!(matches!(write_file(&store, &path), Err(BundleError::MissingStartup)));
        assert!(!path.exists());
    }

    #[test]
    fn missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(dir.path().join("absent.jsbundle")).unwrap_err();
        assert!(matches!(err, BundleError::Io { .. }));
    }
}
