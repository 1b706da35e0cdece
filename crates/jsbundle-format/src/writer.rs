use jsbundle_core::prelude::*;

/// Table d’entrées calculée pour un `ModuleStore`.
///
/// Le slot `i` correspond toujours au module `i` ; un index absent de la
/// collection reste un slot vide `{0, 0}`.
fn plan_entries(store: &ModuleStore, startup_len: usize) -> BundleResult<(Vec<Entry>, usize)> {
    // entryCount = max + 1 doit tenir sur un u32 avant toute allocation
    let entry_count = match store.max_index() {
        None => 0,
        Some(max) => max
            .checked_add(1)
            .ok_or(BundleError::TooLarge { what: "entry count", len: u64::from(max) + 1 })?
            as usize,
    };
    let mut entries = Vec::new();
    entries
        .try_reserve_exact(entry_count)
        .map_err(|_| BundleError::TooLarge { what: "entry table", len: entry_count as u64 })?;
    entries.resize(entry_count, Entry::EMPTY);

    // le module 0 suit immédiatement startup + terminateur
    let mut offset = startup_len + 1;
    for (index, content) in store.numbered() {
        let length = content.len() + 1;
        entries[index as usize] = Entry {
            offset: checked_u32("module offset", offset)?,
            length: checked_u32("module length", length)?,
        };
        offset += length;
    }

    Ok((entries, offset))
}

/// Encode un `ModuleStore` en octets de conteneur.
///
/// Le buffer est préalloué à sa taille exacte puis rempli par écritures
/// positionnelles : en-tête, table, `startup` + `\0`, chaque module + `\0`.
pub fn encode(store: &ModuleStore) -> BundleResult<Vec<u8>> {
    let startup = store.startup().ok_or(BundleError::MissingStartup)?;
    let (entries, region_len) = plan_entries(store, startup.len())?;

    let module_start = HEADER_LEN + entries.len() * ENTRY_LEN;
    let total = module_start + region_len;
    let mut w = ByteWriter::zeroed(total);

    w.write_u32_le_at(0, BUNDLE_MAGIC)?;
    w.write_u32_le_at(U32_LEN, checked_u32("entry count", entries.len())?)?;
    w.write_u32_le_at(U32_LEN * 2, checked_u32("startup block", startup.len() + 1)?)?;

    for (slot, entry) in entries.iter().enumerate() {
        w.write_entry_at(HEADER_LEN + slot * ENTRY_LEN, *entry)?;
    }

    w.write_bytes_at(module_start, startup)?;
    w.write_bytes_at(module_start + startup.len(), &[TERMINATOR])?;

    for (index, content) in store.numbered() {
        let at = module_start + entries[index as usize].offset as usize;
        w.write_bytes_at(at, content)?;
        w.write_bytes_at(at + content.len(), &[TERMINATOR])?;
    }

    tracing::debug!(entries = entries.len(), startup = startup.len(), total, "bundle encoded");
    Ok(w.into_vec())
}

/* ─────────────────────────── Tests ─────────────────────────── */
