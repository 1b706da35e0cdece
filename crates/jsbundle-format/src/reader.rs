use jsbundle_core::prelude::*;

/// En-tête + table d’entrées d’un bundle, sans les contenus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Nombre de lignes de la table.
    pub entry_count: u32,
    /// Taille du bloc `startup`, terminateur compris.
    pub startup_length: u32,
    /// Offset absolu du début de la région des modules.
    pub module_start: usize,
    /// Table d’entrées, dans l’ordre des index.
    pub entries: Vec<Entry>,
}

impl Layout {
    /// Offset absolu du premier octet d’une entrée.
    pub fn absolute_offset(&self, entry: Entry) -> BundleResult<usize> {
        self.module_start
            .checked_add(entry.offset as usize)
            .ok_or(BundleError::TooLarge { what: "entry offset", len: u64::from(entry.offset) })
    }
}

/// Lit l’en-tête et la table d’entrées.
///
/// Échoue avec `InvalidMagic` si les 4 premiers octets ne valent pas
/// `0xfb0bd1e5`, et avec `UnexpectedEof` si la table dépasse l’entrée.
pub fn read_layout(data: &[u8]) -> BundleResult<Layout> {
    let mut r = ByteReader::new(data);

    let magic = r.read_u32_le()?;
    if magic != BUNDLE_MAGIC {
        return Err(BundleError::InvalidMagic { found: magic });
    }
    let entry_count = r.read_u32_le()?;
    let startup_length = r.read_u32_le()?;

    // table complète présente avant toute allocation
    let table_len = (entry_count as usize)
        .checked_mul(ENTRY_LEN)
        .ok_or(BundleError::TooLarge { what: "entry table", len: u64::from(entry_count) })?;
    r.bytes_at(HEADER_LEN, table_len)?;

    let entries = (0..entry_count).map(|_| r.read_entry()).collect::<BundleResult<Vec<_>>>()?;

    Ok(Layout { entry_count, startup_length, module_start: r.offset(), entries })
}

/// Décode un bundle complet en `ModuleStore`.
///
/// Chaque entrée `i` devient le module `i` (terminateur retiré) ; le bloc
/// `startup` correspond aux `startupLength - 1` premiers octets de la région.
pub fn decode(data: &[u8]) -> BundleResult<ModuleStore> {
    let layout = read_layout(data)?;
    let r = ByteReader::new(data);
    let mut store = ModuleStore::new();

    for (index, entry) in (0u32..).zip(&layout.entries) {
        let at = layout.absolute_offset(*entry)?;
        let raw = r.bytes_at(at, entry.length as usize)?;
        let content = raw.split_last().map_or(raw, |(_, body)| body);
        store.insert(index, content);
    }

    let startup_len = layout.startup_length.saturating_sub(1) as usize;
    store.insert(ModuleId::Startup, r.bytes_at(layout.module_start, startup_len)?);

    tracing::debug!(
        entries = layout.entry_count,
        startup = startup_len,
        bytes = store.total_bytes(),
        "bundle decoded"
    );
    Ok(store)
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// magic ‖ entryCount=1 ‖ startupLength=5 ‖ entry0={5,4} ‖ "boot\0" ‖ "foo\0"
    fn boot_foo() -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&BUNDLE_MAGIC.to_le_bytes());
        v.extend_from_slice(&1u32.to_le_bytes());
        v.extend_from_slice(&5u32.to_le_bytes());
        v.extend_from_slice(&5u32.to_le_bytes());
        v.extend_from_slice(&4u32.to_le_bytes());
        v.extend_from_slice(b"boot\0foo\0");
        v
    }

    #[test]
    fn decode_single_module() {
        let store = decode(&boot_foo()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(ModuleId::Index(0)), Some(&b"foo"[..]));
        assert_eq!(store.startup(), Some(&b"boot"[..]));
    }

    #[test]
    fn layout_of_single_module() {
        let layout = read_layout(&boot_foo()).unwrap();
        assert_eq!(layout.entry_count, 1);
        assert_eq!(layout.startup_length, 5);
        assert_eq!(layout.module_start, HEADER_LEN + ENTRY_LEN);
        assert_eq!(layout.entries, vec![Entry { offset: 5, length: 4 }]);
    }

    #[test]
    fn magic_gate() {
        let mut bytes = boot_foo();
        bytes[0] ^= 0xff;
        assert!(matches!(decode(&bytes), Err(BundleError::InvalidMagic { .. })));

        let junk = [0u8; 64];
        assert!(matches!(decode(&junk), Err(BundleError::InvalidMagic { found: 0 })));
    }

    #[test]
    fn empty_table_keeps_startup_only() {
        let mut v = Vec::new();
        v.extend_from_slice(&BUNDLE_MAGIC.to_le_bytes());
        v.extend_from_slice(&0u32.to_le_bytes());
        v.extend_from_slice(&3u32.to_le_bytes());
        v.extend_from_slice(b"go\0");
        let store = decode(&v).unwrap();
        assert_eq!(store.ids(), vec![ModuleId::Startup]);
        assert_eq!(store.startup(), Some(&b"go"[..]));
    }

    #[test]
    fn zero_length_entry_is_empty_module() {
        let mut v = Vec::new();
        v.extend_from_slice(&BUNDLE_MAGIC.to_le_bytes());
        v.extend_from_slice(&2u32.to_le_bytes());
        v.extend_from_slice(&1u32.to_le_bytes());
        v.extend_from_slice(&0u32.to_le_bytes());
        v.extend_from_slice(&0u32.to_le_bytes());
        v.extend_from_slice(&1u32.to_le_bytes());
        v.extend_from_slice(&2u32.to_le_bytes());
        v.extend_from_slice(b"\0x\0");
        let store = decode(&v).unwrap();
        assert_eq!(store.get(ModuleId::Index(0)), Some(&b""[..]));
        assert_eq!(store.get(ModuleId::Index(1)), Some(&b"x"[..]));
        assert_eq!(store.startup(), Some(&b""[..]));
    }

    #[test]
    fn truncated_module_is_fatal() {
        let mut bytes = boot_foo();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(decode(&bytes), Err(BundleError::UnexpectedEof { needed: 4, .. })));
    }

    #[test]
    fn truncated_table_is_fatal() {
        let mut v = Vec::new();
        v.extend_from_slice(&BUNDLE_MAGIC.to_le_bytes());
        v.extend_from_slice(&1000u32.to_le_bytes());
        v.extend_from_slice(&1u32.to_le_bytes());
        assert!(matches!(read_layout(&v), Err(BundleError::UnexpectedEof { .. })));
        assert!(matches!(decode(&v[..6]), Err(BundleError::UnexpectedEof { .. })));
    }

    #[test]
    fn short_input_is_eof() {
        assert!(matches!(decode(&[0xe5, 0xd1]), Err(BundleError::UnexpectedEof { .. })));
    }
}
