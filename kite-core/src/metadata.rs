//! Hover metadata carried in a custom section of the emitted module.
//!
//! The section is named [`HOVER_SECTION`] (`kite-hover-v1`); the number
//! after `-v` is the format version, so a decoder can tell a newer format
//! apart from a missing section. Payload layout, all integers LEB128:
//!
//! ```text
//! count: u32
//! count × {
//!     start_line: u32, start_character: u32,
//!     end_line: u32,   end_character: u32,
//!     kind: u8,
//!     name: string, detail: string, docs: string   // u32 length + UTF-8
//! }
//! ```
//!
//! Entries are written sorted by start position (ties: longer range
//! first), which is what the hover lookup's binary search relies on.

use std::borrow::Cow;
use std::cmp::Reverse;

use thiserror::Error;
use wasm_encoder::{CustomSection, Encode, Module};
use wasmparser::{BinaryReader, Parser, Payload};

use crate::name_resolve::SymbolKind;
use crate::span::{Position, TextRange};

/// Prefix shared by every version of the section name.
pub const HOVER_SECTION_PREFIX: &str = "kite-hover-v";
/// Name of the section written by this version of the encoder.
pub const HOVER_SECTION: &str = "kite-hover-v1";
pub const FORMAT_VERSION: u32 = 1;

/// Why metadata could not be read. Never fatal: hover treats every
/// variant as "no information".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("module has no hover metadata section")]
    Missing,
    #[error("malformed module or metadata: {0}")]
    Malformed(String),
    #[error("unsupported hover metadata version {0}")]
    UnsupportedVersion(u32),
    #[error("{0} unexpected bytes after hover metadata")]
    TrailingBytes(usize),
    #[error("unknown hover entry kind {0}")]
    InvalidKind(u8),
}

impl From<wasmparser::BinaryReaderError> for EncodingError {
    fn from(err: wasmparser::BinaryReaderError) -> Self {
        EncodingError::Malformed(err.to_string())
    }
}

/// What an entry describes. Mutability is folded into the kind so the
/// hover label can be rendered without the symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Function,
    Extern,
    Builtin,
    Struct,
    Field,
    Param,
    Local,
    LocalMut,
    Global,
    GlobalMut,
}

impl EntryKind {
    const ALL: [EntryKind; 10] = [
        EntryKind::Function,
        EntryKind::Extern,
        EntryKind::Builtin,
        EntryKind::Struct,
        EntryKind::Field,
        EntryKind::Param,
        EntryKind::Local,
        EntryKind::LocalMut,
        EntryKind::Global,
        EntryKind::GlobalMut,
    ];

    pub fn from_symbol(kind: SymbolKind, mutable: bool) -> EntryKind {
        match (kind, mutable) {
            (SymbolKind::Function, _) => EntryKind::Function,
            (SymbolKind::Extern, _) => EntryKind::Extern,
            (SymbolKind::Builtin, _) => EntryKind::Builtin,
            (SymbolKind::Struct, _) => EntryKind::Struct,
            (SymbolKind::Field, _) => EntryKind::Field,
            (SymbolKind::Param, _) => EntryKind::Param,
            (SymbolKind::Local, false) => EntryKind::Local,
            (SymbolKind::Local, true) => EntryKind::LocalMut,
            (SymbolKind::Global, false) => EntryKind::Global,
            (SymbolKind::Global, true) => EntryKind::GlobalMut,
        }
    }

    /// Keyword-like label shown in hover text.
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Function => "fn",
            EntryKind::Extern => "extern fn",
            EntryKind::Builtin => "builtin",
            EntryKind::Struct => "struct",
            EntryKind::Field => "field",
            EntryKind::Param => "param",
            EntryKind::Local => "let",
            EntryKind::LocalMut => "let mut",
            EntryKind::Global => "global",
            EntryKind::GlobalMut => "global mut",
        }
    }

    fn to_byte(self) -> u8 {
        self as u8
    }

    fn from_byte(byte: u8) -> Result<EntryKind, EncodingError> {
        EntryKind::ALL
            .get(byte as usize)
            .copied()
            .ok_or(EncodingError::InvalidKind(byte))
    }
}

/// One hover record: a source range and what lives there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub range: TextRange,
    pub kind: EntryKind,
    pub name: String,
    /// Rendered type.
    pub detail: String,
    /// Doc comment text, empty when there is none.
    pub docs: String,
}

/// Sort key order: start ascending, then end descending, so a containing
/// range precedes the ranges nested in it.
pub fn sort_entries(entries: &mut [MetadataEntry]) {
    entries.sort_by_key(|e| (e.range.start, Reverse(e.range.end)));
}

/// Serialize entries into a section payload, sorting them first.
pub fn encode(mut entries: Vec<MetadataEntry>) -> Vec<u8> {
    sort_entries(&mut entries);
    let mut sink = Vec::new();
    (entries.len() as u32).encode(&mut sink);
    for entry in &entries {
        entry.range.start.line.encode(&mut sink);
        entry.range.start.character.encode(&mut sink);
        entry.range.end.line.encode(&mut sink);
        entry.range.end.character.encode(&mut sink);
        sink.push(entry.kind.to_byte());
        entry.name.as_str().encode(&mut sink);
        entry.detail.as_str().encode(&mut sink);
        entry.docs.as_str().encode(&mut sink);
    }
    sink
}

/// Append the metadata section to a module; call after all standard
/// sections so the custom section comes last.
pub fn append_section(module: &mut Module, entries: Vec<MetadataEntry>) {
    let data = encode(entries);
    module.section(&CustomSection {
        name: Cow::Borrowed(HOVER_SECTION),
        data: Cow::Owned(data),
    });
}

/// Decode a section payload produced by [`encode`].
pub fn decode(data: &[u8]) -> Result<Vec<MetadataEntry>, EncodingError> {
    let mut reader = BinaryReader::new(data, 0);
    let count = reader.read_var_u32()?;
    // Each entry takes at least 8 bytes; do not trust `count` for capacity.
    let mut entries = Vec::with_capacity((count as usize).min(data.len() / 8));
    for _ in 0..count {
        let start = Position::new(reader.read_var_u32()?, reader.read_var_u32()?);
        let end = Position::new(reader.read_var_u32()?, reader.read_var_u32()?);
        let kind = EntryKind::from_byte(reader.read_u8()?)?;
        let name = reader.read_string()?.to_string();
        let detail = reader.read_string()?.to_string();
        let docs = reader.read_string()?.to_string();
        entries.push(MetadataEntry {
            range: TextRange::new(start, end),
            kind,
            name,
            detail,
            docs,
        });
    }
    if !reader.eof() {
        return Err(EncodingError::TrailingBytes(reader.bytes_remaining()));
    }
    Ok(entries)
}

/// Locate the hover section in module bytes and decode it.
pub fn decode_module(bytes: &[u8]) -> Result<Vec<MetadataEntry>, EncodingError> {
    for payload in Parser::new(0).parse_all(bytes) {
        if let Payload::CustomSection(section) = payload? {
            let Some(version) = section.name().strip_prefix(HOVER_SECTION_PREFIX) else {
                continue;
            };
            let Ok(version) = version.parse::<u32>() else {
                continue;
            };
            if version != FORMAT_VERSION {
                return Err(EncodingError::UnsupportedVersion(version));
            }
            return decode(section.data());
        }
    }
    Err(EncodingError::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(range: ((u32, u32), (u32, u32)), kind: EntryKind, name: &str, detail: &str) -> MetadataEntry {
        MetadataEntry {
            range: TextRange::new(
                Position::new(range.0.0, range.0.1),
                Position::new(range.1.0, range.1.1),
            ),
            kind,
            name: name.to_string(),
            detail: detail.to_string(),
            docs: String::new(),
        }
    }

    fn sample() -> Vec<MetadataEntry> {
        vec![
            entry(((0, 0), (4, 1)), EntryKind::Function, "main", "fn(i32) -> i32"),
            entry(((0, 8), (0, 14)), EntryKind::Param, "n", "i32"),
            entry(((1, 8), (1, 9)), EntryKind::LocalMut, "x", "i32"),
        ]
    }

    fn module_with(name: &str, data: Vec<u8>) -> Vec<u8> {
        let mut module = Module::new();
        module.section(&CustomSection {
            name: Cow::Borrowed(name),
            data: Cow::Owned(data),
        });
        module.finish()
    }

    #[test]
    fn sorts_outer_ranges_before_nested_ones() {
        let mut entries = sample();
        entries.reverse();
        entries.push(entry(((0, 0), (0, 2)), EntryKind::Struct, "S", "{ }"));
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["main", "S", "n", "x"]);
    }

    #[test]
    fn decodes_what_it_encodes() {
        let entries = sample();
        assert_eq!(decode(&encode(entries.clone())), Ok(entries));
    }

    #[test]
    fn finds_section_inside_a_module() {
        let mut module = Module::new();
        append_section(&mut module, sample());
        let bytes = module.finish();
        assert_eq!(decode_module(&bytes), Ok(sample()));
    }

    #[test]
    fn reports_missing_section() {
        let bytes = Module::new().finish();
        assert_eq!(decode_module(&bytes), Err(EncodingError::Missing));
        let other = module_with("name", vec![0]);
        assert_eq!(decode_module(&other), Err(EncodingError::Missing));
    }

    #[test]
    fn rejects_other_format_versions() {
        let bytes = module_with("kite-hover-v2", encode(sample()));
        assert_eq!(decode_module(&bytes), Err(EncodingError::UnsupportedVersion(2)));
    }

    #[test]
    fn rejects_truncated_payloads_and_modules() {
        let payload = encode(sample());
        for cut in [1, payload.len() / 2, payload.len() - 1] {
            assert!(matches!(
                decode(&payload[..cut]),
                Err(EncodingError::Malformed(_))
            ));
        }
        let mut module = Module::new();
        append_section(&mut module, sample());
        let bytes = module.finish();
        assert!(matches!(
            decode_module(&bytes[..bytes.len() - 3]),
            Err(EncodingError::Malformed(_))
        ));
        assert!(matches!(
            decode_module(b"not a module"),
            Err(EncodingError::Malformed(_))
        ));
    }

    #[test]
    fn writes_the_documented_layout() {
        let payload = encode(vec![entry(((0, 0), (0, 1)), EntryKind::Param, "n", "i32")]);
        assert_eq!(
            payload,
            vec![1, 0, 0, 0, 1, 5, 1, b'n', 3, b'i', b'3', b'2', 0]
        );
    }

    #[test]
    fn rejects_trailing_bytes_and_unknown_kinds() {
        let mut payload = encode(sample());
        payload.push(0);
        assert_eq!(decode(&payload), Err(EncodingError::TrailingBytes(1)));

        // count=1, four zero positions, kind=200
        let bad_kind = vec![1, 0, 0, 0, 0, 200, 0, 0, 0];
        assert_eq!(decode(&bad_kind), Err(EncodingError::InvalidKind(200)));
    }

    fn arb_entry() -> impl Strategy<Value = MetadataEntry> {
        (
            (0u32..500, 0u32..200, 0u32..500, 0u32..200),
            0usize..EntryKind::ALL.len(),
            "[a-z_][a-z0-9_]{0,8}",
            "[ -~]{0,24}",
            "[ -~\n]{0,40}",
        )
            .prop_map(|((sl, sc, el, ec), kind, name, detail, docs)| MetadataEntry {
                range: TextRange::new(Position::new(sl, sc), Position::new(el, ec)),
                kind: EntryKind::ALL[kind],
                name,
                detail,
                docs,
            })
    }

    proptest! {
        #[test]
        fn sorted_entries_survive_the_round_trip(mut entries in proptest::collection::vec(arb_entry(), 0..40)) {
            sort_entries(&mut entries);
            prop_assert_eq!(decode(&encode(entries.clone())), Ok(entries));
        }
    }
}
