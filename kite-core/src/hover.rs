//! Hover lookup over decoded metadata.
//!
//! Entries arrive sorted by [`metadata::sort_entries`], so every candidate
//! for a point lies in the prefix of entries starting at or before it.
//! Among the candidates whose range contains the point, the innermost one
//! wins: latest start, then earliest end.
//!
//! [`metadata::sort_entries`]: crate::metadata::sort_entries

use crate::metadata::MetadataEntry;
use crate::span::Position;

/// Innermost entry whose range contains `point`.
pub fn resolve(entries: &[MetadataEntry], point: Position) -> Option<&MetadataEntry> {
    let candidates = entries.partition_point(|entry| entry.range.start <= point);
    entries[..candidates]
        .iter()
        .filter(|entry| entry.range.contains(point))
        .max_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then_with(|| b.range.end.cmp(&a.range.end))
        })
}

/// Hover text: `"{label} {name}: {detail}"`, followed by the docs after a
/// blank line when there are any.
pub fn render(entry: &MetadataEntry) -> String {
    let mut text = format!("{} {}: {}", entry.kind.label(), entry.name, entry.detail);
    if !entry.docs.is_empty() {
        text.push_str("\n\n");
        text.push_str(&entry.docs);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntryKind, sort_entries};
    use crate::span::TextRange;

    fn entry(start: (u32, u32), end: (u32, u32), kind: EntryKind, name: &str) -> MetadataEntry {
        MetadataEntry {
            range: TextRange::new(Position::new(start.0, start.1), Position::new(end.0, end.1)),
            kind,
            name: name.to_string(),
            detail: "i32".to_string(),
            docs: String::new(),
        }
    }

    fn entries() -> Vec<MetadataEntry> {
        let mut entries = vec![
            entry((0, 0), (3, 1), EntryKind::Function, "f"),
            entry((0, 5), (0, 11), EntryKind::Param, "n"),
            entry((1, 8), (1, 9), EntryKind::Local, "x"),
            entry((2, 4), (2, 5), EntryKind::Local, "x"),
            entry((5, 0), (5, 10), EntryKind::Global, "G"),
        ];
        sort_entries(&mut entries);
        entries
    }

    fn name_at(line: u32, character: u32) -> Option<String> {
        let entries = entries();
        resolve(&entries, Position::new(line, character)).map(|e| e.name.clone())
    }

    #[test]
    fn picks_the_innermost_range() {
        assert_eq!(name_at(0, 6).as_deref(), Some("n"));
        assert_eq!(name_at(1, 8).as_deref(), Some("x"));
        assert_eq!(name_at(1, 2).as_deref(), Some("f"));
    }

    #[test]
    fn ranges_are_half_open() {
        assert_eq!(name_at(0, 11).as_deref(), Some("f"));
        assert_eq!(name_at(5, 9).as_deref(), Some("G"));
        assert_eq!(name_at(5, 10), None);
    }

    #[test]
    fn nothing_outside_every_range() {
        assert_eq!(name_at(4, 0), None);
        assert_eq!(name_at(40, 0), None);
        assert!(resolve(&[], Position::new(0, 0)).is_none());
    }

    #[test]
    fn renders_label_detail_and_docs() {
        let mut e = entry((0, 0), (0, 1), EntryKind::LocalMut, "count");
        assert_eq!(render(&e), "let mut count: i32");
        e.docs = "How many.".to_string();
        assert_eq!(render(&e), "let mut count: i32\n\nHow many.");
    }
}
