//! Boundary index over a ritobin text document
//!
//! Finds every top-level `<key> = <Type> { ... }` entry without parsing its
//! fields. Each [`IndexEntry`] carries the key, type, byte span, 1-based line
//! span, and the `particleName`/`emitterName` strings found by a narrow scan
//! of the span.
//!
//! ## Usage
//!
//! ```
//! use vfxbin::index::index;
//!
//! let text = "\"Base/Effect\" = VfxSystemDefinitionData { particleName: string = \"Fx\" }";
//! let systems = index(text);
//! assert_eq!(systems.len(), 1);
//! ```
//!
//! Malformed input never fails the scan: unclosed records and duplicate
//! keys are reported in [`EntryIndex::diagnostics`] and skipped.

mod batch;
mod scanner;

use std::ops::Range;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::formats::vfx::{EntryKey, VFX_SYSTEM_TYPE};

pub(crate) use scanner::find_block_end;
use scanner::{RawEntry, scan};

pub use batch::{BatchIndexResult, IndexedFile, find_bin_texts, index_files};

static PARTICLE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"particleName:\s*string\s*=\s*"((?:[^"\\]|\\.)*)""#).expect("particleName pattern is valid")
});

static EMITTER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"emitterName:\s*string\s*=\s*"((?:[^"\\]|\\.)*)""#).expect("emitterName pattern is valid")
});

/// One top-level entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub key: EntryKey,
    pub type_name: String,
    /// Hash digits or last path segment of the key
    pub display_name: String,
    /// First `particleName` in the entry
    pub particle_name: Option<String>,
    /// Every `emitterName` in the entry, in order
    pub emitter_names: Vec<String>,
    /// 1-based line of the key
    pub start_line: usize,
    /// 1-based line of the closing brace
    pub end_line: usize,
    /// From the first byte of the key to just past the closing brace
    pub byte_range: Range<usize>,
}

impl IndexEntry {
    fn from_raw(text: &str, raw: RawEntry) -> Self {
        let span = &text[raw.range.clone()];
        let particle_name = PARTICLE_NAME_RE
            .captures(span)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        let emitter_names = EMITTER_NAME_RE
            .captures_iter(span)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect();

        Self {
            display_name: raw.key.display_name(),
            key: raw.key,
            type_name: raw.type_name,
            particle_name,
            emitter_names,
            start_line: raw.start_line,
            end_line: raw.end_line,
            byte_range: raw.range,
        }
    }

    #[must_use]
    pub fn is_vfx_system(&self) -> bool {
        self.type_name == VFX_SYSTEM_TYPE
    }

    fn shift(&mut self, bytes: isize, lines: isize) {
        self.byte_range = self.byte_range.start.saturating_add_signed(bytes)..self.byte_range.end.saturating_add_signed(bytes);
        self.start_line = self.start_line.saturating_add_signed(lines);
        self.end_line = self.end_line.saturating_add_signed(lines);
    }
}

/// Something the indexer skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDiagnostic {
    pub offset: usize,
    pub line: usize,
    pub reason: String,
}

/// All top-level entries of a document, ordered by position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryIndex {
    #[serde(with = "indexmap::map::serde_seq")]
    entries: IndexMap<EntryKey, IndexEntry>,
    diagnostics: Vec<IndexDiagnostic>,
}

impl EntryIndex {
    /// Scan a whole document
    #[must_use]
    pub fn build(text: &str) -> Self {
        let mut index = Self::default();
        let (raw, diagnostics) = scan(text, 0..text.len(), 1);
        index.diagnostics.extend(diagnostics.into_iter().map(|d| IndexDiagnostic {
            offset: d.offset,
            line: d.line,
            reason: d.reason,
        }));
        for entry in raw {
            index.add(IndexEntry::from_raw(text, entry));
        }
        index.sort();

        tracing::debug!(
            entries = index.entries.len(),
            diagnostics = index.diagnostics.len(),
            "indexed document"
        );
        index
    }

    fn add(&mut self, entry: IndexEntry) {
        let line = entry.start_line;
        let offset = entry.byte_range.start;
        match self.entries.get_mut(&entry.key) {
            None => {
                self.entries.insert(entry.key.clone(), entry);
            }
            Some(existing) => {
                let (kept, dropped) = if existing.byte_range.start <= offset {
                    (existing.start_line, entry)
                } else {
                    let dropped = std::mem::replace(existing, entry);
                    (line, dropped)
                };
                tracing::warn!(key = %dropped.key, line = dropped.start_line, "duplicate entry key ignored");
                self.diagnostics.push(IndexDiagnostic {
                    offset: dropped.byte_range.start,
                    line: dropped.start_line,
                    reason: format!("duplicate key {}; definition at line {kept} kept", dropped.key),
                });
            }
        }
    }

    fn sort(&mut self) {
        self.entries.sort_by(|_, a, _, b| a.byte_range.start.cmp(&b.byte_range.start));
        self.diagnostics.sort_by_key(|d| d.offset);
    }

    /// Every entry, any type
    #[must_use]
    pub fn entries(&self) -> &IndexMap<EntryKey, IndexEntry> {
        &self.entries
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[IndexDiagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn get(&self, key: &EntryKey) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Exact key, else an entry whose key refers to `key` across name/hash forms
    #[must_use]
    pub fn lookup(&self, key: &EntryKey) -> Option<&IndexEntry> {
        self.entries
            .get(key)
            .or_else(|| self.entries.values().find(|e| e.key.refers_to(key)))
    }

    #[must_use]
    pub fn contains(&self, key: &EntryKey) -> bool {
        self.lookup(key).is_some()
    }

    /// `VfxSystemDefinitionData` entries in document order
    pub fn systems(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values().filter(|e| e.is_vfx_system())
    }

    /// Entries of one record type in document order
    pub fn of_type<'a, 'b>(&'a self, type_name: &'b str) -> impl Iterator<Item = &'a IndexEntry> + use<'a, 'b> {
        self.entries.values().filter(move |e| e.type_name == type_name)
    }

    /// The entry whose span contains `offset`
    #[must_use]
    pub fn entry_at(&self, offset: usize) -> Option<&IndexEntry> {
        let values = self.entries.as_slice();
        let idx = values.partition_point(|_, e| e.byte_range.start <= offset);
        let (_, entry) = values.get_index(idx.checked_sub(1)?)?;
        (offset < entry.byte_range.end).then_some(entry)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-based line of `offset` in `text`, counted from the closest entry before it
    #[must_use]
    pub fn line_at(&self, text: &str, offset: usize) -> usize {
        let offset = offset.min(text.len());
        let before = self
            .entries
            .values()
            .rev()
            .find(|e| e.byte_range.end <= offset);
        let (base, line) = before.map_or((0, 1), |e| (e.byte_range.end, e.end_line));
        line + text[base..offset].bytes().filter(|&b| b == b'\n').count()
    }

    /// Update the index after `old_range` was replaced by `new_len` bytes
    ///
    /// `text` is the document after the replacement. Entries overlapping the
    /// edit are dropped and the edited span is rescanned; later entries are
    /// shifted. Returns the keys whose spans were dropped or rescanned.
    pub(crate) fn apply_splice(
        &mut self,
        text: &str,
        old_range: Range<usize>,
        new_len: usize,
        line_delta: isize,
    ) -> Vec<EntryKey> {
        let byte_delta = new_len as isize - (old_range.end - old_range.start) as isize;
        let touches = |r: &Range<usize>| {
            if old_range.is_empty() {
                r.start < old_range.start && old_range.start < r.end
            } else {
                r.start < old_range.end && old_range.start < r.end
            }
        };

        let touched: Vec<EntryKey> = self
            .entries
            .values()
            .filter(|e| touches(&e.byte_range))
            .map(|e| e.key.clone())
            .collect();

        let mut region_start = old_range.start;
        let mut region_end_old = old_range.end;
        for key in &touched {
            if let Some(entry) = self.entries.shift_remove(key) {
                region_start = region_start.min(entry.byte_range.start);
                region_end_old = region_end_old.max(entry.byte_range.end);
            }
        }
        let region_end_new = region_end_old.saturating_add_signed(byte_delta).min(text.len());

        for entry in self.entries.values_mut() {
            if entry.byte_range.start >= region_end_old {
                entry.shift(byte_delta, line_delta);
            }
        }
        self.diagnostics.retain(|d| d.offset < region_start || d.offset >= region_end_old);
        for diagnostic in &mut self.diagnostics {
            if diagnostic.offset >= region_end_old {
                diagnostic.offset = diagnostic.offset.saturating_add_signed(byte_delta);
                diagnostic.line = diagnostic.line.saturating_add_signed(line_delta);
            }
        }

        let first_line = self.line_at(text, region_start);
        let (raw, diagnostics) = scan(text, region_start..region_end_new, first_line);
        self.diagnostics.extend(diagnostics.into_iter().map(|d| IndexDiagnostic {
            offset: d.offset,
            line: d.line,
            reason: d.reason,
        }));

        let mut changed = touched;
        for entry in raw {
            changed.push(entry.key.clone());
            self.add(IndexEntry::from_raw(text, entry));
        }
        self.sort();

        tracing::trace!(
            start = region_start,
            end = region_end_new,
            rescanned = changed.len(),
            "reindexed edited span"
        );
        changed
    }
}

/// Index every top-level entry of a document, any type
#[must_use]
pub fn scan_entries(text: &str) -> EntryIndex {
    EntryIndex::build(text)
}

/// Index the `VfxSystemDefinitionData` entries of a document
#[must_use]
pub fn index(text: &str) -> IndexMap<EntryKey, IndexEntry> {
    scan_entries(text)
        .entries
        .into_iter()
        .filter(|(_, e)| e.is_vfx_system())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"#PROP_text
type: string = "PROP"
entries: map[hash,embed] = {
    "Characters/Ahri/Skins/Skin0/Particles/Orb" = VfxSystemDefinitionData {
        complexEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                emitterName: string = "Glow"
            }
            VfxEmitterDefinitionData {
                emitterName: string = "Sparks"
            }
        }
        particleName: string = "Ahri_Orb"
    }
    0xdeadbeef = ResourceResolver {
        resourceMap: map[hash,link] = {}
    }
}
"#;

    #[test]
    fn test_index_vfx_only() {
        let systems = index(DOC);
        assert_eq!(systems.len(), 1);
        let entry = &systems[0];
        assert_eq!(entry.display_name, "Orb");
        assert_eq!(entry.particle_name.as_deref(), Some("Ahri_Orb"));
        assert_eq!(entry.emitter_names, vec!["Glow", "Sparks"]);
        assert_eq!((entry.start_line, entry.end_line), (4, 14));
    }

    #[test]
    fn test_all_entries_and_lookup() {
        let index = EntryIndex::build(DOC);
        assert_eq!(index.len(), 2);
        assert_eq!(index.of_type("ResourceResolver").count(), 1);
        let hash_of_name = EntryKey::Hash(EntryKey::name("Characters/Ahri/Skins/Skin0/Particles/Orb").hash());
        assert!(index.contains(&hash_of_name));
        let offset = DOC.find("Sparks").unwrap();
        assert_eq!(index.entry_at(offset).map(|e| e.display_name.as_str()), Some("Orb"));
        assert!(index.entry_at(0).is_none());
    }

    #[test]
    fn test_duplicate_key_reported() {
        let text = "\"A\" = Foo {}\n\"A\" = Bar {}\n";
        let index = EntryIndex::build(text);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&EntryKey::name("A")).unwrap().type_name, "Foo");
        assert_eq!(index.diagnostics().len(), 1);
        assert_eq!(index.diagnostics()[0].line, 2);
    }

    #[test]
    fn test_apply_splice_matches_full_rebuild() {
        let mut index = EntryIndex::build(DOC);
        let at = DOC.find("particleName").unwrap();
        let old = at..at;
        let inserted = "particlePath: string = \"x\"\n        ";
        let mut text = DOC.to_string();
        text.insert_str(at, inserted);

        index.apply_splice(&text, old, inserted.len(), 1);
        assert_eq!(index, EntryIndex::build(&text));
    }

    #[test]
    fn test_apply_splice_insert_between_entries() {
        let mut index = EntryIndex::build(DOC);
        let at = DOC.find("    0xdeadbeef").unwrap();
        let inserted = "    \"New\" = VfxSystemDefinitionData {\n    }\n";
        let mut text = DOC.to_string();
        text.insert_str(at, inserted);

        let changed = index.apply_splice(&text, at..at, inserted.len(), 2);
        assert_eq!(changed, vec![EntryKey::name("New")]);
        assert_eq!(index, EntryIndex::build(&text));
    }
}
