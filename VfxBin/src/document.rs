//! Source document: ritobin text plus its boundary index
//!
//! [`SourceDocument`] owns the text and keeps an [`EntryIndex`] in sync with
//! it. Every mutation goes through [`SourceDocument::splice`], which checks
//! that both the replaced span and the replacement are balanced, then
//! rescans only the edited span. Parsed records are cached per key until an
//! edit touches or moves them.
//!
//! Multi-step operations run inside [`SourceDocument::transact`] so that a
//! failing step leaves the document exactly as it was.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use indexmap::IndexMap;
use rayon::prelude::*;
use regex::Regex;

use crate::error::{Error, Result};
use crate::formats::vfx::{EntryKey, ParsedRecord, SystemRecord, check_balance, parse_record_at, replace_span, write_system};
use crate::index::{EntryIndex, IndexEntry, find_block_end};

/// Record type holding a skin's idle and persistent effects
pub const SKIN_DATA_TYPE: &str = "SkinCharacterDataProperties";

/// Record type mapping human names to effect keys
pub const RESOLVER_TYPE: &str = "ResourceResolver";

static ENTRIES_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*entries\s*:\s*map\s*\[[^\]]*\]\s*=\s*\{").expect("entries pattern is valid")
});

/// A replacement of `range` with `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub text: String,
}

impl TextEdit {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self { range, text: text.into() }
    }
}

/// Where new top-level entries go
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InsertionPoint {
    pub offset: usize,
    /// Indentation of the entry's header line
    pub indent: String,
    pub prefix: String,
    pub suffix: String,
}

impl InsertionPoint {
    /// Text to splice in for `records`
    pub fn render(&self, records: &[SystemRecord]) -> String {
        let separator = format!("\n{}", self.indent);
        let body: Vec<String> = records.iter().map(|r| write_system(r, &self.indent)).collect();
        format!("{}{}{}", self.prefix, body.join(&separator), self.suffix)
    }
}

/// Systems parsed by [`SourceDocument::parse_all`]
#[derive(Debug, Default)]
pub struct ParseAllResult {
    pub records: Vec<ParsedRecord>,
    pub failures: Vec<(EntryKey, Error)>,
}

/// Ritobin text with an incrementally maintained entry index
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    text: String,
    index: EntryIndex,
    cache: HashMap<EntryKey, ParsedRecord>,
}

impl SourceDocument {
    /// Take ownership of `text` and index it
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let index = EntryIndex::build(&text);
        Self { text, index, cache: HashMap::new() }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Index of every top-level entry
    #[must_use]
    pub fn index(&self) -> &EntryIndex {
        &self.index
    }

    /// `VfxSystemDefinitionData` entries keyed by key, in document order
    #[must_use]
    pub fn vfx_index(&self) -> IndexMap<EntryKey, IndexEntry> {
        self.index.systems().map(|e| (e.key.clone(), e.clone())).collect()
    }

    pub fn systems(&self) -> impl Iterator<Item = &IndexEntry> {
        self.index.systems()
    }

    #[must_use]
    pub fn entry(&self, key: &EntryKey) -> Option<&IndexEntry> {
        self.index.lookup(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &EntryKey) -> bool {
        self.index.contains(key)
    }

    pub fn require_entry(&self, key: &EntryKey) -> Result<&IndexEntry> {
        self.entry(key).ok_or_else(|| Error::EntryNotFound { key: key.literal() })
    }

    /// The entry, which must be a VFX system
    pub fn require_system(&self, key: &EntryKey) -> Result<&IndexEntry> {
        let entry = self.require_entry(key)?;
        if !entry.is_vfx_system() {
            return Err(Error::NotAVfxSystem { key: key.literal(), type_name: entry.type_name.clone() });
        }
        Ok(entry)
    }

    /// First entry of a record type
    #[must_use]
    pub fn first_of_type(&self, type_name: &str) -> Option<&IndexEntry> {
        self.index.of_type(type_name).next()
    }

    #[must_use]
    pub fn skin_data(&self) -> Option<&IndexEntry> {
        self.first_of_type(SKIN_DATA_TYPE)
    }

    #[must_use]
    pub fn resolver(&self) -> Option<&IndexEntry> {
        self.first_of_type(RESOLVER_TYPE)
    }

    /// Parse one entry without touching the cache
    pub fn parse_entry(&self, key: &EntryKey) -> Result<ParsedRecord> {
        let entry = self.require_entry(key)?;
        parse_record_at(&self.text, entry.byte_range.clone(), entry.start_line)
    }

    /// Parse one entry, reusing the cached result while it is current
    pub fn record(&mut self, key: &EntryKey) -> Result<&ParsedRecord> {
        let key = self.require_entry(key)?.key.clone();
        if !self.cache.contains_key(&key) {
            let parsed = self.parse_entry(&key)?;
            self.cache.insert(key.clone(), parsed);
        }
        self.cache.get(&key).ok_or(Error::EntryNotFound { key: key.literal() })
    }

    /// Parse every VFX system in parallel
    ///
    /// Systems that fail (unbalanced braces) are returned in `failures`;
    /// the rest still parse.
    #[must_use]
    pub fn parse_all(&self) -> ParseAllResult {
        let entries: Vec<&IndexEntry> = self.index.systems().collect();
        let results: Vec<(EntryKey, Result<ParsedRecord>)> = entries
            .par_iter()
            .map(|e| (e.key.clone(), parse_record_at(&self.text, e.byte_range.clone(), e.start_line)))
            .collect();

        let mut out = ParseAllResult::default();
        for (key, result) in results {
            match result {
                Ok(parsed) => out.records.push(parsed),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "system failed to parse");
                    out.failures.push((key, err));
                }
            }
        }
        out
    }

    /// Leading whitespace of the line containing `offset`
    #[must_use]
    pub fn line_indent(&self, offset: usize) -> String {
        let offset = offset.min(self.text.len());
        let line_start = self.text[..offset].rfind('\n').map_or(0, |i| i + 1);
        self.text[line_start..offset]
            .chars()
            .take_while(|c| matches!(c, ' ' | '\t'))
            .collect()
    }

    // ========================================================================
    // Mutation primitives
    // ========================================================================

    /// Replace `range` with `new_text` and reindex the edited span
    ///
    /// Both the removed text and the new text must have balanced braces.
    pub(crate) fn splice(&mut self, range: Range<usize>, new_text: &str) -> Result<()> {
        let replaced = replace_span(&self.text, range.clone(), new_text)?;
        check_balance(&self.text, range.clone())?;
        check_balance(new_text, 0..new_text.len())?;

        let removed_lines = self.text[range.clone()].bytes().filter(|&b| b == b'\n').count();
        let added_lines = new_text.bytes().filter(|&b| b == b'\n').count();
        let line_delta = added_lines as isize - removed_lines as isize;

        self.text = replaced;
        let changed = self.index.apply_splice(&self.text, range.clone(), new_text.len(), line_delta);
        for key in &changed {
            self.cache.remove(key);
        }
        self.cache.retain(|_, parsed| parsed.record.range.end <= range.start);
        Ok(())
    }

    /// Apply non-overlapping edits, last first
    pub(crate) fn apply_edits(&mut self, mut edits: Vec<TextEdit>) -> Result<()> {
        edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));
        for pair in edits.windows(2) {
            if pair[1].range.end > pair[0].range.start {
                return Err(Error::InvalidEdit {
                    message: format!("edits {:?} and {:?} overlap", pair[1].range, pair[0].range),
                });
            }
        }
        for edit in edits {
            self.splice(edit.range, &edit.text)?;
        }
        Ok(())
    }

    /// Run `f` on a scratch copy and keep the result only if it succeeds
    pub(crate) fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mut scratch = self.clone();
        let out = f(&mut scratch)?;
        *self = scratch;
        Ok(out)
    }

    /// Parse an entry, let `f` change it, and write it back in place
    ///
    /// Nothing is written when `f` fails or leaves the text unchanged.
    pub(crate) fn rewrite_entry<T>(&mut self, key: &EntryKey, f: impl FnOnce(&mut SystemRecord) -> Result<T>) -> Result<T> {
        let mut record = self.parse_entry(key)?.record;
        let out = f(&mut record)?;
        self.write_back(&mut record)?;
        Ok(out)
    }

    /// Write a record parsed from this document over its own span
    pub(crate) fn write_back(&mut self, record: &mut SystemRecord) -> Result<()> {
        record.refresh_emitters();
        let indent = self.line_indent(record.range.start);
        let new_text = write_system(record, &indent);
        if new_text != self.text[record.range.clone()] {
            self.splice(record.range.clone(), &new_text)?;
        }
        Ok(())
    }

    /// Remove an entry together with the indentation and newline in front of it
    pub(crate) fn remove_entry_text(&mut self, key: &EntryKey) -> Result<()> {
        let range = self.require_entry(key)?.byte_range.clone();
        let line_start = self.text[..range.start].rfind('\n');
        let start = match line_start {
            Some(nl) if self.text[nl + 1..range.start].trim_start_matches([' ', '\t']).is_empty() => nl,
            _ => range.start,
        };
        self.splice(start..range.end, "")
    }

    /// Where [`Self::insert_records`] puts new entries
    ///
    /// After the last VFX system, else after the last entry, else inside the
    /// `entries` map, else in a new `entries` map at the end.
    pub(crate) fn insertion_point(&self) -> InsertionPoint {
        let anchor = self.index.systems().last().or_else(|| self.index.entries().values().last());
        if let Some(entry) = anchor {
            let indent = self.line_indent(entry.byte_range.start);
            return InsertionPoint {
                offset: entry.byte_range.end,
                prefix: format!("\n{indent}"),
                indent,
                suffix: String::new(),
            };
        }

        if let Some(found) = ENTRIES_FIELD_RE.find(&self.text) {
            let open = found.end() - 1;
            if let Some((close, _)) = find_block_end(&self.text, open, self.text.len()) {
                let base = self.line_indent(found.start() + (found.as_str().len() - found.as_str().trim_start().len()));
                let indent = format!("{base}    ");
                let inner = &self.text[open + 1..close - 1];
                let inline = inner.trim().is_empty() && !inner.contains('\n');
                return InsertionPoint {
                    offset: open + 1,
                    prefix: format!("\n{indent}"),
                    indent,
                    suffix: if inline { format!("\n{base}") } else { String::new() },
                };
            }
        }

        let needs_newline = !self.text.is_empty() && !self.text.ends_with('\n');
        InsertionPoint {
            offset: self.text.len(),
            indent: "    ".to_string(),
            prefix: format!("{}entries: map[hash,embed] = {{\n    ", if needs_newline { "\n" } else { "" }),
            suffix: "\n}\n".to_string(),
        }
    }

    /// Write records at the insertion point in one splice
    pub(crate) fn insert_records(&mut self, records: &[SystemRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let point = self.insertion_point();
        let text = point.render(records);
        self.splice(point.offset..point.offset, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::vfx::Record;
    use pretty_assertions::assert_eq;

    const DOC: &str = "#PROP_text\nentries: map[hash,embed] = {\n    \"A\" = VfxSystemDefinitionData {\n        particleName: string = \"A\"\n    }\n}\n";

    #[test]
    fn test_splice_rejects_unbalanced_text() {
        let mut doc = SourceDocument::new(DOC);
        let at = DOC.find("particleName").unwrap();
        let err = doc.splice(at..at, "x: embed = Foo {").unwrap_err();
        assert!(matches!(err, Error::UnbalancedBraces { .. }));
        assert_eq!(doc.text(), DOC);
    }

    #[test]
    fn test_transact_rolls_back() {
        let mut doc = SourceDocument::new(DOC);
        let result: Result<()> = doc.transact(|d| {
            d.splice(0..0, "# first\n")?;
            Err(Error::InvalidEdit { message: "boom".into() })
        });
        assert!(result.is_err());
        assert_eq!(doc.text(), DOC);
    }

    #[test]
    fn test_cache_invalidated_by_edit() {
        let mut doc = SourceDocument::new(DOC);
        let key = EntryKey::name("A");
        assert_eq!(doc.record(&key).unwrap().record.particle_name().as_deref(), Some("A"));
        doc.rewrite_entry(&key, |r| {
            r.body.set_field("particleName", crate::formats::vfx::FieldType::String, crate::formats::vfx::Value::string("B"));
            Ok(())
        })
        .unwrap();
        assert_eq!(doc.record(&key).unwrap().record.particle_name().as_deref(), Some("B"));
    }

    #[test]
    fn test_insert_into_empty_entries_map() {
        let mut doc = SourceDocument::new("#PROP_text\nentries: map[hash,embed] = {}\n");
        let record = SystemRecord::new(EntryKey::name("New"), Record::new("VfxSystemDefinitionData"));
        doc.insert_records(&[record]).unwrap();
        assert_eq!(
            doc.text(),
            "#PROP_text\nentries: map[hash,embed] = {\n    \"New\" = VfxSystemDefinitionData {}\n}\n"
        );
        assert_eq!(doc.systems().count(), 1);
    }

    #[test]
    fn test_insert_without_entries_map() {
        let mut doc = SourceDocument::new("#PROP_text\ntype: string = \"PROP\"");
        let record = SystemRecord::new(EntryKey::name("New"), Record::new("VfxSystemDefinitionData"));
        doc.insert_records(&[record]).unwrap();
        assert!(doc.text().ends_with("\"PROP\"\nentries: map[hash,embed] = {\n    \"New\" = VfxSystemDefinitionData {}\n}\n"));
        assert_eq!(doc.index().len(), 1);
    }

    #[test]
    fn test_remove_entry_text_takes_its_line() {
        let mut doc = SourceDocument::new(DOC);
        doc.remove_entry_text(&EntryKey::name("A")).unwrap();
        assert_eq!(doc.text(), "#PROP_text\nentries: map[hash,embed] = {\n}\n");
        assert!(doc.index().is_empty());
    }
}
