//! Linked files: moving VFX systems into a separate linked file and back
//!
//! A ritobin document names the files it depends on in its top-level
//! `linked` list:
//!
//! ```text
//! linked: list[string] = {
//!     "DATA/Characters/Ahri/Ahri.bin"
//!     "data/skin0_vfx.bin"
//! }
//! ```
//!
//! [`separate_vfx`] pulls every VFX system of a skin into `data/<stem>_vfx`
//! and links it from the main file; [`combine_linked`] merges linked files
//! back into the main file and drops their links. Links keep their `.bin`
//! game paths; the text files they stand for end in `.py`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::document::{SourceDocument, TextEdit};
use crate::error::Result;
use crate::formats::vfx::lexer::{Lexer, Token, TokenKind, quote, unquote};
use crate::formats::vfx::{EntryKey, SystemRecord};
use crate::utils::{last_segment, normalize_path};

/// Top-level field listing linked files
pub const LINKED_FIELD: &str = "linked";

/// Header of a document created by [`SourceDocument::from_records`]
const EMPTY_DOCUMENT: &str = "#PROP_text\ntype: string = \"PROP\"\nversion: u32 = 3\nlinked: list[string] = {}\nentries: map[hash,embed] = {}\n";

static CHAMPION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/characters/([^/]+)/").expect("champion pattern is valid"));

/// Braces and string items of the `linked` list
struct LinkedSection {
    open: usize,
    close: usize,
    items: Vec<Token>,
}

/// Index of the top-level `name:` field's name token
fn top_level_field(tokens: &[Token], src: &str, name: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LBrace => depth += 1,
            TokenKind::RBrace => depth = depth.saturating_sub(1),
            TokenKind::Ident if depth == 0 && token.text(src) == name => {
                if tokens.get(i + 1).is_some_and(|t| t.kind == TokenKind::Colon) {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn linked_section(src: &str) -> Option<LinkedSection> {
    let tokens: Vec<Token> = Lexer::new(src).collect();
    let field = top_level_field(&tokens, src, LINKED_FIELD)?;
    let open = field + tokens[field..].iter().position(|t| t.kind == TokenKind::LBrace)?;

    let mut items = Vec::new();
    for token in &tokens[open + 1..] {
        match token.kind {
            TokenKind::Str => items.push(*token),
            TokenKind::RBrace => {
                return Some(LinkedSection { open: tokens[open].start, close: token.start, items });
            }
            _ => {}
        }
    }
    None
}

fn same_link(a: &str, b: &str) -> bool {
    normalize_path(a).eq_ignore_ascii_case(&normalize_path(b))
}

/// Text file a `.bin` link stands for
fn text_path_for_link(link: &str) -> Option<String> {
    let len = link.len();
    if len < 4 || !link.is_char_boundary(len - 4) || !link[len - 4..].eq_ignore_ascii_case(".bin") {
        return None;
    }
    Some(format!("{}.py", &link[..len - 4]))
}

impl SourceDocument {
    /// A new document holding `records`
    pub fn from_records(records: &[SystemRecord]) -> Result<Self> {
        let mut doc = Self::new(EMPTY_DOCUMENT);
        doc.insert_records(records)?;
        Ok(doc)
    }

    /// Entries of the top-level `linked` list, in order
    #[must_use]
    pub fn linked_files(&self) -> Vec<String> {
        let src = self.text();
        linked_section(src)
            .map(|section| section.items.iter().map(|t| unquote(t.text(src))).collect())
            .unwrap_or_default()
    }

    /// Append `link` to the `linked` list, creating the list when missing
    ///
    /// Returns `false` when the link is already there.
    pub fn add_linked_file(&mut self, link: &str) -> Result<bool> {
        if self.linked_files().iter().any(|existing| same_link(existing, link)) {
            return Ok(false);
        }
        let quoted = quote(link);

        match linked_section(self.text()) {
            Some(section) => match section.items.last() {
                Some(last) => {
                    let indent = self.line_indent(last.start);
                    self.splice(last.end..last.end, &format!("\n{indent}{quoted}"))?;
                }
                None => self.splice(section.open..section.close + 1, &format!("{{\n    {quoted}\n}}"))?,
            },
            None => {
                let src = self.text();
                let tokens: Vec<Token> = Lexer::new(src).collect();
                let at = top_level_field(&tokens, src, "entries")
                    .map_or(src.len(), |i| src[..tokens[i].start].rfind('\n').map_or(0, |nl| nl + 1));
                let mut text = format!("{LINKED_FIELD}: list[string] = {{\n    {quoted}\n}}\n");
                if at == src.len() && !src.is_empty() && !src.ends_with('\n') {
                    text.insert(0, '\n');
                }
                self.splice(at..at, &text)?;
            }
        }
        tracing::debug!(link, "added linked file");
        Ok(true)
    }

    /// Drop every `linked` entry matching one of `links`; returns how many
    pub fn remove_linked_files(&mut self, links: &[String]) -> Result<usize> {
        let src = self.text();
        let Some(section) = linked_section(src) else {
            return Ok(0);
        };
        let edits: Vec<TextEdit> = section
            .items
            .iter()
            .filter(|t| links.iter().any(|link| same_link(&unquote(t.text(src)), link)))
            .map(|t| {
                let line_start = src[..t.start].rfind('\n');
                let start = match line_start {
                    Some(nl) if nl > section.open && src[nl + 1..t.start].trim().is_empty() => nl,
                    _ => t.start,
                };
                TextEdit::new(start..t.end, "")
            })
            .collect();

        let removed = edits.len();
        if removed > 0 {
            self.transact(|doc| doc.apply_edits(edits))?;
        }
        Ok(removed)
    }

    /// Remove every VFX system and return them, parsed, in document order
    pub fn take_vfx_systems(&mut self) -> Result<Vec<SystemRecord>> {
        let keys: Vec<EntryKey> = self.systems().map(|e| e.key.clone()).collect();
        self.transact(|doc| {
            let mut records = Vec::with_capacity(keys.len());
            for key in &keys {
                records.push(doc.parse_entry(key)?.record);
                doc.remove_entry_text(key)?;
            }
            Ok(records)
        })
    }

    /// Copy every entry of `other` whose key this document lacks
    ///
    /// Returns the copied keys.
    pub fn merge_new_entries(&mut self, other: &SourceDocument) -> Result<Vec<EntryKey>> {
        let mut records = Vec::new();
        for entry in other.index().entries().values() {
            if self.contains_key(&entry.key) || records.iter().any(|r: &SystemRecord| r.key.refers_to(&entry.key)) {
                continue;
            }
            records.push(other.parse_entry(&entry.key)?.record);
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }
        self.transact(|doc| doc.insert_records(&records))?;
        Ok(records.into_iter().map(|r| r.key).collect())
    }
}

// ============================================================================
// Files
// ============================================================================

/// Result of [`separate_vfx`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparateReport {
    /// The new VFX file
    pub vfx_file: PathBuf,
    /// Link added to the main file
    pub link: String,
    /// Systems moved, in order
    pub systems: Vec<EntryKey>,
    /// Files VFX systems were taken from
    pub changed_files: Vec<PathBuf>,
}

/// Result of [`combine_linked`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombineReport {
    /// Linked files merged and deleted
    pub merged_files: Vec<PathBuf>,
    /// Entries copied into the main file
    pub merged_entries: Vec<EntryKey>,
    /// Links dropped from the main file
    pub removed_links: Vec<String>,
}

/// Parent of the nearest `data` directory above `main`, else its directory
#[must_use]
pub fn find_skin_root(main: &Path) -> PathBuf {
    let dir = main.parent().unwrap_or(main);
    dir.ancestors()
        .find(|a| a.file_name().is_some_and(|n| n.eq_ignore_ascii_case("data")))
        .and_then(Path::parent)
        .unwrap_or(dir)
        .to_path_buf()
}

fn read_document(path: &Path) -> Result<SourceDocument> {
    Ok(SourceDocument::new(fs::read_to_string(path)?))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Move the VFX systems of `main` and of the text files next to the skin
/// root into `<root>/data/<stem>_vfx.py`, linked from `main`
///
/// A system found in more than one file is moved once; later copies are
/// dropped. Returns `None` when no file has a VFX system.
pub fn separate_vfx(main: &Path) -> Result<Option<SeparateReport>> {
    let root = find_skin_root(main);
    let stem = main.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

    let mut files = vec![main.to_path_buf()];
    for entry in WalkDir::new(&root).max_depth(1).sort_by_file_name() {
        let path = entry?.into_path();
        let is_text = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("py"));
        if is_text && path.is_file() && !files.iter().any(|f| same_file(f, &path)) {
            files.push(path);
        }
    }

    let mut moved: Vec<SystemRecord> = Vec::new();
    let mut changed: Vec<(PathBuf, SourceDocument)> = Vec::new();
    for path in files {
        let mut doc = read_document(&path)?;
        let taken = doc.take_vfx_systems()?;
        if taken.is_empty() && path.as_path() != main {
            continue;
        }
        for record in taken {
            if !moved.iter().any(|m| m.key.refers_to(&record.key)) {
                moved.push(record);
            }
        }
        changed.push((path, doc));
    }
    if moved.is_empty() {
        tracing::warn!(main = %main.display(), "no VFX systems to separate");
        return Ok(None);
    }

    let link = format!("data/{stem}_vfx.bin");
    let vfx_file = root.join("data").join(format!("{stem}_vfx.py"));
    let vfx_doc = SourceDocument::from_records(&moved)?;
    if let Some((_, main_doc)) = changed.first_mut() {
        main_doc.add_linked_file(&link)?;
    }

    if let Some(parent) = vfx_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&vfx_file, vfx_doc.text())?;
    for (path, doc) in &changed {
        fs::write(path, doc.text())?;
    }

    tracing::info!(file = %vfx_file.display(), systems = moved.len(), "separated VFX systems");
    Ok(Some(SeparateReport {
        vfx_file,
        link,
        systems: moved.into_iter().map(|r| r.key).collect(),
        changed_files: changed.into_iter().map(|(path, _)| path).collect(),
    }))
}

/// Merge the files `main` links to back into it
///
/// Each `.bin` link is looked up as a `.py` text file under the skin root,
/// by file name and by full path. The champion's base file and `main`
/// itself are skipped. Entries `main` already has are left out; a file that
/// contributed anything is deleted and its link removed.
pub fn combine_linked(main: &Path) -> Result<CombineReport> {
    let root = find_skin_root(main);
    let mut main_doc = read_document(main)?;
    let champion = CHAMPION_RE
        .captures(&normalize_path(&*main.to_string_lossy()))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase());
    let base_file = champion.map(|c| format!("{c}.py"));

    let mut report = CombineReport::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    for link in main_doc.linked_files() {
        let Some(text_link) = text_path_for_link(&link) else {
            continue;
        };
        let candidates = [root.join(last_segment(&text_link)), root.join(&text_link)];
        let Some(found) = candidates.into_iter().find(|c| c.is_file()) else {
            tracing::debug!(link = %link, "linked file not found");
            continue;
        };

        let name = found.file_name().map(|n| n.to_string_lossy().to_lowercase());
        if name.is_some() && name == base_file {
            continue;
        }
        if same_file(&found, main) || !seen.insert(found.canonicalize().unwrap_or_else(|_| found.clone())) {
            continue;
        }

        let merged = main_doc.merge_new_entries(&read_document(&found)?)?;
        if merged.is_empty() {
            continue;
        }
        tracing::info!(file = %found.display(), entries = merged.len(), "merged linked file");
        report.merged_entries.extend(merged);
        report.merged_files.push(found);
        report.removed_links.push(link);
    }

    if report.merged_files.is_empty() {
        return Ok(report);
    }
    main_doc.remove_linked_files(&report.removed_links)?;
    fs::write(main, main_doc.text())?;
    for file in &report.merged_files {
        fs::remove_file(file)?;
    }
    Ok(report)
}
