//! Byte-level entry boundary scanner
//!
//! Headers are located with a regex; the body of each entry is then walked
//! byte by byte counting braces outside string literals and `#` comments.
//! Line numbers are accumulated in the same passes, so a full scan is linear
//! in the input.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::formats::vfx::EntryKey;

/// `<"name" | 0xhash> = <Type> {`
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"("(?:[^"\\\n]|\\.)*"|0[xX][0-9a-fA-F]{1,8})[ \t]*=[ \t]*([A-Za-z_][A-Za-z0-9_]*|0[xX][0-9a-fA-F]+)[ \t]*\{"#,
    )
    .expect("header pattern is valid")
});

/// One top-level entry found by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawEntry {
    pub key: EntryKey,
    pub type_name: String,
    pub range: Range<usize>,
    pub start_line: usize,
    pub end_line: usize,
}

/// Something the scanner skipped, with its 1-based line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawDiagnostic {
    pub offset: usize,
    pub line: usize,
    pub reason: String,
}

/// String/comment state carried across the gaps between entries
struct GapCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    in_string: bool,
    in_comment: bool,
}

impl<'a> GapCursor<'a> {
    fn new(bytes: &'a [u8], pos: usize, line: usize) -> Self {
        Self { bytes, pos, line, in_string: false, in_comment: false }
    }

    /// Advance to `target`, tracking newlines and literal state
    fn advance_to(&mut self, target: usize) {
        while self.pos < target {
            let b = self.bytes[self.pos];
            if b == b'\n' {
                self.line += 1;
                self.in_comment = false;
            } else if self.in_string {
                if b == b'\\' {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'\n') {
                        self.line += 1;
                    }
                } else if b == b'"' {
                    self.in_string = false;
                }
            } else if !self.in_comment {
                match b {
                    b'"' => self.in_string = true,
                    b'#' => self.in_comment = true,
                    _ => {}
                }
            }
            self.pos += 1;
        }
        self.pos = self.pos.max(target);
    }

    fn in_literal(&self) -> bool {
        self.in_string || self.in_comment
    }

    /// Jump to `pos` whose line is already known; literal state resets
    fn jump(&mut self, pos: usize, line: usize) {
        self.pos = pos;
        self.line = line;
        self.in_string = false;
        self.in_comment = false;
    }
}

/// Find the `}` matching the `{` at `open`
///
/// Returns the offset just past it and the number of newlines crossed.
pub(crate) fn find_block_end(text: &str, open: usize, limit: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let limit = limit.min(bytes.len());
    let mut depth = 0usize;
    let mut newlines = 0usize;
    let mut in_string = false;
    let mut in_comment = false;
    let mut i = open;

    while i < limit {
        let b = bytes[i];
        if b == b'\n' {
            newlines += 1;
            in_comment = false;
        } else if in_string {
            if b == b'\\' {
                i += 1;
                if bytes.get(i) == Some(&b'\n') {
                    newlines += 1;
                }
            } else if b == b'"' {
                in_string = false;
            }
        } else if !in_comment {
            match b {
                b'"' => in_string = true,
                b'#' => in_comment = true,
                b'{' => depth += 1,
                b'}' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some((i + 1, newlines));
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Scan `text[range]` for top-level entries
///
/// `first_line` is the 1-based line of `range.start`, which must not sit
/// inside a string or comment.
pub(crate) fn scan(text: &str, range: Range<usize>, first_line: usize) -> (Vec<RawEntry>, Vec<RawDiagnostic>) {
    let end = range.end.min(text.len());
    let mut entries = Vec::new();
    let mut diagnostics = Vec::new();
    let mut cursor = GapCursor::new(text.as_bytes(), range.start, first_line);
    let mut search_from = range.start;

    while search_from < end {
        let Some(caps) = HEADER_RE.captures_at(&text[..end], search_from) else {
            break;
        };
        let Some(whole) = caps.get(0) else { break };
        let header_start = whole.start();

        cursor.advance_to(header_start);
        if cursor.in_literal() {
            // header-shaped text inside a string or comment
            let mut skip_to = header_start + 1;
            cursor.advance_to(skip_to);
            while cursor.in_literal() && skip_to < end {
                skip_to += 1;
                cursor.advance_to(skip_to);
            }
            search_from = skip_to;
            continue;
        }

        let key_text = caps.get(1).map_or("", |m| m.as_str());
        let type_name = caps.get(2).map_or("", |m| m.as_str()).to_string();
        let open = whole.end() - 1;
        let start_line = cursor.line;

        let Some(key) = EntryKey::from_literal(key_text) else {
            search_from = whole.end();
            continue;
        };

        match find_block_end(text, open, end) {
            Some((close, newlines)) => {
                let header_newlines = text[header_start..open].bytes().filter(|&b| b == b'\n').count();
                let end_line = start_line + header_newlines + newlines;
                entries.push(RawEntry {
                    key,
                    type_name,
                    range: header_start..close,
                    start_line,
                    end_line,
                });
                cursor.jump(close, end_line);
                search_from = close;
            }
            None => {
                diagnostics.push(RawDiagnostic {
                    offset: header_start,
                    line: start_line,
                    reason: format!("{key} = {type_name} is never closed"),
                });
                // resume after the header; its body is scanned as gap text
                cursor.advance_to(whole.end());
                search_from = whole.end();
            }
        }
    }

    (entries, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_two_entries_with_lines() {
        let text = "\"Base/Effect\" = VfxSystemDefinitionData { emitterName: string = \"A\" }\n0x1A2B3C4D = VfxSystemDefinitionData { emitterName: string = \"B\" }";
        let (entries, diagnostics) = scan(text, 0..text.len(), 1);
        assert!(diagnostics.is_empty());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, EntryKey::name("Base/Effect"));
        assert_eq!((entries[0].start_line, entries[0].end_line), (1, 1));
        assert_eq!(entries[1].key, EntryKey::Hash(0x1a2b3c4d));
        assert_eq!((entries[1].start_line, entries[1].end_line), (2, 2));
        assert_eq!(&text[entries[1].range.clone()], &text[text.find("0x").unwrap()..]);
    }

    #[test]
    fn test_braces_in_strings_and_comments() {
        let text = "\"A\" = Foo {\n    s: string = \"}}{\"\n    # }\n}\n\"B\" = Bar {}\n";
        let (entries, _) = scan(text, 0..text.len(), 1);
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].start_line, entries[0].end_line), (1, 4));
        assert_eq!(entries[1].start_line, 5);
    }

    #[test]
    fn test_header_inside_comment_is_ignored() {
        let text = "# \"X\" = Foo {\n\"Real\" = Foo {}\n";
        let (entries, _) = scan(text, 0..text.len(), 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, EntryKey::name("Real"));
        assert_eq!(entries[0].start_line, 2);
    }

    #[test]
    fn test_unclosed_entry_reports_and_continues() {
        let text = "\"Broken\" = Foo {\n    a: string = \"x\"\n\"Next\" = Bar {}\n";
        let (entries, diagnostics) = scan(text, 0..text.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, EntryKey::name("Next"));
        assert_eq!(entries[0].start_line, 3);
    }

    #[test]
    fn test_find_block_end() {
        let text = "{ a { b } \"}\" }tail";
        assert_eq!(find_block_end(text, 0, text.len()), Some((15, 0)));
        assert_eq!(find_block_end("{ {", 0, 3), None);
    }
}
