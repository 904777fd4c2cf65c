//! Lossless tokenizer for ritobin text
//!
//! Tokens carry byte offsets into the source; everything between two tokens
//! (whitespace and `#` comments) is trivia and is recovered by slicing the
//! source, so no text is ever lost.

/// Kind of a lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier: field names, type names, `true`/`false`/`null`
    Ident,
    /// Double-quoted string including both quotes
    Str,
    /// `0x`-prefixed hex literal
    Hex,
    /// Decimal number (sign, fraction and exponent included)
    Number,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Equals,
    Comma,
    /// A string that runs to end of input without a closing quote
    UnterminatedStr,
    /// Any other character
    Unknown,
}

/// A token and its `[start, end)` byte range in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// The token text
    #[must_use]
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }
}

/// Streaming lexer over a byte range of a source string
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Lexer<'a> {
    /// Lex the whole of `src`
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0, end: src.len() }
    }

    /// Lex only `src[start..end]`; offsets stay absolute
    #[must_use]
    pub fn with_range(src: &'a str, start: usize, end: usize) -> Self {
        Self { src, pos: start, end: end.min(src.len()) }
    }

    fn skip_trivia(&mut self) {
        let bytes = self.src.as_bytes();
        while self.pos < self.end {
            match bytes[self.pos] {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'#' => {
                    while self.pos < self.end && bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_string(&mut self) -> TokenKind {
        let bytes = self.src.as_bytes();
        self.pos += 1;
        while self.pos < self.end {
            match bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return TokenKind::Str;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.end;
        TokenKind::UnterminatedStr
    }

    fn lex_number(&mut self) {
        let bytes = self.src.as_bytes();
        let mut prev = bytes[self.pos];
        self.pos += 1;
        while self.pos < self.end {
            let b = bytes[self.pos];
            let signed_exponent = matches!(prev, b'e' | b'E') && matches!(b, b'-' | b'+');
            if !(b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E') || signed_exponent) {
                break;
            }
            prev = b;
            self.pos += 1;
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.skip_trivia();
        if self.pos >= self.end {
            return None;
        }

        let bytes = self.src.as_bytes();
        let start = self.pos;
        let b = bytes[start];
        let next = bytes.get(start + 1).copied().filter(|_| start + 1 < self.end);

        let punct = match b {
            b'{' => Some(TokenKind::LBrace),
            b'}' => Some(TokenKind::RBrace),
            b'[' => Some(TokenKind::LBracket),
            b']' => Some(TokenKind::RBracket),
            b':' => Some(TokenKind::Colon),
            b'=' => Some(TokenKind::Equals),
            b',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = punct {
            self.pos += 1;
            return Some(Token { kind, start, end: self.pos });
        }

        let kind = match b {
            b'"' => self.lex_string(),
            b'0' if matches!(next, Some(b'x' | b'X')) => {
                self.pos += 2;
                while self.pos < self.end && bytes[self.pos].is_ascii_hexdigit() {
                    self.pos += 1;
                }
                TokenKind::Hex
            }
            b'0'..=b'9' => {
                self.lex_number();
                TokenKind::Number
            }
            b'-' | b'+' | b'.' if next.is_some_and(|n| n.is_ascii_digit() || n == b'.') => {
                self.lex_number();
                TokenKind::Number
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                while self.pos < self.end
                    && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
                {
                    self.pos += 1;
                }
                TokenKind::Ident
            }
            _ => {
                let width = self.src[start..].chars().next().map_or(1, char::len_utf8);
                self.pos = (start + width).min(self.end);
                TokenKind::Unknown
            }
        };

        Some(Token { kind, start, end: self.pos })
    }
}

/// Lex `src[start..end]` into a vector
#[must_use]
pub fn tokenize(src: &str, start: usize, end: usize) -> Vec<Token> {
    Lexer::with_range(src, start, end).collect()
}

/// Unescape the contents of a string token (quotes included in `raw`)
#[must_use]
pub fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .map(|s| s.strip_suffix('"').unwrap_or(s))
        .unwrap_or(raw);
    if !inner.contains('\\') {
        return inner.to_string();
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Quote and escape a value for writing
#[must_use]
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).map(|t| t.kind).collect()
    }

    #[test]
    fn test_field_tokens() {
        assert_eq!(
            kinds("rate: list[f32] = { 1, -0.5, 2e-05 }"),
            vec![
                TokenKind::Ident, TokenKind::Colon, TokenKind::Ident, TokenKind::LBracket,
                TokenKind::Ident, TokenKind::RBracket, TokenKind::Equals, TokenKind::LBrace,
                TokenKind::Number, TokenKind::Comma, TokenKind::Number, TokenKind::Comma,
                TokenKind::Number, TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn test_string_with_braces_and_escapes() {
        let src = r#""a{b\"}" 0x1A2B3C4D"#;
        let tokens: Vec<_> = Lexer::new(src).collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text(src), r#""a{b\"}""#);
        assert_eq!(tokens[1].kind, TokenKind::Hex);
        assert_eq!(unquote(tokens[0].text(src)), "a{b\"}");
    }

    #[test]
    fn test_comments_are_trivia() {
        assert_eq!(kinds("#PROP_text\ntype: string = \"PROP\""), vec![
            TokenKind::Ident, TokenKind::Colon, TokenKind::Ident, TokenKind::Equals, TokenKind::Str,
        ]);
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(kinds("name: string = \"oops"), vec![
            TokenKind::Ident, TokenKind::Colon, TokenKind::Ident, TokenKind::Equals,
            TokenKind::UnterminatedStr,
        ]);
    }

    #[test]
    fn test_quote_round_trip() {
        let value = "path\\with \"quotes\"";
        assert_eq!(unquote(&quote(value)), value);
    }
}
