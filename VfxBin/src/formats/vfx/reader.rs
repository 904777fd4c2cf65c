//! Record parser
//!
//! Parses one top-level entry into a [`SystemRecord`]. The brace structure
//! is checked first; an imbalance fails the whole record. Inside a balanced
//! record, a field that does not parse is kept verbatim as [`Unparsed`] text
//! with a diagnostic and parsing resumes at the next field.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::document::{
    EntryKey, Field, FieldType, LineRange, ListItem, ListValue, MapEntry, MapValue, MatrixValue,
    Record, SystemRecord, Trivia, Unparsed, Value, VectorValue, collect_emitters,
};
use super::lexer::{Lexer, Token, TokenKind, tokenize};
use super::matrix::Matrix4x4;
use crate::error::{Error, Result};

/// A field the parser skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    pub offset: usize,
    /// 1-based line in the whole document
    pub line: usize,
    pub reason: String,
}

/// Result of [`parse_record`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub record: SystemRecord,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParsedRecord {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Verify brace and bracket nesting of `src[range]`, ignoring strings and comments
pub fn check_balance(src: &str, range: Range<usize>) -> Result<()> {
    let base = range.start;
    let line_of = |offset: usize| 1 + src[base..offset].bytes().filter(|&b| b == b'\n').count();
    let mut stack: Vec<(TokenKind, usize)> = Vec::new();

    for token in Lexer::with_range(src, range.start, range.end) {
        match token.kind {
            TokenKind::LBrace | TokenKind::LBracket => stack.push((token.kind, token.start)),
            TokenKind::RBrace | TokenKind::RBracket => {
                let expected = if token.kind == TokenKind::RBrace {
                    TokenKind::LBrace
                } else {
                    TokenKind::LBracket
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((_, open_at)) => {
                        return Err(Error::UnbalancedBraces {
                            offset: token.start,
                            line: line_of(token.start),
                            reason: format!("'{}' closes the bracket opened at byte {open_at}", token.text(src)),
                        });
                    }
                    None => {
                        return Err(Error::UnbalancedBraces {
                            offset: token.start,
                            line: line_of(token.start),
                            reason: format!("unexpected '{}'", token.text(src)),
                        });
                    }
                }
            }
            TokenKind::UnterminatedStr => {
                return Err(Error::UnbalancedBraces {
                    offset: token.start,
                    line: line_of(token.start),
                    reason: "unterminated string".to_string(),
                });
            }
            _ => {}
        }
    }

    if let Some((_, open_at)) = stack.pop() {
        return Err(Error::UnbalancedBraces {
            offset: open_at,
            line: line_of(open_at),
            reason: "unclosed brace".to_string(),
        });
    }
    Ok(())
}

/// Parse the entry at `src[range]`, computing its first line by counting
pub fn parse_record(src: &str, range: Range<usize>) -> Result<ParsedRecord> {
    let first_line = 1 + src[..range.start.min(src.len())].bytes().filter(|&b| b == b'\n').count();
    parse_record_at(src, range, first_line)
}

/// Parse the entry at `src[range]` whose first byte sits on `first_line`
pub fn parse_record_at(src: &str, range: Range<usize>, first_line: usize) -> Result<ParsedRecord> {
    if range.end > src.len() || range.start > range.end {
        return Err(Error::InvalidEdit {
            message: format!("range {range:?} outside document of {} bytes", src.len()),
        });
    }
    check_balance(src, range.clone())?;

    let mut parser = Parser::new(src, &range, first_line);
    let header_err = |offset: usize, reason: &str| Error::InvalidHeader { offset, reason: reason.to_string() };

    let key_token = parser
        .bump_if(|k| matches!(k, TokenKind::Str | TokenKind::Hex))
        .ok_or_else(|| header_err(range.start, "expected a quoted name or 0x hash key"))?;
    let key = EntryKey::from_literal(key_token.text(src))
        .ok_or_else(|| header_err(key_token.start, "invalid key literal"))?;
    parser
        .bump_if(|k| k == TokenKind::Equals)
        .ok_or_else(|| header_err(key_token.end, "expected '=' after key"))?;
    let type_token = parser
        .bump_if(|k| matches!(k, TokenKind::Ident | TokenKind::Hex))
        .ok_or_else(|| header_err(key_token.end, "expected a type name"))?;
    let open_token = parser
        .bump_if(|k| k == TokenKind::LBrace)
        .ok_or_else(|| header_err(type_token.end, "expected '{' after type name"))?;

    let header = src[range.start..type_token.start].to_string();
    let body = parser
        .record_body(type_token, open_token)
        .map_err(|m| header_err(m.offset, &m.reason))?;

    let end = parser.last_end;
    if let Some(extra) = parser.peek() {
        parser.diagnose(extra.start, "content after the closing brace is not part of the record");
    }

    let end_line = first_line + src[range.start..end].bytes().filter(|&b| b == b'\n').count();
    let emitters = collect_emitters(&body);
    let record = SystemRecord {
        key,
        header: Some(header),
        body,
        range: range.start..end,
        lines: LineRange { start: first_line, end: end_line },
        emitters,
    };

    Ok(ParsedRecord { record, diagnostics: parser.diagnostics })
}

/// Parse a standalone value of the given type, for text supplied by callers
#[must_use]
pub fn parse_value_text(text: &str, field_type: &FieldType) -> Option<Value> {
    if check_balance(text, 0..text.len()).is_err() {
        return None;
    }
    let mut parser = Parser::new(text, &(0..text.len()), 1);
    let value = parser.value(field_type).ok()?;
    parser.peek().is_none().then_some(value)
}

struct Malformed {
    offset: usize,
    reason: String,
}

impl Malformed {
    fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self { offset, reason: reason.into() }
    }
}

type Parse<T> = std::result::Result<T, Malformed>;

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    last_end: usize,
    base: usize,
    first_line: usize,
    diagnostics: Vec<ParseDiagnostic>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, range: &Range<usize>, first_line: usize) -> Self {
        Self {
            src,
            tokens: tokenize(src, range.start, range.end),
            pos: 0,
            last_end: range.start,
            base: range.start,
            first_line,
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self, ahead: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        self.last_end = token.end;
        Some(token)
    }

    fn bump_if(&mut self, pred: impl Fn(TokenKind) -> bool) -> Option<Token> {
        match self.peek() {
            Some(t) if pred(t.kind) => self.bump(),
            _ => None,
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Parse<Token> {
        match self.peek() {
            Some(t) if t.kind == kind => Ok(self.bump().unwrap_or(t)),
            Some(t) => Err(Malformed::new(t.start, format!("expected {what}, found '{}'", t.text(self.src)))),
            None => Err(Malformed::new(self.last_end, format!("expected {what}, found end of record"))),
        }
    }

    fn lead_before(&self, token: Token) -> Trivia {
        Trivia::Raw(self.src[self.last_end..token.start].to_string())
    }

    fn diagnose(&mut self, offset: usize, reason: &str) {
        let line = self.first_line + self.src[self.base..offset].bytes().filter(|&b| b == b'\n').count();
        self.diagnostics.push(ParseDiagnostic { offset, line, reason: reason.to_string() });
    }

    fn record_body(&mut self, type_token: Token, open_token: Token) -> Parse<Record> {
        let mut record = Record::new(type_token.text(self.src));
        record.open = Some(self.src[type_token.end..open_token.end].to_string());

        loop {
            let Some(token) = self.peek() else {
                return Err(Malformed::new(open_token.start, "record is not closed"));
            };
            if token.kind == TokenKind::RBrace {
                record.close_lead = self.lead_before(token);
                self.bump();
                break;
            }

            let field_pos = self.pos;
            let lead_start = self.last_end;
            let diagnostics_mark = self.diagnostics.len();
            match self.field() {
                Ok(field) => record.fields.push(field),
                Err(malformed) => {
                    self.diagnostics.truncate(diagnostics_mark);
                    self.pos = field_pos;
                    self.last_end = lead_start;
                    self.skip_field();
                    self.diagnose(malformed.offset, &malformed.reason);
                    tracing::debug!(offset = malformed.offset, reason = %malformed.reason, "kept unparsed field text");
                    record.unparsed.push(Unparsed {
                        after: record.fields.len(),
                        text: self.src[lead_start..self.last_end].to_string(),
                        offset: malformed.offset,
                        reason: malformed.reason,
                    });
                }
            }
        }

        record.span = Some(type_token.start..self.last_end);
        Ok(record)
    }

    /// Skip to the next `name:` or the enclosing `}`, consuming at least one token
    fn skip_field(&mut self) {
        let mut depth = 0usize;
        let mut first = true;
        while let Some(token) = self.peek() {
            if depth == 0 {
                let next_field =
                    !first && token.kind == TokenKind::Ident && self.peek_kind(1) == Some(TokenKind::Colon);
                if token.kind == TokenKind::RBrace || next_field {
                    return;
                }
            }
            match token.kind {
                TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            first = false;
            self.bump();
        }
    }

    fn field(&mut self) -> Parse<Field> {
        let lead_start = self.last_end;
        let name_token = self.expect(TokenKind::Ident, "a field name")?;
        let lead = Trivia::Raw(self.src[lead_start..name_token.start].to_string());
        self.expect(TokenKind::Colon, "':'")?;

        let type_start = self
            .peek()
            .map(|t| t.start)
            .ok_or_else(|| Malformed::new(name_token.end, "missing field type"))?;
        let mut type_end = type_start;
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Equals {
                break;
            }
            if !matches!(
                token.kind,
                TokenKind::Ident | TokenKind::LBracket | TokenKind::RBracket | TokenKind::Comma
            ) {
                return Err(Malformed::new(token.start, format!("unexpected '{}' in field type", token.text(self.src))));
            }
            type_end = token.end;
            self.bump();
        }
        let type_text = &self.src[type_start..type_end];
        let field_type = FieldType::parse(type_text)
            .ok_or_else(|| Malformed::new(type_start, format!("unknown field type '{type_text}'")))?;
        self.expect(TokenKind::Equals, "'='")?;

        let value_start = self
            .peek()
            .map(|t| t.start)
            .ok_or_else(|| Malformed::new(self.last_end, "missing value"))?;
        let head = self.src[name_token.start..value_start].to_string();
        let value = self.value(&field_type)?;

        Ok(Field {
            lead,
            name: name_token.text(self.src).to_string(),
            field_type,
            head: Some(head),
            value,
            span: Some(name_token.start..self.last_end),
        })
    }

    fn value(&mut self, field_type: &FieldType) -> Parse<Value> {
        let Some(token) = self.peek() else {
            return Err(Malformed::new(self.last_end, "missing value"));
        };
        let raw = token.text(self.src);
        let mismatch = |what: &str| Malformed::new(token.start, format!("expected {what}, found '{raw}'"));

        match field_type {
            FieldType::String => match token.kind {
                TokenKind::Str => {
                    self.bump();
                    Ok(Value::String(raw.to_string()))
                }
                _ => Err(mismatch("a string")),
            },
            FieldType::Hash(_) => match token.kind {
                TokenKind::Str => {
                    self.bump();
                    Ok(Value::String(raw.to_string()))
                }
                TokenKind::Hex => {
                    self.bump();
                    Ok(Value::Hash(raw.to_string()))
                }
                TokenKind::Number => {
                    self.bump();
                    Ok(Value::Number(raw.to_string()))
                }
                _ => Err(mismatch("a hash")),
            },
            FieldType::Number(_) => match token.kind {
                TokenKind::Number => {
                    self.bump();
                    Ok(Value::Number(raw.to_string()))
                }
                TokenKind::Hex => {
                    self.bump();
                    Ok(Value::Hash(raw.to_string()))
                }
                _ => Err(mismatch("a number")),
            },
            FieldType::Bool(_) => match (token.kind, raw) {
                (TokenKind::Ident, "true" | "false") => {
                    self.bump();
                    Ok(Value::Bool(raw.to_string()))
                }
                _ => Err(mismatch("true or false")),
            },
            FieldType::Vector(_, count) => {
                let (raw, components) = self.number_block(*count)?;
                Ok(Value::Vector(VectorValue { raw: Some(raw), components }))
            }
            FieldType::Matrix => {
                let (raw, numbers) = self.number_block(16)?;
                let matrix = Matrix4x4::from_slice(&numbers).map_err(|e| Malformed::new(token.start, e.to_string()))?;
                Ok(Value::Matrix(MatrixValue { raw: Some(raw), matrix }))
            }
            FieldType::Record(_) => match token.kind {
                TokenKind::Ident if raw == "null" => {
                    self.bump();
                    Ok(Value::Null)
                }
                TokenKind::Ident | TokenKind::Hex => {
                    let type_token = token;
                    self.bump();
                    let open = self.expect(TokenKind::LBrace, "'{'")?;
                    Ok(Value::Record(self.record_body(type_token, open)?))
                }
                _ => Err(mismatch("a record type or null")),
            },
            FieldType::List(_, element) => self.list(element),
            FieldType::Map(key, value) => self.map(key, value),
        }
    }

    fn number_block(&mut self, count: usize) -> Parse<(String, Vec<f64>)> {
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let mut numbers = Vec::with_capacity(count);
        loop {
            let token = self
                .bump()
                .ok_or_else(|| Malformed::new(open.start, "unclosed number block"))?;
            match token.kind {
                TokenKind::RBrace => break,
                TokenKind::Comma => {}
                TokenKind::Number => {
                    let raw = token.text(self.src);
                    let value = raw
                        .parse::<f64>()
                        .map_err(|_| Malformed::new(token.start, format!("'{raw}' is not a number")))?;
                    numbers.push(value);
                }
                _ => {
                    return Err(Malformed::new(
                        token.start,
                        format!("unexpected '{}' in number block", token.text(self.src)),
                    ));
                }
            }
        }
        if numbers.len() != count {
            return Err(Malformed::new(open.start, format!("expected {count} numbers, found {}", numbers.len())));
        }
        Ok((self.src[open.start..self.last_end].to_string(), numbers))
    }

    fn trailing_comma(&mut self) -> Option<String> {
        let before = self.last_end;
        let comma = self.bump_if(|k| k == TokenKind::Comma)?;
        Some(self.src[before..comma.end].to_string())
    }

    fn list(&mut self, element: &FieldType) -> Parse<Value> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut list = ListValue::default();
        loop {
            let token = self
                .peek()
                .ok_or_else(|| Malformed::new(self.last_end, "unclosed list"))?;
            if token.kind == TokenKind::RBrace {
                list.close_lead = self.lead_before(token);
                self.bump();
                return Ok(Value::List(list));
            }
            let lead = self.lead_before(token);
            let value = self.value(element)?;
            let comma = self.trailing_comma();
            list.items.push(ListItem { lead, value, comma });
        }
    }

    fn map(&mut self, key_type: &FieldType, value_type: &FieldType) -> Parse<Value> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut map = MapValue::default();
        loop {
            let token = self
                .peek()
                .ok_or_else(|| Malformed::new(self.last_end, "unclosed map"))?;
            if token.kind == TokenKind::RBrace {
                map.close_lead = self.lead_before(token);
                self.bump();
                return Ok(Value::Map(map));
            }
            let lead = self.lead_before(token);
            let key = self.value(key_type)?;
            let key_end = self.last_end;
            self.expect(TokenKind::Equals, "'=' in map entry")?;
            let value_start = self
                .peek()
                .map(|t| t.start)
                .ok_or_else(|| Malformed::new(self.last_end, "missing map value"))?;
            let sep = self.src[key_end..value_start].to_string();
            let value = self.value(value_type)?;
            let comma = self.trailing_comma();
            map.entries.push(MapEntry { lead, key, sep: Some(sep), value, comma });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::vfx::document::Provenance;

    const SYSTEM: &str = r#"    "Characters/Ahri/Skins/Skin0/Particles/Orb" = VfxSystemDefinitionData {
        complexEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                emitterName: string = "Glow"
                rate: embed = ValueFloat {
                    constantValue: f32 = 2
                }
                birthColor: vec4 = { 1, 0.5, 0, 1 }
            }
            VfxEmitterDefinitionData {
                emitterName: string = "VfxBin_Child_Hand"
                childParticleSetDefinition: pointer = VfxChildParticleSetDefinitionData {
                    childrenIdentifiers: list[embed] = {
                        VfxChildIdentifier {
                            effectKey: hash = "Trail"
                        }
                    }
                }
            }
        }
        particleName: string = "Ahri_Orb"
        particlePath: string = "Characters/Ahri/Skins/Skin0/Particles/Orb"
    }"#;

    fn parse(src: &str) -> ParsedRecord {
        let start = src.find('"').unwrap();
        parse_record(src, start..src.len()).unwrap()
    }

    #[test]
    fn test_parse_system_and_emitters() {
        let parsed = parse(SYSTEM);
        assert!(parsed.is_clean());
        let record = &parsed.record;
        assert_eq!(record.key, EntryKey::name("Characters/Ahri/Skins/Skin0/Particles/Orb"));
        assert!(record.is_vfx_system());
        assert_eq!(record.particle_name().as_deref(), Some("Ahri_Orb"));
        assert_eq!(record.emitters.len(), 2);
        assert_eq!(record.emitters[0].name.as_deref(), Some("Glow"));
        assert!(record.emitters[0].child_particles.is_empty());

        let child = &record.emitters[1].child_particles[0];
        assert_eq!(child.effect_key, EntryKey::name("Trail"));
        assert_eq!(child.provenance, Provenance::ToolAuthored);
        assert_eq!(record.lines, LineRange { start: 1, end: 23 });
    }

    #[test]
    fn test_emitter_fields_exposed() {
        let parsed = parse(SYSTEM);
        let record = &parsed.record;
        let fields: Vec<&str> = record.emitter_fields(&record.emitters[0]).map(|(name, _)| name).collect();
        assert_eq!(fields, vec!["emitterName", "rate", "birthColor"]);
    }

    #[test]
    fn test_malformed_field_recovers() {
        let src = "\"Fx\" = VfxSystemDefinitionData {\n    bad: vec3 = { 1, 2 }\n    particleName: string = \"Fx\"\n}";
        let parsed = parse_record(src, 0..src.len()).unwrap();
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].line, 2);
        assert_eq!(parsed.record.body.unparsed.len(), 1);
        assert_eq!(parsed.record.body.unparsed[0].text, "\n    bad: vec3 = { 1, 2 }");
        assert_eq!(parsed.record.particle_name().as_deref(), Some("Fx"));
    }

    #[test]
    fn test_unbalanced_is_error() {
        let src = "\"Fx\" = VfxSystemDefinitionData {\n    a: embed = Foo {\n}";
        let err = parse_record(src, 0..src.len()).unwrap_err();
        assert!(matches!(err, Error::UnbalancedBraces { .. }));
    }

    #[test]
    fn test_braces_in_strings_do_not_count() {
        let src = "\"Fx\" = VfxSystemDefinitionData {\n    particleName: string = \"a}{b\"\n}";
        let parsed = parse_record(src, 0..src.len()).unwrap();
        assert!(parsed.is_clean());
        assert_eq!(parsed.record.particle_name().as_deref(), Some("a}{b"));
    }

    #[test]
    fn test_parse_value_text() {
        let value = parse_value_text("IsDead { }", &FieldType::Record("pointer".into()));
        assert!(matches!(value, Some(Value::Record(_))));
        assert_eq!(parse_value_text("HP < 50", &FieldType::Record("pointer".into())), None);
    }
}
