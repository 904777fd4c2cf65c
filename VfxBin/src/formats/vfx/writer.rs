//! Record writer
//!
//! Parsed nodes are written from their raw trivia and literals, so an
//! untouched record reproduces its source text exactly. Generated nodes
//! ([`Trivia::Auto`], `None` heads, `None` raw literals) take the
//! indentation of their siblings, falling back to four spaces per level.

use std::ops::Range;

use super::document::{Field, ListValue, MapValue, Record, SystemRecord, Trivia, Value};
use super::matrix::format_matrix;
use crate::error::{Error, Result};

const INDENT_UNIT: &str = "    ";

/// Write a top-level entry; `indent` is the indentation of its header line
#[must_use]
pub fn write_system(record: &SystemRecord, indent: &str) -> String {
    let mut out = match &record.header {
        Some(header) => header.clone(),
        None => format!("{} = ", record.key.literal()),
    };
    write_record_into(&mut out, &record.body, indent);
    out
}

/// Write a record starting at its type name
#[must_use]
pub fn write_record(record: &Record, indent: &str) -> String {
    let mut out = String::new();
    write_record_into(&mut out, record, indent);
    out
}

/// Write a value as it would follow `name: type = `
#[must_use]
pub fn write_value(value: &Value, indent: &str) -> String {
    let mut out = String::new();
    write_value_into(&mut out, value, indent);
    out
}

/// Replace `document[range]` with `new_text`
pub fn replace_span(document: &str, range: Range<usize>, new_text: &str) -> Result<String> {
    if range.start > range.end || range.end > document.len() {
        return Err(Error::InvalidEdit {
            message: format!("range {range:?} outside document of {} bytes", document.len()),
        });
    }
    if !document.is_char_boundary(range.start) || !document.is_char_boundary(range.end) {
        return Err(Error::InvalidEdit {
            message: format!("range {range:?} splits a character"),
        });
    }

    let mut out = String::with_capacity(document.len() - (range.end - range.start) + new_text.len());
    out.push_str(&document[..range.start]);
    out.push_str(new_text);
    out.push_str(&document[range.end..]);
    Ok(out)
}

/// Indentation (spaces and tabs) after the last newline of a raw lead
fn indent_of(trivia: &Trivia) -> Option<&str> {
    match trivia {
        Trivia::Raw(text) => text.rfind('\n').map(|i| {
            let tail = &text[i + 1..];
            let len = tail.len() - tail.trim_start_matches([' ', '\t']).len();
            &tail[..len]
        }),
        Trivia::Auto => None,
    }
}

/// Indentation for generated children: a parsed sibling's, else one level deeper
fn child_indent<'a>(mut sibling_leads: impl Iterator<Item = &'a Trivia>, close_lead: &Trivia, indent: &str) -> String {
    if let Some(found) = sibling_leads.find_map(indent_of) {
        return found.to_string();
    }
    match indent_of(close_lead) {
        Some(close) => format!("{close}{INDENT_UNIT}"),
        None => format!("{indent}{INDENT_UNIT}"),
    }
}

fn write_lead(out: &mut String, lead: &Trivia, indent: &str) {
    match lead {
        Trivia::Raw(text) => out.push_str(text),
        Trivia::Auto => {
            out.push('\n');
            out.push_str(indent);
        }
    }
}

fn write_close(out: &mut String, close_lead: &Trivia, empty: bool, indent: &str) {
    match close_lead {
        Trivia::Raw(text) => out.push_str(text),
        Trivia::Auto if empty => {}
        Trivia::Auto => {
            out.push('\n');
            out.push_str(indent);
        }
    }
    out.push('}');
}

fn write_record_into(out: &mut String, record: &Record, indent: &str) {
    out.push_str(&record.type_name);
    out.push_str(record.open.as_deref().unwrap_or(" {"));

    let inner = child_indent(record.fields.iter().map(|f| &f.lead), &record.close_lead, indent);
    for (i, field) in record.fields.iter().enumerate() {
        for unparsed in record.unparsed.iter().filter(|u| u.after == i) {
            out.push_str(&unparsed.text);
        }
        write_field_into(out, field, &inner);
    }
    for unparsed in record.unparsed.iter().filter(|u| u.after >= record.fields.len()) {
        out.push_str(&unparsed.text);
    }

    let empty = record.fields.is_empty() && record.unparsed.is_empty();
    write_close(out, &record.close_lead, empty, indent);
}

fn write_field_into(out: &mut String, field: &Field, indent: &str) {
    write_lead(out, &field.lead, indent);
    match &field.head {
        Some(head) => out.push_str(head),
        None => {
            out.push_str(&field.name);
            out.push_str(": ");
            out.push_str(&field.field_type.to_string());
            out.push_str(" = ");
        }
    }
    write_value_into(out, &field.value, indent);
}

fn write_value_into(out: &mut String, value: &Value, indent: &str) {
    match value {
        Value::String(raw) | Value::Hash(raw) | Value::Number(raw) | Value::Bool(raw) => out.push_str(raw),
        Value::Null => out.push_str("null"),
        Value::Vector(vector) => match &vector.raw {
            Some(raw) => out.push_str(raw),
            None => out.push_str(&vector.format()),
        },
        Value::Matrix(matrix) => match &matrix.raw {
            Some(raw) => out.push_str(raw),
            None => out.push_str(&format_matrix(&matrix.matrix, indent)),
        },
        Value::Record(record) => write_record_into(out, record, indent),
        Value::List(list) => write_list(out, list, indent),
        Value::Map(map) => write_map(out, map, indent),
    }
}

fn write_list(out: &mut String, list: &ListValue, indent: &str) {
    out.push('{');
    let inner = child_indent(list.items.iter().map(|item| &item.lead), &list.close_lead, indent);
    for item in &list.items {
        write_lead(out, &item.lead, &inner);
        write_value_into(out, &item.value, &inner);
        if let Some(comma) = &item.comma {
            out.push_str(comma);
        }
    }
    write_close(out, &list.close_lead, list.items.is_empty(), indent);
}

fn write_map(out: &mut String, map: &MapValue, indent: &str) {
    out.push('{');
    let inner = child_indent(map.entries.iter().map(|entry| &entry.lead), &map.close_lead, indent);
    for entry in &map.entries {
        write_lead(out, &entry.lead, &inner);
        write_value_into(out, &entry.key, &inner);
        out.push_str(entry.sep.as_deref().unwrap_or(" = "));
        write_value_into(out, &entry.value, &inner);
        if let Some(comma) = &entry.comma {
            out.push_str(comma);
        }
    }
    write_close(out, &map.close_lead, map.entries.is_empty(), indent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::vfx::document::{EntryKey, FieldType, MatrixValue};
    use crate::formats::vfx::matrix::Matrix4x4;
    use crate::formats::vfx::reader::parse_record;
    use pretty_assertions::assert_eq;

    const ENTRY: &str = "\"Fx\" = VfxSystemDefinitionData {\n    # keep me\n    particleName: string   = \"Fx\"\n    list: list[f32] = { 1, 2,3 }\n    junk: vec2 = { 1 }\n    map: map[hash,link] = {\n        \"a\" = \"b\"\n    }\n    empty: embed = Foo {}\n}";

    #[test]
    fn test_untouched_record_is_byte_identical() {
        let parsed = parse_record(ENTRY, 0..ENTRY.len()).unwrap();
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(write_system(&parsed.record, ""), ENTRY);
    }

    #[test]
    fn test_generated_field_takes_sibling_indent() {
        let mut record = parse_record(ENTRY, 0..ENTRY.len()).unwrap().record;
        record.body.push_field(Field::new("extra", FieldType::Bool("flag".into()), Value::bool(true)));
        let text = write_system(&record, "");
        assert!(text.ends_with("    empty: embed = Foo {}\n    extra: flag = true\n}"));
    }

    #[test]
    fn test_generated_record_layout() {
        let body = Record::new("ResourceResolver").with_field(
            "resourceMap",
            FieldType::parse("map[hash,link]").unwrap(),
            Value::Map(MapValue::default()),
        );
        let mut record = SystemRecord::new(EntryKey::name("Res"), body);
        if let Some(map) = record.body.value_mut("resourceMap").and_then(Value::as_map_mut) {
            map.push(Value::string("human"), Value::string("target"));
        }
        assert_eq!(
            write_system(&record, "    "),
            "\"Res\" = ResourceResolver {\n        resourceMap: map[hash,link] = {\n            \"human\" = \"target\"\n        }\n    }"
        );
    }

    #[test]
    fn test_generated_matrix_uses_field_indent() {
        let body = Record::new("VfxSystemDefinitionData").with_field(
            "transform",
            FieldType::Matrix,
            Value::Matrix(MatrixValue::new(Matrix4x4::IDENTITY)),
        );
        let text = write_record(&body, "");
        assert_eq!(
            text,
            "VfxSystemDefinitionData {\n    transform: mtx44 = {\n        1, 0, 0, 0\n        0, 1, 0, 0\n        0, 0, 1, 0\n        0, 0, 0, 1\n    }\n}"
        );
    }

    #[test]
    fn test_replace_span_bounds() {
        assert_eq!(replace_span("abcdef", 1..3, "XY").unwrap(), "aXYdef");
        assert!(matches!(replace_span("abc", 2..9, ""), Err(Error::InvalidEdit { .. })));
        assert!(replace_span("é", 1..2, "").is_err());
    }
}
