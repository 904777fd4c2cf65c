//! Syntax tree for ritobin text records
//!
//! Parsed nodes keep the exact text around their tokens ([`Trivia::Raw`],
//! raw field heads, raw literals) so an untouched record writes back
//! byte-for-byte. Nodes built in code use [`Trivia::Auto`] and `None` heads,
//! and the writer lays them out with the surrounding indentation.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::lexer::{quote, unquote};
use super::matrix::{Matrix4x4, format_float};
use crate::error::{Error, Result};
use crate::utils::{fnv1a_lower, last_segment, parse_hash_literal};

/// Type name of the records the boundary indexer reports
pub const VFX_SYSTEM_TYPE: &str = "VfxSystemDefinitionData";

/// Emitter name prefix marking child-particle emitters created by this crate
pub const TOOL_CHILD_PREFIX: &str = "VfxBin_Child_";

/// List fields of a VFX system that hold emitters, in document order
/// Fields of a `VfxChildIdentifier` that name the spawned system, preferred first
pub const CHILD_EFFECT_FIELDS: [&str; 2] = ["effect", "effectKey"];

pub const EMITTER_LIST_FIELDS: [&str; 2] = ["complexEmitterDefinitionData", "simpleEmitterDefinitionData"];

// ============================================================================
// Keys
// ============================================================================

/// Identifier of a top-level entry
///
/// Names compare exactly as written between the quotes; hashes compare as
/// their 32-bit value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryKey {
    /// `"Characters/Ahri/Skins/Skin0/Particles/Ahri_Base_Q_Mis"`
    Name(String),
    /// `0x1a2b3c4d`
    Hash(u32),
}

impl EntryKey {
    /// Build a name key
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Build a key from a `Str` or `Hex` token's text
    #[must_use]
    pub fn from_literal(raw: &str) -> Option<Self> {
        if let Some(inner) = raw.strip_prefix('"') {
            return Some(Self::Name(inner.strip_suffix('"').unwrap_or(inner).to_string()));
        }
        parse_hash_literal(raw).map(Self::Hash)
    }

    /// The key as it appears in text: `"name"` or `0x1a2b3c4d`
    #[must_use]
    pub fn literal(&self) -> String {
        match self {
            Self::Name(name) => format!("\"{name}\""),
            Self::Hash(hash) => format!("0x{hash:08x}"),
        }
    }

    /// Short label: hash digits without `0x`, or the last path segment
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Name(name) => last_segment(name).to_string(),
            Self::Hash(hash) => format!("{hash:08x}"),
        }
    }

    /// The 32-bit bin hash this key compiles to
    #[must_use]
    pub fn hash(&self) -> u32 {
        match self {
            Self::Name(name) => fnv1a_lower(name),
            Self::Hash(hash) => *hash,
        }
    }

    /// Whether a reference written as `self` points at `other`
    ///
    /// A name and a hash refer to each other when the name hashes to it.
    #[must_use]
    pub fn refers_to(&self, other: &EntryKey) -> bool {
        match (self, other) {
            (Self::Name(a), Self::Name(b)) => a == b,
            (Self::Hash(a), Self::Hash(b)) => a == b,
            (Self::Name(name), Self::Hash(hash)) | (Self::Hash(hash), Self::Name(name)) => {
                fnv1a_lower(name) == *hash
            }
        }
    }

    /// The name, if this is a name key
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Hash(_) => None,
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal())
    }
}

impl FromStr for EntryKey {
    type Err = Error;

    /// Accepts `"quoted"`, `0x` hex, or a bare name
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
            return Ok(Self::Name(s[1..s.len() - 1].to_string()));
        }
        if s.starts_with("0x") || s.starts_with("0X") {
            return parse_hash_literal(s)
                .map(Self::Hash)
                .ok_or_else(|| Error::InvalidKey(s.to_string()));
        }
        if s.is_empty() || s.contains('"') {
            return Err(Error::InvalidKey(s.to_string()));
        }
        Ok(Self::Name(s.to_string()))
    }
}

// ============================================================================
// Field types
// ============================================================================

/// Declared type of a field (`name: <type> = value`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// `string`
    String,
    /// `hash`, `link` or `file`: a quoted name or an `0x` literal
    Hash(String),
    /// Integer and float scalars (`u8`..`u64`, `i8`..`i64`, `f32`)
    Number(String),
    /// `bool` or `flag`
    Bool(String),
    /// `vec2`, `vec3`, `vec4` or `rgba` with its component count
    Vector(String, usize),
    /// `mtx44`
    Matrix,
    /// `embed` or `pointer`
    Record(String),
    /// `list[T]`, `list2[T]` or `option[T]`
    List(String, Box<FieldType>),
    /// `map[K,V]`
    Map(Box<FieldType>, Box<FieldType>),
}

impl FieldType {
    /// Parse a type expression; whitespace is ignored
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        Self::parse_compact(&compact)
    }

    fn parse_compact(s: &str) -> Option<Self> {
        if let Some(open) = s.find('[') {
            let container = &s[..open];
            let inner = s[open + 1..].strip_suffix(']')?;
            return match container {
                "list" | "list2" | "option" => Some(Self::List(
                    container.to_string(),
                    Box::new(Self::parse_compact(inner)?),
                )),
                "map" => {
                    let (key, value) = split_top_level_comma(inner)?;
                    Some(Self::Map(
                        Box::new(Self::parse_compact(key)?),
                        Box::new(Self::parse_compact(value)?),
                    ))
                }
                _ => None,
            };
        }

        let ty = match s {
            "string" => Self::String,
            "hash" | "link" | "file" => Self::Hash(s.to_string()),
            "u8" | "u16" | "u32" | "u64" | "i8" | "i16" | "i32" | "i64" | "f32" | "f64" => {
                Self::Number(s.to_string())
            }
            "bool" | "flag" => Self::Bool(s.to_string()),
            "vec2" => Self::Vector(s.to_string(), 2),
            "vec3" => Self::Vector(s.to_string(), 3),
            "vec4" | "rgba" => Self::Vector(s.to_string(), 4),
            "embed" | "pointer" => Self::Record(s.to_string()),
            _ if s.eq_ignore_ascii_case("mtx44") => Self::Matrix,
            _ => return None,
        };
        Some(ty)
    }
}

fn split_top_level_comma(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Some((&s[..i], &s[i + 1..])),
            _ => {}
        }
    }
    None
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Hash(name) | Self::Number(name) | Self::Bool(name) | Self::Record(name) => {
                f.write_str(name)
            }
            Self::Vector(name, _) => f.write_str(name),
            Self::Matrix => f.write_str("mtx44"),
            Self::List(container, element) => write!(f, "{container}[{element}]"),
            Self::Map(key, value) => write!(f, "map[{key},{value}]"),
        }
    }
}

// ============================================================================
// Trivia and values
// ============================================================================

/// Text in front of a token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trivia {
    /// Generated node: newline plus the indentation of its siblings
    #[default]
    Auto,
    /// Parsed node: the exact source text
    Raw(String),
}

/// Numeric block (`vec2`..`vec4`, `rgba`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorValue {
    /// Source text from `{` to `}`; `None` once the components change
    pub raw: Option<String>,
    pub components: Vec<f64>,
}

impl VectorValue {
    #[must_use]
    pub fn new(components: Vec<f64>) -> Self {
        Self { raw: None, components }
    }

    /// `{ 1, 0.5, 0 }`
    #[must_use]
    pub fn format(&self) -> String {
        let parts: Vec<String> = self.components.iter().map(|v| format_float(*v)).collect();
        format!("{{ {} }}", parts.join(", "))
    }
}

/// `mtx44` value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixValue {
    /// Source text from `{` to `}`; `None` once the matrix changes
    pub raw: Option<String>,
    pub matrix: Matrix4x4,
}

impl MatrixValue {
    #[must_use]
    pub fn new(matrix: Matrix4x4) -> Self {
        Self { raw: None, matrix }
    }
}

/// Field value; every variant is written back by the writer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Quoted string literal, quotes included
    String(String),
    /// `0x` literal
    Hash(String),
    /// Numeric literal as written
    Number(String),
    /// `true` / `false` as written
    Bool(String),
    Vector(VectorValue),
    Matrix(MatrixValue),
    Record(Record),
    /// Null pointer
    Null,
    List(ListValue),
    Map(MapValue),
}

impl Value {
    /// Quoted, escaped string value
    #[must_use]
    pub fn string(value: &str) -> Self {
        Self::String(quote(value))
    }

    /// `0x` hash value
    #[must_use]
    pub fn hash(hash: u32) -> Self {
        Self::Hash(format!("0x{hash:08x}"))
    }

    /// Reference to an entry key, in the key's own form
    #[must_use]
    pub fn key(key: &EntryKey) -> Self {
        match key {
            EntryKey::Name(_) => Self::String(key.literal()),
            EntryKey::Hash(hash) => Self::hash(*hash),
        }
    }

    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number(format_float(value))
    }

    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::Bool(value.to_string())
    }

    /// Unquoted string content
    #[must_use]
    pub fn as_str(&self) -> Option<String> {
        match self {
            Self::String(raw) => Some(unquote(raw)),
            _ => None,
        }
    }

    /// The value read as an entry reference (string or hash)
    #[must_use]
    pub fn as_key(&self) -> Option<EntryKey> {
        match self {
            Self::String(raw) | Self::Hash(raw) => EntryKey::from_literal(raw),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(raw) => raw.parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ListValue> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut MapValue> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    fn walk(&self, path: &str, f: &mut dyn FnMut(&str, &Value)) {
        f(path, self);
        match self {
            Self::Record(record) => record.walk_at(path, f),
            Self::List(list) => {
                for (i, item) in list.items.iter().enumerate() {
                    item.value.walk(&format!("{path}[{i}]"), f);
                }
            }
            Self::Map(map) => {
                for (i, entry) in map.entries.iter().enumerate() {
                    entry.key.walk(&format!("{path}{{{i}}}"), f);
                    entry.value.walk(&format!("{path}[{i}]"), f);
                }
            }
            _ => {}
        }
    }

    fn walk_mut(&mut self, path: &str, f: &mut dyn FnMut(&str, &mut Value)) {
        f(path, self);
        match self {
            Self::Record(record) => record.walk_mut_at(path, f),
            Self::List(list) => {
                for (i, item) in list.items.iter_mut().enumerate() {
                    item.value.walk_mut(&format!("{path}[{i}]"), f);
                }
            }
            Self::Map(map) => {
                for (i, entry) in map.entries.iter_mut().enumerate() {
                    entry.key.walk_mut(&format!("{path}{{{i}}}"), f);
                    entry.value.walk_mut(&format!("{path}[{i}]"), f);
                }
            }
            _ => {}
        }
    }
}

/// `{ item item ... }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListValue {
    pub items: Vec<ListItem>,
    pub close_lead: Trivia,
}

impl ListValue {
    /// Append a generated item
    pub fn push(&mut self, value: Value) {
        self.items.push(ListItem { lead: Trivia::Auto, value, comma: None });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub lead: Trivia,
    pub value: Value,
    /// Source text of a trailing separator (trivia plus `,`)
    pub comma: Option<String>,
}

/// `{ key = value ... }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    pub entries: Vec<MapEntry>,
    pub close_lead: Trivia,
}

impl MapValue {
    /// Append a generated entry
    pub fn push(&mut self, key: Value, value: Value) {
        self.entries.push(MapEntry { lead: Trivia::Auto, key, sep: None, value, comma: None });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub lead: Trivia,
    pub key: Value,
    /// Source text between key and value (` = `)
    pub sep: Option<String>,
    pub value: Value,
    pub comma: Option<String>,
}

// ============================================================================
// Records and fields
// ============================================================================

/// `Type { fields }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_name: String,
    /// Source text after the type name up to and including `{`
    pub open: Option<String>,
    pub fields: Vec<Field>,
    /// Field text the parser could not read, kept verbatim
    pub unparsed: Vec<Unparsed>,
    pub close_lead: Trivia,
    /// Absolute byte range in the source document, for parsed records
    pub span: Option<Range<usize>>,
}

impl Record {
    /// An empty generated record
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            open: None,
            fields: Vec::new(),
            unparsed: Vec::new(),
            close_lead: Trivia::Auto,
            span: None,
        }
    }

    /// Builder-style field append
    #[must_use]
    pub fn with_field(mut self, name: &str, field_type: FieldType, value: Value) -> Self {
        self.push_field(Field::new(name, field_type, value));
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.field(name).map(|f| &f.value)
    }

    pub fn value_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.field_mut(name).map(|f| &mut f.value)
    }

    /// Append a field after every existing field
    pub fn push_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Insert a field at `index`; unparsed text keeps its position
    pub fn insert_field(&mut self, index: usize, field: Field) {
        let index = index.min(self.fields.len());
        for unparsed in &mut self.unparsed {
            if unparsed.after > index {
                unparsed.after += 1;
            }
        }
        self.fields.insert(index, field);
    }

    /// Remove the field at `index`
    pub fn remove_field(&mut self, index: usize) -> Field {
        for unparsed in &mut self.unparsed {
            if unparsed.after > index {
                unparsed.after -= 1;
            }
        }
        self.fields.remove(index)
    }

    /// Replace a field's value in place, or append the field
    ///
    /// Returns `true` when the field was appended.
    pub fn set_field(&mut self, name: &str, field_type: FieldType, value: Value) -> bool {
        if let Some(field) = self.field_mut(name) {
            if field.field_type != field_type {
                field.field_type = field_type;
                field.head = None;
            }
            field.value = value;
            false
        } else {
            self.push_field(Field::new(name, field_type, value));
            true
        }
    }

    /// Visit every value below this record with its dotted path
    pub fn walk(&self, f: &mut dyn FnMut(&str, &Value)) {
        self.walk_at("", f);
    }

    /// Mutable variant of [`Record::walk`]
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&str, &mut Value)) {
        self.walk_mut_at("", f);
    }

    fn walk_at(&self, prefix: &str, f: &mut dyn FnMut(&str, &Value)) {
        for field in &self.fields {
            field.value.walk(&join_path(prefix, &field.name), f);
        }
    }

    fn walk_mut_at(&mut self, prefix: &str, f: &mut dyn FnMut(&str, &mut Value)) {
        for field in &mut self.fields {
            let path = join_path(prefix, &field.name);
            field.value.walk_mut(&path, f);
        }
    }

    /// Records nested anywhere below this one, depth first
    pub fn for_each_record_mut(&mut self, f: &mut dyn FnMut(&mut Record)) {
        f(self);
        for field in &mut self.fields {
            for_each_record_in_value(&mut field.value, f);
        }
    }
}

fn for_each_record_in_value(value: &mut Value, f: &mut dyn FnMut(&mut Record)) {
    match value {
        Value::Record(record) => record.for_each_record_mut(f),
        Value::List(list) => {
            for item in &mut list.items {
                for_each_record_in_value(&mut item.value, f);
            }
        }
        Value::Map(map) => {
            for entry in &mut map.entries {
                for_each_record_in_value(&mut entry.value, f);
            }
        }
        _ => {}
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// `name: type = value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub lead: Trivia,
    pub name: String,
    pub field_type: FieldType,
    /// Source text from the name up to the first token of the value
    pub head: Option<String>,
    pub value: Value,
    pub span: Option<Range<usize>>,
}

impl Field {
    #[must_use]
    pub fn new(name: &str, field_type: FieldType, value: Value) -> Self {
        Self {
            lead: Trivia::Auto,
            name: name.to_string(),
            field_type,
            head: None,
            value,
            span: None,
        }
    }
}

/// Field text that failed to parse, written back untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unparsed {
    /// Number of parsed fields in front of this text
    pub after: usize,
    /// Leading trivia plus the skipped tokens
    pub text: String,
    pub offset: usize,
    pub reason: String,
}

// ============================================================================
// Systems and emitters
// ============================================================================

/// Who created a child-particle binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    UserAuthored,
    ToolAuthored,
}

impl Provenance {
    /// Classify by the emitter name marker
    #[must_use]
    pub fn from_emitter_name(name: Option<&str>) -> Self {
        match name {
            Some(name) if name.starts_with(TOOL_CHILD_PREFIX) => Self::ToolAuthored,
            _ => Self::UserAuthored,
        }
    }
}

/// A child system spawned by an emitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildParticleBinding {
    pub emitter_name: Option<String>,
    pub effect_key: EntryKey,
    pub provenance: Provenance,
}

/// Summary of one emitter, computed when its system is parsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterRecord {
    pub name: Option<String>,
    pub type_name: String,
    /// Emitter list field holding this emitter
    pub list_field: String,
    /// Position inside that list
    pub position: usize,
    pub range: Option<Range<usize>>,
    pub child_particles: Vec<ChildParticleBinding>,
}

/// 1-based inclusive line span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// A top-level `key = Type { ... }` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRecord {
    pub key: EntryKey,
    /// Source text in front of the type name (`"key" = `); `None` after a rename
    pub header: Option<String>,
    pub body: Record,
    pub range: Range<usize>,
    pub lines: LineRange,
    pub emitters: Vec<EmitterRecord>,
}

impl SystemRecord {
    /// A generated entry
    #[must_use]
    pub fn new(key: EntryKey, body: Record) -> Self {
        let mut record = Self {
            key,
            header: None,
            body,
            range: 0..0,
            lines: LineRange::default(),
            emitters: Vec::new(),
        };
        record.refresh_emitters();
        record
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.body.type_name
    }

    #[must_use]
    pub fn is_vfx_system(&self) -> bool {
        self.body.type_name == VFX_SYSTEM_TYPE
    }

    #[must_use]
    pub fn particle_name(&self) -> Option<String> {
        self.body.value("particleName").and_then(Value::as_str)
    }

    /// Change the key; the header is regenerated on write
    pub fn set_key(&mut self, key: EntryKey) {
        self.key = key;
        self.header = None;
    }

    /// The emitter record behind an [`EmitterRecord`] summary
    #[must_use]
    pub fn emitter_body(&self, emitter: &EmitterRecord) -> Option<&Record> {
        self.body
            .value(&emitter.list_field)?
            .as_list()?
            .items
            .get(emitter.position)?
            .value
            .as_record()
    }

    /// Field name → value mapping of one emitter
    pub fn emitter_fields<'a>(&'a self, emitter: &EmitterRecord) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.emitter_body(emitter)
            .into_iter()
            .flat_map(|record| record.fields.iter().map(|f| (f.name.as_str(), &f.value)))
    }

    /// Recompute emitter summaries from the body
    pub fn refresh_emitters(&mut self) {
        self.emitters = collect_emitters(&self.body);
    }
}

/// Emitter summaries of a system body, with child bindings and provenance
#[must_use]
pub fn collect_emitters(body: &Record) -> Vec<EmitterRecord> {
    let mut emitters = Vec::new();
    for list_field in EMITTER_LIST_FIELDS {
        let Some(list) = body.value(list_field).and_then(Value::as_list) else {
            continue;
        };
        for (position, item) in list.items.iter().enumerate() {
            let Some(emitter) = item.value.as_record() else {
                continue;
            };
            let name = emitter.value("emitterName").and_then(Value::as_str);
            let provenance = Provenance::from_emitter_name(name.as_deref());
            let child_particles = child_effect_keys(emitter)
                .into_iter()
                .map(|effect_key| ChildParticleBinding {
                    emitter_name: name.clone(),
                    effect_key,
                    provenance,
                })
                .collect();
            emitters.push(EmitterRecord {
                name,
                type_name: emitter.type_name.clone(),
                list_field: list_field.to_string(),
                position,
                range: emitter.span.clone(),
                child_particles,
            });
        }
    }
    emitters
}

/// Effect keys under `childParticleSetDefinition.childrenIdentifiers`
#[must_use]
pub fn child_effect_keys(emitter: &Record) -> Vec<EntryKey> {
    emitter
        .value("childParticleSetDefinition")
        .and_then(Value::as_record)
        .and_then(|set| set.value("childrenIdentifiers"))
        .and_then(Value::as_list)
        .map(|list| {
            list.items
                .iter()
                .filter_map(|item| item.value.as_record())
                .filter_map(child_identifier_effect)
                .collect()
        })
        .unwrap_or_default()
}

/// System a `VfxChildIdentifier` spawns, from `effect` or else `effectKey`
#[must_use]
pub fn child_identifier_effect(child: &Record) -> Option<EntryKey> {
    CHILD_EFFECT_FIELDS
        .iter()
        .find_map(|field| child.value(field).and_then(Value::as_key))
}
