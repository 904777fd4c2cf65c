//! Ritobin text format (`.py` bin dumps)
//!
//! A file is a flat list of typed fields. VFX definitions live under the
//! `entries` map as `<key> = <Type> { ... }` records:
//!
//! ```text
//! entries: map[hash,embed] = {
//!     "Characters/Ahri/Skins/Skin0/Particles/Orb" = VfxSystemDefinitionData {
//!         particleName: string = "Ahri_Orb"
//!     }
//! }
//! ```
//!
//! - [`lexer`] splits text into tokens without losing trivia
//! - [`reader`] parses one entry into a [`SystemRecord`]
//! - [`writer`] writes a record back, byte-identical when untouched

pub mod document;
pub mod lexer;
pub mod matrix;
pub mod reader;
pub mod writer;

pub use document::{
    CHILD_EFFECT_FIELDS, ChildParticleBinding, EMITTER_LIST_FIELDS, EmitterRecord, EntryKey, Field, FieldType, LineRange,
    ListItem, ListValue, MapEntry, MapValue, MatrixValue, Provenance, Record, SystemRecord,
    TOOL_CHILD_PREFIX, Trivia, Unparsed, VFX_SYSTEM_TYPE, Value, VectorValue, child_identifier_effect,
};
pub use matrix::{Matrix4x4, format_matrix, parse_matrix};
pub use reader::{ParseDiagnostic, ParsedRecord, check_balance, parse_record, parse_record_at};
pub use writer::{replace_span, write_record, write_system, write_value};
