//! System transform matrix

use crate::document::SourceDocument;
use crate::error::{Error, Result};
use crate::formats::vfx::{EntryKey, FieldType, Matrix4x4, MatrixValue, Value};

/// `mtx44` field of a VFX system
pub const TRANSFORM_FIELD: &str = "transform";

impl SourceDocument {
    /// The system's `transform`, if it has one
    pub fn system_matrix(&self, key: &EntryKey) -> Result<Option<Matrix4x4>> {
        let key = self.require_system(key)?.key.clone();
        let parsed = self.parse_entry(&key)?;
        match parsed.record.body.value(TRANSFORM_FIELD) {
            None => Ok(None),
            Some(Value::Matrix(value)) => Ok(Some(value.matrix)),
            Some(_) => Err(Error::InvalidMatrix { message: format!("{key}.{TRANSFORM_FIELD} is not an mtx44 value") }),
        }
    }

    /// Set the system's `transform`, adding the field when missing
    ///
    /// Returns `true` when the field was added. Writing the same matrix
    /// again leaves the text untouched.
    pub fn upsert_matrix(&mut self, key: &EntryKey, matrix: &Matrix4x4) -> Result<bool> {
        let key = self.require_system(key)?.key.clone();
        if matrix.values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidMatrix { message: "matrix values must be finite".to_string() });
        }

        let added = self.transact(|doc| {
            doc.rewrite_entry(&key, |record| {
                if let Some(Value::Matrix(current)) = record.body.value(TRANSFORM_FIELD) {
                    if current.matrix == *matrix {
                        return Ok(false);
                    }
                }
                Ok(record.body.set_field(TRANSFORM_FIELD, FieldType::Matrix, Value::Matrix(MatrixValue::new(*matrix))))
            })
        })?;

        tracing::debug!(key = %key, added, "wrote transform matrix");
        Ok(added)
    }
}
