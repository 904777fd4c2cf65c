//! `mtx44` values

use serde::{Deserialize, Serialize};

use super::lexer::{Lexer, TokenKind};
use crate::error::{Error, Result};

/// Row-major 4x4 matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix4x4 {
    pub values: [f64; 16],
}

impl Matrix4x4 {
    pub const IDENTITY: Self = Self {
        values: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Build from exactly 16 numbers in row order
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let values: [f64; 16] = values.try_into().map_err(|_| Error::InvalidMatrix {
            message: format!("expected 16 numbers, found {}", values.len()),
        })?;
        Ok(Self { values })
    }

    /// Identity with a translation in the last row
    #[must_use]
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.values[12] = x;
        m.values[13] = y;
        m.values[14] = z;
        m
    }

    #[must_use]
    pub fn row(&self, index: usize) -> [f64; 4] {
        let base = index * 4;
        [self.values[base], self.values[base + 1], self.values[base + 2], self.values[base + 3]]
    }
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Parse matrix text
///
/// Accepts a bare `{ ... }` block or a full `mtx44 = { ... }` value. Numbers
/// may be separated by commas, whitespace or newlines.
pub fn parse_matrix(text: &str) -> Result<Matrix4x4> {
    let mut tokens = Lexer::new(text).peekable();

    if tokens.peek().is_some_and(|t| t.kind == TokenKind::Ident) {
        let ident = tokens.next().map(|t| t.text(text)).unwrap_or_default();
        if !ident.eq_ignore_ascii_case("mtx44") {
            return Err(Error::InvalidMatrix { message: format!("unexpected '{ident}'") });
        }
        if tokens.peek().is_some_and(|t| t.kind == TokenKind::Equals) {
            tokens.next();
        }
    }

    match tokens.next() {
        Some(t) if t.kind == TokenKind::LBrace => {}
        _ => return Err(Error::InvalidMatrix { message: "expected '{'".to_string() }),
    }

    let mut numbers = Vec::with_capacity(16);
    loop {
        let Some(token) = tokens.next() else {
            return Err(Error::InvalidMatrix { message: "missing '}'".to_string() });
        };
        match token.kind {
            TokenKind::RBrace => break,
            TokenKind::Comma => {}
            TokenKind::Number => {
                let raw = token.text(text);
                let value = raw.parse::<f64>().map_err(|_| Error::InvalidMatrix {
                    message: format!("'{raw}' is not a number"),
                })?;
                numbers.push(value);
            }
            _ => {
                return Err(Error::InvalidMatrix {
                    message: format!("unexpected '{}'", token.text(text)),
                });
            }
        }
    }

    if let Some(extra) = tokens.next() {
        return Err(Error::InvalidMatrix {
            message: format!("trailing '{}'", extra.text(text)),
        });
    }

    Matrix4x4::from_slice(&numbers)
}

/// Four rows inside braces; `indent` is the indentation of the owning line
#[must_use]
pub fn format_matrix(matrix: &Matrix4x4, indent: &str) -> String {
    let mut out = String::from("{\n");
    for row in 0..4 {
        let cells: Vec<String> = matrix.row(row).iter().map(|v| format_float(*v)).collect();
        out.push_str(indent);
        out.push_str("    ");
        out.push_str(&cells.join(", "));
        out.push('\n');
    }
    out.push_str(indent);
    out.push('}');
    out
}

/// Shortest plain decimal that reads back as the same value (`1`, `0.5`,
/// `-0.00002`); never uses an exponent
#[must_use]
pub fn format_float(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}
