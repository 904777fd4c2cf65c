//! Removing broken fields, orphaned bindings and unused systems

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::{RESOLVER_TYPE, SourceDocument};
use crate::error::{Error, Result};
use crate::formats::vfx::lexer::{Lexer, TokenKind};
use crate::formats::vfx::{EMITTER_LIST_FIELDS, EntryKey, ListValue, Provenance, Record, Value, child_identifier_effect};

use super::resolver::ResourceResolverEntry;

/// What a clean pass found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingKind {
    /// Field text the parser could not read
    MalformedField,
    /// Child identifier whose effect key matches no entry
    OrphanedChildBinding,
    /// Tool-authored emitter left with no child identifiers
    OrphanedChildEmitter,
    /// VFX system nothing references
    UnreferencedSystem,
}

/// One finding; `location` is the entry key, plus the emitter name when there is one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanFinding {
    pub kind: FindingKind,
    pub location: String,
    pub detail: String,
}

/// Findings of a clean pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    /// Removed from the document
    pub removed: Vec<CleanFinding>,
    /// Reported but left alone (user-authored orphans)
    pub kept: Vec<CleanFinding>,
}

impl CleanReport {
    /// Number of removed items
    #[must_use]
    pub fn count(&self) -> usize {
        self.removed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.kept.is_empty()
    }
}

fn emitter_location(key: &EntryKey, emitter: &Record) -> String {
    match emitter.value("emitterName").and_then(Value::as_str) {
        Some(name) => format!("{key} / {name}"),
        None => key.to_string(),
    }
}

fn children_mut(emitter: &mut Record) -> Option<&mut ListValue> {
    emitter
        .value_mut("childParticleSetDefinition")?
        .as_record_mut()?
        .value_mut("childrenIdentifiers")?
        .as_list_mut()
}

impl SourceDocument {
    /// Remove malformed fields and orphaned tool-authored child bindings
    ///
    /// A child binding is orphaned when its effect key resolves to no entry
    /// in this document. Tool-authored bindings are removed, and their
    /// emitter too once it has no children left; user-authored ones are
    /// reported in [`CleanReport::kept`].
    pub fn clean_system(&mut self, key: &EntryKey) -> Result<CleanReport> {
        let key = self.require_system(key)?.key.clone();
        let rows = self.resolver_entries()?;
        let mut record = self.parse_entry(&key)?.record;
        let mut report = CleanReport::default();

        record.body.for_each_record_mut(&mut |nested| {
            for unparsed in nested.unparsed.drain(..) {
                let line = self.index().line_at(self.text(), unparsed.offset);
                report.removed.push(CleanFinding {
                    kind: FindingKind::MalformedField,
                    location: key.to_string(),
                    detail: format!("line {line}: {} ({})", unparsed.text.trim(), unparsed.reason),
                });
            }
        });

        for list_field in EMITTER_LIST_FIELDS {
            let Some(list) = record.body.value_mut(list_field).and_then(Value::as_list_mut) else {
                continue;
            };
            list.items.retain_mut(|item| {
                let Some(emitter) = item.value.as_record_mut() else {
                    return true;
                };
                self.clean_emitter(&key, emitter, &rows, &mut report)
            });
        }

        if report.removed.is_empty() {
            return Ok(report);
        }
        self.transact(|doc| doc.write_back(&mut record))?;

        tracing::info!(key = %key, removed = report.count(), kept = report.kept.len(), "cleaned system");
        Ok(report)
    }

    /// Drop orphaned children of one emitter; returns whether the emitter stays
    fn clean_emitter(&self, key: &EntryKey, emitter: &mut Record, rows: &[ResourceResolverEntry], report: &mut CleanReport) -> bool {
        let location = emitter_location(key, emitter);
        let provenance = Provenance::from_emitter_name(emitter.value("emitterName").and_then(Value::as_str).as_deref());
        let Some(children) = children_mut(emitter) else {
            return true;
        };

        let before = children.items.len();
        children.items.retain(|child| {
            let Some(effect_key) = child.value.as_record().and_then(child_identifier_effect) else {
                return true;
            };
            if self.reference_exists(&effect_key, rows) {
                return true;
            }
            let finding = CleanFinding {
                kind: FindingKind::OrphanedChildBinding,
                location: location.clone(),
                detail: format!("effectKey {effect_key} matches no entry"),
            };
            match provenance {
                Provenance::ToolAuthored => {
                    report.removed.push(finding);
                    false
                }
                Provenance::UserAuthored => {
                    report.kept.push(finding);
                    true
                }
            }
        });

        let emptied = before > 0 && children.items.is_empty();
        if emptied && provenance == Provenance::ToolAuthored {
            report.removed.push(CleanFinding {
                kind: FindingKind::OrphanedChildEmitter,
                location,
                detail: "emitter has no child identifiers left".to_string(),
            });
            return false;
        }
        true
    }

    /// Remove every VFX system nothing points at
    ///
    /// A system stays when a resolver row targets it or any string or hash
    /// literal outside its own span names it. The document must have a
    /// `ResourceResolver`; without one every system would look unused.
    pub fn remove_unreferenced_systems(&mut self) -> Result<CleanReport> {
        if self.resolver().is_none() {
            return Err(Error::EntryNotFound { key: RESOLVER_TYPE.to_string() });
        }
        let rows = self.resolver_entries()?;

        let src = self.text();
        let mut references: HashMap<u32, Vec<usize>> = HashMap::new();
        for token in Lexer::new(src) {
            if !matches!(token.kind, TokenKind::Str | TokenKind::Hex) {
                continue;
            }
            if let Some(key) = EntryKey::from_literal(token.text(src)) {
                references.entry(key.hash()).or_default().push(token.start);
            }
        }

        let unused: Vec<EntryKey> = self
            .systems()
            .filter(|system| {
                let by_row = rows.iter().any(|r| r.target.refers_to(&system.key));
                let by_literal = references
                    .get(&system.key.hash())
                    .is_some_and(|offsets| offsets.iter().any(|o| !system.byte_range.contains(o)));
                !by_row && !by_literal
            })
            .map(|system| system.key.clone())
            .collect();

        let mut report = CleanReport::default();
        if unused.is_empty() {
            return Ok(report);
        }

        self.transact(|doc| {
            for key in &unused {
                doc.remove_entry_text(key)?;
            }
            Ok(())
        })?;

        for key in unused {
            tracing::debug!(key = %key, "removed unreferenced system");
            report.removed.push(CleanFinding {
                kind: FindingKind::UnreferencedSystem,
                location: key.to_string(),
                detail: "no resolver row or literal references it".to_string(),
            });
        }
        tracing::info!(removed = report.count(), "removed unreferenced systems");
        Ok(report)
    }
}
