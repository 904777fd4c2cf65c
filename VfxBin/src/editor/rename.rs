//! Renaming a system and every reference to it

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::{RESOLVER_TYPE, SKIN_DATA_TYPE, SourceDocument, TextEdit};
use crate::error::{Error, Result};
use crate::formats::vfx::lexer::{Lexer, Token, TokenKind};
use crate::formats::vfx::EntryKey;
use crate::utils::parse_hash_literal;

/// What a rename touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameReport {
    pub old_key: EntryKey,
    pub new_key: EntryKey,
    /// Entry headers rewritten (the renamed system itself)
    pub headers: usize,
    /// Literals inside `ResourceResolver` entries
    pub resolver_rows: usize,
    /// Literals inside the skin data entry (idle and persistent bindings)
    pub skin_bindings: usize,
    /// Any other literal: child particles, paths, other entries
    pub references: usize,
}

impl RenameReport {
    fn new(old_key: EntryKey, new_key: EntryKey) -> Self {
        Self { old_key, new_key, headers: 0, resolver_rows: 0, skin_bindings: 0, references: 0 }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.headers + self.resolver_rows + self.skin_bindings + self.references
    }
}

/// `name: string = <token>`
fn in_string_field(tokens: &[Token], src: &str, i: usize) -> bool {
    i >= 3
        && tokens[i - 1].kind == TokenKind::Equals
        && tokens[i - 2].kind == TokenKind::Ident
        && tokens[i - 2].text(src) == "string"
        && tokens[i - 3].kind == TokenKind::Colon
}

fn replacement(new: &EntryKey, token: TokenKind, string_field: bool) -> String {
    match (new, token, string_field) {
        (EntryKey::Name(name), _, _) => format!("\"{name}\""),
        (EntryKey::Hash(hash), TokenKind::Str, true) => format!("\"0x{hash:08x}\""),
        (EntryKey::Hash(hash), _, _) => format!("0x{hash:08x}"),
    }
}

impl SourceDocument {
    /// Rename a VFX system everywhere it is referenced
    ///
    /// Rewrites the header, resolver rows, idle/persistent/child bindings and
    /// every other literal equal to the old key (or its hash). Afterwards a
    /// resolver row maps the new key. Fails without changes when `new` is
    /// already used.
    pub fn rename_system(&mut self, old: &EntryKey, new: &EntryKey) -> Result<RenameReport> {
        let old = self.require_system(old)?.key.clone();
        if old == *new {
            return Ok(RenameReport::new(old, new.clone()));
        }
        if let Some(existing) = self.entry(new) {
            return Err(Error::KeyCollision { key: existing.key.literal() });
        }

        let report = self.transact(|doc| {
            let (edits, report) = doc.collect_rename_edits(&old, new);
            doc.apply_edits(edits)?;
            doc.ensure_resolver_mapping(new)?;

            if doc.index().get(&old).is_some() || doc.index().get(new).is_none() {
                return Err(Error::InvalidEdit {
                    message: format!("rename of {old} to {new} did not reindex cleanly"),
                });
            }
            Ok(report)
        })?;

        tracing::info!(
            from = %report.old_key,
            to = %report.new_key,
            resolver_rows = report.resolver_rows,
            skin_bindings = report.skin_bindings,
            references = report.references,
            "renamed system"
        );
        Ok(report)
    }

    /// One edit per touched entry, plus single-token edits outside entries
    fn collect_rename_edits(&self, old: &EntryKey, new: &EntryKey) -> (Vec<TextEdit>, RenameReport) {
        let src = self.text();
        let tokens: Vec<Token> = Lexer::new(src).collect();
        let old_hash = old.hash();
        let mut report = RenameReport::new(old.clone(), new.clone());
        let mut by_entry: IndexMap<Option<EntryKey>, Vec<TextEdit>> = IndexMap::new();

        for (i, token) in tokens.iter().enumerate() {
            let raw = token.text(src);
            let hit = match token.kind {
                TokenKind::Str => EntryKey::from_literal(raw).is_some_and(|k| k.refers_to(old)),
                TokenKind::Hex => parse_hash_literal(raw) == Some(old_hash),
                _ => false,
            };
            if !hit {
                continue;
            }

            let text = replacement(new, token.kind, in_string_field(&tokens, src, i));
            let container = self.index().entry_at(token.start);
            match container {
                Some(entry) if entry.key == *old && entry.byte_range.start == token.start => report.headers += 1,
                Some(entry) if entry.type_name == RESOLVER_TYPE => report.resolver_rows += 1,
                Some(entry) if entry.type_name == SKIN_DATA_TYPE => report.skin_bindings += 1,
                _ => report.references += 1,
            }
            by_entry
                .entry(container.map(|e| e.key.clone()))
                .or_default()
                .push(TextEdit::new(token.start..token.end, text));
        }

        let mut edits = Vec::new();
        for (container, mut group) in by_entry {
            let Some(range) = container.and_then(|k| self.index().get(&k)).map(|e| e.byte_range.clone()) else {
                edits.extend(group);
                continue;
            };
            group.sort_by(|a, b| b.range.start.cmp(&a.range.start));
            let mut local = src[range.clone()].to_string();
            for edit in group {
                local.replace_range(edit.range.start - range.start..edit.range.end - range.start, &edit.text);
            }
            edits.push(TextEdit::new(range, local));
        }
        (edits, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"entries: map[hash,embed] = {
    "Skins/Skin0" = SkinCharacterDataProperties {
        idleParticlesEffects: list[embed] = {
            SkinCharacterDataProperties_CharacterIdleEffect {
                effectKey: hash = "Particles/Orb"
                boneName: string = "C_BUFFBONE_GLB_CENTER_LOC"
            }
        }
    }
    "Particles/Orb" = VfxSystemDefinitionData {
        particlePath: string = "Particles/Orb"
    }
    "Particles/Host" = VfxSystemDefinitionData {
        complexEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                childParticleSetDefinition: pointer = VfxChildParticleSetDefinitionData {
                    childrenIdentifiers: list[embed] = {
                        VfxChildIdentifier {
                            effectKey: hash = "Particles/Orb"
                        }
                    }
                }
            }
        }
    }
    "Skins/Skin0/Resources" = ResourceResolver {
        resourceMap: map[hash,link] = {
            "Orb" = "Particles/Orb"
        }
    }
}
"#;

    #[test]
    fn test_rename_rewrites_every_reference() {
        let mut doc = SourceDocument::new(DOC);
        let report = doc
            .rename_system(&EntryKey::name("Particles/Orb"), &EntryKey::name("Particles/Sphere"))
            .unwrap();

        assert_eq!(report.headers, 1);
        assert_eq!(report.resolver_rows, 1);
        assert_eq!(report.skin_bindings, 1);
        assert_eq!(report.references, 2);
        assert!(!doc.text().contains("Particles/Orb"));
        assert_eq!(doc.resolver_entries().unwrap().len(), 1);
        assert_eq!(doc.index().len(), 4);
        assert!(doc.index().get(&EntryKey::name("Particles/Sphere")).is_some());
    }

    #[test]
    fn test_rename_to_hash_keeps_string_fields_quoted() {
        let mut doc = SourceDocument::new(DOC);
        doc.rename_system(&EntryKey::name("Particles/Orb"), &EntryKey::Hash(0x12345678)).unwrap();
        assert!(doc.text().contains("0x12345678 = VfxSystemDefinitionData"));
        assert!(doc.text().contains("particlePath: string = \"0x12345678\""));
        assert!(doc.text().contains("effectKey: hash = 0x12345678"));
    }

    #[test]
    fn test_rename_collision_leaves_text() {
        let mut doc = SourceDocument::new(DOC);
        let err = doc
            .rename_system(&EntryKey::name("Particles/Orb"), &EntryKey::name("Particles/Host"))
            .unwrap_err();
        assert!(matches!(err, Error::KeyCollision { .. }));
        assert_eq!(doc.text(), DOC);
    }
}
