//! Structural edits on a [`SourceDocument`](crate::document::SourceDocument)
//!
//! Every operation here is an inherent method of `SourceDocument`. They
//! validate before touching text, run inside a transaction, and splice only
//! the entries they change; the rest of the document stays byte-identical.
//!
//! | Module | Operations |
//! |--------|------------|
//! | [`insert`] | `insert_system`, `insert_preserving_names`, `import_systems`, `remove_system` |
//! | [`rename`] | `rename_system` |
//! | [`clean`] | `clean_system`, `remove_unreferenced_systems` |
//! | [`child_particles`] | `add_child_particle_effect`, `find_available_vfx_systems`, `extract_child_particle_data` |
//! | [`idle_particles`] | `add_idle_particle_effect`, `has_idle_particle_effect`, ... |
//! | [`persistent`] | `extract_existing_conditions`, `insert_or_update_persistent_effect` |
//! | [`resolver`] | `ensure_resolver_mapping`, `resolve_effect_key` |
//! | [`matrix`] | `system_matrix`, `upsert_matrix` |
//! | [`split`] | `split_emitters`, `split_system_emitters` |
//! | [`linked`] | `linked_files`, `take_vfx_systems`, `merge_new_entries`, [`linked::separate_vfx`], [`linked::combine_linked`] |

pub mod child_particles;
pub mod clean;
pub mod idle_particles;
pub mod insert;
pub mod linked;
pub mod matrix;
pub mod persistent;
pub mod rename;
pub mod resolver;
pub mod split;

pub use child_particles::AvailableSystem;
pub use clean::{CleanFinding, CleanReport, FindingKind};
pub use idle_particles::{IDLE_BONES, IdleParticleBinding, is_valid_idle_bone};
pub use insert::InsertOutcome;
pub use linked::{CombineReport, LINKED_FIELD, SeparateReport, combine_linked, find_skin_root, separate_vfx};
pub use matrix::TRANSFORM_FIELD;
pub use persistent::{PersistentEffectEntry, UpsertOutcome};
pub use rename::RenameReport;
pub use resolver::{RESOURCE_MAP_FIELD, ResourceResolverEntry};
pub use split::{SplitEmitter, WRAPPER_PREFIX};
