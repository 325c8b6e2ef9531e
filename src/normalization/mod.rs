//! Leaf parsing helpers shared by every importer: surrogate-key extraction,
//! value parsing and category-label canonicalization.
pub mod identifier;
pub mod label;

pub use identifier::{extract_id, extract_tagged_id, EntityId, NULL_MARKER};
pub use label::normalize_label;
