//! IMDB dataset loader.
//!
//! Reads the seven TSV dumps and writes them into the normalized schema in
//! dependency order. See [`pipeline::run`].
pub mod catalogs;
pub mod context;
pub mod crew;
pub mod entities;
pub mod files;
pub mod pipeline;
pub mod relations;
pub mod rows;
pub mod stage;
pub mod updates;

pub use context::RunContext;
pub use files::{SourceDir, SourceFile};
pub use pipeline::{run, ImdbSettings};
