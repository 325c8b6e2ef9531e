//! Netflix catalog import: one CSV export normalized into show, rating,
//! category, country, director and actor tables.
pub mod pipeline;
pub mod record;
pub mod rows;

pub use pipeline::{run, NetflixSettings};
