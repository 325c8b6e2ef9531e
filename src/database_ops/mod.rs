//! Database-facing side of the loaders: the session, the batch writer and the
//! per-dataset importers built on top of them.
pub mod batch_loader;
pub mod db;
pub mod dictionary;
pub mod imdb;
pub mod netflix;
pub mod phase;
pub mod rows;
pub mod sink;
pub mod source;
