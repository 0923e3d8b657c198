//! # reqforge Core
//!
//! Shared, runtime-agnostic logic for reqforge: the analysis data model, the
//! canonical output schema, response validation, prompt assembly, summary
//! projection, context retrieval and the collaborator traits (vector index,
//! project store, image store, embedding provider, generation client).
//!
//! This crate contains no tokio, sqlx, HTTP or filesystem I/O. Concrete
//! network-backed collaborators live in the `reqforge` app crate; the
//! in-memory implementations in [`store::memory`] back the tests.

pub mod embedding;
pub mod error;
pub mod generation;
pub mod models;
pub mod prompt;
pub mod retrieve;
pub mod schema;
pub mod store;
pub mod summary;
pub mod validate;
