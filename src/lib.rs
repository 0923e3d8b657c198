//! # reqforge
//!
//! Screenshot-to-requirements analysis grounded in prior screens.
//!
//! For each uploaded screenshot, reqforge retrieves short summaries of the
//! screens already analyzed for the same project, asks a vision model for a
//! schema-constrained analysis, validates the answer, and records it so the
//! next screen sees it as context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────┐
//! │   CLI    │──▶│ Orchestrator │──▶│  Gemini   │
//! │(reqforge)│   │  (pipeline)  │   └───────────┘
//! └──────────┘   └──────┬───────┘
//!                       │
//!        ┌──────────────┼──────────────┐
//!        ▼              ▼              ▼
//!  ┌──────────┐   ┌──────────┐   ┌──────────┐
//!  │  SQLite  │   │  Chroma  │   │  Images  │
//!  │ projects │   │ summaries│   │   (fs)   │
//!  └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! The data model, schema, validator, prompt builder and collaborator traits
//! live in the `reqforge-core` crate; this crate supplies the concrete
//! clients, storage, configuration and CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`pipeline`] | The analysis orchestrator |
//! | [`gemini`] | Gemini `generateContent` client |
//! | [`embedding`] | Embedding providers |
//! | [`chroma`] | Chroma vector index |
//! | [`project_store`] | SQLite project/screen store |
//! | [`image_store`] | Filesystem image store |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`app`] | Composition root and CLI commands |

pub mod app;
pub mod chroma;
pub mod config;
pub mod db;
pub mod embedding;
pub mod gemini;
pub mod image_store;
pub mod migrate;
pub mod pipeline;
pub mod project_store;
