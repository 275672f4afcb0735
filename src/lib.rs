//! # Studyhall
//!
//! Backend for a course-organization application: users create courses,
//! upload lecture-note files, and chat with a hosted LLM that receives the
//! extracted note text as context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────────┐
//! │  Upload   │──▶│  Extraction   │──▶│   SQLite +    │
//! │ (HTTP)   │   │ docx/pdf/txt  │   │  blob store   │
//! └──────────┘   └───────────────┘   └──────┬───────┘
//!                                           │
//!                                           ▼
//!                                   ┌──────────────┐   ┌─────────┐
//!                                   │   Context     │──▶│   LLM    │
//!                                   │  assembler    │   │  client  │
//!                                   └──────────────┘   └─────────┘
//! ```
//!
//! Data flows one direction: upload → extract → persist extracted text
//! (keyed by owner/course/file) → on chat, reload all texts for the active
//! course → join → prepend to the prompt → call the hosted LLM.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`extract`] | Per-format text extraction |
//! | [`context`] | Context bundle assembly and truncation |
//! | [`llm`] | Hosted LLM client |
//! | [`storage`] | Raw file object store |
//! | [`courses`], [`notes`] | Relational persistence |
//! | [`ingest`] | Upload pipeline orchestration |
//! | [`server`] | HTTP API |
//! | [`db`], [`migrate`] | Database connection and schema |

pub mod config;
pub mod context;
pub mod courses;
pub mod db;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod notes;
pub mod server;
pub mod storage;
