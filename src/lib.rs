//! # Context Chat
//!
//! A chat assistant that grounds an LLM's answers in live context pulled
//! from Wikipedia, news headlines, web search and uploaded documents.
//!
//! ## Architecture
//!
//! ```text
//!              ┌────────────┐   ┌─────────────────────┐
//!  question ──▶│ Normalizer │──▶│  Context Assembler  │
//!              │ (→ English)│   │ classify │ merge    │
//!              └────────────┘   └────┬────────────────┘
//!                                    │ Wikipedia / News / Web / Documents
//!                                    ▼
//!                             ┌────────────┐   ┌──────────────┐
//!                             │ Generator  │──▶│ History file │
//!                             │ (chat API) │   │  (JSON)      │
//!                             └────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GROQ_API_KEY=... NEWSAPI_KEY=... SERPER_KEY=...
//! cchat ask "What is photosynthesis?"
//! cchat upload ./handbook.pdf
//! cchat doc handbook.pdf "How many vacation days do I get?"
//! cchat chat
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Provider lookup errors |
//! | [`providers`] | Wikipedia, news, web search and document lookups |
//! | [`assembler`] | Classify / merge context policies |
//! | [`llm`] | Chat-completion client |
//! | [`generator`] | Grounded answer generation |
//! | [`normalizer`] | Translation to English |
//! | [`history`] | Conversation persistence |
//! | [`session`] | One turn, end to end |
//! | [`extract`] | Text extraction from txt/md/pdf |
//! | [`library`] | Upload directory management |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Chunk vector index |
//! | [`commands`] | CLI command implementations |

pub mod assembler;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generator;
pub mod history;
pub mod index;
pub mod library;
pub mod llm;
pub mod models;
pub mod normalizer;
pub mod providers;
pub mod session;
