//! Prompt-to-UI-spec generation service.
//!
//! A prompt goes through three oracle-backed stages (layout, content,
//! theme). The theme stage produces several competing candidates that are
//! scored by a fixed rubric; the winner is normalized and returned with
//! its generation metadata.

pub mod color;
pub mod config;
pub mod demo;
pub mod error;
pub mod events;
pub mod gemini;
pub mod lint;
pub mod metadata;
pub mod models;
pub mod oracle;
pub mod pipeline;
pub mod postprocess;
pub mod priors;
pub mod prompts;
pub mod routes;
pub mod seed;
pub mod stage;
pub mod validate;
