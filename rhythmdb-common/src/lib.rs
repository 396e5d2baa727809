//! # RhythmDB Common Library
//!
//! Shared code for the RhythmDB analysis pipeline:
//! - Data model shared by every phase (technical/creative/instrumentation facts,
//!   track records, the main and criteria stores)
//! - The closed taxonomies the creative and instrumentation phases normalize into
//! - Progress event vocabulary and broadcast bus used to drive the UI
//! - Configuration loading (CLI → env → TOML → default)
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod taxonomy;

pub use error::{Error, Result};
