//! # Pulse Core
//!
//! Entity extraction, canonicalization and signal scoring for IPO news.
//!
//! This crate turns sentiment-scored news records into one ranked
//! APPLY / NEUTRAL / AVOID signal per company, combining sentiment,
//! consistency, buzz and trend.

pub mod aggregate;
pub mod canonical;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod signal;

pub use config::*;
pub use error::*;
pub use models::*;
pub use pipeline::{Pipeline, PipelineOutput};
