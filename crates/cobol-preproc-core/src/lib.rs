//! Shared foundation types for the COBOL preprocessing front end.
//!
//! - **Source location tracking**: [`Span`], [`FileId`]
//! - **Text normalization**: [`normalize_line_endings`], [`LineIndex`]
//!
//! # Design Principles
//!
//! - **Zero dependencies**: this crate contains only plain Rust types.
//!   The engine crate adds `thiserror`/`serde`/`tracing` on top.
//! - **Shared, not prescriptive**: these types carry no preprocessing
//!   semantics of their own; the engine decides what a span means.

mod span;
mod text;

pub use span::{FileId, Span};
pub use text::{normalize_line_endings, LineIndex};
