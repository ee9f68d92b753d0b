//! Container format detection and zip header extensions.
//!
//! - [`detect`] identifies the outer compression filter and container format
//!   of a source file from its signature bytes.
//! - [`extra`] encodes and decodes the zip extra fields that carry Unix
//!   metadata (modification time, ownership) the base zip header lacks.

pub mod detect;
pub mod extra;

pub use detect::{ContainerFormat, Detected, Filter, detect_format};
