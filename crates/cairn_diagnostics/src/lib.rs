//! Diagnostic creation, severity management, and rendering.
//!
//! This crate provides structured [`Diagnostic`] messages keyed by the record
//! they were raised against. The thread-safe [`DiagnosticSink`] accumulates
//! them while a compilation session runs and decides whether the session may
//! continue; [`DiagnosticRenderer`] implementations format them for a terminal
//! or as JSON.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, JsonRenderer, RecordNames, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
