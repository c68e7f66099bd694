//! Tag compilation and cache linking.
//!
//! A [`RecordStore`] holds every compiled record of a map together with its
//! outgoing references. A [`CompileSession`] drives the store through the
//! link phases: class pre-hooks, deduplication and offset assignment,
//! class post-hooks, and finally reference patching into a [`LinkedBuffer`]
//! that starts with the target engine's cache header.
//!
//! Semantic problems are reported to the session's
//! [`DiagnosticSink`](cairn_diagnostics::DiagnosticSink) and fail the session
//! at the end of the phase that found them; structural problems are returned
//! as [`LinkError`].

#![warn(missing_docs)]

pub mod builtin;
pub mod error;
pub mod errors;
pub mod hooks;
pub mod layout;
pub mod link;
pub mod output;
pub mod record;
pub mod resources;
pub mod session;
pub mod store;

pub use error::LinkError;
pub use hooks::{HookTable, PostHook, PostHookContext, PreHook, PreHookContext};
pub use layout::Layout;
pub use link::LinkedBuffer;
pub use output::write_cache_file;
pub use record::{ClassId, Record, RefKind, RefTarget, Reference};
pub use resources::ResourceMaps;
pub use session::{CompileOutcome, CompileSession, SessionOptions, SessionState};
pub use store::{RecordStore, TagIndexEntry};
