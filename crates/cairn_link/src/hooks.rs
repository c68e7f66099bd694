//! Per-class hooks run before and after layout.
//!
//! A pre-hook may change its record (fields, references) and add records to
//! the store. A post-hook sees the final layout through shared borrows only,
//! so it can report diagnostics but cannot move anything.

use crate::error::LinkError;
use crate::layout::Layout;
use crate::record::{ClassId, Record};
use crate::store::RecordStore;
use cairn_common::RecordId;
use cairn_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use cairn_map::Engine;
use std::collections::HashMap;

/// Everything a pre-hook may look at and change.
pub struct PreHookContext<'a> {
    /// The record the hook runs for.
    pub record: RecordId,
    /// The whole store, mutable.
    pub store: &'a mut RecordStore,
    /// Where diagnostics go.
    pub sink: &'a DiagnosticSink,
    /// The target engine.
    pub engine: Engine,
}

impl PreHookContext<'_> {
    /// The record the hook runs for.
    pub fn record(&self) -> &Record {
        self.store.get(self.record)
    }

    /// The record the hook runs for, mutably.
    pub fn record_mut(&mut self) -> &mut Record {
        self.store.get_mut(self.record)
    }

    /// Reports an error against the hooked record.
    pub fn error(&self, code: DiagnosticCode, message: impl Into<String>) {
        self.sink.emit(Diagnostic::error(code, message, Some(self.record)));
    }

    /// Reports a warning against the hooked record.
    pub fn warning(&self, code: DiagnosticCode, message: impl Into<String>) {
        self.sink.emit(Diagnostic::warning(code, message, Some(self.record)));
    }
}

/// Everything a post-hook may look at.
pub struct PostHookContext<'a> {
    /// The record the hook runs for (always a survivor).
    pub record: RecordId,
    /// The whole store.
    pub store: &'a RecordStore,
    /// Final offsets and canonical ids.
    pub layout: &'a Layout,
    /// Where diagnostics go.
    pub sink: &'a DiagnosticSink,
    /// The target engine.
    pub engine: Engine,
}

impl PostHookContext<'_> {
    /// The record the hook runs for.
    pub fn record(&self) -> &Record {
        self.store.get(self.record)
    }

    /// Follows a reference field to the surviving target record.
    pub fn resolve_pointer(
        &self,
        base: RecordId,
        field_offset: usize,
    ) -> Result<Option<RecordId>, LinkError> {
        Ok(self
            .store
            .resolve_pointer(base, field_offset)?
            .map(|target| self.layout.canonical(target)))
    }

    /// The final file offset of `id`.
    pub fn offset_of(&self, id: RecordId) -> Option<u64> {
        self.layout.offset(id)
    }

    /// Reports an error against the hooked record.
    pub fn error(&self, code: DiagnosticCode, message: impl Into<String>) {
        self.sink.emit(Diagnostic::error(code, message, Some(self.record)));
    }

    /// Reports a warning against the hooked record.
    pub fn warning(&self, code: DiagnosticCode, message: impl Into<String>) {
        self.sink.emit(Diagnostic::warning(code, message, Some(self.record)));
    }
}

/// A hook run before layout.
pub type PreHook = fn(&mut PreHookContext<'_>);

/// A hook run after layout.
pub type PostHook = fn(&PostHookContext<'_>);

#[derive(Clone, Copy, Default)]
struct ClassHooks {
    pre: Option<PreHook>,
    post: Option<PostHook>,
}

/// Maps class ids to their hooks.
#[derive(Clone, Default)]
pub struct HookTable {
    classes: HashMap<ClassId, ClassHooks>,
}

impl HookTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the built-in hooks.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        crate::builtin::register(&mut table);
        table
    }

    /// Registers hooks for `class`. `None` leaves that phase's existing hook
    /// in place.
    pub fn register(&mut self, class: ClassId, pre: Option<PreHook>, post: Option<PostHook>) {
        let hooks = self.classes.entry(class).or_default();
        if pre.is_some() {
            hooks.pre = pre;
        }
        if post.is_some() {
            hooks.post = post;
        }
    }

    /// The pre-hook for `class`.
    pub fn pre(&self, class: ClassId) -> Option<PreHook> {
        self.classes.get(&class).and_then(|h| h.pre)
    }

    /// The post-hook for `class`.
    pub fn post(&self, class: ClassId) -> Option<PostHook> {
        self.classes.get(&class).and_then(|h| h.post)
    }
}
