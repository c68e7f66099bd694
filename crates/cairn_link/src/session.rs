//! The compile session: one store driven through every link phase.

use crate::error::LinkError;
use crate::hooks::{HookTable, PostHookContext, PreHookContext};
use crate::layout::Layout;
use crate::link::{self, LinkedBuffer};
use crate::resources::ResourceMaps;
use crate::store::RecordStore;
use cairn_common::RecordId;
use cairn_config::ResolvedBuild;
use cairn_diagnostics::{Diagnostic, DiagnosticSink};
use cairn_map::{Engine, MapType};
use std::fmt;
use tracing::{debug, info_span, warn};

/// What the linked cache is built for.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// The target engine.
    pub engine: Engine,
    /// The scenario name written into the header.
    pub map_name: String,
    /// The build string written into the header.
    pub build_string: String,
    /// The kind of scenario.
    pub map_type: MapType,
    /// The largest linked cache allowed.
    pub max_file_size: u64,
    /// Whether warnings fail the session.
    pub deny_warnings: bool,
}

impl SessionOptions {
    /// Options for `engine` with its own size limit and no build string.
    pub fn new(engine: Engine, map_name: impl Into<String>) -> Self {
        Self {
            engine,
            map_name: map_name.into(),
            build_string: String::new(),
            map_type: MapType::default(),
            max_file_size: engine.max_cache_size(),
            deny_warnings: false,
        }
    }

    /// Options taken from a resolved `cairn.toml` build.
    pub fn from_build(build: &ResolvedBuild) -> Self {
        Self {
            engine: build.engine,
            map_name: build.map_name.clone(),
            build_string: build.build_string.clone(),
            map_type: build.map_type,
            max_file_size: build.max_file_size,
            deny_warnings: build.deny_warnings,
        }
    }
}

/// Where a session is in the link pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Records and tags are being added.
    Collecting,
    /// Every pre-hook has run.
    PreHooked,
    /// Records are deduplicated and placed.
    LaidOut,
    /// Every post-hook has run.
    PostHooked,
    /// The cache buffer is assembled.
    Linked,
    /// A phase reported a fatal diagnostic or a structural error.
    Failed,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Collecting => "collecting",
            SessionState::PreHooked => "pre-hooked",
            SessionState::LaidOut => "laid out",
            SessionState::PostHooked => "post-hooked",
            SessionState::Linked => "linked",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The result of [`CompileSession::compile`].
pub struct CompileOutcome {
    /// The linked cache, or `None` if a phase failed.
    pub buffer: Option<LinkedBuffer>,
    /// Every diagnostic reported, in order.
    pub diagnostics: Vec<Diagnostic>,
    /// The compiled store, for naming the records diagnostics point at.
    pub store: RecordStore,
}

impl fmt::Debug for CompileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOutcome")
            .field("buffer", &self.buffer)
            .field("diagnostics", &self.diagnostics)
            .field("records", &self.store.len())
            .finish()
    }
}

impl CompileOutcome {
    /// Returns `true` if a cache was produced.
    pub fn succeeded(&self) -> bool {
        self.buffer.is_some()
    }
}

/// Drives a [`RecordStore`] through pre-hooks, layout, post-hooks and
/// linking.
pub struct CompileSession {
    store: RecordStore,
    hooks: HookTable,
    resources: ResourceMaps,
    options: SessionOptions,
    sink: DiagnosticSink,
    state: SessionState,
    layout: Option<Layout>,
    buffer: Option<LinkedBuffer>,
}

impl CompileSession {
    /// Creates a session over `store`.
    pub fn new(store: RecordStore, hooks: HookTable, options: SessionOptions) -> Self {
        let sink = if options.deny_warnings {
            DiagnosticSink::deny_warnings()
        } else {
            DiagnosticSink::new()
        };
        Self {
            store,
            hooks,
            resources: ResourceMaps::new(),
            options,
            sink,
            state: SessionState::Collecting,
            layout: None,
            buffer: None,
        }
    }

    /// Sets the resource maps resource references resolve against.
    pub fn with_resources(mut self, resources: ResourceMaps) -> Self {
        self.resources = resources;
        self
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The record store, mutably. Only available while collecting.
    pub fn store_mut(&mut self) -> Result<&mut RecordStore, LinkError> {
        self.require_state(SessionState::Collecting, "add records")?;
        Ok(&mut self.store)
    }

    /// The session options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The diagnostics reported so far.
    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    /// The layout, once records are placed.
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    /// The linked cache, once linked.
    pub fn buffer(&self) -> Option<&LinkedBuffer> {
        self.buffer.as_ref()
    }

    fn require_state(&self, state: SessionState, operation: &'static str) -> Result<(), LinkError> {
        if self.state == state {
            Ok(())
        } else {
            Err(LinkError::InvalidPhase {
                operation,
                state: self.state.name(),
            })
        }
    }

    fn finish_phase(&mut self, next: SessionState) {
        if self.sink.has_fatal() {
            warn!(
                phase = %next,
                errors = self.sink.error_count(),
                warnings = self.sink.warning_count(),
                "phase failed"
            );
            self.state = SessionState::Failed;
        } else {
            self.state = next;
        }
    }

    /// Runs the pre-hook of every record in insertion order, including
    /// records added by earlier hooks.
    pub fn run_pre_hooks(&mut self) -> Result<(), LinkError> {
        self.require_state(SessionState::Collecting, "run pre-hooks")?;
        let mut ran = 0usize;
        let mut index = 0;
        while index < self.store.len() {
            let record = RecordId::from_raw(index as u32);
            index += 1;
            let Some(hook) = self.hooks.pre(self.store.get(record).class) else {
                continue;
            };
            let mut ctx = PreHookContext {
                record,
                store: &mut self.store,
                sink: &self.sink,
                engine: self.options.engine,
            };
            hook(&mut ctx);
            ran += 1;
        }
        debug!(records = self.store.len(), hooks = ran, "ran pre-hooks");
        self.finish_phase(SessionState::PreHooked);
        Ok(())
    }

    /// Deduplicates and places every record, then checks that every
    /// reference of a survivor can be patched.
    pub fn lay_out(&mut self) -> Result<(), LinkError> {
        self.require_state(SessionState::PreHooked, "lay out")?;
        let layout = match Layout::compute(&self.store, &self.sink, self.options.max_file_size) {
            Ok(layout) => layout,
            Err(err) => {
                warn!(error = %err, "layout failed");
                self.state = SessionState::Failed;
                return Err(err);
            }
        };
        link::check_references(
            &self.store,
            &layout,
            &self.resources,
            self.options.engine,
            &self.sink,
        );
        self.layout = Some(layout);
        self.finish_phase(SessionState::LaidOut);
        Ok(())
    }

    /// Runs the post-hook of every surviving record in insertion order.
    pub fn run_post_hooks(&mut self) -> Result<(), LinkError> {
        self.require_state(SessionState::LaidOut, "run post-hooks")?;
        let layout = self.laid_out()?;
        let mut ran = 0usize;
        for (record, data) in self.store.records() {
            if !layout.is_survivor(record) {
                continue;
            }
            let Some(hook) = self.hooks.post(data.class) else {
                continue;
            };
            let ctx = PostHookContext {
                record,
                store: &self.store,
                layout,
                sink: &self.sink,
                engine: self.options.engine,
            };
            hook(&ctx);
            ran += 1;
        }
        debug!(survivors = layout.order().len(), hooks = ran, "ran post-hooks");
        self.finish_phase(SessionState::PostHooked);
        Ok(())
    }

    /// Patches every reference and assembles the cache.
    pub fn link(&mut self) -> Result<&LinkedBuffer, LinkError> {
        self.require_state(SessionState::PostHooked, "link")?;
        let layout = self.laid_out()?;
        match link::link(&self.store, layout, &self.resources, &self.options) {
            Ok(buffer) => {
                self.state = SessionState::Linked;
                Ok(self.buffer.insert(buffer))
            }
            Err(err) => {
                self.state = SessionState::Failed;
                Err(err.into())
            }
        }
    }

    fn laid_out(&self) -> Result<&Layout, LinkError> {
        self.layout
            .as_ref()
            .ok_or_else(|| cairn_common::InternalError::new("no layout after lay_out").into())
    }

    /// Runs every remaining phase and returns the cache with every
    /// diagnostic. A phase that reports a fatal diagnostic stops the session
    /// without a buffer; structural errors are returned as `Err`.
    pub fn compile(mut self) -> Result<CompileOutcome, LinkError> {
        let span = info_span!(
            "compile",
            engine = %self.options.engine,
            map = %self.options.map_name,
            records = self.store.len(),
            tags = self.store.tag_count()
        );
        let _enter = span.enter();

        let phases: [fn(&mut Self) -> Result<(), LinkError>; 4] = [
            Self::run_pre_hooks,
            Self::lay_out,
            Self::run_post_hooks,
            |session| session.link().map(|_| ()),
        ];
        for phase in phases {
            if self.state == SessionState::Failed {
                break;
            }
            phase(&mut self)?;
        }

        if let Some(buffer) = &self.buffer {
            debug!(
                size = buffer.len(),
                warnings = self.sink.warning_count(),
                "compiled cache"
            );
        }
        Ok(CompileOutcome {
            buffer: self.buffer,
            diagnostics: self.sink.drain(),
            store: self.store,
        })
    }
}
