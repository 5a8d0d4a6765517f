use std::cell::RefCell;

/// An observable engine event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    TypeRegistered { ty: crate::types::Type },
    TypeDestroyed { ty: crate::types::Type },
    FunctionEntered { name: String },
    FunctionLeft { name: String },
    BreakpointHit { line: usize },
    ModuleLoaded { name: String },
    ScriptCompiled { path: String },
}

/// Observes engine events.
///
/// Installed on the engine; never global. The engine only builds the
/// event payload when a tracer is interested, so the no-op tracer costs
/// nothing beyond a virtual call.
pub trait EngineTracer {
    /// Whether the tracer wants events at all.
    fn enabled(&self) -> bool {
        true
    }

    fn event(&self, event: TraceEvent);
}

/// The default tracer: drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl EngineTracer for NoopTracer {
    fn enabled(&self) -> bool {
        false
    }

    fn event(&self, _event: TraceEvent) {}
}

/// Collects every event, for tests and tooling.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: RefCell<Vec<TraceEvent>>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EngineTracer for RecordingTracer {
    fn event(&self, event: TraceEvent) {
        self.events.borrow_mut().push(event);
    }
}
