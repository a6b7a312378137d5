use std::fmt;

/// Stage of a capture session a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Resolving,
    Downloading,
    Assembling,
    Done,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Resolving => "resolving",
            Phase::Downloading => "downloading",
            Phase::Assembling => "assembling",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Segments attempted so far, successful or not
    pub completed: usize,
    pub total: usize,
    pub phase: Phase,
    /// Status line, or the failure message of a `Failed` event
    pub detail: Option<String>,
}

impl ProgressEvent {
    pub fn new(phase: Phase, completed: usize, total: usize) -> Self {
        Self {
            completed,
            total,
            phase,
            detail: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            completed: 0,
            total: 0,
            phase: Phase::Failed,
            detail: Some(message.into()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Rounded completion percentage, clamped to 100.
    pub fn percent(&self) -> u8 {
        if self.phase == Phase::Done {
            return 100;
        }
        if self.total == 0 {
            return 0;
        }
        let ratio = self.completed as f64 / self.total as f64;
        (ratio * 100.0).round().min(100.0) as u8
    }
}

/// Receiver of progress events.
///
/// Called from whichever task finishes a stage, so implementations must be
/// thread-safe.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Forwards events into an unbounded channel, preserving emission order.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub tokio::sync::mpsc::UnboundedSender<ProgressEvent>);

impl ProgressSink for ChannelSink {
    fn on_progress(&self, event: ProgressEvent) {
        // A closed receiver only means nobody is listening anymore.
        let _ = self.0.send(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn on_progress(&self, _event: ProgressEvent) {}
}
