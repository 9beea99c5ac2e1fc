//! Progress reporting.

/// Receiver of progress updates during a pass.
///
/// The phase text is updated before each unit of table work and the
/// percentage is incremented once after it.
pub trait Progress {
    /// Describes the work about to start.
    fn set_phase_text(&mut self, text: &str);

    /// Sets the number of increments that make up 100%.
    fn set_percent_max(&mut self, max: usize);

    /// Advances by one increment.
    fn inc_percent(&mut self);
}

/// Progress sink that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn set_phase_text(&mut self, _text: &str) {}

    fn set_percent_max(&mut self, _max: usize) {}

    fn inc_percent(&mut self) {}
}
