//! Points where the controller hands control to the embedding UI.

/// Blocking indicator shown while the startup pull runs.
pub trait LoadingIndicator: Send + Sync {
    fn show(&self, message: &str);
    fn hide(&self);
}

/// Indicator that displays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndicator;

impl LoadingIndicator for NoopIndicator {
    fn show(&self, _message: &str) {}
    fn hide(&self) {}
}

/// Answers "Replace local data with cloud data?" for interactive pulls.
pub trait ConfirmOverwrite: Send + Sync {
    fn confirm_replace(&self) -> bool;
}

/// Fixed answer, for tests and non-interactive front ends.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl ConfirmOverwrite for AutoConfirm {
    fn confirm_replace(&self) -> bool {
        self.0
    }
}
