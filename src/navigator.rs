use std::sync::{Mutex, PoisonError};

/// Something which can move the user to another view.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Just logs where the user should go next. Good enough for a terminal.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        log::info!("Redirecting to {}", path);
    }
}

/// Remembers every navigation, in order.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self { RecordingNavigator::default() }

    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<String> { self.visited().pop() }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
