//! Hidden-page tracking

use std::cell::Cell;

/// Whether the page has been hidden during the current passive session
///
/// Becoming visible again does not clear the flag. Only a new manual
/// recording does, through [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct VisibilityGate {
    hidden: Cell<bool>,
}

impl VisibilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    /// The host reported the page as hidden
    pub fn mark_hidden(&self) {
        self.hidden.set(true);
    }

    /// A manual recording started
    pub fn reset(&self) {
        self.hidden.set(false);
    }
}
