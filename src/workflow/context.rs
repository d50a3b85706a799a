use crate::routing::Route;

/// State shared between the steps of a single run.
///
/// A fresh context is created for every run and handed to each step's
/// executor in turn, so at most one step writes to it at any time.
#[derive(Debug, Default)]
pub struct WorkflowContext {
    /// Route produced by the most recent quote step of this run.
    pub last_quoted_route: Option<Route>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }
}
