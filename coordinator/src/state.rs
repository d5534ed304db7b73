use std::sync::Arc;

use crate::scheduler::Scheduler;

/// Estado compartido por los handlers HTTP.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }
}
