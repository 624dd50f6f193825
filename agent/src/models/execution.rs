//! Per-mower command execution bookkeeping

use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::action::MowerAction;

/// Automatic retries allowed beyond the original attempt
pub const MAX_COMMAND_RETRIES: u32 = 2;

/// Execution status of the last command sent to a mower
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Initiated,
    Done,
    Error,
}

/// Execution state of one mower
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionState {
    pub status: ExecutionStatus,

    /// Last action requested, parameters included
    pub last_action: Option<MowerAction>,

    pub retry_count: u32,
}

impl ExecutionState {
    /// Whether the retry pass should send `last_action` again
    pub fn is_retry_due(&self) -> bool {
        self.status == ExecutionStatus::Error
            && self.retry_count < MAX_COMMAND_RETRIES
            && self.last_action.is_some()
    }
}

/// Execution states keyed by mower name
#[derive(Debug, Default)]
pub struct ExecutionTracker {
    states: Mutex<HashMap<String, ExecutionState>>,
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle entry for a mower that has none yet
    pub fn ensure(&self, mower_name: &str) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.entry(mower_name.to_string()).or_default();
    }

    /// Record a freshly requested command
    pub fn begin(&self, mower_name: &str, action: MowerAction) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let state = states.entry(mower_name.to_string()).or_default();
        state.status = ExecutionStatus::Initiated;
        state.last_action = Some(action);
        state.retry_count = 0;
    }

    /// Record a command that completes without reaching the remote service
    pub fn skip(&self, mower_name: &str) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let state = states.entry(mower_name.to_string()).or_default();
        state.status = ExecutionStatus::Done;
        state.retry_count = 0;
    }

    pub fn mark_done(&self, mower_name: &str) {
        self.set_status(mower_name, ExecutionStatus::Done);
    }

    /// Record a failure eligible for automatic retries
    pub fn mark_failed(&self, mower_name: &str) {
        self.set_status(mower_name, ExecutionStatus::Error);
    }

    /// Record a failure that retrying cannot fix
    pub fn mark_failed_permanently(&self, mower_name: &str) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let state = states.entry(mower_name.to_string()).or_default();
        state.status = ExecutionStatus::Error;
        state.retry_count = MAX_COMMAND_RETRIES;
    }

    /// Move every failed command of the given mowers back to `Initiated`,
    /// returning the actions to send again
    pub fn take_due_retries<'a>(
        &self,
        mower_names: impl IntoIterator<Item = &'a str>,
    ) -> Vec<(String, MowerAction, u32)> {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let mut due = Vec::new();

        for name in mower_names {
            let Some(state) = states.get_mut(name) else {
                continue;
            };
            if !state.is_retry_due() {
                continue;
            }
            let Some(action) = state.last_action.clone() else {
                continue;
            };
            state.status = ExecutionStatus::Initiated;
            state.retry_count += 1;
            due.push((name.to_string(), action, state.retry_count));
        }

        due
    }

    pub fn get(&self, mower_name: &str) -> Option<ExecutionState> {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.get(mower_name).cloned()
    }

    fn set_status(&self, mower_name: &str, status: ExecutionStatus) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.entry(mower_name.to_string()).or_default().status = status;
    }
}
