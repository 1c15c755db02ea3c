// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable mock collaborators for exercising the delivery pipeline
//! without a live execution environment or block store.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use courier_core::{
    BlockStore, CourierError, ExecTarget, SessionAccess, SessionHandle, TerminalHandle,
};

/// In-memory [`ExecTarget`] that records every terminal write and can be
/// scripted to deny sessions or fail writes to specific terminals.
#[derive(Default)]
pub struct MockExecTarget {
    state: Mutex<ExecState>,
}

#[derive(Default)]
struct ExecState {
    deny_sessions: bool,
    running: bool,
    failing_terminals: HashSet<String>,
    writes: Vec<(String, String)>,
    wakes: Vec<String>,
}

impl MockExecTarget {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().running = true;
        mock
    }

    /// Deny all session requests from now on.
    pub fn deny_sessions(&self) {
        self.state.lock().unwrap().deny_sessions = true;
    }

    /// Make writes to the terminal resolved for `item_id` fail.
    pub fn fail_writes_to(&self, item_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_terminals
            .insert(item_id.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failing_terminals.clear();
    }

    pub fn set_running(&self, running: bool) {
        self.state.lock().unwrap().running = running;
    }

    /// Every `(terminal item id, text)` write so far, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Dashboards that had a session ensured, in order.
    pub fn wakes(&self) -> Vec<String> {
        self.state.lock().unwrap().wakes.clone()
    }
}

#[async_trait]
impl ExecTarget for MockExecTarget {
    async fn ensure_session(
        &self,
        dashboard_id: &str,
    ) -> Result<SessionAccess, CourierError> {
        let mut state = self.state.lock().unwrap();
        state.wakes.push(dashboard_id.to_string());
        if state.deny_sessions {
            return Ok(SessionAccess::Denied);
        }
        state.running = true;
        Ok(SessionAccess::Granted(SessionHandle(format!(
            "sess-{dashboard_id}"
        ))))
    }

    async fn resolve_terminal(
        &self,
        _session: &SessionHandle,
        item_id: &str,
    ) -> Result<TerminalHandle, CourierError> {
        Ok(TerminalHandle(item_id.to_string()))
    }

    async fn write_terminal(
        &self,
        handle: &TerminalHandle,
        text: &str,
    ) -> Result<(), CourierError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_terminals.contains(&handle.0) {
            return Err(CourierError::Delivery {
                message: format!("terminal {} unavailable", handle.0),
                source: None,
            });
        }
        state.writes.push((handle.0.clone(), text.to_string()));
        Ok(())
    }

    async fn is_running(&self, _dashboard_id: &str) -> Result<bool, CourierError> {
        Ok(self.state.lock().unwrap().running)
    }
}

/// In-memory [`BlockStore`] recording note appends and prompt replacements.
#[derive(Default)]
pub struct MockBlockStore {
    notes: Mutex<Vec<(String, String, String)>>,
    prompts: Mutex<Vec<(String, String, String)>>,
    failing_items: Mutex<HashSet<String>>,
}

impl MockBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_to(&self, item_id: &str) {
        self.failing_items.lock().unwrap().insert(item_id.to_string());
    }

    /// `(dashboard_id, item_id, text)` per note append, in order.
    pub fn notes(&self) -> Vec<(String, String, String)> {
        self.notes.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<(String, String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockStore for MockBlockStore {
    async fn append_note(
        &self,
        dashboard_id: &str,
        item_id: &str,
        text: &str,
    ) -> Result<(), CourierError> {
        if self.failing_items.lock().unwrap().contains(item_id) {
            return Err(CourierError::Delivery {
                message: format!("note {item_id} unavailable"),
                source: None,
            });
        }
        self.notes.lock().unwrap().push((
            dashboard_id.to_string(),
            item_id.to_string(),
            text.to_string(),
        ));
        Ok(())
    }

    async fn replace_prompt(
        &self,
        dashboard_id: &str,
        item_id: &str,
        text: &str,
    ) -> Result<(), CourierError> {
        if self.failing_items.lock().unwrap().contains(item_id) {
            return Err(CourierError::Delivery {
                message: format!("prompt {item_id} unavailable"),
                source: None,
            });
        }
        self.prompts.lock().unwrap().push((
            dashboard_id.to_string(),
            item_id.to_string(),
            text.to_string(),
        ));
        Ok(())
    }
}
