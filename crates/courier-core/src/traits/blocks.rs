// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Block-storage collaborator for note and prompt destinations.
//!
//! Note/prompt writes are pure data mutations against the workspace's
//! collaboration layer; no live session is involved.

use async_trait::async_trait;

use crate::error::CourierError;

/// Interface to the workspace block store.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Append text to a note-kind block.
    async fn append_note(
        &self,
        dashboard_id: &str,
        item_id: &str,
        text: &str,
    ) -> Result<(), CourierError>;

    /// Replace the content of a prompt-kind block.
    async fn replace_prompt(
        &self,
        dashboard_id: &str,
        item_id: &str,
        text: &str,
    ) -> Result<(), CourierError>;
}
