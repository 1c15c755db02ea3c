// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams for the external collaborators of the pipeline: execution
//! environment, block storage, destination-authorization graph. Only the
//! interface boundary is defined here; implementations live elsewhere.

pub mod blocks;
pub mod exec;
pub mod graph;

pub use blocks::BlockStore;
pub use exec::{ExecTarget, SessionAccess, SessionHandle, TerminalHandle};
pub use graph::ItemGraph;
