// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and serializes its work
//! through the single writer connection.

pub mod buffer;
pub mod graph;
pub mod subscriptions;
