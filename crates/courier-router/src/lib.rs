// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription routing for Courier.

pub mod router;

pub use router::{route, RequestHints, RouteMatch};
