// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier delivery pipeline.
//!
//! This crate provides the canonical message/subscription/buffer types, the
//! error type, and the trait seams for external collaborators. Every other
//! Courier crate depends on these definitions and nothing platform-specific.

pub mod error;
pub mod traits;
pub mod types;

pub use error::CourierError;
pub use types::{
    BufferStatus, BufferedMessage, ChannelFilter, ChannelFilterMode, Destination, DestinationKind,
    MessagingPolicy, NormalizedMessage, Provider, SenderFilter, SenderFilterMode, Subscription,
    SubscriptionStatus,
};

pub use traits::{BlockStore, ExecTarget, ItemGraph, SessionAccess, SessionHandle, TerminalHandle};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn courier_error_has_all_variants() {
        let _config = CourierError::Config("test".into());
        let _storage = CourierError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _unroutable = CourierError::Unroutable("no team scope".into());
        let _delivery = CourierError::Delivery {
            message: "test".into(),
            source: None,
        };
        let _registration = CourierError::Registration {
            message: "test".into(),
            source: None,
        };
        let _internal = CourierError::Internal("test".into());
    }

    #[test]
    fn trait_objects_are_constructible() {
        fn _assert_exec<T: ExecTarget>() {}
        fn _assert_blocks<T: BlockStore>() {}
        fn _assert_graph<T: ItemGraph>() {}
    }
}
