// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Policy evaluation and the per-destination decision.

use courier_core::{
    BufferedMessage, ChannelFilterMode, CourierError, Destination, ItemGraph, MessagingPolicy,
    Provider, SenderFilterMode,
};
use tracing::debug;

/// Outcome of authorizing one destination for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Deliver,
    Deny,
    /// A policy-gated destination with no policy configured yet. Not an
    /// explicit denial: callers release the message back to the buffer so
    /// it delivers once configuration completes, bounded by the TTL.
    NotConfigured,
}

/// Authorize `destination` for `message`, re-reading graph and policy live.
///
/// Policy state at buffer time is deliberately ignored; a policy edited
/// between ingestion and delivery applies to every remaining attempt.
pub async fn destination_decision(
    graph: &dyn ItemGraph,
    provider: Provider,
    source_item_id: &str,
    destination: &Destination,
    message: &BufferedMessage,
) -> Result<Decision, CourierError> {
    if !graph.has_edge(source_item_id, &destination.item_id).await? {
        return Ok(Decision::Deny);
    }
    if !provider.is_policy_gated() {
        return Ok(Decision::Deliver);
    }
    match graph.policy(&destination.item_id).await? {
        Some(policy) => Ok(evaluate(&policy, message)),
        None => {
            debug!(
                item_id = %destination.item_id,
                "policy-gated destination has no policy yet"
            );
            Ok(Decision::NotConfigured)
        }
    }
}

/// Evaluate a messaging policy against a buffered message.
pub fn evaluate(policy: &MessagingPolicy, message: &BufferedMessage) -> Decision {
    if !policy.can_receive {
        return Decision::Deny;
    }
    if !channel_allowed(policy, message) {
        return Decision::Deny;
    }
    if !sender_allowed(policy, message) {
        return Decision::Deny;
    }
    Decision::Deliver
}

/// Lowercase and strip a leading `#` so `#Releases`, `releases` and
/// `Releases` all compare equal.
fn canonical(identifier: &str) -> String {
    identifier.trim().trim_start_matches('#').to_lowercase()
}

fn channel_allowed(policy: &MessagingPolicy, message: &BufferedMessage) -> bool {
    let filter = &policy.channel_filter;
    if filter.mode == ChannelFilterMode::All {
        return true;
    }

    // Policies may be authored with ids or names in either list, so the
    // message's id and name are both checked against the union.
    let configured: Vec<String> = filter
        .channel_ids
        .iter()
        .chain(filter.channel_names.iter())
        .map(|entry| canonical(entry))
        .collect();

    let id = canonical(&message.channel_id);
    if configured.iter().any(|entry| *entry == id) {
        return true;
    }
    if let Some(name) = &message.channel_name {
        let name = canonical(name);
        if configured.iter().any(|entry| *entry == name) {
            return true;
        }
    }
    false
}

fn sender_allowed(policy: &MessagingPolicy, message: &BufferedMessage) -> bool {
    let filter = &policy.sender_filter;
    if filter.mode == SenderFilterMode::All {
        return true;
    }

    let configured: Vec<String> = filter
        .user_ids
        .iter()
        .chain(filter.user_names.iter())
        .map(|entry| canonical(entry))
        .collect();

    let id = canonical(&message.sender_id);
    let mut matched = configured.iter().any(|entry| *entry == id);
    if !matched {
        if let Some(name) = &message.sender_name {
            let name = canonical(name);
            matched = configured.iter().any(|entry| *entry == name);
        }
    }

    match filter.mode {
        SenderFilterMode::Allowlist => matched,
        SenderFilterMode::Blocklist => !matched,
        SenderFilterMode::All => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::{BufferStatus, ChannelFilter, DestinationKind, SenderFilter};
    use std::collections::HashMap;

    fn message() -> BufferedMessage {
        BufferedMessage {
            id: "buf-1".into(),
            subscription_id: "sub-1".into(),
            dashboard_id: "dash-1".into(),
            item_id: "item-1".into(),
            provider: Provider::Telegram,
            platform_message_id: "m-1".into(),
            sender_id: "42".into(),
            sender_name: Some("Nadia".into()),
            channel_id: "-100123".into(),
            channel_name: Some("#Releases".into()),
            text: "ship it".into(),
            metadata: None,
            status: BufferStatus::Delivering,
            delivery_attempts: 1,
            claimed_at: Some("2026-08-31T10:00:00Z".into()),
            delivered_targets: vec![],
            created_at: "2026-08-31T09:59:00Z".into(),
            expires_at: "2026-09-01T09:59:00Z".into(),
        }
    }

    fn open_policy() -> MessagingPolicy {
        MessagingPolicy {
            can_receive: true,
            channel_filter: ChannelFilter::default(),
            sender_filter: SenderFilter::default(),
        }
    }

    #[test]
    fn can_receive_false_denies_everything() {
        let policy = MessagingPolicy {
            can_receive: false,
            ..open_policy()
        };
        assert_eq!(evaluate(&policy, &message()), Decision::Deny);
    }

    #[test]
    fn channel_allowlist_matches_name_case_insensitively() {
        let mut policy = open_policy();
        policy.channel_filter = ChannelFilter {
            mode: ChannelFilterMode::Allowlist,
            channel_ids: vec![],
            channel_names: vec!["releases".into()],
        };
        assert_eq!(evaluate(&policy, &message()), Decision::Deliver);
    }

    #[test]
    fn channel_allowlist_cross_checks_id_against_name_list() {
        let mut policy = open_policy();
        // Author put the raw channel id into the names list.
        policy.channel_filter = ChannelFilter {
            mode: ChannelFilterMode::Allowlist,
            channel_ids: vec![],
            channel_names: vec!["-100123".into()],
        };
        assert_eq!(evaluate(&policy, &message()), Decision::Deliver);

        // And the name into the ids list.
        policy.channel_filter = ChannelFilter {
            mode: ChannelFilterMode::Allowlist,
            channel_ids: vec!["#releases".into()],
            channel_names: vec![],
        };
        assert_eq!(evaluate(&policy, &message()), Decision::Deliver);
    }

    #[test]
    fn channel_allowlist_denies_when_nothing_matches() {
        let mut policy = open_policy();
        policy.channel_filter = ChannelFilter {
            mode: ChannelFilterMode::Allowlist,
            channel_ids: vec!["C999".into()],
            channel_names: vec!["ops".into()],
        };
        assert_eq!(evaluate(&policy, &message()), Decision::Deny);
    }

    #[test]
    fn sender_allowlist_and_blocklist() {
        let mut policy = open_policy();
        policy.sender_filter = SenderFilter {
            mode: SenderFilterMode::Allowlist,
            user_ids: vec!["42".into()],
            user_names: vec![],
        };
        assert_eq!(evaluate(&policy, &message()), Decision::Deliver);

        policy.sender_filter.mode = SenderFilterMode::Blocklist;
        assert_eq!(evaluate(&policy, &message()), Decision::Deny);

        policy.sender_filter = SenderFilter {
            mode: SenderFilterMode::Blocklist,
            user_ids: vec![],
            user_names: vec!["NADIA".into()],
        };
        assert_eq!(evaluate(&policy, &message()), Decision::Deny);

        policy.sender_filter = SenderFilter {
            mode: SenderFilterMode::Allowlist,
            user_ids: vec!["other".into()],
            user_names: vec![],
        };
        assert_eq!(evaluate(&policy, &message()), Decision::Deny);
    }

    struct FakeGraph {
        edges: Vec<(String, String)>,
        policies: HashMap<String, MessagingPolicy>,
    }

    #[async_trait]
    impl ItemGraph for FakeGraph {
        async fn has_edge(&self, from: &str, to: &str) -> Result<bool, CourierError> {
            Ok(self
                .edges
                .iter()
                .any(|(f, t)| f == from && t == to))
        }
        async fn destinations(&self, _item_id: &str) -> Result<Vec<Destination>, CourierError> {
            Ok(vec![])
        }
        async fn policy(&self, item_id: &str) -> Result<Option<MessagingPolicy>, CourierError> {
            Ok(self.policies.get(item_id).cloned())
        }
    }

    #[tokio::test]
    async fn edge_based_provider_skips_policy_lookup() {
        let graph = FakeGraph {
            edges: vec![("item-1".into(), "term-1".into())],
            policies: HashMap::new(),
        };
        let dest = Destination {
            item_id: "term-1".into(),
            kind: DestinationKind::Terminal,
        };
        let mut msg = message();
        msg.provider = Provider::Slack;

        let decision = destination_decision(&graph, Provider::Slack, "item-1", &dest, &msg)
            .await
            .unwrap();
        assert_eq!(decision, Decision::Deliver);
    }

    #[tokio::test]
    async fn missing_edge_denies_even_with_permissive_policy() {
        let mut policies = HashMap::new();
        policies.insert("term-1".to_string(), open_policy());
        let graph = FakeGraph {
            edges: vec![],
            policies,
        };
        let dest = Destination {
            item_id: "term-1".into(),
            kind: DestinationKind::Terminal,
        };

        let decision =
            destination_decision(&graph, Provider::Telegram, "item-1", &dest, &message())
                .await
                .unwrap();
        assert_eq!(decision, Decision::Deny);
    }

    #[tokio::test]
    async fn unconfigured_policy_is_not_a_denial() {
        let graph = FakeGraph {
            edges: vec![("item-1".into(), "term-1".into())],
            policies: HashMap::new(),
        };
        let dest = Destination {
            item_id: "term-1".into(),
            kind: DestinationKind::Terminal,
        };

        let decision =
            destination_decision(&graph, Provider::Telegram, "item-1", &dest, &message())
                .await
                .unwrap();
        assert_eq!(decision, Decision::NotConfigured);
    }

    #[tokio::test]
    async fn policies_are_independent_per_destination() {
        let mut policies = HashMap::new();
        policies.insert("open".to_string(), open_policy());
        let mut strict = open_policy();
        strict.sender_filter = SenderFilter {
            mode: SenderFilterMode::Allowlist,
            user_ids: vec!["someone-else".into()],
            user_names: vec![],
        };
        policies.insert("strict".to_string(), strict);
        let graph = FakeGraph {
            edges: vec![
                ("item-1".into(), "open".into()),
                ("item-1".into(), "strict".into()),
            ],
            policies,
        };
        let msg = message();

        let open_dest = Destination {
            item_id: "open".into(),
            kind: DestinationKind::Note,
        };
        let strict_dest = Destination {
            item_id: "strict".into(),
            kind: DestinationKind::Note,
        };

        let open_decision =
            destination_decision(&graph, Provider::Telegram, "item-1", &open_dest, &msg)
                .await
                .unwrap();
        let strict_decision =
            destination_decision(&graph, Provider::Telegram, "item-1", &strict_dest, &msg)
                .await
                .unwrap();
        assert_eq!(open_decision, Decision::Deliver);
        assert_eq!(strict_decision, Decision::Deny);
    }
}
