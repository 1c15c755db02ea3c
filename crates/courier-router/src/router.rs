// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps a normalized message to the subscriptions that should receive it.
//!
//! The routing key differs per platform: most route by channel id, the
//! team-scoped platforms additionally require a workspace key, Telegram
//! routes by the webhook id embedded in the request path, and WhatsApp
//! routes by the business number with an optional per-sender scope.
//! Missing scope is never guessed around; the router refuses to route.

use courier_core::{
    CourierError, NormalizedMessage, Provider, Subscription, SubscriptionStatus,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Envelope-level routing inputs that do not live in the message body.
#[derive(Debug, Clone, Default)]
pub struct RequestHints {
    /// Workspace scope from the request envelope (Slack `team_id`).
    pub team_id: Option<String>,
    /// Webhook id from the request path (Telegram per-subscription URLs).
    pub webhook_id: Option<String>,
}

/// One subscription matched to its own copy of the message.
///
/// Each match owns a clone because downstream enrichment mutates the
/// message with per-subscription credentials.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub subscription: Subscription,
    pub message: NormalizedMessage,
}

/// Select the active subscriptions that should receive `message`.
///
/// `candidates` is the set of stored subscriptions for `provider`; every
/// independent match is returned. An absent required scoping field is an
/// `Unroutable` error, which callers ack without buffering anything.
pub fn route(
    provider: Provider,
    message: &NormalizedMessage,
    hints: &RequestHints,
    candidates: &[Subscription],
) -> Result<Vec<RouteMatch>, CourierError> {
    let scope = Scope::extract(provider, message, hints)?;

    let matches: Vec<RouteMatch> = candidates
        .iter()
        .filter(|sub| sub.provider == provider && sub.status == SubscriptionStatus::Active)
        .filter(|sub| scope.matches(sub))
        .map(|sub| RouteMatch {
            subscription: sub.clone(),
            message: message.clone(),
        })
        .collect();

    debug!(
        provider = %provider,
        channel_id = %message.channel_id,
        matched = matches.len(),
        "routed inbound message"
    );
    Ok(matches)
}

/// Provider-specific routing key extracted from one inbound event.
enum Scope<'a> {
    /// Match on channel id alone.
    Channel { channel_id: &'a str },
    /// Match on (team, channel).
    TeamChannel {
        team_id: &'a str,
        channel_id: &'a str,
    },
    /// Match on the per-subscription webhook id, optionally narrowed to a
    /// chat scope stored on the subscription.
    Webhook {
        webhook_id: &'a str,
        chat_id: &'a str,
    },
    /// Match on the business number; a null chat scope on the subscription
    /// is a catch-all for any sender.
    BusinessNumber {
        business_number_id: &'a str,
        sender_id: &'a str,
    },
}

impl<'a> Scope<'a> {
    fn extract(
        provider: Provider,
        message: &'a NormalizedMessage,
        hints: &'a RequestHints,
    ) -> Result<Self, CourierError> {
        match provider {
            Provider::Slack => {
                let Some(team_id) = hints.team_id.as_deref().filter(|t| !t.is_empty()) else {
                    warn!(channel_id = %message.channel_id, "slack event without team id, refusing to route");
                    return Err(CourierError::Unroutable(
                        "slack event is missing its workspace id".into(),
                    ));
                };
                Ok(Scope::TeamChannel {
                    team_id,
                    channel_id: &message.channel_id,
                })
            }
            Provider::Mattermost => {
                let Some(team_id) = message
                    .metadata
                    .get("team_id")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                else {
                    warn!(channel_id = %message.channel_id, "mattermost payload without team id, refusing to route");
                    return Err(CourierError::Unroutable(
                        "mattermost payload is missing its team id".into(),
                    ));
                };
                Ok(Scope::TeamChannel {
                    team_id,
                    channel_id: &message.channel_id,
                })
            }
            Provider::Telegram => {
                let Some(webhook_id) = hints.webhook_id.as_deref().filter(|w| !w.is_empty())
                else {
                    return Err(CourierError::Unroutable(
                        "telegram request path carries no webhook id".into(),
                    ));
                };
                Ok(Scope::Webhook {
                    webhook_id,
                    chat_id: &message.channel_id,
                })
            }
            Provider::Whatsapp => {
                let Some(business_number_id) = message
                    .metadata
                    .get("business_number_id")
                    .and_then(Value::as_str)
                    .filter(|b| !b.is_empty())
                else {
                    return Err(CourierError::Unroutable(
                        "whatsapp payload is missing the business number id".into(),
                    ));
                };
                Ok(Scope::BusinessNumber {
                    business_number_id,
                    sender_id: &message.sender_id,
                })
            }
            Provider::Discord | Provider::Teams | Provider::Googlechat => Ok(Scope::Channel {
                channel_id: &message.channel_id,
            }),
        }
    }

    fn matches(&self, sub: &Subscription) -> bool {
        match self {
            Scope::Channel { channel_id } => sub.channel_id.as_deref() == Some(channel_id),
            Scope::TeamChannel {
                team_id,
                channel_id,
            } => {
                sub.team_id.as_deref() == Some(team_id)
                    && sub.channel_id.as_deref() == Some(channel_id)
            }
            Scope::Webhook {
                webhook_id,
                chat_id,
            } => {
                sub.webhook_id == *webhook_id
                    && match sub.chat_id.as_deref() {
                        Some(scoped) => scoped == *chat_id,
                        None => true,
                    }
            }
            Scope::BusinessNumber {
                business_number_id,
                sender_id,
            } => {
                sub.channel_id.as_deref() == Some(business_number_id)
                    && match sub.chat_id.as_deref() {
                        Some(scoped) => scoped == *sender_id,
                        None => true,
                    }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subscription(provider: Provider) -> Subscription {
        Subscription {
            id: "sub-1".into(),
            dashboard_id: "dash-1".into(),
            item_id: "item-1".into(),
            provider,
            channel_id: Some("C100".into()),
            chat_id: None,
            team_id: None,
            webhook_id: "wh-1".into(),
            webhook_secret: "secret".into(),
            access_token: None,
            status: SubscriptionStatus::Active,
            created_at: "2026-08-01T00:00:00Z".into(),
            updated_at: "2026-08-01T00:00:00Z".into(),
        }
    }

    fn message(channel_id: &str) -> NormalizedMessage {
        NormalizedMessage {
            platform_message_id: "m-1".into(),
            sender_id: "u-1".into(),
            sender_name: None,
            channel_id: channel_id.into(),
            channel_name: None,
            text: "hello".into(),
            metadata: json!({}),
        }
    }

    #[test]
    fn slack_requires_team_id() {
        let sub = {
            let mut s = subscription(Provider::Slack);
            s.team_id = Some("T1".into());
            s
        };
        let msg = message("C100");

        let err = route(Provider::Slack, &msg, &RequestHints::default(), &[sub.clone()]);
        assert!(matches!(err, Err(CourierError::Unroutable(_))));

        let hints = RequestHints {
            team_id: Some("T1".into()),
            webhook_id: None,
        };
        let matches = route(Provider::Slack, &msg, &hints, &[sub]).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn slack_same_channel_id_other_workspace_does_not_match() {
        let mut ours = subscription(Provider::Slack);
        ours.team_id = Some("T1".into());
        let mut theirs = subscription(Provider::Slack);
        theirs.id = "sub-2".into();
        theirs.team_id = Some("T2".into());

        let hints = RequestHints {
            team_id: Some("T2".into()),
            webhook_id: None,
        };
        let matches = route(Provider::Slack, &message("C100"), &hints, &[ours, theirs]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].subscription.id, "sub-2");
    }

    #[test]
    fn mattermost_team_comes_from_payload_metadata() {
        let mut sub = subscription(Provider::Mattermost);
        sub.team_id = Some("team-9".into());
        let mut msg = message("C100");
        msg.metadata = json!({"team_id": "team-9"});

        let matches =
            route(Provider::Mattermost, &msg, &RequestHints::default(), &[sub.clone()]).unwrap();
        assert_eq!(matches.len(), 1);

        let bare = message("C100");
        let err = route(Provider::Mattermost, &bare, &RequestHints::default(), &[sub]);
        assert!(matches!(err, Err(CourierError::Unroutable(_))));
    }

    #[test]
    fn telegram_routes_by_webhook_path() {
        let mut sub = subscription(Provider::Telegram);
        sub.chat_id = Some("-100555".into());
        let hints = RequestHints {
            team_id: None,
            webhook_id: Some("wh-1".into()),
        };

        let matches =
            route(Provider::Telegram, &message("-100555"), &hints, &[sub.clone()]).unwrap();
        assert_eq!(matches.len(), 1);

        // Same webhook, different chat: the chat scope narrows the match.
        let matches = route(Provider::Telegram, &message("-100999"), &hints, &[sub]).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn whatsapp_catch_all_and_specific_both_match() {
        let mut catch_all = subscription(Provider::Whatsapp);
        catch_all.channel_id = Some("biz-1".into());
        let mut specific = subscription(Provider::Whatsapp);
        specific.id = "sub-2".into();
        specific.channel_id = Some("biz-1".into());
        specific.chat_id = Some("15550102222".into());
        let mut other_sender = subscription(Provider::Whatsapp);
        other_sender.id = "sub-3".into();
        other_sender.channel_id = Some("biz-1".into());
        other_sender.chat_id = Some("15550109999".into());

        let mut msg = message("15550102222");
        msg.sender_id = "15550102222".into();
        msg.metadata = json!({"business_number_id": "biz-1"});

        let matches = route(
            Provider::Whatsapp,
            &msg,
            &RequestHints::default(),
            &[catch_all, specific, other_sender],
        )
        .unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.subscription.id.as_str()).collect();
        assert_eq!(ids, vec!["sub-1", "sub-2"]);
    }

    #[test]
    fn inactive_subscriptions_never_match() {
        let mut sub = subscription(Provider::Discord);
        sub.status = SubscriptionStatus::Pending;
        let matches = route(
            Provider::Discord,
            &message("C100"),
            &RequestHints::default(),
            &[sub],
        )
        .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn each_match_owns_its_message() {
        let a = subscription(Provider::Discord);
        let mut b = subscription(Provider::Discord);
        b.id = "sub-2".into();

        let mut matches = route(
            Provider::Discord,
            &message("C100"),
            &RequestHints::default(),
            &[a, b],
        )
        .unwrap();
        matches[0].message.sender_name = Some("resolved".into());
        assert!(matches[1].message.sender_name.is_none());
    }
}
