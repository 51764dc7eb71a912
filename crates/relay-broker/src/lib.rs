//! The subscription broker: a listener table keyed by an opaque id, each
//! holding an authenticated pubkey, a bounded push channel, and its own
//! subscription-id → filter map.
//!
//! Grounded on `rostra-util-dedup-chan`'s shape: a central table the sender
//! iterates, with per-subscriber channels the sender never blocks on. That
//! crate's semantics are a deduplicating multi-producer broadcast; this
//! broker instead needs drop-newest backpressure per listener, so the
//! channel primitive is a plain bounded `tokio::sync::mpsc` with
//! `try_send`, not the dedup queue.

use std::collections::HashMap;
use std::sync::RwLock;

use relay_core::{Event, EventId, Filter, PubKey};
use snafu::OptionExt as _;
use tracing::warn;

const LOG_TARGET: &str = "relay::broker";

/// Default bounded channel capacity per listener.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Opaque listener identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub String);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-assigned subscription identifier, scoped to one listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubId(pub String);

impl std::fmt::Display for SubId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What gets pushed to a listener's channel on a match.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub sub_id: SubId,
    pub event: Event,
}

struct Listener {
    pubkey: Option<PubKey>,
    sender: tokio::sync::mpsc::Sender<Delivery>,
    subscriptions: HashMap<SubId, Filter>,
}

/// Kinds treated as privileged for the purposes of the authentication gate
///: direct-message-shaped kinds whose
/// delivery must be restricted to a party actually named in the event.
/// NIP-04 legacy DMs (4), and the NIP-59 seal/gift-wrap pair (13, 1059)
/// used by NIP-17 DMs.
fn is_privileged_kind(kind: relay_core::EventKind) -> bool {
    matches!(kind.0, 4 | 13 | 1059)
}

/// True when `listener_pubkey` is allowed to receive `event` under the
/// privilege gate: either the event isn't privileged, or the listener is
/// the author or named in a `p` tag.
pub fn privilege_allows(event: &Event, listener_pubkey: Option<PubKey>) -> bool {
    if !is_privileged_kind(event.kind) {
        return true;
    }
    let Some(pubkey) = listener_pubkey else {
        return false;
    };
    if event.pubkey == pubkey {
        return true;
    }
    event.tags.values_of_letter(b'p').any(|v| v == pubkey.to_string())
}

#[derive(Debug, snafu::Snafu)]
pub enum BrokerError {
    #[snafu(display("listener {listener_id} is not registered"))]
    UnknownListener { listener_id: String },
}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// The broker owns the listener table; listeners never call back into the
/// broker during delivery.
#[derive(Default)]
pub struct Broker {
    listeners: RwLock<HashMap<ListenerId, Listener>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: re-registering an existing listener id replaces its
    /// pubkey and channel and drops any subscriptions from before.
    pub fn register(
        &self,
        listener_id: ListenerId,
        pubkey: Option<PubKey>,
        capacity: usize,
    ) -> tokio::sync::mpsc::Receiver<Delivery> {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity.max(1));
        let listener = Listener {
            pubkey,
            sender: tx,
            subscriptions: HashMap::new(),
        };
        self.listeners
            .write()
            .expect("poisoned lock")
            .insert(listener_id, listener);
        rx
    }

    /// Adds or replaces one filter on an already-registered listener.
    pub fn subscribe(&self, listener_id: &ListenerId, sub_id: SubId, filter: Filter) -> BrokerResult<()> {
        let mut listeners = self.listeners.write().expect("poisoned lock");
        let listener = listeners
            .get_mut(listener_id)
            .context(UnknownListenerSnafu { listener_id: listener_id.0.clone() })?;
        listener.subscriptions.insert(sub_id, filter);
        Ok(())
    }

    /// Removes one subscription; the listener itself survives.
    pub fn unsubscribe(&self, listener_id: &ListenerId, sub_id: &SubId) -> BrokerResult<()> {
        let mut listeners = self.listeners.write().expect("poisoned lock");
        let listener = listeners
            .get_mut(listener_id)
            .context(UnknownListenerSnafu { listener_id: listener_id.0.clone() })?;
        listener.subscriptions.remove(sub_id);
        Ok(())
    }

    /// Removes the listener and every one of its subscriptions.
    pub fn close(&self, listener_id: &ListenerId) {
        self.listeners.write().expect("poisoned lock").remove(listener_id);
    }

    pub fn is_registered(&self, listener_id: &ListenerId) -> bool {
        self.listeners.read().expect("poisoned lock").contains_key(listener_id)
    }

    /// Called after a successful save. Iterates every listener, matches
    /// each of its subscriptions against `event`, and pushes a
    /// non-blocking [`Delivery`] per match, subject to the privilege gate.
    pub fn deliver(&self, event: &Event) {
        let listeners = self.listeners.read().expect("poisoned lock");
        for (listener_id, listener) in listeners.iter() {
            if !privilege_allows(event, listener.pubkey) {
                continue;
            }
            for (sub_id, filter) in &listener.subscriptions {
                if !filter.matches(event) {
                    continue;
                }
                let delivery = Delivery {
                    sub_id: sub_id.clone(),
                    event: event.clone(),
                };
                if let Err(err) = listener.sender.try_send(delivery) {
                    warn!(
                        target: LOG_TARGET,
                        %listener_id,
                        %sub_id,
                        err = %err,
                        "dropped event for slow listener"
                    );
                }
            }
        }
    }

    /// Ids of every event this broker would currently deliver for at least
    /// one listener, used by callers that only need to know whether a save
    /// has live subscribers.
    pub fn matched_ids(&self, event: &Event) -> Vec<EventId> {
        let listeners = self.listeners.read().expect("poisoned lock");
        listeners
            .values()
            .filter(|l| privilege_allows(event, l.pubkey))
            .filter(|l| l.subscriptions.values().any(|f| f.matches(event)))
            .map(|_| event.id)
            .collect()
    }
}
