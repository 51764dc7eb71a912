//! The query/subscription predicate.

use std::collections::BTreeMap;

use crate::event::{Event, EventKind, Timestamp};
use crate::id::{EventId, PubKey};

/// All fields are optional; an absent field imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub ids: Vec<EventId>,
    pub authors: Vec<PubKey>,
    pub kinds: Vec<EventKind>,
    /// single-byte tag key -> accepted values.
    pub tags: BTreeMap<u8, Vec<String>>,
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn since_or_min(&self) -> Timestamp {
        self.since.unwrap_or(Timestamp(0))
    }

    pub fn until_or_max(&self) -> Timestamp {
        self.until.unwrap_or(Timestamp::MAX)
    }

    /// True when the filter is an explicit by-id lookup: other fields are then ignored by the planner.
    pub fn is_by_id(&self) -> bool {
        !self.ids.is_empty()
    }

    /// Direct, in-memory predicate matching one event, used by the
    /// subscription broker and mirrored by the
    /// query engine's key-range planning.
    pub fn matches(&self, event: &Event) -> bool {
        if !self.ids.is_empty() && !self.ids.contains(&event.id) {
            return false;
        }
        if !self.authors.is_empty() && !self.authors.contains(&event.pubkey) {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
            return false;
        }
        if event.created_at < self.since_or_min() || event.created_at > self.until_or_max() {
            return false;
        }
        for (letter, accepted) in &self.tags {
            let matched = event
                .tags
                .values_of_letter(*letter)
                .any(|v| accepted.iter().any(|a| a == v));
            if !matched {
                return false;
            }
        }
        true
    }
}
