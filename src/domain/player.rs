// Roster entry for one participant.

use crate::domain::card::Card;
use std::fmt;
use std::sync::Arc;

/// Opaque server-generated identity, stable across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerId(Arc<str>);

impl PlayerId {
    pub fn generate() -> Self {
        PlayerId(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    /// Rebuilds an identity from the token a reconnecting client presents.
    pub fn from_token(token: &str) -> Self {
        PlayerId(Arc::from(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    /// Multiset of held cards; order is irrelevant to the rules but
    /// preserved for display.
    pub hand: Vec<Card>,
    /// Eliminated players stay in the roster outside the turn rotation.
    pub spectating: bool,
}

impl Player {
    pub fn new(username: String, spectating: bool) -> Self {
        Self {
            id: PlayerId::generate(),
            username,
            hand: Vec::new(),
            spectating,
        }
    }
}
