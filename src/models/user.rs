//! User and group records
//!
//! Users are identified by an opaque id and looked up by their unique display
//! name. Groups own an ordered, append-only member list.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{GroupId, UserId};

/// A registered person who can pay for or share in bills
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,

    /// Fields written by other tools, kept verbatim on re-save
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Create a new user with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// A set of users sharing expenses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,

    /// Members in the order they joined
    #[serde(default)]
    pub member_ids: Vec<UserId>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Group {
    /// Create a new group with a fresh id
    pub fn new(name: impl Into<String>, member_ids: Vec<UserId>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            member_ids,
            extra: Map::new(),
        }
    }

    /// Check if a user belongs to this group
    pub fn has_member(&self, user_id: &UserId) -> bool {
        self.member_ids.contains(user_id)
    }
}
