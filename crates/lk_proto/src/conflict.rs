//! Three-way conflict model.
//!
//! A conflict is divergence from a common ancestor: `base` is the last
//! mutually-acknowledged state, `local` and `remote` are its two
//! independently mutated descendants. Resolution is ALWAYS explicit —
//! silent content loss is unacceptable in a messaging context, so there is
//! no last-write-wins path anywhere in this model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One snapshot of a conflicted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityVersion {
    pub content: String,
    pub updated_at: DateTime<Utc>,
    pub author: String,
}

/// What kind of entity diverged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictEntity {
    Message,
    Profile,
}

impl ConflictEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Profile => "profile",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(Self::Message),
            "profile" => Some(Self::Profile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    #[default]
    Pending,
    Resolved,
}

impl ConflictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

/// The user's decision when resolving.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictChoice {
    KeepLocal,
    KeepRemote,
}

/// A recorded divergence awaiting explicit resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub id: String,
    pub entity_type: ConflictEntity,
    pub entity_id: String,
    pub base_version: EntityVersion,
    pub local_version: EntityVersion,
    pub remote_version: EntityVersion,
    pub status: ConflictStatus,
    pub created_at: DateTime<Utc>,
}

impl ConflictInfo {
    pub fn new(
        entity_type: ConflictEntity,
        entity_id: impl Into<String>,
        base_version: EntityVersion,
        local_version: EntityVersion,
        remote_version: EntityVersion,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entity_type,
            entity_id: entity_id.into(),
            base_version,
            local_version,
            remote_version,
            status: ConflictStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// The version the given choice selects.
    pub fn chosen(&self, choice: ConflictChoice) -> &EntityVersion {
        match choice {
            ConflictChoice::KeepLocal => &self.local_version,
            ConflictChoice::KeepRemote => &self.remote_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(content: &str, author: &str) -> EntityVersion {
        EntityVersion {
            content: content.into(),
            updated_at: Utc::now(),
            author: author.into(),
        }
    }

    #[test]
    fn chosen_picks_the_right_side() {
        let c = ConflictInfo::new(
            ConflictEntity::Message,
            "m1",
            version("base", "alice"),
            version("local edit", "alice"),
            version("remote edit", "bob"),
        );
        assert_eq!(c.chosen(ConflictChoice::KeepLocal).content, "local edit");
        assert_eq!(c.chosen(ConflictChoice::KeepRemote).content, "remote edit");
        assert_eq!(c.status, ConflictStatus::Pending);
    }
}
