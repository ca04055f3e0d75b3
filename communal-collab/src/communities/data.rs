use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use communal_core::{DocumentPath, StoreResult};
use serde::{Deserialize, Serialize};

use crate::{CommunityName, UserId};

/// Who may view, post, and comment in a community
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyType {
    #[default]
    Public,
    Restricted,
    Private,
}

impl PrivacyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Restricted => "restricted",
            Self::Private => "private",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Public => "Anyone can view, post and comment to this community.",
            Self::Restricted => {
                "Anyone can view this community, but only approved users can post."
            }
            Self::Private => "Only approved users can view and submit to this community.",
        }
    }
}

impl Display for PrivacyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "restricted" => Ok(Self::Restricted),
            "private" => Ok(Self::Private),
            other => Err(format!("unknown privacy type {other:?}")),
        }
    }
}

/// A community as stored at `communities/{name}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRecord {
    pub creator_id: UserId,
    /// Assigned by the store when the community is committed
    pub created_at: DateTime<Utc>,
    pub number_of_members: u32,
    pub privacy_type: PrivacyType,
}

/// The fields of a community written on creation, `createdAt` is stamped by the store
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewCommunity<'a> {
    pub creator_id: &'a UserId,
    pub number_of_members: u32,
    pub privacy_type: PrivacyType,
}

/// Links a user to a community and their role in it.
/// Stored at `users/{userId}/communitySnippets/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipSnippet {
    pub community_id: CommunityName,
    pub is_moderator: bool,
}

/// A community together with its name
#[derive(Debug, Clone, PartialEq)]
pub struct Community {
    pub name: CommunityName,
    pub record: CommunityRecord,
}

impl CommunityRecord {
    pub fn path(name: &CommunityName) -> StoreResult<DocumentPath> {
        DocumentPath::new(["communities", name.as_str()])
    }
}

impl MembershipSnippet {
    pub fn path(user_id: &UserId, name: &CommunityName) -> StoreResult<DocumentPath> {
        DocumentPath::new([
            "users",
            user_id.as_str(),
            "communitySnippets",
            name.as_str(),
        ])
    }
}
