//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use chrono::{DateTime, Utc};
use communal_collab::{
    greeting, Community as CollabCommunity, PrivacyType, SessionData, UserData,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: String,
    email: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    expires_at: DateTime<Utc>,
    user: User,
    /// A friendly message to show after signing in
    greeting: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    name: String,
    creator_id: String,
    created_at: DateTime<Utc>,
    number_of_members: u32,
    privacy_type: PrivacyType,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id.to_string(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            expires_at: self.expires_at,
            user: self.user.to_serialized(),
            greeting: greeting(&self.user.email),
        }
    }
}

impl ToSerialized<Community> for CollabCommunity {
    fn to_serialized(&self) -> Community {
        Community {
            name: self.name.to_string(),
            creator_id: self.record.creator_id.to_string(),
            created_at: self.record.created_at,
            number_of_members: self.record.number_of_members,
            privacy_type: self.record.privacy_type,
        }
    }
}
