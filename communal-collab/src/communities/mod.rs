mod data;
mod name;

pub use data::*;
pub use name::*;

use communal_core::{Document, DocumentStore, StoreError};
use log::{debug, warn};
use thiserror::Error;

use crate::{CollabContext, CollabEvent, IdentityProvider, UserId};

/// Registers communities, together with a moderator membership for their creator.
pub struct Registrar<Db: ?Sized> {
    context: CollabContext<Db>,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Community names must be between 3-21 characters, and can only contain letters, numbers and underscores ({0})")]
    InvalidName(#[from] InvalidName),
    #[error("You must be signed in to create a community")]
    Unauthenticated,
    #[error("Sorry, r/{0} is taken. Try another!")]
    NameTaken(CommunityName),
    /// Another registration committed first, running the whole operation again may succeed
    #[error("Another registration happened at the same time, please try again")]
    ConflictRetryable,
    #[error("Communities are unavailable right now: {0}")]
    StoreUnavailable(String),
    /// Stored data could not be encoded or decoded
    #[error(transparent)]
    Store(StoreError),
}

impl RegistrationError {
    /// Whether running the same registration again could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictRetryable | Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for RegistrationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict => Self::ConflictRetryable,
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
            e => Self::Store(e),
        }
    }
}

impl<Db> Registrar<Db>
where
    Db: DocumentStore + ?Sized,
{
    pub fn new(context: &CollabContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Registers a community named `name`, created by `requesting_user`.
    ///
    /// The name is validated before the store is touched. The availability check and both
    /// writes happen in one transaction, so either the community and its creator's moderator
    /// snippet both exist afterwards, or neither does. No retries are made.
    pub async fn register_community(
        &self,
        name: &str,
        privacy_type: PrivacyType,
        requesting_user: Option<&UserId>,
    ) -> Result<Community, RegistrationError> {
        let creator_id = requesting_user.ok_or(RegistrationError::Unauthenticated)?;
        let name = CommunityName::parse(name)?;

        let community = self
            .context
            .timed(self.create(&name, privacy_type, creator_id))
            .await
            .inspect_err(|e| {
                if e.is_retryable() {
                    warn!("Registering r/{name} failed: {e}");
                }
            })?;

        debug!("r/{name} was created by {creator_id} as {privacy_type}");

        self.context.emit(CollabEvent::CommunityCreated {
            name: name.clone(),
            creator_id: creator_id.clone(),
            privacy_type,
        });

        Ok(community)
    }

    /// Registers a community on behalf of whoever the identity provider says is signed in
    pub async fn register_as<P>(
        &self,
        identity: &P,
        name: &str,
        privacy_type: PrivacyType,
    ) -> Result<Community, RegistrationError>
    where
        P: IdentityProvider + ?Sized,
    {
        let user_id = identity.current_user_id();

        self.register_community(name, privacy_type, user_id.as_ref())
            .await
    }

    /// Returns a community by name, if it exists
    pub async fn community(
        &self,
        name: &CommunityName,
    ) -> Result<Option<Community>, RegistrationError> {
        let path = CommunityRecord::path(name)?;
        let document = self.context.timed(self.context.store.get(&path)).await?;

        let record = document.map(|d| d.to_record::<CommunityRecord>()).transpose()?;

        Ok(record.map(|record| Community {
            name: name.clone(),
            record,
        }))
    }

    /// Returns the membership snippet linking a user to a community, if it exists
    pub async fn membership(
        &self,
        user_id: &UserId,
        name: &CommunityName,
    ) -> Result<Option<MembershipSnippet>, RegistrationError> {
        let path = MembershipSnippet::path(user_id, name)?;
        let document = self.context.timed(self.context.store.get(&path)).await?;

        Ok(document.map(|d| d.to_record()).transpose()?)
    }

    async fn create(
        &self,
        name: &CommunityName,
        privacy_type: PrivacyType,
        creator_id: &UserId,
    ) -> Result<Community, RegistrationError> {
        let community_path = CommunityRecord::path(name)?;
        let snippet_path = MembershipSnippet::path(creator_id, name)?;

        let community = Document::from_record(&NewCommunity {
            creator_id,
            number_of_members: 1,
            privacy_type,
        })?
        .with_server_timestamp("createdAt");

        let snippet = Document::from_record(&MembershipSnippet {
            community_id: name.clone(),
            is_moderator: true,
        })?;

        let mut transaction = self.context.store.begin().await?;

        // Returning early drops the transaction, which discards it
        if transaction.get(&community_path).await?.is_some() {
            return Err(RegistrationError::NameTaken(name.clone()));
        }

        transaction.set(community_path, community);
        transaction.set(snippet_path, snippet);

        let created_at = transaction.commit().await?;

        Ok(Community {
            name: name.clone(),
            record: CommunityRecord {
                creator_id: creator_id.clone(),
                created_at,
                number_of_members: 1,
                privacy_type,
            },
        })
    }
}
