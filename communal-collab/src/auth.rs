use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Utc};
use communal_core::{Document, DocumentPath, DocumentStore, StoreError, StoreResult};
use lazy_static::lazy_static;
use log::debug;
use rand::rngs::OsRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{util::random_string, CollabContext, CollabEvent, IdentityProvider, UserId};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@/]+@[^\s@/]+\.[^\s@/]+$").unwrap();
}

/// Email and password accounts, and the sessions they sign in to
pub struct Auth<Db: ?Sized> {
    context: CollabContext<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect. Deliberately doesn't say which.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("A user with that email already exists")]
    EmailInUse,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password should be at least {0} characters")]
    WeakPassword(usize),
    #[error("Session does not exist")]
    InvalidSession,
    #[error("Session has expired")]
    SessionExpired,
    /// Something went wrong with the store
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("HashError: {0}")]
    HashError(String),
}

/// A communal account
#[derive(Debug, Clone, PartialEq)]
pub struct UserData {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Login session data for authentication
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    /// Defaults to the part of the email before the @
    pub display_name: Option<String>,
}

/// Stored at `accounts/{email}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    user_id: UserId,
    password_hash: String,
}

/// Stored at `users/{userId}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    email: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewUserRecord<'a> {
    email: &'a str,
    display_name: &'a str,
}

/// Stored at `sessions/{token}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

impl<Db> Auth<Db>
where
    Db: DocumentStore + ?Sized,
{
    pub const MIN_PASSWORD_LENGTH: usize = 6;
    const TOKEN_LENGTH: usize = 32;

    pub fn new(context: &CollabContext<Db>) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Creates an account, failing if the email is already registered
    pub async fn register(&self, new_account: NewAccount) -> Result<UserData, AuthError> {
        let email = normalize_email(&new_account.email)?;

        if new_account.password.chars().count() < Self::MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(Self::MIN_PASSWORD_LENGTH));
        }

        let display_name = new_account
            .display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| local_part(&email).to_string());

        let password_hash = self.hash_password(&new_account.password)?;
        let user_id = UserId::generate();

        let created_at = self
            .context
            .timed(self.create_account(&email, &display_name, &user_id, password_hash))
            .await?;

        debug!("Registered account {user_id} for {email}");
        self.context.emit(CollabEvent::AccountCreated {
            user_id: user_id.clone(),
        });

        Ok(UserData {
            id: user_id,
            email,
            display_name,
            created_at,
        })
    }

    /// Logs in a user, returning a new session
    pub async fn sign_in_with_email_and_password(
        &self,
        credentials: Credentials,
    ) -> Result<SessionData, AuthError> {
        let email = normalize_email(&credentials.email).map_err(|_| AuthError::InvalidCredentials)?;

        let account: AccountRecord = self
            .context
            .timed(self.context.store.get(&account_path(&email)?))
            .await?
            .ok_or(AuthError::InvalidCredentials)?
            .to_record()?;

        let stored_password = PasswordHash::parse(&account.password_hash, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let user = self.user(&account.user_id).await?;

        let token = random_string(Self::TOKEN_LENGTH);
        let expires_at = Utc::now() + self.context.config.session_duration();

        let session = Document::from_record(&SessionRecord {
            user_id: user.id.clone(),
            expires_at,
        })?;

        let path = session_path(&token)?;

        self.context
            .timed(async {
                let mut transaction = self.context.store.begin().await?;
                transaction.set(path, session);
                transaction.commit().await
            })
            .await?;

        debug!("{} signed in", user.email);
        self.context.emit(CollabEvent::UserSignedIn {
            user_id: user.id.clone(),
        });

        Ok(SessionData {
            token,
            expires_at,
            user,
        })
    }

    /// Returns the session for a token if it exists and hasn't expired
    pub async fn session(&self, token: &str) -> Result<SessionData, AuthError> {
        let path = session_path(token).map_err(|_| AuthError::InvalidSession)?;

        let session: SessionRecord = self
            .context
            .timed(self.context.store.get(&path))
            .await?
            .ok_or(AuthError::InvalidSession)?
            .to_record()?;

        if session.expires_at <= Utc::now() {
            return Err(AuthError::SessionExpired);
        }

        let user = self.user(&session.user_id).await?;

        Ok(SessionData {
            token: token.to_string(),
            expires_at: session.expires_at,
            user,
        })
    }

    /// Deletes the session, if it exists
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let path = session_path(token).map_err(|_| AuthError::InvalidSession)?;

        let user_id = self
            .context
            .timed(async {
                let mut transaction = self.context.store.begin().await?;

                let session: SessionRecord = transaction
                    .get(&path)
                    .await?
                    .ok_or(AuthError::InvalidSession)?
                    .to_record()?;

                transaction.delete(path.clone());
                transaction.commit().await?;

                Ok::<_, AuthError>(session.user_id)
            })
            .await?;

        debug!("{user_id} signed out");
        self.context.emit(CollabEvent::UserSignedOut { user_id });

        Ok(())
    }

    /// Returns a user by id
    pub async fn user(&self, user_id: &UserId) -> Result<UserData, AuthError> {
        let record: UserRecord = self
            .context
            .timed(self.context.store.get(&user_path(user_id)?))
            .await?
            .ok_or_else(|| {
                StoreError::Internal(format!("user {user_id} has no profile").into())
            })?
            .to_record()?;

        Ok(UserData {
            id: user_id.clone(),
            email: record.email,
            display_name: record.display_name,
            created_at: record.created_at,
        })
    }

    async fn create_account(
        &self,
        email: &str,
        display_name: &str,
        user_id: &UserId,
        password_hash: String,
    ) -> Result<DateTime<Utc>, AuthError> {
        let account_path = account_path(email)?;

        let account = Document::from_record(&AccountRecord {
            user_id: user_id.clone(),
            password_hash,
        })?;

        let profile = Document::from_record(&NewUserRecord {
            email,
            display_name,
        })?
        .with_server_timestamp("createdAt");

        let mut transaction = self.context.store.begin().await?;

        if transaction.get(&account_path).await?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        transaction.set(account_path, account);
        transaction.set(user_path(user_id)?, profile);

        Ok(transaction.commit().await?)
    }

    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::HashError(e.to_string()))
    }
}

impl IdentityProvider for SessionData {
    fn current_user_id(&self) -> Option<UserId> {
        Some(self.user.id.clone())
    }
}

/// The greeting shown after signing in, using the part of the email before the @
pub fn greeting(email: &str) -> String {
    format!("Welcome back {}", local_part(email.trim()))
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();

    if !EMAIL.is_match(&email) {
        return Err(AuthError::InvalidEmail);
    }

    Ok(email)
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

fn account_path(email: &str) -> StoreResult<DocumentPath> {
    DocumentPath::new(["accounts", email])
}

fn user_path(user_id: &UserId) -> StoreResult<DocumentPath> {
    DocumentPath::new(["users", user_id.as_str()])
}

fn session_path(token: &str) -> StoreResult<DocumentPath> {
    DocumentPath::new(["sessions", token])
}
