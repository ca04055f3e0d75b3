use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::util::random_string;

/// Identifies a communal account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    const GENERATED_LENGTH: usize = 28;

    /// Returns None if the id is empty or contains a path separator
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();

        (!id.is_empty() && !id.contains('/')).then_some(Self(id))
    }

    pub fn generate() -> Self {
        Self(random_string(Self::GENERATED_LENGTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies the identity of whoever is making a request, if anyone
pub trait IdentityProvider {
    fn current_user_id(&self) -> Option<UserId>;
}

impl IdentityProvider for UserId {
    fn current_user_id(&self) -> Option<UserId> {
        Some(self.clone())
    }
}

impl<T> IdentityProvider for Option<T>
where
    T: IdentityProvider,
{
    fn current_user_id(&self) -> Option<UserId> {
        self.as_ref().and_then(|identity| identity.current_user_id())
    }
}

#[cfg(test)]
mod test {
    use super::{IdentityProvider, UserId};

    #[test]
    fn user_ids() {
        assert!(UserId::new("").is_none());
        assert!(UserId::new("a/b").is_none());
        assert_eq!(UserId::new("abc").unwrap().as_str(), "abc");

        let generated = UserId::generate();
        assert_eq!(generated.as_str().len(), 28);
        assert_ne!(generated, UserId::generate());
    }

    #[test]
    fn optional_identity() {
        let signed_out: Option<UserId> = None;
        let signed_in = UserId::new("abc");

        assert_eq!(signed_out.current_user_id(), None);
        assert_eq!(signed_in.current_user_id(), UserId::new("abc"));
    }
}
