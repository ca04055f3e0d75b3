use std::{fmt::Display, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    /// Anything that isn't a letter, digit, or underscore
    static ref DISALLOWED: Regex = Regex::new(r"[^A-Za-z0-9_]").unwrap();
}

/// The unique, case-preserving name of a community.
/// Holding one means the name passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommunityName(String);

/// Why a proposed community name was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidName {
    #[error("name is {length} characters, the minimum is {}", CommunityName::MIN_LENGTH)]
    TooShort { length: usize },
    #[error("name is {length} characters, the maximum is {}", CommunityName::MAX_LENGTH)]
    TooLong { length: usize },
    #[error("name contains {0:?}")]
    InvalidCharacter(char),
}

impl CommunityName {
    pub const MIN_LENGTH: usize = 3;
    pub const MAX_LENGTH: usize = 21;

    pub fn parse(name: &str) -> Result<Self, InvalidName> {
        let length = name.chars().count();

        if length < Self::MIN_LENGTH {
            return Err(InvalidName::TooShort { length });
        }

        if length > Self::MAX_LENGTH {
            return Err(InvalidName::TooLong { length });
        }

        if let Some(found) = DISALLOWED.find(name) {
            let character = found.as_str().chars().next().unwrap_or_default();
            return Err(InvalidName::InvalidCharacter(character));
        }

        Ok(Self(name.to_string()))
    }

    /// How many characters can still be typed, clamped to 0
    pub fn characters_remaining(input: &str) -> usize {
        Self::MAX_LENGTH.saturating_sub(input.chars().count())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CommunityName {
    type Err = InvalidName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CommunityName {
    type Error = InvalidName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CommunityName> for String {
    fn from(value: CommunityName) -> Self {
        value.0
    }
}

impl Display for CommunityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommunityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
