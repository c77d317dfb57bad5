use crate::util::PositiveDuration;
use argon2::{Argon2, Params};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use serde::Serialize;
use std::{
    fmt::{Debug, Formatter},
    str::FromStr,
};
use thiserror::Error;
use time::UtcDateTime;
use uuid::Uuid;

pub const SESSION_TOKEN_CORE_LEN: usize = 24;
pub const SESSION_TOKEN_SALT_LEN: usize = 18;
pub const SESSION_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing session token failed: {0}")]
pub struct SessionTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum SessionTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(uuid::Error),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// Bearer token handed out at reconciliation time. Only its argon2 hash is
/// stored; the token string is `user_id:core:salt` with base64 core and salt.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionToken {
    pub user_id: Uuid,
    pub core: [u8; SESSION_TOKEN_CORE_LEN],
    pub salt: [u8; SESSION_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionTokenHash(pub Box<[u8; SESSION_TOKEN_HASH_LEN]>);

/// Identity projected into a session by reconciliation. This is the value
/// threaded through request handling; anonymous callers simply have none.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub display_name: String,
    pub is_admin: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Session {
    pub token_hash: SessionTokenHash,
    pub identity: Identity,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now: UtcDateTime) -> bool {
        match self.expires_after {
            Some(expires_after) => self.created_at + expires_after.get() < now,
            None => false,
        }
    }
}

impl SessionToken {
    #[must_use]
    pub fn generate_random(user_id: Uuid) -> Self {
        let core = rand::random();
        let salt = rand::random();

        Self {
            user_id,
            core,
            salt,
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let encoded_core = Base64Display::new(&self.core, &BASE64_STANDARD);
        let encoded_salt = Base64Display::new(&self.salt, &BASE64_STANDARD);

        format!("{user_id}:{encoded_core}:{encoded_salt}")
    }

    pub fn hash(&self) -> Result<SessionTokenHash, SessionTokenHashError> {
        let argon2 = Argon2::default();

        let mut hash = Box::new([0; SESSION_TOKEN_HASH_LEN]);
        argon2
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(SessionTokenHashError)?;

        Ok(SessionTokenHash(hash))
    }
}

impl FromStr for SessionToken {
    type Err = SessionTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let core_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = Uuid::try_parse(user_id_part).map_err(Self::Err::InvalidUserId)?;
        let core = BASE64_STANDARD
            .decode(core_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidCoreLength)?;
        let salt = BASE64_STANDARD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            core,
            salt,
        })
    }
}

impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for SessionTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionTokenHash")
            .field(&"[redacted]")
            .finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The session token hash had an invalid length")]
pub struct InvalidSessionTokenHashError;

impl TryFrom<Box<[u8]>> for SessionTokenHash {
    type Error = InvalidSessionTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        Ok(Self(
            value.try_into().map_err(|_| InvalidSessionTokenHashError)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn token_string_round_trips() {
        let token = SessionToken::generate_random(Uuid::new_v4());
        let parsed: SessionToken = token.as_token_str().parse().unwrap();

        assert_eq!(parsed, token);
    }

    #[test]
    fn token_with_missing_parts_is_rejected() {
        let result = SessionToken::from_str("not-a-token");

        assert!(matches!(
            result,
            Err(SessionTokenDecodeError::NotEnoughParts | SessionTokenDecodeError::InvalidUserId(_))
        ));
    }

    #[test]
    fn token_with_bad_user_id_is_rejected() {
        let result = SessionToken::from_str("nonsense:YWJj:YWJj");

        assert!(matches!(
            result,
            Err(SessionTokenDecodeError::InvalidUserId(_))
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let token = SessionToken::generate_random(Uuid::new_v4());

        let rendered = format!("{token:?}");
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn session_expiry_uses_creation_time() {
        let created_at = UtcDateTime::now();
        let session = Session {
            token_hash: SessionTokenHash(Box::new([0; SESSION_TOKEN_HASH_LEN])),
            identity: Identity {
                user_id: Uuid::new_v4(),
                display_name: "tester".to_owned(),
                is_admin: false,
            },
            created_at,
            expires_after: Some(PositiveDuration::new(Duration::hours(1)).unwrap()),
        };

        assert!(!session.is_expired(created_at + Duration::minutes(30)));
        assert!(session.is_expired(created_at + Duration::hours(2)));

        let unbounded = Session {
            expires_after: None,
            ..session
        };
        assert!(!unbounded.is_expired(created_at + Duration::days(10_000)));
    }
}
