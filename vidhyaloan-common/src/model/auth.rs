use crate::model::{Id, user::UserMarker};
use argon2::{Argon2, Params};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Formatter},
    num::{NonZeroI64, ParseIntError},
    str::FromStr,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const AUTH_TOKEN_CORE_LEN: usize = 24;
pub const AUTH_TOKEN_SALT_LEN: usize = 18;
pub const AUTH_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing auth token failed: {0}")]
pub struct AuthTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// Bearer token presented by clients: `user_id:base64(core):base64(salt)`.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub user_id: Id<UserMarker>,
    pub core: [u8; AUTH_TOKEN_CORE_LEN],
    pub salt: [u8; AUTH_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthTokenHash(pub Box<[u8; AUTH_TOKEN_HASH_LEN]>);

/// Token lifetime in whole seconds. Absent means the token never expires.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct TokenTtl(NonZeroI64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Token lifetime must be a positive number of seconds: {0}")]
pub struct InvalidTokenTtlError(i64);

impl TokenTtl {
    #[must_use]
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        NonZeroI64::new(seconds).filter(|s| s.get() > 0).map(Self)
    }

    #[must_use]
    pub fn seconds(self) -> i64 {
        self.0.get()
    }

    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::seconds(self.0.get())
    }
}

impl TryFrom<i64> for TokenTtl {
    type Error = InvalidTokenTtlError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_seconds(value).ok_or(InvalidTokenTtlError(value))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub user: Id<UserMarker>,
    pub token_hash: AuthTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<TokenTtl>,
}

impl Authentication {
    /// Whether the token had expired at the given instant.
    #[must_use]
    pub fn expired_at(&self, now: UtcDateTime) -> bool {
        match self.expires_after {
            Some(ttl) => self.created_at + ttl.as_duration() < now,
            None => false,
        }
    }
}

impl AuthToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
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

    pub fn hash(&self) -> Result<AuthTokenHash, AuthTokenHashError> {
        let argon2 = Argon2::default();

        let mut hash = Box::new([0; AUTH_TOKEN_HASH_LEN]);
        argon2
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(AuthTokenHashError)?;

        Ok(AuthTokenHash(hash))
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let core_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = u64::from_str(user_id_part)
            .map_err(Self::Err::InvalidUserId)?
            .into();
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

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AuthTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The auth token hash had an invalid length")]
pub struct InvalidAuthTokenHashError;

impl TryFrom<Box<[u8]>> for AuthTokenHash {
    type Error = InvalidAuthTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        Ok(Self(
            value.try_into().map_err(|_| InvalidAuthTokenHashError)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        auth::{AuthToken, Authentication, TokenTtl},
        user::UserMarker,
    };
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn token_str_round_trips() {
        let user_id = Id::<UserMarker>::from(42_u64);
        let token = AuthToken::generate_random(user_id);

        let parsed: AuthToken = token.as_token_str().parse().unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn token_rejects_malformed_strings() {
        assert!("no-colons-here".parse::<AuthToken>().is_err());
        assert!("abc:def:ghi".parse::<AuthToken>().is_err());
        assert!("42:dG9vc2hvcnQ=:dG9vc2hvcnQ=".parse::<AuthToken>().is_err());
    }

    #[test]
    fn ttl_must_be_positive() {
        assert!(TokenTtl::from_seconds(3600).is_some());
        assert!(TokenTtl::from_seconds(0).is_none());
        assert!(TokenTtl::from_seconds(-5).is_none());
    }

    #[test]
    fn expiry() {
        let created_at = utc_datetime!(2025-03-01 12:00);
        let token = AuthToken::generate_random(Id::<UserMarker>::from(7_u64));
        let authentication = Authentication {
            user: token.user_id,
            token_hash: token.hash().unwrap(),
            created_at,
            expires_after: TokenTtl::from_seconds(3600),
        };

        assert!(!authentication.expired_at(created_at + Duration::minutes(59)));
        assert!(authentication.expired_at(created_at + Duration::minutes(61)));

        let eternal = Authentication {
            expires_after: None,
            ..authentication
        };
        assert!(!eternal.expired_at(created_at + Duration::days(10_000)));
    }
}
