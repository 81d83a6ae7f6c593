pub mod auth;
pub mod comment;
pub mod post;
pub mod user;

use crate::{
    model::{
        auth::{InvalidAuthTokenHashError, InvalidTokenTtlError},
        comment::InvalidCommentBodyError,
        post::{InvalidPostBodyError, InvalidTitleError},
        user::{InvalidRoleError, InvalidUserHandleError},
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserHandle(#[from] InvalidUserHandleError),
    #[error(transparent)]
    Role(#[from] InvalidRoleError),
    #[error(transparent)]
    Title(#[from] InvalidTitleError),
    #[error(transparent)]
    PostBody(#[from] InvalidPostBodyError),
    #[error(transparent)]
    CommentBody(#[from] InvalidCommentBodyError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
    #[error(transparent)]
    TokenTtl(#[from] InvalidTokenTtlError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct VidhyaLoanEpoch;
impl Epoch for VidhyaLoanEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2024-01-01 00:00);
}

pub type ForumSnowflake = Snowflake<VidhyaLoanEpoch>;
pub type ForumSnowflakeGenerator = SnowflakeGenerator<VidhyaLoanEpoch>;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(ForumSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: ForumSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> ForumSnowflake {
        self.0
    }

    /// The creation time embedded in the id.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime {
        self.0.created_at()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<ForumSnowflake> for Id<Marker> {
    fn from(value: ForumSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for ForumSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(ForumSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

/// Authoritative server answer to a like toggle.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: u64,
}
