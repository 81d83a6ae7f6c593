use crate::model::{
    Id,
    post::PostMarker,
    user::User,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const COMMENT_BODY_MAX_LEN: usize = 5_000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// A single reply row. `parent_id` absent means top-level; present, it must
/// reference a comment of the same post.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub parent_id: Option<Id<CommentMarker>>,
    pub author: User,
    pub content: CommentBody,
    pub like_count: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct CommentDraft {
    pub content: CommentBody,
    pub parent_id: Option<Id<CommentMarker>>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentBody(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidCommentBodyError {
    #[error("The comment is empty")]
    Empty,
    #[error("The comment must be at most {COMMENT_BODY_MAX_LEN} characters")]
    TooLong,
}

impl CommentBody {
    pub fn new(content: String) -> Result<Self, InvalidCommentBodyError> {
        if content.trim().is_empty() {
            return Err(InvalidCommentBodyError::Empty);
        }
        if content.chars().count() > COMMENT_BODY_MAX_LEN {
            return Err(InvalidCommentBodyError::TooLong);
        }
        Ok(CommentBody(content))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for CommentBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentBody::new(inner.clone())
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"CommentBody"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::comment::{CommentBody, InvalidCommentBodyError};

    #[test]
    fn body_validation() {
        assert!(CommentBody::new("Congrats on the admit!".to_owned()).is_ok());
        assert_eq!(
            CommentBody::new(String::new()),
            Err(InvalidCommentBodyError::Empty)
        );
        assert_eq!(
            CommentBody::new("  \n ".to_owned()),
            Err(InvalidCommentBodyError::Empty)
        );
        assert!(CommentBody::new("y".repeat(5_001)).is_err());
    }
}
