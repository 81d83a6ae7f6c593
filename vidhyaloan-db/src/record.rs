use sqlx::FromRow;
use time::PrimitiveDateTime;
use vidhyaloan_common::model::{
    ModelValidationError,
    auth::{Authentication, TokenTtl},
    comment::{Comment, CommentBody},
    post::{Category, Post, PostBody, PostSummary, Title},
    user::{Role, User, UserHandle},
};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub handle: String,
    pub role: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostSummaryRecord {
    pub post_snowflake: i64,
    pub author_snowflake: i64,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub pinned: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub view_count: i64,
    pub pinned: bool,
    pub user_snowflake: i64,
    pub handle: String,
    pub role: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub parent_snowflake: Option<i64>,
    pub content: String,
    pub like_count: i64,
    pub user_snowflake: i64,
    pub handle: String,
    pub role: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            handle: UserHandle::new(value.handle)?,
            role: value.role.parse::<Role>()?,
        })
    }
}

impl TryFrom<PostSummaryRecord> for PostSummary {
    type Error = ModelValidationError;

    fn try_from(value: PostSummaryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author_id: value.author_snowflake.cast_unsigned().into(),
            title: Title::new(value.title)?,
            category: Category::from_slug(&value.category),
            tags: value.tags,
            like_count: value.like_count.cast_unsigned(),
            comment_count: value.comment_count.cast_unsigned(),
            pinned: value.pinned,
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author: User {
                id: value.user_snowflake.cast_unsigned().into(),
                handle: UserHandle::new(value.handle)?,
                role: value.role.parse::<Role>()?,
            },
            title: Title::new(value.title)?,
            content: PostBody::new(value.content)?,
            category: Category::from_slug(&value.category),
            tags: value.tags,
            like_count: value.like_count.cast_unsigned(),
            comment_count: value.comment_count.cast_unsigned(),
            view_count: value.view_count.cast_unsigned(),
            pinned: value.pinned,
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            post_id: value.post_snowflake.cast_unsigned().into(),
            parent_id: value
                .parent_snowflake
                .map(|parent| parent.cast_unsigned().into()),
            author: User {
                id: value.user_snowflake.cast_unsigned().into(),
                handle: UserHandle::new(value.handle)?,
                role: value.role.parse::<Role>()?,
            },
            content: CommentBody::new(value.content)?,
            like_count: value.like_count.cast_unsigned(),
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(TokenTtl::try_from)
                .transpose()?,
        })
    }
}
