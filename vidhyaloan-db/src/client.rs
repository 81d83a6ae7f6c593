use crate::record::{
    AuthenticationRecord, CommentRecord, FullPostRecord, PostSummaryRecord, UserRecord,
};
use sqlx::{PgPool, query, query_as, query_scalar};
use std::sync::Mutex;
use thiserror::Error;
use vidhyaloan_common::{
    model::{
        ForumSnowflake, ForumSnowflakeGenerator, Id, LikeOutcome, ModelValidationError,
        auth::{Authentication, AuthTokenHash},
        comment::{Comment, CommentDraft, CommentMarker},
        post::{Category, Post, PostDraft, PostMarker, PostSummary},
        user::{User, UserMarker},
    },
    snowflake::{NodeId, TimestampFromDateTimeError},
};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Generating an id failed: {0}")]
    IdGeneration(#[from] TimestampFromDateTimeError),
    #[error("Parent comment {0} was not found")]
    UnknownParent(Id<CommentMarker>),
    #[error("Parent comment {parent} does not belong to post {post}")]
    ForeignParent {
        parent: Id<CommentMarker>,
        post: Id<PostMarker>,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<ForumSnowflakeGenerator>,
}

fn db_key<Marker>(id: Id<Marker>) -> i64 {
    u64::from(id).cast_signed()
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, node_id: NodeId) -> Self {
        let snowflake_generator = Mutex::new(ForumSnowflakeGenerator::new(node_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    fn next_snowflake(&self) -> Result<ForumSnowflake> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .generate()?;
        Ok(snowflake)
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.handle,
                users.role
            FROM
                users.users
            WHERE
                users.user_snowflake = $1
            ",
        )
        .bind(db_key(user_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_snowflake,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM
                users.authentications authentications
            WHERE
                authentications.token_hash = $1
            ",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Authentication::try_from).transpose()?)
    }

    /// The post with author, aggregates, and its full comment list. Reading
    /// a post bumps its view count.
    pub async fn fetch_post_with_comments(
        &self,
        post_id: Id<PostMarker>,
    ) -> Result<Option<(Post, Vec<Comment>)>> {
        let mut tx = self.pool.begin().await?;

        query("UPDATE forum.posts SET view_count = view_count + 1 WHERE post_snowflake = $1")
            .bind(db_key(post_id))
            .execute(&mut *tx)
            .await?;

        let post_record = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.title,
                posts.content,
                posts.category,
                posts.tags,
                posts.comment_count,
                posts.view_count,
                posts.pinned,
                (SELECT COUNT(*) FROM forum.post_likes likes
                    WHERE likes.post_snowflake = posts.post_snowflake) AS like_count,
                users.user_snowflake,
                users.handle,
                users.role
            FROM
                forum.posts posts
                JOIN users.users users ON users.user_snowflake = posts.author_snowflake
            WHERE
                posts.post_snowflake = $1
            ",
        )
        .bind(db_key(post_id))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(post_record) = post_record else {
            return Ok(None);
        };

        let comment_records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.parent_snowflake,
                comments.content,
                (SELECT COUNT(*) FROM forum.comment_likes likes
                    WHERE likes.comment_snowflake = comments.comment_snowflake) AS like_count,
                users.user_snowflake,
                users.handle,
                users.role
            FROM
                forum.comments comments
                JOIN users.users users ON users.user_snowflake = comments.author_snowflake
            WHERE
                comments.post_snowflake = $1
            ORDER BY
                comments.comment_snowflake
            ",
        )
        .bind(db_key(post_id))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let post = Post::try_from(post_record)?;
        let comments = comment_records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some((post, comments)))
    }

    /// Pinned posts first, then newest first.
    pub async fn list_posts(
        &self,
        category: Option<Category>,
        limit: i64,
    ) -> Result<Vec<PostSummary>> {
        let records = query_as::<_, PostSummaryRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.author_snowflake,
                posts.title,
                posts.category,
                posts.tags,
                posts.comment_count,
                posts.pinned,
                (SELECT COUNT(*) FROM forum.post_likes likes
                    WHERE likes.post_snowflake = posts.post_snowflake) AS like_count
            FROM
                forum.posts posts
            WHERE
                $1::TEXT IS NULL OR posts.category = $1
            ORDER BY
                posts.pinned DESC, posts.post_snowflake DESC
            LIMIT $2
            ",
        )
        .bind(category.map(Category::slug))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(PostSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Recent posts fed to the keyword ranking of the duplicate check.
    /// Plain recency order, ignoring pins.
    pub async fn similar_candidates(
        &self,
        category: Option<Category>,
        scan_limit: i64,
    ) -> Result<Vec<PostSummary>> {
        let records = query_as::<_, PostSummaryRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.author_snowflake,
                posts.title,
                posts.category,
                posts.tags,
                posts.comment_count,
                posts.pinned,
                (SELECT COUNT(*) FROM forum.post_likes likes
                    WHERE likes.post_snowflake = posts.post_snowflake) AS like_count
            FROM
                forum.posts posts
            WHERE
                $1::TEXT IS NULL OR posts.category = $1
            ORDER BY
                posts.post_snowflake DESC
            LIMIT $2
            ",
        )
        .bind(category.map(Category::slug))
        .bind(scan_limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(PostSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn create_post(
        &self,
        draft: &PostDraft,
        author: Id<UserMarker>,
    ) -> Result<PostSummary> {
        let post_snowflake = self.next_snowflake()?;

        query(
            "
            INSERT INTO forum.posts
                (post_snowflake, author_snowflake, title, content, category, tags)
            VALUES
                ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(db_key(author))
        .bind(draft.title.get())
        .bind(draft.content.get())
        .bind(draft.category.slug())
        .bind(&draft.tags)
        .execute(&self.pool)
        .await?;

        Ok(PostSummary {
            id: post_snowflake.into(),
            author_id: author,
            title: draft.title.clone(),
            category: draft.category,
            tags: draft.tags.clone(),
            like_count: 0,
            comment_count: 0,
            pinned: false,
        })
    }

    /// Inserts a comment and bumps the post's comment count. `None` if the
    /// post is unknown. A parent from another post (or no post at all) is
    /// rejected here and again by the composite foreign key.
    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        draft: &CommentDraft,
        author: &User,
    ) -> Result<Option<Comment>> {
        let mut tx = self.pool.begin().await?;

        let post_exists =
            query_scalar::<_, i64>("SELECT post_snowflake FROM forum.posts WHERE post_snowflake = $1")
                .bind(db_key(post_id))
                .fetch_optional(&mut *tx)
                .await?;
        if post_exists.is_none() {
            return Ok(None);
        }

        if let Some(parent_id) = draft.parent_id {
            let parent_post = query_scalar::<_, i64>(
                "SELECT post_snowflake FROM forum.comments WHERE comment_snowflake = $1",
            )
            .bind(db_key(parent_id))
            .fetch_optional(&mut *tx)
            .await?;

            match parent_post {
                None => return Err(DbError::UnknownParent(parent_id)),
                Some(parent_post) if parent_post != db_key(post_id) => {
                    return Err(DbError::ForeignParent {
                        parent: parent_id,
                        post: post_id,
                    });
                }
                Some(_) => {}
            }
        }

        let comment_snowflake = self.next_snowflake()?;

        query(
            "
            INSERT INTO forum.comments
                (comment_snowflake, post_snowflake, parent_snowflake, author_snowflake, content)
            VALUES
                ($1, $2, $3, $4, $5)
            ",
        )
        .bind(comment_snowflake.get().cast_signed())
        .bind(db_key(post_id))
        .bind(draft.parent_id.map(db_key))
        .bind(db_key(author.id))
        .bind(draft.content.get())
        .execute(&mut *tx)
        .await?;

        query("UPDATE forum.posts SET comment_count = comment_count + 1 WHERE post_snowflake = $1")
            .bind(db_key(post_id))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(Comment {
            id: comment_snowflake.into(),
            post_id,
            parent_id: draft.parent_id,
            author: author.clone(),
            content: draft.content.clone(),
            like_count: 0,
        }))
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.parent_snowflake,
                comments.content,
                (SELECT COUNT(*) FROM forum.comment_likes likes
                    WHERE likes.comment_snowflake = comments.comment_snowflake) AS like_count,
                users.user_snowflake,
                users.handle,
                users.role
            FROM
                forum.comments comments
                JOIN users.users users ON users.user_snowflake = comments.author_snowflake
            WHERE
                comments.comment_snowflake = $1
            ",
        )
        .bind(db_key(comment_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::try_from).transpose()?)
    }

    /// Removes the comment (replies cascade) and recounts the post's
    /// comment aggregate. `false` if the comment was already gone.
    pub async fn delete_comment(
        &self,
        comment_id: Id<CommentMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = query("DELETE FROM forum.comments WHERE comment_snowflake = $1")
            .bind(db_key(comment_id))
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Ok(false);
        }

        query(
            "
            UPDATE forum.posts SET comment_count =
                (SELECT COUNT(*) FROM forum.comments WHERE post_snowflake = $1)
            WHERE post_snowflake = $1
            ",
        )
        .bind(db_key(post_id))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// One like per user per post, toggled. The aggregate is recounted in
    /// the same transaction, so the returned pair is authoritative. `None`
    /// if the post is unknown.
    pub async fn toggle_post_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<LikeOutcome>> {
        let mut tx = self.pool.begin().await?;

        let post_exists =
            query_scalar::<_, i64>("SELECT post_snowflake FROM forum.posts WHERE post_snowflake = $1")
                .bind(db_key(post_id))
                .fetch_optional(&mut *tx)
                .await?;
        if post_exists.is_none() {
            return Ok(None);
        }

        let removed =
            query("DELETE FROM forum.post_likes WHERE post_snowflake = $1 AND user_snowflake = $2")
                .bind(db_key(post_id))
                .bind(db_key(user_id))
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let liked = removed == 0;
        if liked {
            query("INSERT INTO forum.post_likes (post_snowflake, user_snowflake) VALUES ($1, $2)")
                .bind(db_key(post_id))
                .bind(db_key(user_id))
                .execute(&mut *tx)
                .await?;
        }

        let likes =
            query_scalar::<_, i64>("SELECT COUNT(*) FROM forum.post_likes WHERE post_snowflake = $1")
                .bind(db_key(post_id))
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(Some(LikeOutcome {
            liked,
            likes: likes.cast_unsigned(),
        }))
    }

    /// Same toggle contract at comment granularity.
    pub async fn toggle_comment_like(
        &self,
        comment_id: Id<CommentMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<LikeOutcome>> {
        let mut tx = self.pool.begin().await?;

        let comment_exists = query_scalar::<_, i64>(
            "SELECT comment_snowflake FROM forum.comments WHERE comment_snowflake = $1",
        )
        .bind(db_key(comment_id))
        .fetch_optional(&mut *tx)
        .await?;
        if comment_exists.is_none() {
            return Ok(None);
        }

        let removed = query(
            "DELETE FROM forum.comment_likes WHERE comment_snowflake = $1 AND user_snowflake = $2",
        )
        .bind(db_key(comment_id))
        .bind(db_key(user_id))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let liked = removed == 0;
        if liked {
            query(
                "INSERT INTO forum.comment_likes (comment_snowflake, user_snowflake) VALUES ($1, $2)",
            )
            .bind(db_key(comment_id))
            .bind(db_key(user_id))
            .execute(&mut *tx)
            .await?;
        }

        let likes = query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM forum.comment_likes WHERE comment_snowflake = $1",
        )
        .bind(db_key(comment_id))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(LikeOutcome {
            liked,
            likes: likes.cast_unsigned(),
        }))
    }
}
