use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use vidhyaloan_common::model::{
    Id, LikeOutcome,
    comment::{Comment, CommentDraft, CommentMarker},
    post::PostMarker,
};
use vidhyaloan_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_comment)
        .typed_post(like_comment)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forum/{id}/comments", rejection(ServerError))]
struct CreateCommentPath {
    id: Id<PostMarker>,
}

async fn create_comment(
    CreateCommentPath { id }: CreateCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(draft): Json<CommentDraft>,
) -> Result<Json<Comment>> {
    let author = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::InvalidToken)?;

    let comment = db
        .create_comment(id, &draft, &author)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forum/comments/{id}/like", rejection(ServerError))]
struct LikeCommentPath {
    id: Id<CommentMarker>,
}

async fn like_comment(
    LikeCommentPath { id }: LikeCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<LikeOutcome>> {
    let outcome = db
        .toggle_comment_like(id, user.user_id())
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok(Json(outcome))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forum/comments/{id}", rejection(ServerError))]
struct DeleteCommentPath {
    id: Id<CommentMarker>,
}

async fn delete_comment(
    DeleteCommentPath { id }: DeleteCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    let caller = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::InvalidToken)?;

    if caller.id != comment.author.id && !caller.role.is_admin() {
        return Err(ServerError::CommentDeleteForbidden(id));
    }

    if !db.delete_comment(comment.id, comment.post_id).await? {
        return Err(ServerError::CommentByIdNotFound(id));
    }

    Ok(StatusCode::NO_CONTENT)
}
