use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;
use vidhyaloan_common::{
    composer::{ComposerError, GateConfig},
    model::{
        Id,
        auth::{AuthTokenDecodeError, AuthTokenHashError},
        comment::CommentMarker,
        post::{PostMarker, PostSummary},
        user::UserMarker,
    },
    moderation::{BlockReason, ModerationPolicy},
};
use vidhyaloan_db::client::{DbClient, DbError};

mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub gate: GateConfig,
    pub policy: Arc<ModerationPolicy>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("The draft was rejected: {0}")]
    InvalidDraft(#[from] ComposerError),
    #[error("The draft was blocked: {0}")]
    ModerationBlocked(BlockReason),
    #[error("{message}")]
    DuplicateDetected {
        message: String,
        similar: Vec<PostSummary>,
    },
    #[error("Only the author or an admin may delete comment {0}.")]
    CommentDeleteForbidden(Id<CommentMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ServerError::CommentDeleteForbidden(_) => StatusCode::FORBIDDEN,
            ServerError::DuplicateDetected { .. } => StatusCode::CONFLICT,
            ServerError::InvalidDraft(_) | ServerError::ModerationBlocked(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::Database(
                DbError::UnknownParent(_) | DbError::ForeignParent { .. },
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::JsonRejection(_)
            | ServerError::QueryRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<BlockReason>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    similar_posts: Vec<PostSummary>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let reason = match &self {
            ServerError::ModerationBlocked(reason) => Some(*reason),
            _ => None,
        };
        let message = self.to_string();
        let similar_posts = match self {
            ServerError::DuplicateDetected { similar, .. } => similar,
            _ => Vec::new(),
        };

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message,
            reason,
            similar_posts,
        };
        (status, Json(error_response)).into_response()
    }
}
