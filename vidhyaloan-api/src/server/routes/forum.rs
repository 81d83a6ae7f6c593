use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::extract::{Query, State};
use axum_extra::{
    extract::WithRejection,
    routing::{RouterExt, TypedPath},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use vidhyaloan_common::{
    composer::{Composer, ComposerState, GateConfig, PostOutcome, SearchUnavailable},
    model::{
        Id, LikeOutcome,
        post::{Category, MAX_TAGS, Post, PostMarker, PostSummary},
    },
    moderation::{ModerationPolicy, suggest_tags},
    similarity,
    thread::{self, CommentNode},
};
use vidhyaloan_db::client::DbClient;

/// How many recent posts the duplicate check ranks against.
const CANDIDATE_SCAN_LIMIT: i64 = 200;
const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

const DUPLICATE_MESSAGE: &str =
    "Similar questions already exist. Edit your draft, or post it anyway.";
const EXACT_DUPLICATE_MESSAGE: &str = "A question with this exact title already exists.";

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_post(similar_posts)
        .typed_get(get_post)
        .typed_post(like_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forum", rejection(ServerError))]
struct ForumPath();

#[derive(Deserialize)]
struct ListQuery {
    category: Option<String>,
    limit: Option<i64>,
}

async fn list_posts(
    ForumPath(): ForumPath,
    State(db): State<Arc<DbClient>>,
    WithRejection(Query(params), _): WithRejection<Query<ListQuery>, ServerError>,
) -> Result<Json<Vec<PostSummary>>> {
    let category = params.category.as_deref().map(Category::from_slug);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let posts = db.list_posts(category, limit).await?;
    Ok(Json(posts))
}

#[derive(Deserialize)]
struct CreatePostRequest {
    title: String,
    content: String,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    force: bool,
}

/// Drives the posting wizard server-side: validation, local moderation,
/// the similarity check (skippable only by `force`), and the authoritative
/// exact-title check that applies even to forced submissions.
async fn create_post(
    ForumPath(): ForumPath,
    State(db): State<Arc<DbClient>>,
    State(gate): State<GateConfig>,
    State(policy): State<Arc<ModerationPolicy>>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<PostSummary>> {
    let category = Category::from_slug(request.category.as_deref().unwrap_or_default());

    let mut composer = Composer::new(gate, policy.as_ref().clone());
    composer.submit_title(&request.title)?;
    composer.submit_description(&request.content, category, request.tags)?;

    if let ComposerState::Blocked { reason } = composer.state() {
        return Err(ServerError::ModerationBlocked(*reason));
    }

    // A failed candidate query fails open rather than blocking posting.
    let ranked = match db.similar_candidates(Some(category), CANDIDATE_SCAN_LIMIT).await {
        Ok(candidates) => Ok(similarity::rank(
            &request.title,
            candidates,
            gate.min_keyword_overlap,
            gate.similar_limit,
        )),
        Err(error) => {
            warn!(%error, "Similarity search failed, letting the draft through");
            Err(SearchUnavailable)
        }
    };
    composer.similarity_result(ranked)?;

    let known_matches = match composer.state() {
        ComposerState::Duplicate { matches, .. } => {
            if !request.force {
                return Err(ServerError::DuplicateDetected {
                    message: DUPLICATE_MESSAGE.to_owned(),
                    similar: matches.clone(),
                });
            }
            matches.clone()
        }
        _ => Vec::new(),
    };

    composer.confirm()?;

    let exact_duplicate = known_matches.iter().any(|candidate| {
        candidate
            .title
            .get()
            .trim()
            .eq_ignore_ascii_case(request.title.trim())
    });
    if exact_duplicate {
        composer.post_result(PostOutcome::Duplicate {
            matches: known_matches.clone(),
            message: EXACT_DUPLICATE_MESSAGE.to_owned(),
        })?;
        return Err(ServerError::DuplicateDetected {
            message: EXACT_DUPLICATE_MESSAGE.to_owned(),
            similar: known_matches,
        });
    }

    let ComposerState::Posting { draft, .. } = composer.state() else {
        return Err(ServerError::InvalidDraft(
            vidhyaloan_common::composer::ComposerError::WrongState {
                state: composer.state().name(),
                action: "create",
            },
        ));
    };

    let summary = db.create_post(draft, user.user_id()).await?;
    composer.post_result(PostOutcome::Created(summary.id))?;

    Ok(Json(summary))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forum/similar", rejection(ServerError))]
struct SimilarPath();

#[derive(Deserialize)]
struct SimilarRequest {
    title: String,
    content: Option<String>,
    category: Option<String>,
}

#[derive(Serialize)]
struct SimilarResponse {
    similar_posts: Vec<PostSummary>,
    suggested_tags: Vec<String>,
}

async fn similar_posts(
    SimilarPath(): SimilarPath,
    State(db): State<Arc<DbClient>>,
    State(gate): State<GateConfig>,
    Json(request): Json<SimilarRequest>,
) -> Result<Json<SimilarResponse>> {
    let category = request.category.as_deref().map(Category::from_slug);

    let candidates = db.similar_candidates(category, CANDIDATE_SCAN_LIMIT).await?;
    let similar_posts = similarity::rank(
        &request.title,
        candidates,
        gate.min_keyword_overlap,
        gate.similar_limit,
    );
    let suggested_tags = suggest_tags(
        &request.title,
        request.content.as_deref().unwrap_or_default(),
        gate.suggest_after,
        MAX_TAGS,
    );

    Ok(Json(SimilarResponse {
        similar_posts,
        suggested_tags,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forum/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

#[derive(Serialize)]
struct ThreadResponse {
    post: Post,
    comments: Vec<CommentNode>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<ThreadResponse>> {
    let (post, comments) = db
        .fetch_post_with_comments(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(ThreadResponse {
        post,
        comments: thread::assemble(comments),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forum/{id}/like", rejection(ServerError))]
struct LikePostPath {
    id: Id<PostMarker>,
}

async fn like_post(
    LikePostPath { id }: LikePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<LikeOutcome>> {
    let outcome = db
        .toggle_post_like(id, user.user_id())
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(outcome))
}
