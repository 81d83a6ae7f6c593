use crate::server::ServerRouter;
use axum::Router;

mod comments;
mod forum;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(forum::routes())
        .merge(comments::routes())
        .merge(users::routes())
}
