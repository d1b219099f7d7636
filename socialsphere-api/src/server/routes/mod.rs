use crate::server::ServerRouter;
use axum::Router;

mod auth;
mod feed;
mod posts;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(auth::routes())
        .merge(feed::routes())
        .merge(posts::routes())
}
