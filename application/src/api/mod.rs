//! HTTP API definitions.

pub mod auth;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;

use crate::Session;

/// Builds the [`Router`] of the authentication routes.
///
/// These routes are public: the session gate is applied to everything else.
pub fn router() -> Router {
    Router::new()
        .route("/auth/providers", get(auth::providers))
        .route("/auth/signin/email", post(auth::signin_email))
        .route("/auth/signin/:provider", get(auth::signin))
        .route("/auth/callback/email", get(auth::callback_email))
        .route("/auth/callback/:provider", get(auth::callback))
        .route("/auth/session", get(auth::session))
        .route("/auth/signout", post(auth::signout))
        .route("/auth/authenticators", get(auth::authenticators))
}

/// Handler of the gated root page.
///
/// The [`Session`] extension is attached by the gate middleware, so reaching
/// this handler means the request is authorized.
pub async fn index(Extension(session): Extension<Session>) -> Json<Index> {
    Json(Index {
        session: IndexSession {
            user: IndexUser {
                id: session.user_id.to_string(),
            },
        },
    })
}

/// View rendered by the [`index`] handler.
#[derive(Debug, Serialize)]
pub struct Index {
    /// Current session.
    pub session: IndexSession,
}

/// [`Session`] view of the [`Index`].
#[derive(Debug, Serialize)]
pub struct IndexSession {
    /// Authenticated user.
    pub user: IndexUser,
}

/// User view of the [`IndexSession`].
#[derive(Debug, Serialize)]
pub struct IndexUser {
    /// ID of the user.
    pub id: String,
}

/// Handler of the gated `GET /api/me` endpoint.
pub async fn me(Extension(session): Extension<Session>) -> Json<Me> {
    Json(Me {
        id: session.user_id.to_string(),
    })
}

/// View rendered by the [`me`] handler.
#[derive(Debug, Serialize)]
pub struct Me {
    /// ID of the authenticated user.
    pub id: String,
}

/// Fallback handler of the gated area.
///
/// Only reachable with a valid session: unauthorized requests are redirected
/// or rejected by the gate before routing resolves.
pub async fn fallback() -> crate::Error {
    crate::Error {
        code: "NOT_FOUND",
        status_code: http::StatusCode::NOT_FOUND,
        message: "Route not found".to_owned(),
        backtrace: None,
    }
}
