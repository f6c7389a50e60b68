//! Session gate deciding the authorization state of every request.

use std::{fmt, sync::Arc};

use axum::{
    extract::{FromRequestParts as _, Request, State},
    middleware::Next,
    response::{IntoResponse as _, Redirect, Response},
};

use crate::{context::AuthError, Context, Error};

/// Authorization decision point invoked per request.
///
/// Requests carrying a valid session token proceed; the rest are either
/// redirected to the sign-in page (page-rendering paths) or rejected with an
/// error status (paths under the API prefix).
#[derive(Clone, Debug)]
pub struct Gate {
    /// Location of the sign-in page.
    signin_page: String,

    /// Path prefix of API routes.
    api_prefix: String,
}

/// Decision of a [`Gate`] on an unauthorized request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Redirect the request to the provided location.
    Redirect(String),

    /// Reject the request with the provided status code.
    Reject(http::StatusCode),
}

impl Gate {
    /// Creates a new [`Gate`] with the provided sign-in page location and
    /// API path prefix.
    #[must_use]
    pub fn new(
        signin_page: impl Into<String>,
        api_prefix: impl Into<String>,
    ) -> Self {
        Self {
            signin_page: signin_page.into(),
            api_prefix: api_prefix.into(),
        }
    }

    /// Decides what to do with an unauthorized request to the provided
    /// `path`.
    #[must_use]
    pub fn decide(&self, path: &str) -> Decision {
        if path == self.api_prefix
            || (path.starts_with(&self.api_prefix)
                && path[self.api_prefix.len()..].starts_with('/'))
        {
            Decision::Reject(http::StatusCode::FORBIDDEN)
        } else {
            Decision::Redirect(self.signin_page.clone())
        }
    }

    /// Returns the sign-in page location carrying the provided `error` code.
    #[must_use]
    pub fn error_location(&self, error: &impl fmt::Display) -> String {
        format!("{}?error={error}", self.signin_page)
    }
}

/// Middleware applying the [`Gate`] to every request it wraps.
///
/// Authorized requests proceed with their [`Session`] attached as a request
/// extension.
///
/// [`Session`]: crate::Session
pub async fn require_session(
    State(gate): State<Arc<Gate>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let context = match Context::from_request_parts(&mut parts, &()).await {
        Ok(context) => context,
        Err(e) => return e.into_response(),
    };
    let session = match context.try_current_session().await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    match session {
        Some(session) => {
            let mut request = Request::from_parts(parts, body);
            _ = request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => match gate.decide(parts.uri.path()) {
            Decision::Redirect(location) => {
                Redirect::temporary(&location).into_response()
            }
            Decision::Reject(status_code) => {
                let mut error = Error::from(AuthError::AuthorizationRequired);
                error.status_code = status_code;
                error.into_response()
            }
        },
    }
}

#[cfg(test)]
mod spec {
    use service::infra::identity::Class;

    use super::{Decision, Gate};

    fn gate() -> Gate {
        Gate::new("/signin", "/api")
    }

    #[test]
    fn redirects_pages_to_signin() {
        assert_eq!(
            gate().decide("/"),
            Decision::Redirect("/signin".to_owned()),
        );
        assert_eq!(
            gate().decide("/dashboard"),
            Decision::Redirect("/signin".to_owned()),
        );
    }

    #[test]
    fn rejects_api_paths() {
        assert_eq!(
            gate().decide("/api/me"),
            Decision::Reject(http::StatusCode::FORBIDDEN),
        );
        assert_eq!(
            gate().decide("/api"),
            Decision::Reject(http::StatusCode::FORBIDDEN),
        );

        // A prefix match must respect path segment boundaries.
        assert_eq!(
            gate().decide("/apiary"),
            Decision::Redirect("/signin".to_owned()),
        );
    }

    #[test]
    fn builds_error_locations() {
        assert_eq!(
            gate().error_location(&Class::Callback),
            "/signin?error=OAuthCallbackError",
        );
        assert_eq!(
            gate().error_location(&Class::AccessDenied),
            "/signin?error=AccessDenied",
        );
    }
}
