//! Authentication route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{account, user, verification},
    infra::identity,
    query,
};
use tracing as log;
use uuid::Uuid;

use crate::{
    context::SESSION_COOKIE, define_error, AsError, Context, Error, Gate,
    Service,
};

/// Name of the cookie carrying the [OAuth 2.0] `state` value between the
/// sign-in redirect and the callback.
///
/// [OAuth 2.0]: https://datatracker.ietf.org/doc/html/rfc6749
const STATE_COOKIE: &str = "oauth_state";

/// Publicly reachable base URL of this server.
#[derive(Clone, Debug)]
pub struct PublicUrl(pub String);

impl PublicUrl {
    /// Returns the callback URL of the provided [`account::Provider`].
    #[must_use]
    pub fn callback(&self, provider: &account::Provider) -> String {
        format!("{}/auth/callback/{provider}", self.0.trim_end_matches('/'))
    }

    /// Checks whether this [`PublicUrl`] is served over HTTPS.
    #[must_use]
    fn is_secure(&self) -> bool {
        self.0.starts_with("https://")
    }
}

/// `GET /auth/providers` handler listing the configured identity providers.
pub async fn providers(
    Extension(service): Extension<Service>,
) -> Json<Providers> {
    Json(Providers {
        providers: service
            .identity()
            .providers()
            .into_iter()
            .map(ToString::to_string)
            .collect(),
    })
}

/// View rendered by the [`providers`] handler.
#[derive(Debug, Serialize)]
pub struct Providers {
    /// Names of the configured identity providers.
    pub providers: Vec<String>,
}

/// `GET /auth/signin/{provider}` handler redirecting the end user to the
/// provider's authorization endpoint.
pub async fn signin(
    Extension(service): Extension<Service>,
    Extension(gate): Extension<Arc<Gate>>,
    Extension(public_url): Extension<PublicUrl>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Response {
    let Ok(provider) = provider.parse::<account::Provider>() else {
        return Redirect::temporary(
            &gate.error_location(&identity::Class::Signin),
        )
        .into_response();
    };

    let state = Uuid::new_v4().simple().to_string();
    let redirect_uri = public_url.callback(&provider);

    match service.identity().authorization_request(
        &provider,
        &state,
        &redirect_uri,
    ) {
        Ok(url) => {
            let cookie = Cookie::build((STATE_COOKIE, state))
                .path("/auth")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(public_url.is_secure())
                .build();
            (jar.add(cookie), Redirect::temporary(url.as_str()))
                .into_response()
        }
        Err(e) => match e.as_ref().class() {
            Some(class) => {
                Redirect::temporary(&gate.error_location(&class))
                    .into_response()
            }
            None => Error::internal(&e).into_response(),
        },
    }
}

/// Query parameters of a provider sign-in callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code issued by the provider.
    pub code: Option<String>,

    /// `state` value echoed back by the provider.
    pub state: Option<String>,

    /// Error reported by the provider instead of a code.
    pub error: Option<String>,
}

/// `GET /auth/callback/{provider}` handler completing a provider sign-in.
///
/// On success issues a session, sets the session cookie and redirects to the
/// application root. Provider-classified failures redirect to the sign-in
/// page carrying the error code; everything else surfaces as an internal
/// error.
pub async fn callback(
    Extension(service): Extension<Service>,
    Extension(gate): Extension<Arc<Gate>>,
    Extension(public_url): Extension<PublicUrl>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Response {
    let Ok(provider) = provider.parse::<account::Provider>() else {
        return Redirect::temporary(
            &gate.error_location(&identity::Class::Signin),
        )
        .into_response();
    };

    if let Some(error) = &query.error {
        let class = if error == "access_denied" {
            identity::Class::AccessDenied
        } else {
            identity::Class::Callback
        };
        return Redirect::temporary(&gate.error_location(&class))
            .into_response();
    }

    let presented = query.state.as_deref().unwrap_or_default();
    let expected = jar.get(STATE_COOKIE).map(Cookie::value);
    if presented.is_empty() || expected != Some(presented) {
        return Redirect::temporary(
            &gate.error_location(&identity::Class::Callback),
        )
        .into_response();
    }

    let Some(code) = query
        .code
        .as_deref()
        .and_then(identity::AuthorizationCode::new)
    else {
        return Redirect::temporary(
            &gate.error_location(&identity::Class::Callback),
        )
        .into_response();
    };

    let user = match service
        .execute(command::SignInUser {
            provider: provider.clone(),
            code,
            redirect_uri: public_url.callback(&provider),
        })
        .await
    {
        Ok(user) => user,
        Err(e) => {
            use command::sign_in_user::ExecutionError as E;

            return match e.as_ref() {
                E::Exchange(inner) => match inner.class() {
                    Some(class) => Redirect::temporary(
                        &gate.error_location(&class),
                    )
                    .into_response(),
                    None => e.as_error().into_response(),
                },
                E::AccountNotLinked(_) => Redirect::temporary(
                    &gate.error_location(&"OAuthAccountNotLinked"),
                )
                .into_response(),
                E::Db(_) | E::UserNotExists(_) => {
                    e.as_error().into_response()
                }
            };
        }
    };

    finish_sign_in(&service, &public_url, jar, user.id).await
}

/// Request body of an email sign-in.
#[derive(Debug, Deserialize)]
pub struct EmailSignin {
    /// Email address to send the sign-in link to.
    pub email: String,
}

/// `POST /auth/signin/email` handler starting an email sign-in.
///
/// Issues a one-time verification token. Delivery transport is out of scope:
/// the sign-in link is surfaced via the operator log and never returned in
/// the response.
pub async fn signin_email(
    Extension(service): Extension<Service>,
    Extension(public_url): Extension<PublicUrl>,
    Json(body): Json<EmailSignin>,
) -> Result<Json<Accepted>, Error> {
    let Some(identifier) = user::Email::new(body.email) else {
        return Err(ApiError::InvalidEmail.into());
    };

    let token = service
        .execute(command::CreateVerificationToken { identifier })
        .await
        .map_err(|e| e.as_error())?;

    log::info!(
        "email sign-in link issued: \
         {}/auth/callback/email?token={}&email={}",
        public_url.0.trim_end_matches('/'),
        token.token,
        token.identifier,
    );

    Ok(Json(Accepted { ok: true }))
}

/// Query parameters of an email sign-in callback.
#[derive(Debug, Deserialize)]
pub struct EmailCallbackQuery {
    /// Presented one-time token value.
    pub token: String,

    /// Email address the token was issued for.
    pub email: String,
}

/// `GET /auth/callback/email` handler completing an email sign-in.
pub async fn callback_email(
    Extension(service): Extension<Service>,
    Extension(gate): Extension<Arc<Gate>>,
    Extension(public_url): Extension<PublicUrl>,
    Query(query): Query<EmailCallbackQuery>,
    jar: CookieJar,
) -> Response {
    let verification_error =
        || Redirect::temporary(&gate.error_location(&"Verification"));

    let Some(identifier) = user::Email::new(query.email) else {
        return verification_error().into_response();
    };
    let Ok(token) = query.token.parse::<verification::Token>() else {
        return verification_error().into_response();
    };

    match service
        .execute(command::SignInEmail { identifier, token })
        .await
    {
        Ok(user) => {
            finish_sign_in(&service, &public_url, jar, user.id).await
        }
        Err(e) => {
            use command::sign_in_email::ExecutionError as E;

            match e.as_ref() {
                E::TokenNotExists | E::TokenExpired => {
                    verification_error().into_response()
                }
                E::Db(_) => e.as_error().into_response(),
            }
        }
    }
}

/// Issues a session for the signed-in [`user::Id`], sets the session cookie
/// and redirects to the application root.
async fn finish_sign_in(
    service: &Service,
    public_url: &PublicUrl,
    jar: CookieJar,
    user_id: user::Id,
) -> Response {
    let issued = match service
        .execute(command::CreateUserSession { user_id })
        .await
    {
        Ok(issued) => issued,
        Err(e) => return e.as_error().into_response(),
    };

    let session_cookie = Cookie::build((
        SESSION_COOKIE,
        issued.token.to_string(),
    ))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(public_url.is_secure())
    .build();

    let jar = jar
        .remove(Cookie::build((STATE_COOKIE, "")).path("/auth").build())
        .add(session_cookie);

    (jar, Redirect::temporary("/")).into_response()
}

/// `GET /auth/session` handler returning the current session view.
///
/// Responds with `null` when the request carries no valid session: unlike
/// gated routes, this endpoint never rejects or redirects.
pub async fn session(
    context: Context,
) -> Result<Json<Option<SessionView>>, Error> {
    let Some(session) = context.try_current_session().await? else {
        return Ok(Json(None));
    };

    let Some(user) = context
        .service()
        .execute(query::user::ById::by(session.user_id))
        .await
        .map_err(|e| e.as_error())?
    else {
        return Ok(Json(None));
    };

    Ok(Json(Some(SessionView {
        user: UserView {
            id: user.id.to_string(),
            name: user.name.map(|n| n.to_string()),
            email: user.email.map(|e| e.to_string()),
            image: user.image.map(|i| i.to_string()),
        },
        expires_at: session.expires_at.to_rfc3339(),
    })))
}

/// View rendered by the [`session`] handler.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Authenticated user.
    pub user: UserView,

    /// Expiration of the session, as an RFC 3339 string.
    pub expires_at: String,
}

/// User view of a [`SessionView`].
#[derive(Debug, Serialize)]
pub struct UserView {
    /// ID of the user.
    pub id: String,

    /// Display name of the user.
    pub name: Option<String>,

    /// Email of the user.
    pub email: Option<String>,

    /// Avatar image URL of the user.
    pub image: Option<String>,
}

/// `GET /auth/authenticators` handler listing the public-key credentials
/// registered for the current user.
pub async fn authenticators(
    context: Context,
) -> Result<Json<Authenticators>, Error> {
    let session = context.current_session().await?;

    let registered = context
        .service()
        .execute(query::authenticators::ByUser::by(session.user_id))
        .await
        .map_err(|e| e.as_error())?;

    Ok(Json(Authenticators {
        authenticators: registered
            .into_iter()
            .map(|a| AuthenticatorView {
                credential_id: a.credential_id.to_string(),
                device_type: a.device_type.to_string(),
                backed_up: a.backed_up,
                transports: a.transports.map(|t| t.to_string()),
            })
            .collect(),
    }))
}

/// View rendered by the [`authenticators`] handler.
#[derive(Debug, Serialize)]
pub struct Authenticators {
    /// Registered public-key credentials of the current user.
    pub authenticators: Vec<AuthenticatorView>,
}

/// Single credential view of the [`Authenticators`].
#[derive(Debug, Serialize)]
pub struct AuthenticatorView {
    /// ID of the credential.
    pub credential_id: String,

    /// Device type of the credential.
    pub device_type: String,

    /// Whether the credential is backed up.
    pub backed_up: bool,

    /// Transports the credential supports.
    pub transports: Option<String>,
}

/// `POST /auth/signout` handler terminating the current session.
pub async fn signout(
    context: Context,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Accepted>), Error> {
    if let Some(session) = context.try_current_session().await? {
        context
            .service()
            .execute(command::TerminateUserSession {
                token: session.token,
            })
            .await
            .map_err(|e| e.as_error())?;
    }

    let jar =
        jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());

    Ok((jar, Json(Accepted { ok: true })))
}

/// Acknowledgement body of a state-changing handler.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Accepted {
    /// Whether the request was accepted.
    pub ok: bool,
}

impl AsError for command::sign_in_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::sign_in_user::ExecutionError as E;

        match self {
            E::Db(e) => e.try_as_error(),
            E::Exchange(_) | E::AccountNotLinked(_) | E::UserNotExists(_) => {
                None
            }
        }
    }
}

impl AsError for command::sign_in_email::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::sign_in_email::ExecutionError as E;

        match self {
            E::Db(e) => e.try_as_error(),
            E::TokenNotExists | E::TokenExpired => None,
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::create_user_session::ExecutionError as E;

        match self {
            E::Db(e) => e.try_as_error(),
            E::JsonWebTokenEncodeError(_) | E::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::create_verification_token::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::create_verification_token::ExecutionError as E;

        match self {
            E::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::terminate_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::terminate_user_session::ExecutionError as E;

        match self {
            E::Db(e) => e.try_as_error(),
        }
    }
}

define_error! {
    enum ApiError {
        #[code = "INVALID_EMAIL"]
        #[status = BAD_REQUEST]
        #[message = "Invalid email address"]
        InvalidEmail,
    }
}
