use crate::server::redirect;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use federwerk_common::model::session::{SessionCodec, SessionIdentity};
use std::{convert::Infallible, sync::Arc};

pub const SESSION_COOKIE: &str = "session_token";
pub const LOGIN_PROMPT_TARGET: &str = "/?error=Please%20log%20in%20first";

/// The request's identity, if a valid session cookie came along. An absent
/// or undecodable cookie means anonymous; this extractor never rejects.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Option<SessionIdentity>);

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<SessionCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = Arc::<SessionCodec>::from_ref(state);
        let identity = CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .and_then(|cookie| codec.decode(cookie.value()).ok());

        Ok(Self(identity))
    }
}

/// Gate for authoring routes. Anonymous requests are sent back home with a
/// human-readable prompt instead of an error status.
#[derive(Clone, Debug)]
pub struct RequireUser(pub SessionIdentity);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LoginPromptRedirect;

impl IntoResponse for LoginPromptRedirect {
    fn into_response(self) -> Response {
        redirect(LOGIN_PROMPT_TARGET)
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    Arc<SessionCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = LoginPromptRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(CurrentUser(Some(identity))) => Ok(Self(identity)),
            Ok(CurrentUser(None)) => Err(LoginPromptRedirect),
            Err(infallible) => match infallible {},
        }
    }
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .build()
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/").build())
}
