use crate::server::auth::{clear_session_cookie, session_cookie};
use crate::server::form::Form;
use crate::server::json::Json;
use crate::server::{Result, ServerError, ServerRouter, redirect};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::routing::{RouterExt, TypedPath};
use federwerk_common::model::session::{SessionCodec, SessionIdentity};
use federwerk_common::model::user::{
    CreateUser, MESSAGE_USERNAME_TAKEN, SignupErrors, SignupFields, Username,
};
use federwerk_common::password;
use federwerk_db::client::{DbClient, DbError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_post(signup)
        .typed_post(login)
        .typed_get(logout)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/signup")]
struct SignupPath;

/// Violation set plus the submitted values, echoed untrimmed so the form can
/// be redisplayed as typed.
#[derive(Debug, Serialize)]
struct SignupRejection {
    errors: SignupErrors,
    username: String,
    email: String,
}

fn signup_rejection(errors: SignupErrors, fields: &SignupFields) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(SignupRejection {
            errors,
            username: fields.username.clone(),
            email: fields.email.clone(),
        }),
    )
        .into_response()
}

fn username_taken() -> SignupErrors {
    SignupErrors {
        username: Some(MESSAGE_USERNAME_TAKEN),
        ..SignupErrors::default()
    }
}

async fn signup(
    _: SignupPath,
    State(db): State<Arc<DbClient>>,
    Form(fields): Form<SignupFields>,
) -> Result<Response> {
    match fields.validate() {
        Ok(valid) => {
            if db.fetch_user_by_username(&valid.username).await?.is_some() {
                return Ok(signup_rejection(username_taken(), &fields));
            }

            let create = CreateUser {
                password_hash: password::hash(&valid.password)?,
                username: valid.username,
                email: valid.email,
            };

            match db.create_user(&create).await {
                Ok(_) => Ok(redirect("/login")),
                // lost a concurrent race; the unique constraint is the arbiter
                // and the surface is the same as the pre-check above
                Err(DbError::DuplicateUsername) => Ok(signup_rejection(username_taken(), &fields)),
                Err(err) => Err(err.into()),
            }
        }
        Err(mut errors) => {
            // a taken username is reported together with the field errors,
            // not on a later attempt
            if errors.username.is_none()
                && let Ok(username) = Username::new(fields.username.clone())
                && db.fetch_user_by_username(&username).await?.is_some()
            {
                errors.username = Some(MESSAGE_USERNAME_TAKEN);
            }

            Ok(signup_rejection(errors, &fields))
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/login")]
struct LoginPath;

#[derive(Clone, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(
    _: LoginPath,
    State(db): State<Arc<DbClient>>,
    State(codec): State<Arc<SessionCodec>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Response)> {
    // an unusable username cannot match any stored user; same surface as a
    // wrong password so usernames cannot be enumerated
    let username = Username::new(form.username).map_err(|_| ServerError::InvalidCredentials)?;
    let user = db
        .fetch_user_by_credentials(&username, &form.password)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    let identity = SessionIdentity {
        id: user.id,
        username: user.username,
    };
    let token = codec.encode(&identity)?;

    Ok((jar.add(session_cookie(token)), redirect("/")))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/logout")]
struct LogoutPath;

async fn logout(_: LogoutPath, jar: CookieJar) -> (CookieJar, Response) {
    (clear_session_cookie(jar), redirect("/"))
}
