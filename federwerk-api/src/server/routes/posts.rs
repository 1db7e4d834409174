use crate::server::auth::{CurrentUser, RequireUser};
use crate::server::form::Form;
use crate::server::json::Json;
use crate::server::{Result, ServerError, ServerRouter, redirect};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use federwerk_common::model::Id;
use federwerk_common::model::post::{CreatePost, Post, PostFieldErrors, PostMarker};
use federwerk_common::model::session::SessionIdentity;
use federwerk_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(home)
        .typed_get(new_post_form)
        .typed_post(create_post)
        .typed_get(get_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/")]
struct HomePath;

/// Everything the post list page needs; rendering happens elsewhere.
#[derive(Debug, Serialize)]
struct HomeBundle {
    user: Option<SessionIdentity>,
    posts: Vec<Post>,
}

async fn home(
    _: HomePath,
    CurrentUser(user): CurrentUser,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<HomeBundle>> {
    let posts = db.fetch_posts().await?;

    Ok(Json(HomeBundle { user, posts }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/post/new")]
struct NewPostPath;

#[derive(Debug, Serialize)]
struct NewPostBundle {
    user: SessionIdentity,
}

async fn new_post_form(_: NewPostPath, RequireUser(user): RequireUser) -> Json<NewPostBundle> {
    Json(NewPostBundle { user })
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/post")]
struct CreatePostPath;

#[derive(Clone, Deserialize)]
struct PostForm {
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct PostRejection {
    errors: PostFieldErrors,
    title: String,
    body: String,
}

async fn create_post(
    _: CreatePostPath,
    RequireUser(user): RequireUser,
    State(db): State<Arc<DbClient>>,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    match CreatePost::new(user.username, &form.title, &form.body) {
        Ok(post) => {
            db.create_post(&post).await?;
            Ok(redirect("/"))
        }
        Err(errors) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(PostRejection {
                errors,
                title: form.title,
                body: form.body,
            }),
        )
            .into_response()),
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/post/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}
