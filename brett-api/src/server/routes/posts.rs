use crate::server::{Result, ServerError, ServerRouter, auth::Subject, json::Json};
use axum::{
    extract::{FromRequestParts, Query, State},
    http::{StatusCode, request::Parts},
};
use axum_extra::routing::{RouterExt, TypedPath};
use brett_common::{
    model::{
        Id,
        comment::{Comment, NewCommentRequest},
        post::{NewPostRequest, Post, PostDetail, PostMarker, UpdatePostRequest},
    },
    policy, sanitize,
};
use brett_db::client::{DbClient, PostFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
        .typed_post(create_comment)
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct ListPostsQuery {
    q: Option<String>,
    title: Option<String>,
    content: Option<String>,
    author: Option<String>,
    tag: Option<String>,
    resolved: Option<bool>,
}

impl<S: Send + Sync> FromRequestParts<S> for ListPostsQuery {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<ListPostsQuery>::from_request_parts(parts, state).await?;
        Ok(query)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl From<ListPostsQuery> for PostFilter {
    fn from(query: ListPostsQuery) -> Self {
        Self {
            q: non_empty(query.q),
            title: non_empty(query.title),
            content: non_empty(query.content),
            author: non_empty(query.author),
            tag: non_empty(query.tag),
            resolved: query.resolved,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts", rejection(ServerError))]
struct ListPostsPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct PostListResponse {
    posts: Vec<Post>,
    count: usize,
}

/// Lists posts, newest first. Private posts the subject may not read are
/// still listed, but redacted down to their existence.
async fn list_posts(
    ListPostsPath(): ListPostsPath,
    query: ListPostsQuery,
    State(db): State<Arc<DbClient>>,
    subject: Subject,
) -> Result<Json<PostListResponse>> {
    let posts = db.list_posts(&query.into()).await?;

    let posts: Vec<Post> = posts
        .into_iter()
        .map(|post| policy::redact_for(post, subject.identity()))
        .collect();
    let count = posts.len();

    Ok(Json(PostListResponse { posts, count }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/create", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    subject: Subject,
    Json(request): Json<NewPostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    let new_post = sanitize::sanitize_new_post(&request)?;

    // Private posts need an owner for the access policy to ever admit a
    // non-admin; reject before anything is persisted.
    if new_post.private && subject.identity().is_none() {
        return Err(ServerError::PrivateRequiresAuth);
    }

    let owner = subject.identity().map(|identity| identity.user_id);
    let post = db.create_post(&new_post, owner).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(db): State<Arc<DbClient>>,
    subject: Subject,
) -> Result<Json<PostDetail>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !policy::can_access(&post, subject.identity()) {
        return Err(ServerError::AccessDenied);
    }

    let comments = db.fetch_comments(id).await?;

    Ok(Json(PostDetail { post, comments }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}", rejection(ServerError))]
struct UpdatePostPath {
    id: Id<PostMarker>,
}

async fn update_post(
    UpdatePostPath { id }: UpdatePostPath,
    State(db): State<Arc<DbClient>>,
    subject: Subject,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !policy::can_access(&post, subject.identity()) {
        return Err(ServerError::AccessDenied);
    }

    let patch = sanitize::sanitize_post_patch(&request)?;

    let updated = db
        .update_post(id, &patch)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(updated))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}", rejection(ServerError))]
struct DeletePostPath {
    id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

async fn delete_post(
    DeletePostPath { id }: DeletePostPath,
    State(db): State<Arc<DbClient>>,
    subject: Subject,
) -> Result<Json<MessageResponse>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !policy::can_access(&post, subject.identity()) {
        return Err(ServerError::AccessDenied);
    }

    if !db.delete_post(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "The post was deleted.".to_owned(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}/comments", rejection(ServerError))]
struct CreateCommentPath {
    id: Id<PostMarker>,
}

/// Commenting is gated by the same access predicate as reading: on private
/// posts only the owner and administrators may comment.
async fn create_comment(
    CreateCommentPath { id }: CreateCommentPath,
    State(db): State<Arc<DbClient>>,
    subject: Subject,
    Json(request): Json<NewCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !policy::can_access(&post, subject.identity()) {
        return Err(ServerError::AccessDenied);
    }

    let new_comment = sanitize::sanitize_new_comment(&request)?;
    let owner = subject.identity().map(|identity| identity.user_id);
    let comment = db.create_comment(id, &new_comment, owner).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}
