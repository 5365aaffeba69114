use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router};

use super::{ApiError, Db, PostStorage, Result};

use crate::{
    state::AppState,
    storage::{NewPost, Post, PostPatch},
};

/// 配置文章写入相关路由。
///
/// - `POST /posts`：创建文章，slug 重复时返回 409
/// - `PATCH /posts/{slug}`：局部更新文章
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{slug}", patch(update_post))
}

async fn create_post(
    State(pool): State<Db>,
    Json(data): Json<NewPost>,
) -> Result<(StatusCode, Json<Post>)> {
    let mut storage = &pool;
    let post = storage.create(&data).await?;

    tracing::info!(slug = %post.slug, id = post.id, "post published");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    Path(slug): Path<String>,
    State(pool): State<Db>,
    Json(patch): Json<PostPatch>,
) -> Result<Json<Post>> {
    let mut storage = &pool;
    let post = storage
        .update(&slug, &patch)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(post))
}
