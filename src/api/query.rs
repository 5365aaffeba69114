use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};

use super::{ApiError, Db, PostQuery, PostStorage, Result};

use crate::{related, state::AppState, storage::Post};

/// 配置文章查询相关路由。
///
/// 路由包括：
/// - `GET /posts`：文章列表
/// - `GET /posts/{slug}`：获取单篇文章，并增加浏览次数
/// - `GET /posts/{slug}/related`：相关文章
/// - `GET /tags/{tag}/posts`：带有某个标签的文章
/// - `GET /categories`：获取所有分类
/// - `GET /categories/{category}/posts`：某个分类下的文章
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/posts", get(post_list))
        .route("/posts/{slug}", get(post))
        .route("/posts/{slug}/related", get(related_posts))
        .route("/tags/{tag}/posts", get(tag_posts))
        .route("/categories", get(category_list))
        .route("/categories/{category}/posts", get(category_posts))
}

/// 分页结果
#[derive(Debug, Serialize)]
pub struct PostPage {
    pub total: i64,
    pub posts: Vec<Post>,
}

/// 查询参数，用于文章列表分页。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelatedParams {
    limit: Option<usize>,
}

/// 获取文章列表。
///
/// 按发布时间倒序，支持 `limit` / `offset` 分页。
async fn post_list(
    Query(params): Query<PageParams>,
    State(pool): State<Db>,
) -> Result<Json<PostPage>> {
    let (total, posts) = tokio::try_join!(pool.count(), pool.list(params.limit, params.offset))?;
    Ok(Json(PostPage { total, posts }))
}

/// 根据 slug 获取单篇文章。
///
/// 文章不存在返回 [`ApiError::NotFound`]；存在时浏览次数加一。
async fn post(Path(slug): Path<String>, State(pool): State<Db>) -> Result<Json<Post>> {
    let post = pool.get_by_slug(&slug).await?.ok_or(ApiError::NotFound)?;

    let mut storage = &pool;
    storage.increment_views(&slug).await?;

    Ok(Json(post))
}

/// 获取相关文章。
///
/// 未指定 `limit` 时使用配置中的默认数量；文章不存在时返回空列表。
async fn related_posts(
    Path(slug): Path<String>,
    Query(params): Query<RelatedParams>,
    State(app): State<AppState>,
) -> Result<Json<Vec<Post>>> {
    let limit = params.limit.unwrap_or(app.related_limit());
    related::find_related(app.pool(), &slug, limit)
        .await
        .map(Json)
}

/// 获取带有指定标签的文章。
async fn tag_posts(Path(tag): Path<String>, State(pool): State<Db>) -> Result<Json<Vec<Post>>> {
    pool.list_by_tag(&tag).await.map(Json)
}

/// 获取所有分类。
async fn category_list(State(pool): State<Db>) -> Result<Json<Vec<String>>> {
    pool.categories().await.map(Json)
}

/// 获取分类下的文章。
///
/// 与文章列表相同的分页规则，`total` 为该分类的文章总数。
async fn category_posts(
    Path(category): Path<String>,
    Query(params): Query<PageParams>,
    State(pool): State<Db>,
) -> Result<Json<PostPage>> {
    let (total, posts) = tokio::try_join!(
        pool.count_by_category(&category),
        pool.list_by_category(&category, params.limit, params.offset)
    )?;
    Ok(Json(PostPage { total, posts }))
}
