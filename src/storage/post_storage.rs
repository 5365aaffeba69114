use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use super::{
    Db, NewPost, Post, PostPatch, codec,
    post_query::{fetch_by_id, fetch_by_slug},
    sqlite::timestamp,
};
use crate::error::{Error, Result};

/// 提供文章的写操作接口
///
/// 文章只会被创建和更新，不提供删除。
pub trait PostStorage: Send {
    /// 获取 SQL 执行器，用于 [`sqlx::query()`] 执行
    fn executor<'t>(&'t mut self) -> impl SqliteExecutor<'t>;

    /// 创建文章
    ///
    /// `views` 置 0，发布时间与更新时间都取当前时间，返回按新 id 回查到的文章。
    /// 空的封面地址按 `NULL` 存储。
    /// slug 已存在时返回 [`Error::ConstraintViolation`]，表中数据不变。
    fn create(&mut self, post: &NewPost) -> impl Future<Output = Result<Post>> + Send {
        async move {
            let now = timestamp(Utc::now());
            let tags = codec::encode_tags(&post.tags)?;
            let media = codec::encode_media(post.embedded_media.as_deref())?;

            let id = sqlx::query(
                "
                INSERT INTO posts
                    (slug, title, content, excerpt, author, tags, cover_image, category,
                     embedded_media, published_at, updated_at, views)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
                ",
            )
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.excerpt)
            .bind(&post.author)
            .bind(&tags)
            .bind(post.cover_image.as_deref().filter(|url| !url.is_empty()))
            .bind(post.category())
            .bind(media.as_deref())
            .bind(&now)
            .bind(&now)
            .execute(self.executor())
            .await?
            .last_insert_rowid();

            tracing::debug!(id, slug = %post.slug, "post created");

            fetch_by_id(self.executor(), id)
                .await?
                .ok_or(Error::MissingAfterInsert(id))
        }
    }

    /// 局部更新文章
    ///
    /// 只写入 [`PostPatch`] 中给出的字段，`updated_at` 总是刷新。
    /// slug 不存在时返回 `None`，不产生任何写入。
    fn update(
        &mut self,
        slug: &str,
        patch: &PostPatch,
    ) -> impl Future<Output = Result<Option<Post>>> + Send {
        async move {
            let now = timestamp(Utc::now());
            let tags = patch.tags.as_deref().map(codec::encode_tags).transpose()?;
            let media = match patch.embedded_media.as_change() {
                Some(media) => Some(codec::encode_media(media.map(Vec::as_slice))?),
                None => None,
            };

            let mut builder = QueryBuilder::<Sqlite>::new("UPDATE posts SET ");
            let mut sets = builder.separated(", ");

            if let Some(title) = &patch.title {
                sets.push("title = ").push_bind_unseparated(title);
            }
            if let Some(content) = &patch.content {
                sets.push("content = ").push_bind_unseparated(content);
            }
            if let Some(excerpt) = &patch.excerpt {
                sets.push("excerpt = ").push_bind_unseparated(excerpt);
            }
            if let Some(author) = &patch.author {
                sets.push("author = ").push_bind_unseparated(author);
            }
            if let Some(tags) = &tags {
                sets.push("tags = ").push_bind_unseparated(tags);
            }
            if let Some(cover_image) = patch.cover_image.as_change() {
                let cover_image = cover_image.map(String::as_str).filter(|url| !url.is_empty());
                sets.push("cover_image = ").push_bind_unseparated(cover_image);
            }
            if let Some(category) = &patch.category {
                sets.push("category = ").push_bind_unseparated(category);
            }
            if let Some(media) = &media {
                sets.push("embedded_media = ")
                    .push_bind_unseparated(media.as_deref());
            }
            sets.push("updated_at = ").push_bind_unseparated(&now);

            builder.push(" WHERE slug = ").push_bind(slug);

            let done = builder.build().execute(self.executor()).await?;
            if done.rows_affected() == 0 {
                return Ok(None);
            }

            fetch_by_slug(self.executor(), slug).await
        }
    }

    /// 浏览次数加一，slug 不存在时什么也不做
    fn increment_views(&mut self, slug: &str) -> impl Future<Output = Result<()>> + Send {
        async move {
            sqlx::query("UPDATE posts SET views = views + 1 WHERE slug = ?")
                .bind(slug)
                .execute(self.executor())
                .await?;
            Ok(())
        }
    }
}

/// 为 [`sqlx::Transaction`] 实现 [`PostStorage`]
impl PostStorage for sqlx::Transaction<'_, Sqlite> {
    fn executor<'t>(&'t mut self) -> impl SqliteExecutor<'t> {
        &mut **self
    }
}

/// 为 [`Db`] 实现 [`PostStorage`]
impl PostStorage for &'_ Db {
    fn executor<'t>(&'t mut self) -> impl SqliteExecutor<'t> {
        *self
    }
}
