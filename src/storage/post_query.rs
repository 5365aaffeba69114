use std::collections::HashSet;

use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use super::{Db, Post, models::PostRow};
use crate::error::Result;

/// 拼接查询 `posts` 全部列的 SQL
macro_rules! select_posts {
    ($tail:literal) => {
        concat!(
            "SELECT id, slug, title, content, excerpt, author, tags, cover_image, category, ",
            "embedded_media, published_at, updated_at, views FROM posts ",
            $tail
        )
    };
}

/// 最新发布的排前面，同一时间按 id 升序
const RECENT_FIRST: &str = " ORDER BY published_at DESC, id ASC";

/// 候选文章的过滤条件，供相关文章查找使用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate<'a> {
    /// 标题包含关键字（不区分大小写）
    TitleContains(&'a str),
    /// 标签列表中有完全相同的一项
    Tag(&'a str),
    /// 分类完全相同
    Category(&'a str),
    /// 不做过滤
    Any,
}

/// 查询文章相关数据
///
/// 提供按 id / slug 获取、分页列表、按标签和分类过滤以及分类列表的接口。
/// 文章不存在时返回 `None`，不视为错误。
pub trait PostQuery: Send + Sync {
    fn get_by_id(&self, id: i64) -> impl Future<Output = Result<Option<Post>>> + Send;

    fn get_by_slug(&self, slug: &str) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// 按发布时间倒序分页；只有给出 `limit` 时 `offset` 才生效
    fn list(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> impl Future<Output = Result<Vec<Post>>> + Send;

    fn count(&self) -> impl Future<Output = Result<i64>> + Send;

    /// 标签列表中含有 `tag` 的文章
    ///
    /// 按单个标签项精确匹配，`art` 不会匹配到 `chart`。
    fn list_by_tag(&self, tag: &str) -> impl Future<Output = Result<Vec<Post>>> + Send;

    /// 与 [`PostQuery::list`] 相同的排序和分页规则
    fn list_by_category(
        &self,
        category: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> impl Future<Output = Result<Vec<Post>>> + Send;

    fn count_by_category(&self, category: &str) -> impl Future<Output = Result<i64>> + Send;

    /// 去重后按字母序排列的分类
    fn categories(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// 查询候选文章
    ///
    /// 排除 `source_id` 与 `exclude` 中的 id，按 [`Candidate`] 过滤，
    /// 最新发布的排前面，最多返回 `limit` 篇。
    fn candidates(
        &self,
        source_id: i64,
        exclude: &HashSet<i64>,
        filter: Candidate<'_>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Post>>> + Send;
}

impl PostQuery for Db {
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        fetch_by_id(self, id).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        fetch_by_slug(self, slug).await
    }

    async fn list(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<Post>> {
        let mut builder = QueryBuilder::new(select_posts!(""));
        builder.push(RECENT_FIRST);
        paginate(&mut builder, limit, offset);
        fetch_all(builder, self).await
    }

    async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self)
            .await?)
    }

    async fn list_by_tag(&self, tag: &str) -> Result<Vec<Post>> {
        let mut builder = QueryBuilder::new(select_posts!("WHERE "));
        push_filter(&mut builder, Candidate::Tag(tag));
        builder.push(RECENT_FIRST);
        fetch_all(builder, self).await
    }

    async fn list_by_category(
        &self,
        category: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Post>> {
        let mut builder = QueryBuilder::new(select_posts!("WHERE "));
        push_filter(&mut builder, Candidate::Category(category));
        builder.push(RECENT_FIRST);
        paginate(&mut builder, limit, offset);
        fetch_all(builder, self).await
    }

    async fn count_by_category(&self, category: &str) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE category = ?")
                .bind(category)
                .fetch_one(self)
                .await?,
        )
    }

    async fn categories(&self) -> Result<Vec<String>> {
        Ok(
            sqlx::query_scalar("SELECT DISTINCT category FROM posts ORDER BY category")
                .fetch_all(self)
                .await?,
        )
    }

    async fn candidates(
        &self,
        source_id: i64,
        exclude: &HashSet<i64>,
        filter: Candidate<'_>,
        limit: usize,
    ) -> Result<Vec<Post>> {
        let mut builder = QueryBuilder::new(select_posts!("WHERE id != "));
        builder.push_bind(source_id);

        // 已选中的 id 作为单个 JSON 数组绑定
        if !exclude.is_empty() {
            let ids = serde_json::to_string(exclude)?;
            builder
                .push(" AND id NOT IN (SELECT value FROM json_each(")
                .push_bind(ids)
                .push("))");
        }

        if filter != Candidate::Any {
            builder.push(" AND ");
            push_filter(&mut builder, filter);
        }

        builder.push(RECENT_FIRST);
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        fetch_all(builder, self).await
    }
}

/// 追加过滤条件
///
/// 标签列不是 JSON 数组时按空数组处理，该行不匹配但不会让整条查询失败。
fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: Candidate<'a>) {
    match filter {
        Candidate::TitleContains(keyword) => {
            // instr 不会把 `%` / `_` 当作通配符
            builder
                .push("instr(lower(title), ")
                .push_bind(keyword.to_lowercase())
                .push(") > 0");
        }
        Candidate::Tag(tag) => {
            builder
                .push(
                    "EXISTS (SELECT 1 FROM json_each(CASE \
                     WHEN NOT json_valid(posts.tags) THEN '[]' \
                     WHEN json_type(posts.tags) = 'array' THEN posts.tags \
                     ELSE '[]' END) WHERE json_each.value = ",
                )
                .push_bind(tag)
                .push(")");
        }
        Candidate::Category(category) => {
            builder.push("category = ").push_bind(category);
        }
        Candidate::Any => {
            builder.push("1 = 1");
        }
    }
}

fn paginate(builder: &mut QueryBuilder<'_, Sqlite>, limit: Option<u32>, offset: Option<u32>) {
    if let Some(limit) = limit {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
        if let Some(offset) = offset {
            builder.push(" OFFSET ").push_bind(i64::from(offset));
        }
    }
}

async fn fetch_all(mut builder: QueryBuilder<'_, Sqlite>, db: &Db) -> Result<Vec<Post>> {
    builder
        .build_query_as::<PostRow>()
        .fetch_all(db)
        .await?
        .into_iter()
        .map(|row| Post::try_from(row).map_err(Into::into))
        .collect()
}

pub(crate) async fn fetch_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> Result<Option<Post>> {
    let row = sqlx::query_as::<_, PostRow>(select_posts!("WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Post::try_from).transpose()?)
}

pub(crate) async fn fetch_by_slug<'e>(
    executor: impl SqliteExecutor<'e>,
    slug: &str,
) -> Result<Option<Post>> {
    let row = sqlx::query_as::<_, PostRow>(select_posts!("WHERE slug = ?"))
        .bind(slug)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Post::try_from).transpose()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        DEFAULT_CATEGORY, PostStorage,
        testing::{backdate, memory_db, new_post, tagged},
    };

    #[tokio::test]
    async fn test_list_orders_by_published_at_then_id() {
        let db = memory_db().await;
        let mut storage = &db;
        for slug in ["a", "b", "c", "d"] {
            storage.create(&new_post(slug, slug)).await.unwrap();
        }
        backdate(&db, "a", "2024-01-01T00:00:00.000Z").await;
        backdate(&db, "b", "2024-03-01T00:00:00.000Z").await;
        backdate(&db, "c", "2024-03-01T00:00:00.000Z").await;
        backdate(&db, "d", "2024-02-01T00:00:00.000Z").await;

        let total = db.count().await.unwrap();
        assert_eq!(total, 4);

        let slugs: Vec<_> = db
            .list(Some(total as u32), None)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, ["b", "c", "d", "a"], "同一时间按 id 升序");
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let db = memory_db().await;
        let mut storage = &db;
        for (i, slug) in ["a", "b", "c"].into_iter().enumerate() {
            storage.create(&new_post(slug, slug)).await.unwrap();
            backdate(&db, slug, &format!("2024-01-0{}T00:00:00.000Z", i + 1)).await;
        }

        let all = db.list(None, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let first = db.list(Some(2), None).await.unwrap();
        assert_eq!(first.iter().map(|p| p.slug.as_str()).collect::<Vec<_>>(), ["c", "b"]);

        let second = db.list(Some(2), Some(2)).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].slug, "a");

        assert!(db.list(Some(0), None).await.unwrap().is_empty());
        assert_eq!(db.list(None, Some(2)).await.unwrap().len(), 3, "没有 limit 时忽略 offset");
    }

    #[tokio::test]
    async fn test_get_by_id_and_slug() {
        let db = memory_db().await;
        let created = (&db).create(&new_post("hello", "Hello")).await.unwrap();

        assert_eq!(db.get_by_id(created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(db.get_by_slug("hello").await.unwrap(), Some(created));
        assert_eq!(db.get_by_slug("missing").await.unwrap(), None);
        assert_eq!(db.get_by_id(9999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_by_tag_is_anchored() {
        let db = memory_db().await;
        let mut storage = &db;
        storage.create(&tagged("art-post", &["art"])).await.unwrap();
        storage.create(&tagged("chart-post", &["chart", "data"])).await.unwrap();
        storage.create(&tagged("percent", &["100%"])).await.unwrap();

        let art: Vec<_> = db.list_by_tag("art").await.unwrap();
        assert_eq!(art.len(), 1);
        assert_eq!(art[0].slug, "art-post");

        assert_eq!(db.list_by_tag("data").await.unwrap().len(), 1);
        assert!(db.list_by_tag("ar").await.unwrap().is_empty());
        assert!(db.list_by_tag("%").await.unwrap().is_empty());
        assert_eq!(db.list_by_tag("100%").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_by_tag_skips_malformed_blob() {
        let db = memory_db().await;
        let mut storage = &db;
        storage.create(&tagged("good", &["rust"])).await.unwrap();
        for (slug, raw) in [
            ("bad", "rust, not json"),
            ("scalar", r#""rust""#),
            ("object", r#"{"k":"rust"}"#),
        ] {
            storage.create(&tagged(slug, &["rust"])).await.unwrap();
            sqlx::query("UPDATE posts SET tags = ? WHERE slug = ?")
                .bind(raw)
                .bind(slug)
                .execute(&db)
                .await
                .unwrap();
        }

        let posts = db.list_by_tag("rust").await.unwrap();
        assert_eq!(posts.len(), 1, "只有 JSON 数组形式的标签参与匹配");
        assert_eq!(posts[0].slug, "good");

        for slug in ["bad", "scalar", "object"] {
            let post = db.get_by_slug(slug).await.unwrap().expect("文章应当存在");
            assert!(post.tags.is_empty(), "{slug}: 损坏的标签按空列表处理");
        }
    }

    #[tokio::test]
    async fn test_categories_and_category_listing() {
        let db = memory_db().await;
        let mut storage = &db;
        for (slug, category) in [
            ("e1", Some("Engineering")),
            ("d1", Some("Design")),
            ("e2", Some("Engineering")),
            ("n1", None),
        ] {
            let mut post = new_post(slug, slug);
            post.category = category.map(str::to_string);
            storage.create(&post).await.unwrap();
        }
        backdate(&db, "e1", "2024-01-01T00:00:00.000Z").await;
        backdate(&db, "e2", "2024-02-01T00:00:00.000Z").await;

        assert_eq!(
            db.categories().await.unwrap(),
            [DEFAULT_CATEGORY, "Design", "Engineering"]
        );

        assert_eq!(db.count_by_category("Engineering").await.unwrap(), 2);
        assert_eq!(db.count_by_category("Nope").await.unwrap(), 0);

        let engineering = db.list_by_category("Engineering", None, None).await.unwrap();
        assert_eq!(
            engineering.iter().map(|p| p.slug.as_str()).collect::<Vec<_>>(),
            ["e2", "e1"]
        );

        let page = db.list_by_category("Engineering", Some(1), Some(1)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].slug, "e1");
    }

    #[tokio::test]
    async fn test_candidates_excludes_source_and_seen() {
        let db = memory_db().await;
        let mut storage = &db;
        let source = storage.create(&new_post("src", "Rust Patterns")).await.unwrap();
        let a = storage.create(&new_post("a", "More Rust")).await.unwrap();
        let b = storage.create(&new_post("b", "rust_lang tips")).await.unwrap();
        storage.create(&new_post("c", "Cooking")).await.unwrap();

        let exclude = HashSet::from([a.id]);
        let found = db
            .candidates(source.id, &exclude, Candidate::TitleContains("RUST"), 10)
            .await
            .unwrap();
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), [b.id]);

        let any = db
            .candidates(source.id, &HashSet::new(), Candidate::Any, 2)
            .await
            .unwrap();
        assert_eq!(any.len(), 2);
        assert!(any.iter().all(|p| p.id != source.id));

        let none = db
            .candidates(source.id, &HashSet::new(), Candidate::TitleContains("_"), 10)
            .await
            .unwrap();
        assert_eq!(none.len(), 1, "`_` 按字面匹配");
    }

    #[tokio::test]
    async fn test_candidates_with_huge_exclude_set() {
        let db = memory_db().await;
        let mut storage = &db;
        let source = storage.create(&new_post("src", "Source")).await.unwrap();
        let a = storage.create(&new_post("a", "A")).await.unwrap();
        let b = storage.create(&new_post("b", "B")).await.unwrap();

        // 超过 SQLite 单条语句的绑定参数上限
        let mut exclude: HashSet<i64> = (1_000..41_000).collect();
        exclude.insert(a.id);

        let found = db
            .candidates(source.id, &exclude, Candidate::Any, 40_000)
            .await
            .expect("大量排除 id 时查询不应失败");
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), [b.id]);
    }
}
