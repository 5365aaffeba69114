//! 相关文章查找
//!
//! 按优先级依次尝试四个阶段，凑满 `limit` 篇即停止：
//!
//! 1. 标题关键字
//! 2. 相同标签
//! 3. 相同分类
//! 4. 最新发布
//!
//! 每个阶段内部按发布时间倒序，不计算相关度分数。

use std::collections::HashSet;

use tracing::instrument;

use crate::{
    error::Result,
    storage::{Candidate, Post, PostQuery},
};

/// 默认返回的相关文章数量
pub const DEFAULT_LIMIT: usize = 2;

const STOP_WORDS: [&str; 12] = [
    "the", "and", "for", "with", "this", "that", "from", "have", "will", "your", "are", "not",
];

/// 从标题中提取关键字
///
/// 转小写，非单词字符（`[A-Za-z0-9_]` 与空白以外）替换为空格后按空白切分，
/// 只保留长度大于 3 且不在停用词中的词，按在标题中出现的顺序去重。
pub fn title_keywords(title: &str) -> Vec<String> {
    let normalized: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for word in normalized.split_whitespace() {
        if word.len() <= 3 || STOP_WORDS.contains(&word) {
            continue;
        }
        if !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }
    keywords
}

/// 查找结果的累加器
///
/// 按加入顺序保存文章，并记录已经出现过的 id，保证跨阶段不重复。
#[derive(Debug)]
pub struct Related {
    source_id: i64,
    limit: usize,
    posts: Vec<Post>,
    seen: HashSet<i64>,
}

impl Related {
    pub fn new(source_id: i64, limit: usize) -> Self {
        Self {
            source_id,
            limit,
            posts: Vec::with_capacity(limit.min(16)),
            seen: HashSet::new(),
        }
    }

    /// 还差多少篇
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.posts.len())
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    pub fn seen(&self) -> &HashSet<i64> {
        &self.seen
    }

    /// 加入尚未出现过的文章，返回实际加入的数量
    pub fn absorb(&mut self, posts: Vec<Post>) -> usize {
        let mut added = 0;
        for post in posts {
            if self.is_full() {
                break;
            }
            if post.id == self.source_id || !self.seen.insert(post.id) {
                continue;
            }
            self.posts.push(post);
            added += 1;
        }
        added
    }

    pub fn into_posts(mut self) -> Vec<Post> {
        self.posts.truncate(self.limit);
        self.posts
    }
}

/// 查找与 `slug` 相关的文章，最多 `limit` 篇
///
/// 文章不存在时返回空列表；结果中不会出现源文章，也不会有重复。
/// 任一查询失败都会中止整个查找。
#[instrument(skip(store))]
pub async fn find_related<Q: PostQuery>(
    store: &Q,
    slug: &str,
    limit: usize,
) -> Result<Vec<Post>> {
    let Some(source) = store.get_by_slug(slug).await? else {
        return Ok(Vec::new());
    };

    let mut related = Related::new(source.id, limit);

    by_title_keywords(store, &source, &mut related).await?;
    by_tags(store, &source, &mut related).await?;
    by_category(store, &source, &mut related).await?;
    by_freshness(store, &source, &mut related).await?;

    Ok(related.into_posts())
}

async fn by_title_keywords<Q: PostQuery>(
    store: &Q,
    source: &Post,
    related: &mut Related,
) -> Result<()> {
    let mut added = 0;
    for keyword in title_keywords(&source.title) {
        if related.is_full() {
            break;
        }
        added += take(store, source, related, Candidate::TitleContains(&keyword)).await?;
    }
    tracing::debug!(added, "title keyword stage");
    Ok(())
}

async fn by_tags<Q: PostQuery>(store: &Q, source: &Post, related: &mut Related) -> Result<()> {
    let mut tried = HashSet::new();
    let mut added = 0;
    for tag in &source.tags {
        if related.is_full() {
            break;
        }
        if !tried.insert(tag.as_str()) {
            continue;
        }
        added += take(store, source, related, Candidate::Tag(tag)).await?;
    }
    tracing::debug!(added, "tag stage");
    Ok(())
}

async fn by_category<Q: PostQuery>(store: &Q, source: &Post, related: &mut Related) -> Result<()> {
    if related.is_full() {
        return Ok(());
    }
    let added = take(store, source, related, Candidate::Category(&source.category)).await?;
    tracing::debug!(added, "category stage");
    Ok(())
}

async fn by_freshness<Q: PostQuery>(
    store: &Q,
    source: &Post,
    related: &mut Related,
) -> Result<()> {
    if related.is_full() {
        return Ok(());
    }
    let added = take(store, source, related, Candidate::Any).await?;
    tracing::debug!(added, "freshness stage");
    Ok(())
}

/// 查询一批候选文章并加入累加器
async fn take<Q: PostQuery>(
    store: &Q,
    source: &Post,
    related: &mut Related,
    filter: Candidate<'_>,
) -> Result<usize> {
    let posts = store
        .candidates(source.id, related.seen(), filter, related.remaining())
        .await?;
    Ok(related.absorb(posts))
}
