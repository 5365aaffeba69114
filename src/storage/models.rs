use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::codec;

/// 未指定分类时使用的兜底分类
pub const DEFAULT_CATEGORY: &str = "All Blog Posts";

/// 文章
///
/// 标签与嵌入媒体已经解码为结构化序列，参见 [`codec`]。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// 存储分配的自增 id
    pub id: i64,
    /// 文章唯一标识
    pub slug: String,
    /// 标题
    pub title: String,
    /// 正文
    pub content: String,
    /// 摘要
    pub excerpt: String,
    /// 作者
    pub author: String,
    /// 标签列表
    pub tags: Vec<String>,
    /// 封面图
    pub cover_image: Option<String>,
    /// 分类
    pub category: String,
    /// 嵌入媒体，参见 [`EmbeddedMedia`]
    pub embedded_media: Option<Vec<EmbeddedMedia>>,
    /// 发布时间
    pub published_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
    /// 浏览次数
    pub views: i64,
}

/// `posts` 表的原始行
///
/// `tags` 与 `embedded_media` 保持序列化后的文本，由 [`Post::try_from`] 解码。
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub tags: String,
    pub cover_image: Option<String>,
    pub category: String,
    pub embedded_media: Option<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub views: i64,
}

impl TryFrom<PostRow> for Post {
    type Error = serde_json::Error;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let embedded_media = codec::decode_media(row.embedded_media.as_deref())?;
        let tags = codec::decode_tags(&row.tags);

        Ok(Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            content: row.content,
            excerpt: row.excerpt,
            author: row.author,
            tags,
            cover_image: row.cover_image,
            category: row.category,
            embedded_media,
            published_at: row.published_at,
            updated_at: row.updated_at,
            views: row.views,
        })
    }
}

/// 嵌入媒体引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedMedia {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<MediaPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Youtube,
    Vimeo,
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaPosition {
    Inline,
    Right,
    Left,
    FullWidth,
}

/// 创建文章所需的数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_media: Option<Vec<EmbeddedMedia>>,
}

impl NewPost {
    /// 实际写入的分类，未设置或为空时回落到 [`DEFAULT_CATEGORY`]
    pub fn category(&self) -> &str {
        match self.category.as_deref() {
            Some(category) if !category.is_empty() => category,
            _ => DEFAULT_CATEGORY,
        }
    }
}

/// 可空字段的局部更新
///
/// - [`Patch::Unset`]：不修改
/// - [`Patch::Null`]：置为 `NULL`
/// - [`Patch::Value`]：写入新值
///
/// 反序列化时缺省的键为 `Unset`（需配合 `#[serde(default)]`），显式的 `null` 为 `Null`。
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Unset,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Unset
    }
}

impl<T> Patch<T> {
    /// `None` 表示不修改，`Some(None)` 表示置空
    pub fn as_change(&self) -> Option<Option<&T>> {
        match self {
            Patch::Unset => None,
            Patch::Null => Some(None),
            Patch::Value(v) => Some(Some(v)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Into::into)
    }
}

/// 文章的局部更新，只有给出的字段会被写入
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover_image: Patch<String>,
    pub category: Option<String>,
    pub embedded_media: Patch<Vec<EmbeddedMedia>>,
}
