use std::path::Path;

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    storage::{EmbeddedMedia, NewPost},
};

/// Markdown 草稿的 YAML Front Matter
#[derive(Debug, Deserialize)]
pub struct FrontMatter {
    pub title: String,
    pub excerpt: String,
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub embedded_media: Option<Vec<EmbeddedMedia>>,
}

pub struct NoContent;
pub struct Content(String);

/// 从 Markdown 文件构建待发布的文章
///
/// slug 取文件名（去掉扩展名），正文为 Front Matter 之后的部分。
///
/// ```ignore
/// let post = Draft::new("posts/hello-world.md")
///     .content(std::fs::read_to_string("posts/hello-world.md")?)
///     .build()?;
/// ```
pub struct Draft<T> {
    slug: String,
    content: T,
}

impl Draft<NoContent> {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let slug = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            slug,
            content: NoContent,
        }
    }

    pub fn content(self, md_content: impl Into<String>) -> Draft<Content> {
        Draft {
            slug: self.slug,
            content: Content(md_content.into()),
        }
    }
}

impl Draft<Content> {
    /// 解析 Front Matter，生成 [`NewPost`]
    pub fn build(self) -> Result<NewPost> {
        if self.slug.is_empty() {
            return Err(Error::FrontMatter("Cannot derive slug from file name"));
        }

        let (yaml_str, body) = Self::extract_front_matter_and_body(&self.content.0)?;
        let front_matter: FrontMatter = serde_yaml::from_str(yaml_str)?;

        Ok(NewPost {
            content: body.to_string(),
            slug: self.slug,
            title: front_matter.title,
            excerpt: front_matter.excerpt,
            author: front_matter.author,
            tags: front_matter.tags,
            cover_image: front_matter.cover_image,
            category: front_matter.category,
            embedded_media: front_matter.embedded_media,
        })
    }

    /// 从原始 Markdown 内容中提取 Front Matter 字符串和正文。
    ///
    /// 结束分隔符必须单独起一行。
    fn extract_front_matter_and_body(content: &str) -> Result<(&str, &str)> {
        const DELIM: &str = "---";

        let content = content.trim_start();

        let Some(rest) = content.strip_prefix(DELIM) else {
            return Err(Error::FrontMatter("Missing required YAML front matter"));
        };

        let end_pos = rest.find("\n---").ok_or(Error::FrontMatter(
            "Front matter does not terminate with expected delimiter ---",
        ))?;

        let yaml_str = &rest[..end_pos];
        let body_str = rest[end_pos + 1 + DELIM.len()..].trim_start();

        Ok((yaml_str.trim(), body_str))
    }
}
