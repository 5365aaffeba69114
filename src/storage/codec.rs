//! 序列化列的编解码
//!
//! `tags` 与 `embedded_media` 在表中是 JSON 文本，进出存储时在这里转换为结构化序列。

use super::models::EmbeddedMedia;

pub(crate) fn encode_tags(tags: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(tags)
}

/// 解析标签，格式损坏时视为没有标签
pub(crate) fn decode_tags(raw: &str) -> Vec<String> {
    match serde_json::from_str(raw) {
        Ok(tags) => tags,
        Err(e) => {
            tracing::warn!(%e, raw, "malformed tags, treating as empty");
            Vec::new()
        }
    }
}

pub(crate) fn encode_media(
    media: Option<&[EmbeddedMedia]>,
) -> Result<Option<String>, serde_json::Error> {
    media.map(serde_json::to_string).transpose()
}

pub(crate) fn decode_media(
    raw: Option<&str>,
) -> Result<Option<Vec<EmbeddedMedia>>, serde_json::Error> {
    raw.map(serde_json::from_str).transpose()
}
