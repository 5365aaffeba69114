use std::{env, fs, path::Path};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    related,
};

/// 服务配置
///
/// 先读取 `FOLIO_CONFIG` 指向的 TOML 文件（可选），再由环境变量覆盖：
///
/// - `DATABASE_URL`：数据库连接 URL
/// - `FOLIO_ADDR`：HTTP 监听地址
/// - `FOLIO_RELATED_LIMIT`：相关文章默认数量
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub related_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://folio.db".to_string(),
            listen_addr: "0.0.0.0:3000".to_string(),
            related_limit: related::DEFAULT_LIMIT,
        }
    }
}

impl Config {
    /// 从配置文件和环境变量加载
    pub fn load() -> Result<Self> {
        let mut config = match env::var("FOLIO_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.override_with(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// 读取 TOML 配置文件，缺省的键使用默认值
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn override_with(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(addr) = var("FOLIO_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(limit) = var("FOLIO_RELATED_LIMIT") {
            self.related_limit = limit
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("FOLIO_RELATED_LIMIT: `{limit}`")))?;
        }
        Ok(())
    }
}
