use axum::extract::FromRef;

use crate::storage::Db;

/// 应用程序上下文
///
/// [`AppState`] 封装了数据库连接池和相关文章的默认数量，提供统一访问入口。
#[derive(Clone, FromRef)]
pub struct AppState {
    pool: Db,
    #[from_ref(skip)]
    related_limit: usize,
}

impl AppState {
    /// 创建一个新的 [`AppState`] 实例
    pub fn new(pool: Db, related_limit: usize) -> Self {
        Self {
            pool,
            related_limit,
        }
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> &Db {
        &self.pool
    }

    /// 相关文章的默认数量
    pub fn related_limit(&self) -> usize {
        self.related_limit
    }
}
