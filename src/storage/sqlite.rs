use std::{str::FromStr, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// 数据库连接池类型
pub type Db = sqlx::SqlitePool;

/// 建表脚本
const SCHEMA: &str = include_str!("../../sql/01-CREATE_TABLE.sql");

/// 根据连接 URL 创建新的数据库连接池
///
/// 连接池配置：
///
/// - 最大空闲时间 60 秒
/// - 最大生存时间 1500 秒（约 25 分钟）
/// - 最大连接数 10
/// - 获取连接超时 2 秒
/// - 获取前测试连接
///
/// 数据库文件不存在时会自动创建。`:memory:` URL 交给 [`connect_memory`]，
/// 否则每个连接都会得到一份独立的内存库。
pub async fn connect(conn_url: &str) -> Result<Db, sqlx::Error> {
    if conn_url.contains(":memory:") {
        return connect_memory().await;
    }

    let options = SqliteConnectOptions::from_str(conn_url)?.create_if_missing(true);

    SqlitePoolOptions::new()
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(1500))
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(2))
        .test_before_acquire(true)
        .connect_with(options)
        .await
}

/// 创建单连接的内存数据库连接池
///
/// 连接永不过期，保证库的生命周期与连接池一致。
pub async fn connect_memory() -> Result<Db, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// 执行建表脚本
///
/// 将脚本按 `;` 分割，每条 SQL 单独执行
pub async fn migrate(db: &Db) -> Result<(), sqlx::Error> {
    for sql in SCHEMA.split(';') {
        if sql.trim().is_empty() {
            continue;
        }
        sqlx::query(sql).execute(db).await?;
    }
    Ok(())
}

/// 将时间格式化为定长的 RFC 3339 文本（UTC，毫秒精度）
///
/// 定长保证了文本的字典序与时间先后一致，`ORDER BY published_at` 可以直接使用。
pub(crate) fn timestamp(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_timestamp_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::milliseconds(120);

        assert_eq!(timestamp(a), "2024-01-02T03:04:05.000Z");
        assert_eq!(timestamp(b), "2024-01-02T03:04:05.120Z");
        assert!(timestamp(a) < timestamp(b));
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = connect_memory().await.expect("创建内存库失败");
        migrate(&db).await.expect("第一次建表失败");
        migrate(&db).await.expect("重复建表应当无副作用");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&db)
            .await
            .expect("查询失败");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_connect_file_creates_database() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let url = format!("sqlite://{}", dir.path().join("folio.db").display());

        let db = connect(&url).await.expect("连接文件库失败");
        migrate(&db).await.expect("建表失败");

        assert!(dir.path().join("folio.db").exists());
    }
}
