pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod related;
pub mod state;
pub mod storage;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use config::Config;
use state::AppState;

/// 启动服务
///
/// 初始化日志，加载配置，连接数据库并建表，然后开始监听。
pub async fn run() -> error::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("FOLIO_LOG"))
        .init();

    let config = Config::load()?;
    tracing::info!(database = %config.database_url, "starting folio");

    let db = storage::connect(&config.database_url).await?;
    storage::migrate(&db).await?;

    let app = AppState::new(db, config.related_limit);

    api::run_server(app, &config.listen_addr).await
}
