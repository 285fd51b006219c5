use anyhow::Result;
use declaration_submit::utils::logging;
use declaration_submit::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志（guard 需要存活到程序结束）
    let (_guard, log_file) = logging::init(&config.log_dir, &config.log_level)?;
    tracing::debug!("日志文件: {}", log_file.display());

    // 初始化并运行应用
    let ledger = App::initialize(config).await?.run().await?;

    if ledger.iter().any(|r| !r.is_success()) {
        tracing::warn!("⚠️ 部分声明未能完成，详见结果报告");
    }

    Ok(())
}
