use anyhow::Result;
use relay_server::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let ax = relay_server::build(&config).await?;

    ax.listen(config.addr()).await?;

    Ok(())
}
