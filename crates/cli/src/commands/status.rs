//! `cardiolake status` — Show the effective configuration.

use cardiolake_config::AppConfig;

use super::{CommandResult, load_config};

pub async fn run() -> CommandResult {
    let config = load_config()?;

    let datastore = if config.healthlake.datastore_id.is_empty() {
        "(not set)".to_string()
    } else {
        config.healthlake_url()
    };

    println!("🫀 CardioLake Status");
    println!("==================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Region:        {}", config.aws.region);
    println!("  Credentials:   {}", if config.has_credentials() { "configured" } else { "missing" });
    println!("  Datastore:     {datastore}");
    println!("  Agent config:  {}", config.agents.config_path);
    println!("  Agent runtime: {}", config.agents.base_url(&config.aws.region));
    println!("  Gateway:       {}:{}", config.gateway.host, config.gateway.port);
    println!("  CORS origins:  {}", config.gateway.allowed_origins.join(", "));

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `cardiolake init` first");
    }

    Ok(())
}
