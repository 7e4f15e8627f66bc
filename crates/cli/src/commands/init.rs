//! `cardiolake init` — Write a starter config and agent directory.

use cardiolake_config::AppConfig;

use super::CommandResult;

const AGENT_TEMPLATE: &str = r#"{
  "cardiologist_agent": { "agent_id": "", "alias_id": "" },
  "radiologist_agent": { "agent_id": "", "alias_id": "" },
  "endocrinologist_agent": { "agent_id": "", "alias_id": "" },
  "orchestrator_agent": { "agent_id": "", "alias_id": "" },
  "qa_agent": { "agent_id": "", "alias_id": "" }
}
"#;

pub async fn run() -> CommandResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🫀 CardioLake — First-Time Setup");
    println!("================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let agents_path = config_dir.join("agent_config.json");
    if !agents_path.exists() {
        std::fs::write(&agents_path, AGENT_TEMPLATE)?;
        println!("✅ Created agent_config.json at: {}", agents_path.display());
    }

    println!("\n📝 Next steps:");
    println!("   1. Set healthlake.datastore_id in {}", config_path.display());
    println!("   2. Fill in the agent ids in {}", agents_path.display());
    println!("      and point agents.config_path (or CARDIOLAKE_AGENT_CONFIG) at it");
    println!("   3. Export AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY");
    println!("   4. Run: cardiolake doctor\n");

    Ok(())
}
