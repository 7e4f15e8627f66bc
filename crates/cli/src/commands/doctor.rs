//! `cardiolake doctor` — Check configuration, credentials and the agent directory.

use std::path::Path;

use cardiolake_config::{AgentDirectory, AppConfig};

use super::CommandResult;

pub async fn run() -> CommandResult {
    println!("🩺 CardioLake Doctor");
    println!("====================\n");

    let mut issues = 0;

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before anything else.");
            return Ok(());
        }
    };

    if config.has_credentials() {
        println!("  ✅ AWS credentials configured");
    } else {
        println!("  ❌ No AWS credentials — export AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY");
        issues += 1;
    }

    if config.healthlake.datastore_id.is_empty() {
        println!("  ❌ No datastore id — set HEALTHLAKE_DATASTORE_ID");
        issues += 1;
    } else {
        println!("  ✅ Datastore: {}", config.healthlake_url());
    }

    match AgentDirectory::load_from(Path::new(&config.agents.config_path)) {
        Ok(directory) => {
            let missing = directory.missing();
            if missing.is_empty() {
                println!("  ✅ Agent directory lists all {} specialists", directory.len());
            } else {
                for specialist in missing {
                    println!("  ⚠️  Agent directory has no {specialist}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Agent directory unreadable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
