//! `contreact check`: validate a run config without running it.

use super::{build_provider, explain_provider_error};
use contreact_config::RunConfig;
use contreact_core::provider::Provider;
use contreact_providers::model_is_listed;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Checking {}", config_path.display());

    let config = match RunConfig::load_from(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed and validated");
            config
        }
        Err(e) => {
            println!("   ❌ {e}");
            return Err("Configuration is invalid".into());
        }
    };

    let mut issues = 0;
    let provider = build_provider(&config)?;

    match provider.list_models().await {
        Ok(models) => {
            println!("   ✅ Backend reachable at {} ({} models)", config.backend.host, models.len());
            if model_is_listed(&models, &config.model_name) {
                println!("   ✅ Model '{}' available", config.model_name);
            } else {
                let e = contreact_core::error::ProviderError::ModelNotFound(config.model_name.clone());
                println!("   ❌ {}", explain_provider_error(&e, &config.model_name));
                issues += 1;
            }
            if config.diversity.enabled {
                if model_is_listed(&models, &config.diversity.embedding_model) {
                    println!("   ✅ Embedding model '{}' available", config.diversity.embedding_model);
                } else {
                    println!(
                        "   ⚠️  Embedding model '{}' not listed; pull it with: ollama pull {}",
                        config.diversity.embedding_model, config.diversity.embedding_model
                    );
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("   ❌ {}", explain_provider_error(&e, &config.model_name));
            issues += 1;
        }
    }

    let telegram = &config.operator.telegram;
    if telegram.enabled {
        if telegram.bot_token.is_some() {
            println!("   ✅ Telegram relay enabled for {} user(s)", telegram.authorized_users.len());
        } else {
            println!("   ❌ Telegram relay enabled but {} is not set", contreact_config::TELEGRAM_TOKEN_ENV);
            issues += 1;
        }
    } else {
        println!("   ✅ Operator messages go to the console");
    }

    println!("   Event log: {}", config.event_log_path().display());

    println!();
    if issues == 0 {
        println!("  🎉 Ready to run.");
        Ok(())
    } else {
        Err(format!("{issues} issue(s) found").into())
    }
}
