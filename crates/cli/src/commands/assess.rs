//! `contreact assess`: rate a finished run on the PEI scale.

use super::explain_provider_error;
use contreact_agent::{Assessment, assess, reconstruct_history};
use contreact_core::error::Error;
use contreact_providers::OllamaProvider;
use contreact_telemetry::read_log;
use std::path::Path;
use std::time::Duration;

const EVALUATOR_TIMEOUT_SECS: u64 = 300;

pub async fn run(log: &Path, evaluator: &str, output: &Path, host: &str) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_log(log)?;
    let Some(first) = records.first() else {
        return Err(format!("{} contains no records", log.display()).into());
    };
    let run_id = first.run_id.clone();

    println!("  PEI assessment of run '{run_id}'");
    println!("  Evaluator:  {evaluator} ({host})");
    println!("  Events:     {}", records.len());

    let history = reconstruct_history(&records)?;
    println!("  Messages:   {}", history.len());

    let provider = OllamaProvider::new(host, Duration::from_secs(EVALUATOR_TIMEOUT_SECS))?;
    let assessment = assess(&provider, evaluator, &run_id, history)
        .await
        .map_err(|e| match e {
            Error::Provider(p) => explain_provider_error(&p, evaluator),
            other => other.to_string(),
        })?;

    println!();
    println!("{}", "-".repeat(60));
    println!("{}", assessment.pei_response);
    println!("{}", "-".repeat(60));
    println!();

    save(output, &assessment)?;
    println!("  ✅ Assessment saved to {}", output.display());
    match assessment.pei_rating {
        Some(rating) => println!("  PEI rating: {rating}/10"),
        None => println!("  ⚠️  Could not read a PEI rating from the reply"),
    }
    Ok(())
}

/// Write the assessment as pretty JSON, creating parent directories.
fn save(path: &Path, assessment: &Assessment) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(assessment)?)?;
    Ok(())
}
