//! `mentat ask` — run one query through the cognitive loop.

use anyhow::{Context, bail};
use mentat_agent::Scheduler;
use mentat_planner::GeminiPlanner;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub async fn run(query: String, preferences: Vec<String>) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let (facts, snapshots) = super::load_facts(&config).await?;

    let api_key = config.oracle.api_key.clone().context(
        "No oracle API key configured; set MENTAT_ORACLE_API_KEY or oracle.api_key in config.toml",
    )?;
    let oracle = GeminiPlanner::with_timeout(
        api_key,
        config.oracle.model.clone(),
        config.oracle.timeout_secs,
    )?
    .with_base_url(config.oracle.base_url.clone());

    let scheduler = Scheduler::new(
        Arc::new(oracle),
        Arc::new(mentat_tools::default_registry()),
        facts,
        config.max_iterations,
    )
    .with_snapshots(snapshots)
    .with_memory_tuning(config.memory.max_results, config.memory.min_relevance)
    .with_preferences(parse_preferences(&preferences)?);

    let response = scheduler.run(&query).await;

    println!("{}", response.result);
    println!(
        "({} of {} iterations used)",
        response.iterations, config.max_iterations
    );

    if !response.success {
        bail!(
            "query failed: {}",
            response.error.unwrap_or_else(|| "unknown error".into())
        );
    }
    Ok(())
}

/// Parse repeated `key=value` flags. Values that are valid JSON are kept
/// structured; everything else is a plain string.
fn parse_preferences(raw: &[String]) -> anyhow::Result<BTreeMap<String, Value>> {
    let mut preferences = BTreeMap::new();
    for entry in raw {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("preference '{entry}' is not in key=value form");
        };
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        preferences.insert(key.to_string(), value);
    }
    Ok(preferences)
}
