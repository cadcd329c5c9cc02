//! Model listing command handler.

use super::load_config;
use colloquy::ColloquyResult;
use std::path::Path;

/// Print the resolved profile of every configured model.
pub fn list_models(config: Option<&Path>) -> ColloquyResult<()> {
    let config = load_config(config)?;

    println!(
        "concurrency: heavy={} normal={} default={}",
        config.concurrency.heavy, config.concurrency.normal, config.concurrency.default
    );
    println!(
        "defaults: {} attempts, {}s timeout, backoff {}s..{}s, floor {}s ({})",
        config.defaults.max_retries,
        config.defaults.timeout_secs,
        config.defaults.base_delay_secs,
        config.defaults.max_delay_secs,
        config.defaults.rate_limit_floor_secs,
        config.defaults.floor_scope
    );
    println!();
    println!(
        "{:<24} {:<10} {:>8} {:>8} {:>8} {:>8} {:>6}",
        "MODEL", "PROVIDER", "OUTPUT", "CEILING", "RETRIES", "TIMEOUT", "RPM"
    );
    for name in config.model_names() {
        let profile = config.profile_for(name)?;
        let rpm = (*profile.requests_per_minute())
            .map(|rpm| rpm.to_string())
            .unwrap_or_else(|| "-".to_string());
        let ceiling = profile
            .effective_ceiling()
            .map(|ceiling| ceiling.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<10} {:>8} {:>8} {:>8} {:>7}s {:>6}",
            name,
            profile.provider().to_string(),
            profile.base_output_limit(),
            ceiling,
            profile.max_retries(),
            profile.timeout_secs(),
            rpm
        );
    }
    Ok(())
}
