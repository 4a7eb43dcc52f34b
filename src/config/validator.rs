use crate::config::{ApiConfig, Config, LaunchConfig, MIN_OPERATION_TIMEOUT_MS, TimingConfig};
use crate::error::{Error, Result};

/// Validates the API server section
pub fn validate_api_config(config: &ApiConfig) -> Result<()> {
    if config.address.is_empty() {
        return Err(Error::ConfigInvalid("API address is empty".to_string()));
    }

    if config.port == 0 {
        return Err(Error::ConfigInvalid("API port must not be 0".to_string()));
    }

    if config.workers == 0 {
        return Err(Error::ConfigInvalid(
            "API worker count must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates termination windows and the operation deadline
pub fn validate_timing_config(config: &TimingConfig) -> Result<()> {
    if config.operation_timeout_ms < MIN_OPERATION_TIMEOUT_MS {
        return Err(Error::ConfigInvalid(format!(
            "operationTimeoutMs must be at least {} (got {})",
            MIN_OPERATION_TIMEOUT_MS, config.operation_timeout_ms
        )));
    }

    // A deadline shorter than one full graceful cycle would time out every stop.
    let cycle = config
        .grace_ms
        .saturating_add(config.settle_ms)
        .saturating_add(config.force_settle_ms);
    if cycle >= config.operation_timeout_ms {
        return Err(Error::ConfigInvalid(format!(
            "grace/settle windows ({}ms) exceed the operation timeout ({}ms)",
            cycle, config.operation_timeout_ms
        )));
    }

    Ok(())
}

/// Validates launch settings
pub fn validate_launch_config(config: &LaunchConfig) -> Result<()> {
    if config.shell.trim().is_empty() {
        return Err(Error::ConfigInvalid("Launch shell is empty".to_string()));
    }

    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(api) = &config.api {
        validate_api_config(api)?;
    }
    validate_timing_config(&config.timing)?;
    validate_launch_config(&config.launch)?;

    Ok(())
}
