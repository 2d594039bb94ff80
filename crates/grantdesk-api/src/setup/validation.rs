//! Configuration validation
//!
//! Validates critical configuration values at startup to catch
//! misconfigurations early.

use anyhow::Result;
use grantdesk_core::Config;

/// Validate critical configuration values, failing fast on anything that
/// could cause security problems or runtime errors.
pub fn validate_config(config: &Config) -> Result<()> {
    let is_production = config.is_production();

    // CORS must not be wide open in production
    if is_production && config.cors_origins().contains(&"*".to_string()) {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production - this is a security risk. \
            Please set specific allowed origins via CORS_ORIGINS environment variable."
        ));
    }

    if config.db_max_connections() == 0 {
        return Err(anyhow::anyhow!("Database max connections cannot be 0"));
    }

    if config.db_timeout_seconds() == 0 {
        return Err(anyhow::anyhow!("Database timeout cannot be 0"));
    }

    if config.jwt_secret().is_empty() {
        return Err(anyhow::anyhow!(
            "JWT secret cannot be empty - set JWT_SECRET environment variable"
        ));
    }

    if config.jwt_secret().len() < 32 {
        if is_production {
            return Err(anyhow::anyhow!(
                "JWT secret must be at least 32 characters in production"
            ));
        }
        tracing::warn!(
            "JWT secret is shorter than 32 characters - consider using a longer, more secure secret"
        );
    }

    if config.jwt_expiry_hours() <= 0 {
        return Err(anyhow::anyhow!("JWT expiry must be positive"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_accepted_outside_production() {
        let config = Config::for_tests("short");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_long_secret_accepted() {
        let config = Config::for_tests("a-secret-that-is-definitely-32-chars-long");
        assert!(validate_config(&config).is_ok());
    }
}
