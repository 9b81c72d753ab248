use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("fetch.timeout_secs must be positive")]
    ZeroTimeout,

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidEndpoint {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid {field} scheme '{scheme}', expected one of: {expected}")]
    InvalidEndpointScheme {
        field: &'static str,
        scheme: String,
        expected: String,
    },

    #[error("webdriver socksVersion must be 4 or 5, got '{0}'")]
    InvalidSocksVersion(String),

    #[error("playwright.user_agent must not be empty")]
    EmptyUserAgent,
}

const WEBDRIVER_SCHEMES: &[&str] = &["http", "https"];
const DRIVER_SCHEMES: &[&str] = &["ws", "wss", "http", "https"];

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_fetch(config)?;
    validate_webdriver(config)?;
    validate_playwright(config)?;
    Ok(())
}

fn validate_fetch(config: &Config) -> Result<(), ValidationError> {
    if config.fetch.timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout);
    }
    Ok(())
}

fn validate_webdriver(config: &Config) -> Result<(), ValidationError> {
    validate_endpoint("webdriver.url", config.webdriver.effective_url(), WEBDRIVER_SCHEMES)?;

    if let Some(version) = config.webdriver.proxy.socks_version.as_deref() {
        if !version.is_empty() && !matches!(version.trim(), "4" | "5") {
            return Err(ValidationError::InvalidSocksVersion(version.to_string()));
        }
    }

    Ok(())
}

fn validate_playwright(config: &Config) -> Result<(), ValidationError> {
    validate_endpoint(
        "playwright.driver_url",
        config.playwright.effective_driver_url(),
        DRIVER_SCHEMES,
    )?;

    if config.playwright.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }

    Ok(())
}

fn validate_endpoint(
    field: &'static str,
    value: &str,
    schemes: &[&str],
) -> Result<(), ValidationError> {
    let url = reqwest::Url::parse(value).map_err(|e| ValidationError::InvalidEndpoint {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    if !schemes.contains(&url.scheme()) {
        return Err(ValidationError::InvalidEndpointScheme {
            field,
            scheme: url.scheme().to_string(),
            expected: schemes.join(", "),
        });
    }

    if url.host_str().is_none() {
        return Err(ValidationError::InvalidEndpoint {
            field,
            value: value.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(())
}
