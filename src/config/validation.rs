use crate::config::types::{Config, FilterConfig, MailboxConfig, OutputConfig, ScanConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_mailbox_config(&config.mailbox)?;
    validate_scan_config(&config.scan)?;
    validate_output_config(&config.output)?;
    validate_filter_config(&config.filters)?;
    Ok(())
}

/// Validates mailbox configuration
fn validate_mailbox_config(config: &MailboxConfig) -> Result<(), ConfigError> {
    if config.root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "mailbox root cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates scan configuration
fn validate_scan_config(config: &ScanConfig) -> Result<(), ConfigError> {
    if config.default_folders.is_empty() {
        return Err(ConfigError::Validation(
            "default-folders must name at least one folder".to_string(),
        ));
    }

    if config.default_folders.iter().any(|f| f.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "default-folders cannot contain empty folder names".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates filter tables
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    let lists = [
        ("tracking-params", &config.tracking_params),
        ("ignore-patterns", &config.ignore_patterns),
        ("long-form-hosts", &config.long_form_hosts),
    ];

    for (name, list) in lists {
        if let Some(entries) = list {
            if entries.iter().any(|e| e.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "{} cannot contain empty entries",
                    name
                )));
            }
        }
    }

    Ok(())
}
