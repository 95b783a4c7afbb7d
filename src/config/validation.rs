//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and required combinations
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::{ServiceConfig, SinkKind};

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.logger.name.trim().is_empty() {
        errors.push(ValidationError::new("logger.name", "must not be empty"));
    }

    if config.logger.sink == SinkKind::File && config.logger.file_path.is_none() {
        errors.push(ValidationError::new(
            "logger.file_path",
            "required when logger.sink is \"file\"",
        ));
    }

    if config.middleware.max_body_size == 0 {
        errors.push(ValidationError::new(
            "middleware.max_body_size",
            "must be greater than zero",
        ));
    }

    if let Err(e) = EnvFilter::try_new(&config.observability.log_level) {
        errors.push(ValidationError::new("observability.log_level", e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "localhost".into();
        config.logger.name = "  ".into();
        config.logger.sink = SinkKind::File;
        config.middleware.max_body_size = 0;
        config.observability.log_level = "request_logger=loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "logger.name",
                "logger.file_path",
                "middleware.max_body_size",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn test_display_names_field() {
        let err = ValidationError::new("logger.name", "must not be empty");
        assert_eq!(err.to_string(), "logger.name: must not be empty");
    }
}
