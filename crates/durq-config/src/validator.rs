//! Configuration validation.

use crate::schema::{Config, StorageLocation};

/// Batch sizes above this keep a large share of the backlog resident.
const LARGE_BATCH_SIZE: usize = 10_000;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_queue(config, &mut result);
        Self::validate_log(config, &mut result);

        result
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        if config.queue.batch_size == 0 {
            result.add_error(ValidationError::new(
                "queue.batch_size",
                "batch_size must be greater than 0",
            ));
        }

        if config.queue.batch_size > LARGE_BATCH_SIZE {
            result.add_warning(ValidationWarning::new(
                "queue.batch_size",
                format!(
                    "batch_size is very high (>{}), most of the backlog will be held in memory",
                    LARGE_BATCH_SIZE
                ),
            ));
        }

        match config.queue.storage() {
            StorageLocation::Memory => {
                result.add_warning(ValidationWarning::new(
                    "queue.location",
                    "location is empty, jobs are kept in memory and lost on close",
                ));
            }
            StorageLocation::File(path) => {
                if path.is_dir() {
                    result.add_error(ValidationError::new(
                        "queue.location",
                        format!("location is a directory: {:?}", path),
                    ));
                }
            }
        }
    }

    fn validate_log(config: &Config, result: &mut ValidationResult) {
        if config.log.level.trim().is_empty() {
            result.add_error(ValidationError::new("log.level", "level cannot be empty"));
        }

        if let Some(ref dir) = config.log.dir {
            if dir.is_file() {
                result.add_error(ValidationError::new(
                    "log.dir",
                    format!("log directory is a file: {:?}", dir),
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
