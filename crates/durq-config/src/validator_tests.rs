
    use super::*;
    use crate::schema::QueueConfig;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let mut config = Config::default();
        config.queue.batch_size = 0;

        let result = ConfigValidator::validate(&config);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "queue.batch_size"));
    }

    #[test]
    fn test_validate_large_batch_size_warning() {
        let mut config = Config::default();
        config.queue.batch_size = 50_000;

        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "queue.batch_size"));
    }

    #[test]
    fn test_validate_memory_location_warning() {
        let config = Config {
            queue: QueueConfig::in_memory(10),
            ..Default::default()
        };

        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "queue.location"));
    }

    #[test]
    fn test_validate_directory_location() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            queue: QueueConfig::new(dir.path().to_string_lossy(), 10),
            ..Default::default()
        };

        let result = ConfigValidator::validate(&config);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "queue.location"));
    }

    #[test]
    fn test_validate_empty_log_level() {
        let mut config = Config::default();
        config.log.level = "  ".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "log.level"));
    }

    #[test]
    fn test_validate_log_dir_is_file() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.log.dir = Some(file.path().to_path_buf());

        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "log.dir"));
    }
