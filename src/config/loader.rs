//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{ExecutorKind, HandoffBackend, PipelineConfig, StorageBackend};
use super::secret::secret_string;
use crate::domain::errors::PipelineError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "PHI_ARCHIVE_";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`PipelineConfig`]
/// 4. Applies environment variable overrides (`PHI_ARCHIVE_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, the TOML is malformed, an
/// override cannot be parsed, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use phi_archive::config::load_config;
///
/// let config = load_config("phi-archive.toml").expect("Failed to load config");
/// println!("archive table: {}", config.schema.archive_table);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PipelineError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PipelineError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text with the same substitution, override, and
/// validation steps as [`load_config`]
pub fn parse_config(contents: &str) -> Result<PipelineConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: PipelineConfig = toml::from_str(&contents)
        .map_err(|e| PipelineError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        PipelineError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied untouched. Every missing variable is reported in
/// a single error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PipelineError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}")).ok()
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env_var(key) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            PipelineError::Configuration(format!(
                "Invalid value '{raw}' for environment variable {ENV_PREFIX}{key}"
            ))
        }),
        None => Ok(None),
    }
}

/// Applies environment variable overrides using the `PHI_ARCHIVE_` prefix
///
/// Variables follow the pattern `PHI_ARCHIVE_<SECTION>_<KEY>`, for example
/// `PHI_ARCHIVE_EXECUTION_PARTITIONS` or `PHI_ARCHIVE_HANDOFF_PATH`.
fn apply_env_overrides(config: &mut PipelineConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env_var("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Storage backend
    if let Some(val) = env_var("STORAGE_BACKEND") {
        config.storage_backend = match val.to_lowercase().as_str() {
            "postgresql" => StorageBackend::PostgreSQL,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(PipelineError::Configuration(format!(
                    "Invalid storage backend '{other}'. Must be 'postgresql' or 'memory'"
                )))
            }
        };
    }

    // Schema overrides
    if let Some(val) = env_var("SCHEMA_RAW_TABLE") {
        config.schema.raw_table = val;
    }
    if let Some(val) = env_var("SCHEMA_ARCHIVE_TABLE") {
        config.schema.archive_table = val;
    }

    // Pseudonymization overrides
    if let Some(val) = env_var("PSEUDONYMIZATION_DIGEST") {
        config.pseudonymization.digest = val;
    }

    // Handoff overrides
    if let Some(val) = env_var("HANDOFF_PATH") {
        config.handoff.path = val;
    }
    if let Some(val) = env_var("HANDOFF_BACKEND") {
        config.handoff.backend = match val.to_lowercase().as_str() {
            "filesystem" => HandoffBackend::Filesystem,
            "memory" => HandoffBackend::Memory,
            other => {
                return Err(PipelineError::Configuration(format!(
                    "Invalid handoff backend '{other}'. Must be 'filesystem' or 'memory'"
                )))
            }
        };
    }

    // Execution overrides
    if let Some(val) = env_var("EXECUTION_EXECUTOR") {
        config.execution.executor = match val.to_lowercase().as_str() {
            "worker_pool" => ExecutorKind::WorkerPool,
            "sequential" => ExecutorKind::Sequential,
            other => {
                return Err(PipelineError::Configuration(format!(
                    "Invalid executor '{other}'. Must be 'worker_pool' or 'sequential'"
                )))
            }
        };
    }
    if let Some(partitions) = env_parse("EXECUTION_PARTITIONS")? {
        config.execution.partitions = partitions;
    }
    if let Some(concurrency) = env_parse("EXECUTION_MAX_CONCURRENCY")? {
        config.execution.max_concurrency = concurrency;
    }
    if let Some(attempts) = env_parse("EXECUTION_MAX_ATTEMPTS")? {
        config.execution.max_attempts = attempts;
    }
    if let Some(backoff) = env_parse("EXECUTION_RETRY_BACKOFF_MS")? {
        config.execution.retry_backoff_ms = backoff;
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg_config) = config.postgresql {
        if let Some(val) = env_var("POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Some(max) = env_parse("POSTGRESQL_MAX_CONNECTIONS")? {
            pg_config.max_connections = max;
        }
        if let Some(val) = env_var("POSTGRESQL_SSL_MODE") {
            pg_config.ssl_mode = val;
        }
    }

    // Memory overrides
    if let Some(val) = env_var("MEMORY_SEED_PATH") {
        config.memory.seed_path = Some(val);
    }

    // Logging overrides
    if let Some(enabled) = env_parse("LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Some(val) = env_var("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env_var("LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }
    if let Some(json) = env_parse("LOGGING_JSON_CONSOLE")? {
        config.logging.json_console = json;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("PHI_LOADER_UNIT_VAR", "secret_value");
        let input = "connection_string = \"${PHI_LOADER_UNIT_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "connection_string = \"secret_value\"\n");
        std::env::remove_var("PHI_LOADER_UNIT_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("PHI_LOADER_MISSING_VAR");
        let input = "connection_string = \"${PHI_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("PHI_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let input = "# connection_string = \"${PHI_LOADER_COMMENTED_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${PHI_LOADER_COMMENTED_VAR}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-phi-archive.toml");
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
storage_backend = "memory"

[schema]
raw_table = "phi_raw_data"
archive_table = "phi_archive_data"

[handoff]
backend = "memory"

[execution]
executor = "sequential"
partitions = 2

[logging]
local_enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.handoff.backend, HandoffBackend::Memory);
        assert_eq!(config.execution.executor, ExecutorKind::Sequential);
        assert_eq!(config.execution.partitions, 2);
        assert_eq!(config.execution.max_attempts, 4);
        assert_eq!(config.schema.raw_family, "raw_cf");
        assert_eq!(config.pseudonymization.digest, "sha256");
    }

    #[test]
    fn test_parse_config_rejects_invalid_values() {
        let toml_content = r#"
storage_backend = "memory"

[execution]
partitions = 0
"#;
        let err = parse_config(toml_content).unwrap_err();
        assert!(err.to_string().contains("execution.partitions"));
    }

    #[test]
    fn test_parse_config_requires_storage_backend() {
        let err = parse_config("[execution]\npartitions = 2\n").unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
