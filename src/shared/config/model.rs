use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on the number of result elements a single drain may
    /// request when the caller does not say otherwise.
    pub default_page_size: usize,
    /// Cap on the number of live groups a GROUP BY may accumulate.
    /// `None` disables the check.
    pub max_grouping_cardinality: Option<usize>,
}

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("STROOMDB_CONFIG").unwrap_or_else(|_| "config".to_string());

    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(&config_path))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
