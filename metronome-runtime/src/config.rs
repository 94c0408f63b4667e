use crate::backend;
use crate::error::Result;
use crate::event_loop::BackendKind;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// The `eventloop` section of an application config.
#[derive(Debug, Default, Deserialize)]
pub struct LoopSettings {
    /// Preferred backend name, e.g. `"tokio"` or `"std"`.
    pub backend: Option<String>,
}

/// Load config from a specific TOML file
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
        .add_source(Environment::with_prefix("METRONOME").separator("_"))
        .build()?;
    Ok(config)
}

/// Load config from a specific YAML file
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Yaml))
        .add_source(Environment::with_prefix("METRONOME").separator("_"))
        .build()?;
    Ok(config)
}

/// Applies the `eventloop` section of `config` to the process-wide backend
/// selector. A missing section leaves the selector untouched; an unknown
/// backend name is an error.
pub fn configure_from(config: &Config) -> Result<()> {
    let settings: LoopSettings = match config.get("eventloop") {
        Ok(settings) => settings,
        Err(config::ConfigError::NotFound(_)) => LoopSettings::default(),
        Err(err) => return Err(err.into()),
    };

    if let Some(name) = settings.backend {
        let kind: BackendKind = name.parse()?;
        backend::global().configure(kind)?;
    }
    Ok(())
}
