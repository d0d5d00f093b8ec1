use evm_core::EngineConfig;
use log::debug;
use std::fs;
use std::path::Path;

const CONFIG_ENV: &str = "EVM_CONFIG";

/// Load the engine configuration from `path`, or from `$EVM_CONFIG`.
/// `None` when neither is set: the input document's own configuration, or
/// the defaults, apply. YAML is recognised by extension, anything else is
/// read as JSON.
pub fn load(path: Option<&str>) -> Result<Option<EngineConfig>, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_string(),
        None => match std::env::var(CONFIG_ENV) {
            Ok(p) if !p.trim().is_empty() => p,
            _ => {
                debug!("no configuration file");
                return Ok(None);
            }
        },
    };

    let contents = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config '{}': {}", path, e))?;
    let is_yaml = Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let config: EngineConfig = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
    };
    config.validate()?;
    debug!("configuration loaded from {path}");
    Ok(Some(config))
}
