use super::schema::Config;
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use std::path::Path;

/// Prefix of the environment variables that configure the wrapper.
pub const ENV_PREFIX: &str = "CNI_WRAPPER_";
/// Environment variable naming an optional configuration file.
pub const CONFIG_PATH_VAR: &str = "CNI_WRAPPER_CONFIG";

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).ignore(&["config"])
}

/// Load configuration from defaults, the file named by `CNI_WRAPPER_CONFIG`
/// (if any) and `CNI_WRAPPER_*` variables, in increasing precedence.
pub fn load_from_env() -> Result<Config> {
    match std::env::var_os(CONFIG_PATH_VAR) {
        Some(path) if !path.is_empty() => load_from_path(path),
        _ => load_from_figment(Figment::from(Serialized::defaults(Config::default())).merge(env_provider())),
    }
}

pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let base = Figment::from(Serialized::defaults(Config::default()));

    let figment = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => base.merge(Toml::file(path)),
        Some("json") => base.merge(Json::file(path)),
        Some("yaml") | Some("yml") => base.merge(Yaml::file(path)),
        _ => {
            return Err(ConfigError::Parse(
                "Unsupported config file format. Use .toml, .json, .yaml, or .yml".into(),
            )
            .into())
        }
    };

    load_from_figment(figment.merge(env_provider()))
}

pub fn load_from_figment(figment: Figment) -> Result<Config> {
    let config: Config = figment
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.plugin_path.is_none() && config.plugin_suffix.is_empty() {
        // The wrapper would resolve to itself and re-exec forever.
        return Err(ConfigError::Validation(
            "plugin_suffix must not be empty unless plugin_path is set".into(),
        )
        .into());
    }

    if let Some(path) = &config.plugin_path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("plugin_path must not be empty".into()).into());
        }
    }

    if config.log_level.trim().is_empty() {
        return Err(ConfigError::Validation("log_level must not be empty".into()).into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use crate::error::WrapperError;
    use std::io::Write;
    use std::path::PathBuf;

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    #[test]
    fn test_defaults() {
        let config = load_from_figment(defaults()).unwrap();
        assert_eq!(config.plugin_suffix, "-impl");
        assert_eq!(config.plugin_path, None);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = defaults().merge(Toml::string(
            r#"
            plugin_suffix = ".real"
            log_level = "debug"
            log_format = "json"
            "#,
        ));

        let config = load_from_figment(figment).unwrap();
        assert_eq!(config.plugin_suffix, ".real");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_empty_suffix_rejected_without_explicit_path() {
        let figment = defaults().merge(Toml::string(r#"plugin_suffix = """#));
        let err = load_from_figment(figment).unwrap_err();
        assert!(matches!(err, WrapperError::Config(ConfigError::Validation(_))));

        let figment = defaults().merge(Toml::string(
            r#"
            plugin_suffix = ""
            plugin_path = "/opt/cni/bin/calico-real"
            "#,
        ));
        let config = load_from_figment(figment).unwrap();
        assert_eq!(config.plugin_path, Some(PathBuf::from("/opt/cni/bin/calico-real")));
    }

    #[test]
    fn test_invalid_log_format_is_parse_error() {
        let figment = defaults().merge(Toml::string(r#"log_format = "xml""#));
        let err = load_from_figment(figment).unwrap_err();
        assert!(matches!(err, WrapperError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"log_level": "trace"}"#).unwrap();

        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.plugin_suffix, "-impl");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_from_path("/etc/cni-wrapper.ini").unwrap_err();
        assert!(matches!(err, WrapperError::Config(ConfigError::Parse(_))));
    }
}
