/// Unified configuration
///
/// Generator and host settings are read from TOML or JSON files, may be overridden
/// through environment variables, and are validated before use.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod customization;

pub use customization::{ArgumentCustomization, MethodCustomization, WrapperTypeSpec};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    ParseError(String),
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Generator configuration, normally read from `bindgen.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindgenConfig {
    /// Attribute types that never get accessors (e.g. `EventHandler`).
    #[serde(default = "default_ignored_attribute_types")]
    pub ignored_attribute_types: Vec<String>,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Engine limits applied by `ScriptHost` when built from this configuration.
    #[serde(default)]
    pub host: ScriptHostConfig,

    /// One entry per interface to generate, with its member customizations.
    #[serde(default, rename = "interface")]
    pub interfaces: Vec<WrapperTypeSpec>,
}

fn default_ignored_attribute_types() -> Vec<String> {
    vec!["EventHandler".to_string()]
}

impl_default!(BindgenConfig {
    ignored_attribute_types: default_ignored_attribute_types(),
    input: InputConfig::default(),
    output: OutputConfig::default(),
    logging: LoggingConfig::default(),
    host: ScriptHostConfig::default(),
    interfaces: Vec::new(),
});

impl BindgenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the configuration from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Loads the configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Loads the configuration, picking the format from the file extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// Applies `BINDGEN_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("BINDGEN_IDL_PATH") {
            self.input.idl_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("BINDGEN_OUTPUT_DIR") {
            self.output.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("BINDGEN_LOG_LEVEL") {
            if let Some(level) = LogLevel::parse(&val) {
                self.logging.level = level;
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.output.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "output.output_dir must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for interface in &self.interfaces {
            interface.validate()?;
            if !seen.insert(interface.type_name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "interface {} is configured more than once",
                    interface.type_name
                )));
            }
        }
        self.host.validate()
    }

    pub fn interface(&self, type_name: &str) -> Option<&WrapperTypeSpec> {
        self.interfaces.iter().find(|i| i.type_name == type_name)
    }

    /// Looks for `bindgen.toml`, then `bindgen.json`, in the working directory.
    pub fn load_or_default() -> Self {
        for candidate in ["bindgen.toml", "bindgen.json"] {
            if let Ok(config) = Self::from_file(candidate) {
                tracing::info!(target: "bindgen", "Loaded config from {}", candidate);
                return config;
            }
        }
        tracing::info!(target: "bindgen", "Using default configuration");
        Self::default()
    }
}

/// Where the interface specification is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// webidl2 JSON document with an `idlNames` table.
    pub idl_path: PathBuf,
}

impl_default!(InputConfig {
    idl_path: PathBuf::from("idl.json"),
});

/// Where and how generated code is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_dir: PathBuf,

    /// `use` paths emitted at the top of every generated file.
    #[serde(default = "default_imports")]
    pub imports: Vec<String>,

    /// Also emit `mod.rs` with `all_templates()`.
    #[serde(default = "default_true")]
    pub module_index: bool,
}

fn default_imports() -> Vec<String> {
    vec!["script_bindings::scripting::prelude::*".to_string()]
}

fn default_true() -> bool {
    true
}

impl_default!(OutputConfig {
    output_dir: PathBuf::from("src/generated"),
    imports: default_imports(),
    module_index: true,
});

/// Limits handed to the QuickJS runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptHostConfig {
    /// Heap limit in bytes.
    pub memory_limit: Option<usize>,
    /// Allocation threshold that triggers a GC run.
    pub gc_threshold: Option<usize>,
    /// Maximum native stack size in bytes.
    pub max_stack_size: Option<usize>,
}

impl ScriptHostConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.memory_limit == Some(0) {
            return Err(ConfigError::ValidationError(
                "host.memory_limit must be greater than zero".to_string(),
            ));
        }
        if self.max_stack_size == Some(0) {
            return Err(ConfigError::ValidationError(
                "host.max_stack_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
ignored_attribute_types = ["EventHandler", "OnErrorEventHandler"]

[input]
idl_path = "specs/dom.json"

[output]
output_dir = "src/generated"

[logging]
level = "debug"

[host]
memory_limit = 16777216

[[interface]]
name = "Node"
receiver = "info"
run_custom_code = true

[interface.methods.appendChild]
no_error = true

[interface.methods.insertBefore.arguments.child]
required = true

[[interface]]
name = "Document"
inner_type = "DomDocument"
"#;

    #[test]
    fn test_default_config() {
        let config = BindgenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ignored_attribute_types, vec!["EventHandler".to_string()]);
    }

    #[test]
    fn test_toml_parsing() {
        let config = BindgenConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.input.idl_path, PathBuf::from("specs/dom.json"));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.host.memory_limit, Some(16 * 1024 * 1024));
        assert_eq!(config.interfaces.len(), 2);

        let node = config.interface("Node").unwrap();
        assert!(node.run_custom_code);
        assert!(node.method_customization("appendChild").no_error);
        assert!(
            node.method_customization("insertBefore")
                .argument("child")
                .required
        );
        assert_eq!(config.interface("Document").unwrap().inner_type_name(), "DomDocument");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let config = BindgenConfig::from_toml_str(SAMPLE).unwrap();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: BindgenConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_json_serialization() {
        let config = BindgenConfig::from_toml_str(SAMPLE).unwrap();
        let json_str = serde_json::to_string(&config).unwrap();
        let parsed = BindgenConfig::from_json_str(&json_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_duplicate_interface_is_rejected() {
        let mut config = BindgenConfig::default();
        config.interfaces.push(WrapperTypeSpec::new("Node"));
        config.interfaces.push(WrapperTypeSpec::new("Node"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_memory_limit_is_rejected() {
        let mut config = BindgenConfig::default();
        config.host.memory_limit = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindgen.toml");
        let config = BindgenConfig::from_toml_str(SAMPLE).unwrap();
        config.save_toml(&path).unwrap();
        assert_eq!(BindgenConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
    }
}
