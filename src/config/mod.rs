mod document;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{DspType, NormalizedPath, Protocol};
use crate::settings::InstallSettings;

use document::{ConfigDocument, ConfigSection};

/// DSP configuration persisted by the installer and read by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DspConfig {
    pub dsp_type: DspType,
    pub protocol: Protocol,
    pub bus_number: u8,
    pub device_address: u8,
    pub parameter_file: NormalizedPath,
}

/// Errors that can occur when loading, parsing or writing a config file.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    #[diagnostic(code(config::not_found))]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    #[diagnostic(code(config::read))]
    ReadError(#[from] std::io::Error),
    #[error("invalid KDL syntax: {0}")]
    #[diagnostic(code(config::syntax))]
    ParseError(String),
    #[error("invalid config: {0}")]
    #[diagnostic(code(config::invalid))]
    ValidationError(String),
    #[error("config file already exists: {0}")]
    #[diagnostic(code(config::exists), help("pass --force to overwrite it"))]
    AlreadyExists(PathBuf),
    #[error("failed to write config {path}: {source}")]
    #[diagnostic(code(config::write))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

const DSP_SECTION: &str = "dsp";
const PARAMETERS_SECTION: &str = "parameters";
const DSP_KEYS: &[&str] = &["type", "protocol", "bus-number", "device-address"];
const PARAMETERS_KEYS: &[&str] = &["path"];

impl DspConfig {
    pub fn from_settings(settings: &InstallSettings) -> Self {
        DspConfig {
            dsp_type: settings.dsp_type,
            protocol: settings.protocol,
            bus_number: settings.bus_number,
            device_address: settings.device_address,
            parameter_file: settings.parameter_file.clone(),
        }
    }

    /// Load a config from a KDL file at the given path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::ReadError(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parse a KDL string into a config. Every entry is required.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let doc = ConfigDocument::parse(content)?;

        for (name, line) in doc.top_level() {
            if name != DSP_SECTION && name != PARAMETERS_SECTION {
                return Err(ConfigError::ValidationError(format!(
                    "line {line}: unknown section {name}; expected {DSP_SECTION} or {PARAMETERS_SECTION}"
                )));
            }
        }

        let dsp = required_section(&doc, DSP_SECTION)?;
        dsp.deny_unknown(DSP_SECTION, DSP_KEYS)?;
        let parameters = required_section(&doc, PARAMETERS_SECTION)?;
        parameters.deny_unknown(PARAMETERS_SECTION, PARAMETERS_KEYS)?;

        let type_node = required_node(&dsp, DSP_SECTION, "type")?;
        let dsp_type = type_node
            .string_value()?
            .parse::<DspType>()
            .map_err(|e| type_node.invalid(&e.to_string()))?;

        let protocol_node = required_node(&dsp, DSP_SECTION, "protocol")?;
        let protocol = protocol_node
            .string_value()?
            .parse::<Protocol>()
            .map_err(|e| protocol_node.invalid(&e.to_string()))?;

        let bus_number = byte_entry(&dsp, "bus-number")?;
        let device_address = byte_entry(&dsp, "device-address")?;

        let path_node = required_node(&parameters, PARAMETERS_SECTION, "path")?;
        let parameter_file = NormalizedPath::new(path_node.string_value()?)
            .map_err(|e| path_node.invalid(&e.to_string()))?;

        Ok(DspConfig {
            dsp_type,
            protocol,
            bus_number,
            device_address,
            parameter_file,
        })
    }

    /// Render the config as KDL.
    pub fn render(&self) -> String {
        format!(
            "dsp {{\n    type {}\n    protocol {}\n    bus-number {}\n    device-address {}\n}}\nparameters {{\n    path {}\n}}\n",
            kdl_string(self.dsp_type.as_str()),
            kdl_string(self.protocol.as_str()),
            self.bus_number,
            self.device_address,
            kdl_string(self.parameter_file.as_str()),
        )
    }

    /// Write the rendered config to `path`, creating its folder.
    ///
    /// Refuses to replace an existing file unless `overwrite` is set.
    pub fn write(&self, path: &Path, overwrite: bool) -> Result<(), ConfigError> {
        if path.exists() && !overwrite {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let write_error = |source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, self.render()).map_err(write_error)?;
        log::info!("wrote DSP config to {}", path.display());
        Ok(())
    }
}

fn required_section<'a>(
    doc: &'a ConfigDocument,
    name: &str,
) -> Result<ConfigSection<'a>, ConfigError> {
    doc.section(name)?
        .ok_or_else(|| ConfigError::ValidationError(format!("missing {name} section")))
}

fn required_node<'a>(
    section: &ConfigSection<'a>,
    section_name: &str,
    name: &str,
) -> Result<document::ParseNode<'a>, ConfigError> {
    section.unique(name)?.ok_or_else(|| {
        ConfigError::ValidationError(format!("missing {name} in {section_name} section"))
    })
}

fn byte_entry(section: &ConfigSection, name: &str) -> Result<u8, ConfigError> {
    let node = required_node(section, DSP_SECTION, name)?;
    u8::try_from(node.integer_value()?).map_err(|_| node.invalid("must be in 0..=255"))
}

/// Quote a string for KDL, escaping backslashes, quotes and control characters.
fn kdl_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
