use std::collections::HashMap;
use std::path::Path;

use super::env_script::{self, EnvScriptError};

/// The installation variables, in the order an installer exports them.
pub const VARIABLES: [&str; 10] = [
    SIGMADSP,
    SIGMADSP_BACKEND,
    CONFIGURATION_FOLDER,
    CONFIGURATION_FILE,
    DSP_TYPE,
    DSP_PROTOCOL,
    BUS_NUMBER,
    DEVICE_ADDRESS,
    PARAMETER_FILE,
    TEMP_FOLDER,
];

pub const SIGMADSP: &str = "SIGMADSP";
pub const SIGMADSP_BACKEND: &str = "SIGMADSP_BACKEND";
pub const CONFIGURATION_FOLDER: &str = "CONFIGURATION_FOLDER";
pub const CONFIGURATION_FILE: &str = "CONFIGURATION_FILE";
pub const DSP_TYPE: &str = "DSP_TYPE";
pub const DSP_PROTOCOL: &str = "DSP_PROTOCOL";
pub const BUS_NUMBER: &str = "BUS_NUMBER";
pub const DEVICE_ADDRESS: &str = "DEVICE_ADDRESS";
pub const PARAMETER_FILE: &str = "PARAMETER_FILE";
pub const TEMP_FOLDER: &str = "TEMP_FOLDER";

const DEFAULT_CONFIGURATION_FOLDER: &str = "/var/lib/sigmadsp";
const CONFIGURATION_FILE_NAME: &str = "config.kdl";
const PARAMETER_FILE_NAME: &str = "current.params";

/// Raw installation variables, before validation.
///
/// Holds only values that were set explicitly. Anything else falls back to
/// a default in [`InstallVars::get`]; the two file defaults follow whatever
/// `CONFIGURATION_FOLDER` ends up being.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallVars {
    explicit: HashMap<String, String>,
}

impl InstallVars {
    /// No explicit values: every variable takes its default.
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Read assignments from an env script. Names outside [`VARIABLES`] are
    /// evaluated for references but not kept.
    pub fn from_env_script(
        source: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, EnvScriptError> {
        let mut vars = Self::default();
        for assignment in env_script::evaluate(source, lookup)? {
            if VARIABLES.contains(&assignment.name.as_str()) {
                vars.set(&assignment.name, assignment.value);
            }
        }
        Ok(vars)
    }

    /// Load an env script from disk, resolving references against the
    /// process environment.
    pub fn load_env_script(path: &Path) -> Result<Self, EnvScriptError> {
        let source = std::fs::read_to_string(path).map_err(|source| EnvScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded env script {}", path.display());
        Self::from_env_script(&source, &|key: &str| std::env::var(key).ok())
    }

    /// Override with any installation variable `lookup` knows about.
    pub fn overlay(mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        for name in VARIABLES {
            if let Some(value) = lookup(name) {
                log::debug!("{name} taken from the environment");
                self.set(name, value);
            }
        }
        self
    }

    /// Override with installation variables set in the process environment.
    pub fn overlay_process_env(self) -> Self {
        self.overlay(&|key: &str| std::env::var(key).ok())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.explicit.insert(name.to_string(), value.into());
    }

    pub fn is_explicit(&self, name: &str) -> bool {
        self.explicit.contains_key(name)
    }

    /// Value of `name`, falling back to its default.
    ///
    /// Returns `None` only for names outside [`VARIABLES`].
    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.explicit.get(name) {
            return Some(value.clone());
        }
        let default = match name {
            SIGMADSP => "sigmadsp".to_string(),
            SIGMADSP_BACKEND => "sigmadsp-backend".to_string(),
            CONFIGURATION_FOLDER => DEFAULT_CONFIGURATION_FOLDER.to_string(),
            CONFIGURATION_FILE => self.in_configuration_folder(CONFIGURATION_FILE_NAME),
            DSP_TYPE => "adau14xx".to_string(),
            DSP_PROTOCOL => "spi".to_string(),
            BUS_NUMBER | DEVICE_ADDRESS => "0".to_string(),
            PARAMETER_FILE => self.in_configuration_folder(PARAMETER_FILE_NAME),
            TEMP_FOLDER => "/tmp/sigmadsp".to_string(),
            _ => return None,
        };
        Some(default)
    }

    fn in_configuration_folder(&self, file_name: &str) -> String {
        let folder = self
            .get(CONFIGURATION_FOLDER)
            .unwrap_or_else(|| DEFAULT_CONFIGURATION_FOLDER.to_string());
        format!("{}/{file_name}", folder.trim_end_matches('/'))
    }
}
