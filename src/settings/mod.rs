//! Installation settings of the SigmaDSP backend.
//!
//! [`InstallVars`] gathers raw name/value pairs from defaults, an env
//! script and the process environment. [`InstallSettings::resolve`] turns
//! them into typed, validated settings.

mod env_script;
pub mod vars;

use serde::Serialize;

use crate::domain::{parse_number, DspType, NormalizedPath, Protocol, I2C_ADDRESS_RANGE};

pub use env_script::EnvScriptError;
pub use vars::{InstallVars, VARIABLES};

use vars::*;

/// A single variable that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{variable}: {message}")]
pub struct InvalidVariable {
    pub variable: &'static str,
    pub message: String,
}

/// Every problem found while validating installation variables.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("invalid installation settings:\n{}", format_problems(.0))]
#[diagnostic(
    code(settings::invalid),
    help("fix the variables in the env script or the environment and run `check` again")
)]
pub struct SettingsError(pub Vec<InvalidVariable>);

fn format_problems(problems: &[InvalidVariable]) -> String {
    problems
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validated installation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallSettings {
    pub package: String,
    pub service: String,
    pub configuration_folder: NormalizedPath,
    pub configuration_file: NormalizedPath,
    pub dsp_type: DspType,
    pub protocol: Protocol,
    pub bus_number: u8,
    pub device_address: u8,
    pub parameter_file: NormalizedPath,
    pub temp_folder: NormalizedPath,
}

/// Collects problems so that all of them are reported in one pass.
struct Validator<'a> {
    vars: &'a InstallVars,
    problems: Vec<InvalidVariable>,
}

impl<'a> Validator<'a> {
    fn raw(&self, variable: &'static str) -> String {
        self.vars.get(variable).unwrap_or_default()
    }

    fn fail(&mut self, variable: &'static str, message: impl Into<String>) {
        self.problems.push(InvalidVariable {
            variable,
            message: message.into(),
        });
    }

    fn name(&mut self, variable: &'static str) -> Option<String> {
        let raw = self.raw(variable);
        let message = if raw.is_empty() {
            "must not be empty"
        } else if raw.chars().any(char::is_whitespace) {
            "must not contain whitespace"
        } else if raw.contains('/') {
            "must not contain '/'"
        } else {
            return Some(raw);
        };
        self.fail(variable, message);
        None
    }

    fn path(&mut self, variable: &'static str) -> Option<NormalizedPath> {
        match NormalizedPath::new(&self.raw(variable)) {
            Ok(path) => Some(path),
            Err(e) => {
                self.fail(variable, e.to_string());
                None
            }
        }
    }

    /// A path that defaults to a file inside `CONFIGURATION_FOLDER`.
    ///
    /// When the folder is invalid and the path was not set explicitly, its
    /// default is derived from the bad folder; only the folder is reported.
    fn folder_path(
        &mut self,
        variable: &'static str,
        folder: Option<&NormalizedPath>,
    ) -> Option<NormalizedPath> {
        if folder.is_none() && !self.vars.is_explicit(variable) {
            return None;
        }
        self.path(variable)
    }

    fn parsed<T>(&mut self, variable: &'static str) -> Option<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.raw(variable).parse() {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(variable, e.to_string());
                None
            }
        }
    }

    fn byte(&mut self, variable: &'static str) -> Option<u8> {
        let raw = self.raw(variable);
        match parse_number(&raw).map(u8::try_from) {
            Some(Ok(value)) => Some(value),
            Some(Err(_)) => {
                self.fail(variable, format!("'{raw}' is out of range 0..=255"));
                None
            }
            None => {
                self.fail(variable, format!("'{raw}' is not a decimal or 0x-prefixed number"));
                None
            }
        }
    }
}

impl InstallSettings {
    /// Validate raw variables into settings, collecting every problem.
    pub fn resolve(vars: &InstallVars) -> Result<Self, SettingsError> {
        let mut v = Validator {
            vars,
            problems: Vec::new(),
        };

        let package = v.name(SIGMADSP);
        let service = v.name(SIGMADSP_BACKEND);
        let configuration_folder = v.path(CONFIGURATION_FOLDER);
        let configuration_file = v.folder_path(CONFIGURATION_FILE, configuration_folder.as_ref());
        let dsp_type = v.parsed::<DspType>(DSP_TYPE);
        let protocol = v.parsed::<Protocol>(DSP_PROTOCOL);
        let bus_number = v.byte(BUS_NUMBER);
        let device_address = v.byte(DEVICE_ADDRESS);
        let parameter_file = v.folder_path(PARAMETER_FILE, configuration_folder.as_ref());
        let temp_folder = v.path(TEMP_FOLDER);

        if let (Some(Protocol::I2c), Some(address)) = (protocol, device_address) {
            if !I2C_ADDRESS_RANGE.contains(&address) {
                v.fail(
                    DEVICE_ADDRESS,
                    format!(
                        "{address:#04x} is not a 7-bit I2C address ({:#04x}..={:#04x})",
                        I2C_ADDRESS_RANGE.start(),
                        I2C_ADDRESS_RANGE.end()
                    ),
                );
            }
        }

        if let (Some(folder), Some(file)) = (&configuration_folder, &configuration_file) {
            if file == folder {
                v.fail(CONFIGURATION_FILE, "must name a file, not the configuration folder");
            } else if !file.is_inside(folder) {
                log::warn!("{CONFIGURATION_FILE} {file} lies outside {CONFIGURATION_FOLDER} {folder}");
            }
        }

        match (
            package,
            service,
            configuration_folder,
            configuration_file,
            dsp_type,
            protocol,
            bus_number,
            device_address,
            parameter_file,
            temp_folder,
        ) {
            (
                Some(package),
                Some(service),
                Some(configuration_folder),
                Some(configuration_file),
                Some(dsp_type),
                Some(protocol),
                Some(bus_number),
                Some(device_address),
                Some(parameter_file),
                Some(temp_folder),
            ) if v.problems.is_empty() => Ok(InstallSettings {
                package,
                service,
                configuration_folder,
                configuration_file,
                dsp_type,
                protocol,
                bus_number,
                device_address,
                parameter_file,
                temp_folder,
            }),
            _ => Err(SettingsError(v.problems)),
        }
    }

    /// The variables these settings correspond to, normalized, in export order.
    pub fn to_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            (SIGMADSP, self.package.clone()),
            (SIGMADSP_BACKEND, self.service.clone()),
            (CONFIGURATION_FOLDER, self.configuration_folder.to_string()),
            (CONFIGURATION_FILE, self.configuration_file.to_string()),
            (DSP_TYPE, self.dsp_type.to_string()),
            (DSP_PROTOCOL, self.protocol.to_string()),
            (BUS_NUMBER, self.bus_number.to_string()),
            (DEVICE_ADDRESS, self.device_address.to_string()),
            (PARAMETER_FILE, self.parameter_file.to_string()),
            (TEMP_FOLDER, self.temp_folder.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> InstallVars {
        let mut vars = InstallVars::defaults();
        for (name, value) in pairs {
            vars.set(name, *value);
        }
        vars
    }

    fn problems(pairs: &[(&str, &str)]) -> Vec<InvalidVariable> {
        InstallSettings::resolve(&vars(pairs)).unwrap_err().0
    }

    #[test]
    fn defaults_resolve() {
        let settings = InstallSettings::resolve(&InstallVars::defaults()).unwrap();
        assert_eq!(settings.package, "sigmadsp");
        assert_eq!(settings.service, "sigmadsp-backend");
        assert_eq!(settings.dsp_type, DspType::Adau14xx);
        assert_eq!(settings.protocol, Protocol::Spi);
        assert_eq!(settings.bus_number, 0);
        assert_eq!(settings.device_address, 0);
        assert_eq!(
            settings.configuration_file.as_str(),
            "/var/lib/sigmadsp/config.kdl"
        );
        assert_eq!(settings.temp_folder.as_str(), "/tmp/sigmadsp");
    }

    #[test]
    fn hex_numbers_are_accepted() {
        let settings = InstallSettings::resolve(&vars(&[
            (DSP_PROTOCOL, "I2C"),
            (BUS_NUMBER, "1"),
            (DEVICE_ADDRESS, "0x38"),
        ]))
        .unwrap();
        assert_eq!(settings.protocol, Protocol::I2c);
        assert_eq!(settings.bus_number, 1);
        assert_eq!(settings.device_address, 0x38);
    }

    #[test]
    fn empty_names_are_rejected() {
        let problems = problems(&[(SIGMADSP, ""), (SIGMADSP_BACKEND, "sigma dsp")]);
        assert_eq!(
            problems,
            vec![
                InvalidVariable {
                    variable: SIGMADSP,
                    message: "must not be empty".into()
                },
                InvalidVariable {
                    variable: SIGMADSP_BACKEND,
                    message: "must not contain whitespace".into()
                },
            ]
        );
    }

    #[test]
    fn all_problems_are_collected() {
        let problems = problems(&[
            (CONFIGURATION_FOLDER, "relative/folder"),
            (DSP_TYPE, "adau1701"),
            (DSP_PROTOCOL, "uart"),
            (BUS_NUMBER, "256"),
            (DEVICE_ADDRESS, "lots"),
            (TEMP_FOLDER, ""),
        ]);
        let variables: Vec<_> = problems.iter().map(|p| p.variable).collect();
        assert_eq!(
            variables,
            vec![
                CONFIGURATION_FOLDER,
                DSP_TYPE,
                DSP_PROTOCOL,
                BUS_NUMBER,
                DEVICE_ADDRESS,
                TEMP_FOLDER
            ]
        );
    }

    #[test]
    fn bad_folder_still_reports_explicit_files() {
        let problems = problems(&[
            (CONFIGURATION_FOLDER, "relative/folder"),
            (PARAMETER_FILE, "params"),
        ]);
        let variables: Vec<_> = problems.iter().map(|p| p.variable).collect();
        assert_eq!(variables, vec![CONFIGURATION_FOLDER, PARAMETER_FILE]);
    }

    #[test]
    fn i2c_address_must_be_seven_bit() {
        let problems = problems(&[(DSP_PROTOCOL, "i2c"), (DEVICE_ADDRESS, "0x80")]);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].variable, DEVICE_ADDRESS);
        assert!(problems[0].message.contains("7-bit I2C address"));
    }

    #[test]
    fn i2c_address_range_bounds() {
        for rejected in ["0x02", "0x78"] {
            let problems = problems(&[(DSP_PROTOCOL, "i2c"), (DEVICE_ADDRESS, rejected)]);
            assert_eq!(problems.len(), 1, "{rejected}");
            assert_eq!(problems[0].variable, DEVICE_ADDRESS);
        }
        for accepted in ["0x03", "0x77"] {
            let settings =
                InstallSettings::resolve(&vars(&[(DSP_PROTOCOL, "i2c"), (DEVICE_ADDRESS, accepted)]));
            assert!(settings.is_ok(), "{accepted}");
        }
    }

    #[test]
    fn names_with_slash_are_rejected() {
        let problems = problems(&[(SIGMADSP, "a/b")]);
        assert_eq!(
            problems,
            vec![InvalidVariable {
                variable: SIGMADSP,
                message: "must not contain '/'".into()
            }]
        );
    }

    #[test]
    fn spi_chip_select_zero_is_valid() {
        assert!(InstallSettings::resolve(&vars(&[(DEVICE_ADDRESS, "0")])).is_ok());
    }

    #[test]
    fn configuration_file_cannot_be_the_folder() {
        let problems = problems(&[(CONFIGURATION_FILE, "/var/lib/sigmadsp/")]);
        assert_eq!(problems[0].variable, CONFIGURATION_FILE);
    }

    #[test]
    fn error_lists_every_problem() {
        let err = InstallSettings::resolve(&vars(&[(DSP_TYPE, "x"), (BUS_NUMBER, "-1")]))
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("  - DSP_TYPE: unknown DSP type 'x'"));
        assert!(text.contains("  - BUS_NUMBER: '-1' is not a decimal or 0x-prefixed number"));
    }

    #[test]
    fn to_vars_normalizes_values() {
        let settings = InstallSettings::resolve(&vars(&[
            (DSP_TYPE, "ADAU1X01"),
            (DEVICE_ADDRESS, "0x02"),
            (TEMP_FOLDER, "/tmp//sigmadsp/"),
        ]))
        .unwrap();
        let vars = settings.to_vars();
        assert!(vars.contains(&(DSP_TYPE, "adau1x01".to_string())));
        assert!(vars.contains(&(DEVICE_ADDRESS, "2".to_string())));
        assert!(vars.contains(&(TEMP_FOLDER, "/tmp/sigmadsp".to_string())));
    }
}
