use std::path::Path;

use miette::IntoDiagnostic;

use crate::config::DspConfig;
use crate::settings::InstallSettings;

use super::SourceArgs;

fn resolve(source: &SourceArgs) -> miette::Result<InstallSettings> {
    let vars = source.load()?;
    Ok(InstallSettings::resolve(&vars)?)
}

pub(super) fn show(source: &SourceArgs) -> miette::Result<()> {
    let settings = resolve(source)?;
    let json = serde_json::to_string_pretty(&settings).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

/// Validate settings; an existing config file must also parse and agree
/// with them.
pub(super) fn check(source: &SourceArgs) -> miette::Result<()> {
    let settings = resolve(source)?;
    let path = settings.configuration_file.as_path();

    if path.exists() {
        let on_disk = DspConfig::load(path)?;
        if on_disk != DspConfig::from_settings(&settings) {
            log::warn!(
                "{} differs from the installation settings; run write-config --force to update it",
                path.display()
            );
        }
    } else {
        log::info!("{} does not exist yet", path.display());
    }

    println!("ok");
    Ok(())
}

pub(super) fn write_config(
    source: &SourceArgs,
    output: Option<&Path>,
    force: bool,
) -> miette::Result<()> {
    let settings = resolve(source)?;
    let path = output.unwrap_or_else(|| settings.configuration_file.as_path());
    DspConfig::from_settings(&settings).write(path, force)?;
    println!("{}", path.display());
    Ok(())
}

pub(super) fn env(source: &SourceArgs) -> miette::Result<()> {
    let settings = resolve(source)?;
    for (name, value) in settings.to_vars() {
        println!("export {name}={}", shell_quote(&value));
    }
    Ok(())
}

/// Double-quote a value so that a POSIX shell reads it back verbatim.
fn shell_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_plain_value() {
        assert_eq!(shell_quote("/var/lib/sigmadsp"), r#""/var/lib/sigmadsp""#);
    }

    #[test]
    fn shell_quote_escapes_expansions() {
        assert_eq!(shell_quote(r#"a"$b`c\"#), r#""a\"\$b\`c\\""#);
    }
}
