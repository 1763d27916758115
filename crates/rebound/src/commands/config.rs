//! Config command

use anyhow::Result;
use camino::Utf8Path;
use rebound_core::SettingsLoader;

use super::load_settings;
use crate::cli::{ConfigCommands, ConfigShowArgs};
use crate::output;

pub fn run(cmd: ConfigCommands, config: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args, config),
        ConfigCommands::Path => path(config),
    }
}

fn show(args: ConfigShowArgs, config: Option<&Utf8Path>) -> Result<()> {
    let settings = load_settings(config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print!("{}", serde_yaml_ng::to_string(&settings)?);
    }

    Ok(())
}

fn path(config: Option<&Utf8Path>) -> Result<()> {
    let path = match config {
        Some(path) => path.to_owned(),
        None => SettingsLoader::new()?.settings_path(),
    };

    println!("{}", path);
    if !path.exists() {
        output::info("File does not exist, built-in defaults apply");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rebound_core::types::RetrySettings;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_settings_from_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("retry.yaml")).unwrap();
        fs::write(&path, "pattern:\n  max-attempts: 9\n").unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.pattern.max_attempts, 9);
        assert_eq!(settings.backoff, RetrySettings::default().backoff);
    }

    #[test]
    fn test_load_settings_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("missing.yaml")).unwrap();
        assert!(load_settings(Some(&path)).is_err());
    }

    #[test]
    fn test_show_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("retry.yaml")).unwrap();
        fs::write(&path, "backoff:\n  max-retries: 2\n").unwrap();

        assert!(show(ConfigShowArgs { json: true }, Some(&path)).is_ok());
    }
}
