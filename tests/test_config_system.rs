//! Configuration discovery, precedence and source attribution.

use anyhow::Result;
use serial_test::serial;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use poegen::{CliArgs, Config, ConfigError};
use poegen_config::HOME_ENV;

fn project(root: &Path, config: Option<&str>, secrets: Option<&str>) -> PathBuf {
    fs::create_dir_all(root.join(".git")).unwrap();
    let dir = root.join(".poegen");
    fs::create_dir_all(&dir).unwrap();
    if let Some(content) = config {
        fs::write(dir.join("config.toml"), content).unwrap();
    }
    if let Some(content) = secrets {
        fs::write(dir.join("secrets.toml"), content).unwrap();
    }
    dir
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_upward_discovery_from_nested_directory() -> Result<()> {
    let temp = TempDir::new()?;
    project(
        temp.path(),
        Some("[llm]\nendpoint = \"https://contoso.openai.azure.com/\"\n"),
        None,
    );
    let nested = temp.path().join("customers").join("acme");
    fs::create_dir_all(&nested)?;

    let config = Config::discover_with_env(&nested, &CliArgs::default(), &env_from(&[]))?;

    assert_eq!(
        config.llm.endpoint.as_deref(),
        Some("https://contoso.openai.azure.com/")
    );
    assert_eq!(config.root_dir, temp.path());
    assert_eq!(config.output_dir(), temp.path().join("out"));
    Ok(())
}

#[test]
fn test_environment_beats_secrets_beats_config_file() -> Result<()> {
    let temp = TempDir::new()?;
    project(
        temp.path(),
        Some("[llm]\ndeployment = \"from-config\"\ntemperature = 0.3\n"),
        Some("AZURE_OPENAI_DEPLOYMENT = \"from-secrets\"\nAZURE_OPENAI_KEY = \"secret-key\"\n"),
    );

    let from_secrets =
        Config::discover_with_env(temp.path(), &CliArgs::default(), &env_from(&[]))?;
    assert_eq!(from_secrets.llm.deployment.as_deref(), Some("from-secrets"));

    let from_env = Config::discover_with_env(
        temp.path(),
        &CliArgs::default(),
        &env_from(&[("AZURE_OPENAI_DEPLOYMENT", "from-env")]),
    )?;
    assert_eq!(from_env.llm.deployment.as_deref(), Some("from-env"));

    let effective = from_env.effective_config();
    assert_eq!(
        effective["deployment"],
        ("from-env".to_string(), "env".to_string())
    );
    assert_eq!(effective["temperature"].1, "config");
    assert_eq!(
        effective["api_key"],
        ("<set>".to_string(), "secrets".to_string())
    );
    assert_eq!(effective["api_version"].1, "default");
    Ok(())
}

#[test]
fn test_cli_overrides_output_dir_and_deployment() -> Result<()> {
    let temp = TempDir::new()?;
    project(temp.path(), Some("[output]\ndir = \"bundles\"\n"), None);

    let args = CliArgs {
        output_dir: Some(PathBuf::from("elsewhere")),
        deployment: Some("gpt-4o-mini".to_string()),
        ..CliArgs::default()
    };
    let config = Config::discover_with_env(
        temp.path(),
        &args,
        &env_from(&[("AZURE_OPENAI_DEPLOYMENT", "from-env")]),
    )?;

    assert_eq!(config.output_dir(), temp.path().join("elsewhere"));
    assert_eq!(config.llm.deployment.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(config.effective_config()["output.dir"].1, "cli");
    Ok(())
}

#[test]
fn test_llm_settings_names_every_missing_key() -> Result<()> {
    let temp = TempDir::new()?;
    project(temp.path(), None, None);
    let config = Config::discover_with_env(
        temp.path(),
        &CliArgs::default(),
        &env_from(&[("AZURE_OPENAI_DEPLOYMENT", "gpt-4o")]),
    )?;

    match config.llm_settings() {
        Err(ConfigError::MissingRequired(keys)) => {
            assert_eq!(keys, ["AZURE_OPENAI_ENDPOINT", "AZURE_OPENAI_KEY"]);
        }
        other => panic!("expected MissingRequired, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() {
    let temp = TempDir::new().unwrap();
    project(temp.path(), Some("[llm]\ntemperature = 3.5\n"), None);
    let err = Config::discover_with_env(temp.path(), &CliArgs::default(), &env_from(&[]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "temperature"));

    let unknown = TempDir::new().unwrap();
    project(unknown.path(), Some("[llm]\nmodel = \"gpt\"\n"), None);
    assert!(matches!(
        Config::discover_with_env(unknown.path(), &CliArgs::default(), &env_from(&[])),
        Err(ConfigError::InvalidFile(_))
    ));
}

#[test]
fn test_explicit_config_path() -> Result<()> {
    let temp = TempDir::new()?;
    let custom = temp.path().join("custom");
    fs::create_dir_all(&custom)?;
    let path = custom.join("poegen.toml");
    fs::write(&path, "[llm]\ndeployment = \"explicit\"\n")?;

    let args = CliArgs {
        config_path: Some(path.clone()),
        ..CliArgs::default()
    };
    let config = Config::discover_with_env(temp.path(), &args, &env_from(&[]))?;
    assert_eq!(config.llm.deployment.as_deref(), Some("explicit"));
    assert_eq!(config.root_dir, custom);

    let missing = CliArgs {
        config_path: Some(temp.path().join("nope.toml")),
        ..CliArgs::default()
    };
    assert!(matches!(
        Config::discover_with_env(temp.path(), &missing, &env_from(&[])),
        Err(ConfigError::NotFound { .. })
    ));
    Ok(())
}

#[test]
#[serial]
fn test_home_env_replaces_working_directory() -> Result<()> {
    let temp = TempDir::new()?;
    project(temp.path(), Some("[output]\ndir = \"bundles\"\n"), None);

    unsafe {
        env::set_var(HOME_ENV, temp.path());
    }
    let result = Config::discover(&CliArgs::default());
    unsafe {
        env::remove_var(HOME_ENV);
    }

    let config = result?;
    assert_eq!(config.root_dir, temp.path());
    assert_eq!(config.output_dir(), temp.path().join("bundles"));
    Ok(())
}
