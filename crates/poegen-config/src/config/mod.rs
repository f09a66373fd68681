mod discovery;
mod model;
mod sources;
mod validation;

pub use discovery::{CONFIG_DIR_NAME, EnvLookup, HOME_ENV};
pub use model::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

use poegen_utils::error::ConfigError;

impl Config {
    /// Resolve the LLM connection settings.
    ///
    /// Every missing required key is reported at once so the user can fix
    /// them in a single pass.
    pub fn llm_settings(&self) -> Result<LlmSettings, ConfigError> {
        let mut missing = Vec::new();
        let required = |value: &Option<String>, key: &str, missing: &mut Vec<String>| {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Some(v.to_string()),
                _ => {
                    missing.push(key.to_string());
                    None
                }
            }
        };

        let endpoint = required(&self.llm.endpoint, KEY_ENDPOINT, &mut missing);
        let api_key = required(&self.llm.api_key, KEY_API_KEY, &mut missing);
        let deployment = required(&self.llm.deployment, KEY_DEPLOYMENT, &mut missing);

        match (endpoint, api_key, deployment) {
            (Some(endpoint), Some(api_key), Some(deployment)) => Ok(LlmSettings {
                endpoint,
                api_key,
                deployment,
                api_version: self
                    .llm
                    .api_version
                    .clone()
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                temperature: self.llm.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                max_completion_tokens: self
                    .llm
                    .max_completion_tokens
                    .unwrap_or(DEFAULT_MAX_COMPLETION_TOKENS),
                timeout: Duration::from_secs(self.llm.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
                prompt_token_ceiling: self
                    .llm
                    .prompt_token_ceiling
                    .unwrap_or(DEFAULT_PROMPT_TOKEN_CEILING),
            }),
            _ => Err(ConfigError::MissingRequired(missing)),
        }
    }

    /// Template locations, relative entries resolved against the project root.
    #[must_use]
    pub fn template_paths(&self) -> TemplatePaths {
        TemplatePaths {
            solution: self.resolve(
                self.templates.solution.as_deref(),
                DEFAULT_SOLUTION_TEMPLATE,
            ),
            pov: self.resolve(self.templates.pov.as_deref(), DEFAULT_POV_TEMPLATE),
            migration_header: self.resolve(
                self.templates.migration_header.as_deref(),
                DEFAULT_MIGRATION_HEADER,
            ),
        }
    }

    /// Directory artifacts are written to.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.resolve(self.output.dir.as_deref(), "out")
    }

    fn resolve(&self, configured: Option<&Path>, default: &str) -> PathBuf {
        let path = configured.unwrap_or_else(|| Path::new(default));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poegen_utils::types::ConfigSource;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn project_with(config: Option<&str>, secrets: Option<&str>) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let dir = temp.path().join(CONFIG_DIR_NAME);
        fs::create_dir(&dir).unwrap();
        if let Some(content) = config {
            fs::write(dir.join("config.toml"), content).unwrap();
        }
        if let Some(content) = secrets {
            fs::write(dir.join("secrets.toml"), content).unwrap();
        }
        temp
    }

    #[test]
    fn test_defaults_without_any_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let config =
            Config::discover_with_env(temp.path(), &CliArgs::default(), &no_env).unwrap();

        assert!(config.llm.endpoint.is_none());
        assert_eq!(config.root_dir, temp.path());
        assert_eq!(
            config.template_paths().solution,
            temp.path().join(DEFAULT_SOLUTION_TEMPLATE)
        );
        assert_eq!(config.output_dir(), temp.path().join("out"));
    }

    #[test]
    fn test_discovery_walks_upward_and_stops_at_repo_root() {
        let temp = project_with(Some("[llm]\ndeployment = \"gpt-4o\"\n"), None);
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover_with_env(&nested, &CliArgs::default(), &no_env).unwrap();
        assert_eq!(config.llm.deployment.as_deref(), Some("gpt-4o"));
        assert_eq!(config.root_dir, temp.path());

        // A repository boundary below the config hides it.
        fs::create_dir(nested.join(".git")).unwrap();
        let config = Config::discover_with_env(&nested, &CliArgs::default(), &no_env).unwrap();
        assert!(config.llm.deployment.is_none());
    }

    #[test]
    fn test_precedence_env_over_secrets_over_file() {
        let temp = project_with(
            Some("[llm]\nendpoint = \"https://file.example\"\ndeployment = \"file-dep\"\n"),
            Some("AZURE_OPENAI_ENDPOINT = \"https://secrets.example\"\nAZURE_OPENAI_KEY = \"k\"\n"),
        );
        let env: HashMap<&str, &str> = [("AZURE_OPENAI_DEPLOYMENT", "env-dep")].into();
        let lookup = |key: &str| env.get(key).map(|v| (*v).to_string());

        let config = Config::discover_with_env(temp.path(), &CliArgs::default(), &lookup).unwrap();

        assert_eq!(config.llm.endpoint.as_deref(), Some("https://secrets.example"));
        assert_eq!(config.llm.deployment.as_deref(), Some("env-dep"));
        assert!(matches!(
            config.source_attribution.get("endpoint"),
            Some(ConfigSource::SecretsFile(_))
        ));
        assert_eq!(
            config.source_attribution.get("deployment"),
            Some(&ConfigSource::Environment)
        );

        let effective = config.effective_config();
        assert_eq!(effective["api_key"], ("<set>".to_string(), "secrets".to_string()));
        assert_eq!(effective["api_version"].1, "default");
    }

    #[test]
    fn test_llm_settings_lists_all_missing_keys() {
        let config = Config::default();
        match config.llm_settings() {
            Err(ConfigError::MissingRequired(keys)) => {
                assert_eq!(keys, vec![KEY_ENDPOINT, KEY_API_KEY, KEY_DEPLOYMENT]);
            }
            other => panic!("expected MissingRequired, got {other:?}"),
        }
    }

    #[test]
    fn test_llm_settings_applies_defaults() {
        let mut config = Config::default();
        config.llm.endpoint = Some("https://contoso.openai.azure.com/".into());
        config.llm.api_key = Some("secret".into());
        config.llm.deployment = Some("gpt-4o".into());

        let settings = config.llm_settings().unwrap();
        assert_eq!(settings.api_version, DEFAULT_API_VERSION);
        assert_eq!(settings.max_completion_tokens, 16_384);
        assert_eq!(settings.prompt_token_ceiling, 128_000);
        assert!((settings.temperature - 0.7).abs() < f32::EPSILON);
        assert!(!format!("{settings:?}").contains("secret"));
    }

    #[test]
    fn test_explicit_config_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let args = CliArgs {
            config_path: Some(temp.path().join("missing.toml")),
            ..CliArgs::default()
        };
        assert!(matches!(
            Config::discover_with_env(temp.path(), &args, &no_env),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let temp = project_with(Some("[llm]\nmodel = \"x\"\n"), None);
        assert!(matches!(
            Config::discover_with_env(temp.path(), &CliArgs::default(), &no_env),
            Err(ConfigError::InvalidFile(_))
        ));
    }

    #[test]
    fn test_cli_output_dir_overrides_file() {
        let temp = project_with(Some("[output]\ndir = \"docs\"\n"), None);
        let args = CliArgs {
            output_dir: Some(PathBuf::from("/tmp/poegen-out")),
            ..CliArgs::default()
        };
        let config = Config::discover_with_env(temp.path(), &args, &no_env).unwrap();
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/poegen-out"));
        assert_eq!(config.effective_config()["output.dir"].1, "cli");
    }
}
