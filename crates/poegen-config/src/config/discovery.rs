use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use poegen_utils::error::ConfigError;
use poegen_utils::types::ConfigSource;

use super::{
    CliArgs, Config, KEY_API_KEY, KEY_API_VERSION, KEY_DEPLOYMENT, KEY_ENDPOINT, LlmConfig,
    OutputConfig, TemplatesConfig,
};

/// Name of the per-project configuration directory.
pub const CONFIG_DIR_NAME: &str = ".poegen";

/// Environment variable that replaces the working directory as search root.
pub const HOME_ENV: &str = "POEGEN_HOME";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    llm: Option<LlmConfig>,
    templates: Option<TemplatesConfig>,
    output: Option<OutputConfig>,
}

/// Lookup function for environment variables.
///
/// Tests pass a closure over a map instead of touching the process environment.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Discover and load configuration with precedence:
    /// environment > secrets file > config file > defaults.
    ///
    /// The search starts at `POEGEN_HOME` when set, otherwise at the current
    /// working directory.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = match process_env(HOME_ENV) {
            Some(home) => PathBuf::from(home),
            None => std::env::current_dir()
                .map_err(|e| ConfigError::InvalidFile(format!("cannot read current directory: {e}")))?,
        };
        Self::discover_with_env(&start_dir, cli_args, &process_env)
    }

    /// Discover configuration starting from a specific directory, reading the
    /// process environment.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        Self::discover_with_env(start_dir, cli_args, &process_env)
    }

    /// Path-driven variant with an injectable environment.
    pub fn discover_with_env(
        start_dir: &Path,
        cli_args: &CliArgs,
        env: EnvLookup<'_>,
    ) -> Result<Self, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut llm = LlmConfig::default();
        let mut templates = TemplatesConfig::default();
        let mut output = OutputConfig::default();

        // Explicit --config wins over discovery; its directory also holds the secrets file.
        let (config_path, config_dir) = match &cli_args.config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.display().to_string(),
                    });
                }
                (Some(path.clone()), path.parent().map(Path::to_path_buf))
            }
            None => match Self::discover_config_dir_from(start_dir) {
                Some(dir) => {
                    let candidate = dir.join("config.toml");
                    (candidate.exists().then_some(candidate), Some(dir))
                }
                None => (None, None),
            },
        };

        // Relative paths resolve against the directory that holds `.poegen/`.
        let root_dir = match &config_dir {
            Some(dir) if dir.file_name().is_some_and(|n| n == CONFIG_DIR_NAME) => dir
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| start_dir.to_path_buf()),
            Some(dir) => dir.clone(),
            None => start_dir.to_path_buf(),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)?;
            let source = ConfigSource::ConfigFile(path.clone());

            if let Some(file_llm) = file_config.llm {
                macro_rules! apply {
                    ($($field:ident),*) => {$(
                        if file_llm.$field.is_some() {
                            llm.$field = file_llm.$field;
                            source_attribution.insert(stringify!($field).to_string(), source.clone());
                        }
                    )*};
                }
                apply!(
                    endpoint,
                    api_key,
                    deployment,
                    api_version,
                    temperature,
                    max_completion_tokens,
                    timeout_secs,
                    prompt_token_ceiling
                );
            }

            if let Some(file_templates) = file_config.templates {
                if file_templates.solution.is_some() {
                    templates.solution = file_templates.solution;
                    source_attribution.insert("templates.solution".to_string(), source.clone());
                }
                if file_templates.pov.is_some() {
                    templates.pov = file_templates.pov;
                    source_attribution.insert("templates.pov".to_string(), source.clone());
                }
                if file_templates.migration_header.is_some() {
                    templates.migration_header = file_templates.migration_header;
                    source_attribution
                        .insert("templates.migration_header".to_string(), source.clone());
                }
            }

            if let Some(file_output) = file_config.output
                && file_output.dir.is_some()
            {
                output.dir = file_output.dir;
                source_attribution.insert("output.dir".to_string(), source.clone());
            }
        }

        // Secrets file overrides the config file.
        if let Some(dir) = &config_dir {
            let secrets_path = dir.join("secrets.toml");
            if secrets_path.exists() {
                let secrets = Self::load_secrets_file(&secrets_path)?;
                let source = ConfigSource::SecretsFile(secrets_path.clone());
                apply_secret_values(&mut llm, &mut source_attribution, &source, |key| {
                    secrets.get(key).cloned()
                });
            }
        }

        // Environment overrides everything else.
        apply_secret_values(
            &mut llm,
            &mut source_attribution,
            &ConfigSource::Environment,
            env,
        );

        if let Some(dir) = &cli_args.output_dir {
            output.dir = Some(dir.clone());
            source_attribution.insert("output.dir".to_string(), ConfigSource::Cli);
        }
        if let Some(deployment) = &cli_args.deployment {
            llm.deployment = Some(deployment.clone());
            source_attribution.insert("deployment".to_string(), ConfigSource::Cli);
        }

        let config = Self {
            llm,
            templates,
            output,
            root_dir,
            source_attribution,
        };

        config.validate()?;

        tracing::debug!(
            config_file = ?config_path,
            root = %config.root_dir.display(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Search upward from `start_dir` for a `.poegen/` directory, stopping at
    /// a repository root (`.git`, `.hg`, `.svn`) or the filesystem root.
    #[must_use]
    pub fn discover_config_dir_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let candidate = current_dir.join(CONFIG_DIR_NAME);
            if candidate.is_dir() {
                return Some(candidate);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                return None;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))
    }

    fn load_secrets_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("failed to read {}: {e}", path.display()))
        })?;
        // Never echo the file content; it holds credentials.
        toml::from_str(&content).map_err(|_| {
            ConfigError::InvalidFile(format!(
                "{}: expected KEY = \"value\" string entries",
                path.display()
            ))
        })
    }
}

fn apply_secret_values(
    llm: &mut LlmConfig,
    attribution: &mut HashMap<String, ConfigSource>,
    source: &ConfigSource,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(value) = lookup(KEY_API_KEY) {
        llm.api_key = Some(value);
        attribution.insert("api_key".to_string(), source.clone());
    }
    if let Some(value) = lookup(KEY_ENDPOINT) {
        llm.endpoint = Some(value);
        attribution.insert("endpoint".to_string(), source.clone());
    }
    if let Some(value) = lookup(KEY_DEPLOYMENT) {
        llm.deployment = Some(value);
        attribution.insert("deployment".to_string(), source.clone());
    }
    if let Some(value) = lookup(KEY_API_VERSION) {
        llm.api_version = Some(value);
        attribution.insert("api_version".to_string(), source.clone());
    }
}
