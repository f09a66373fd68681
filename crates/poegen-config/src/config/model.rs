use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use poegen_utils::types::ConfigSource;

/// Azure OpenAI API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Sampling temperature for every stage.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Completion budget per call.
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 16_384;

/// Network timeout per call in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Prompt size ceiling of the reference deployment.
pub const DEFAULT_PROMPT_TOKEN_CEILING: usize = 128_000;

/// Template file names looked up under `templates/` when none are configured.
pub const DEFAULT_SOLUTION_TEMPLATE: &str = "templates/solution_template.docx";
pub const DEFAULT_POV_TEMPLATE: &str = "templates/pov_template.docx";
pub const DEFAULT_MIGRATION_HEADER: &str = "templates/migration_header.csv";

/// Environment / secrets keys.
pub const KEY_API_KEY: &str = "AZURE_OPENAI_KEY";
pub const KEY_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const KEY_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT";
pub const KEY_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

/// Configuration for poegen.
///
/// Each value tracks its source for `poegen config`.
///
/// # Configuration File Format
///
/// ```toml
/// [llm]
/// endpoint = "https://contoso.openai.azure.com/"
/// deployment = "gpt-4o"
/// api_version = "2024-06-01"
/// temperature = 0.7
/// max_completion_tokens = 16384
/// timeout_secs = 300
/// prompt_token_ceiling = 128000
///
/// [templates]
/// solution = "templates/solution_template.docx"
/// pov = "templates/pov_template.docx"
/// migration_header = "templates/migration_header.csv"
///
/// [output]
/// dir = "out"
/// ```
///
/// The API key belongs in `.poegen/secrets.toml` or the environment:
///
/// ```toml
/// AZURE_OPENAI_KEY = "..."
/// AZURE_OPENAI_ENDPOINT = "https://contoso.openai.azure.com/"
/// AZURE_OPENAI_DEPLOYMENT = "gpt-4o"
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub llm: LlmConfig,
    pub templates: TemplatesConfig,
    pub output: OutputConfig,
    /// Directory relative template and output paths resolve against.
    pub root_dir: PathBuf,
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[llm]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub deployment: Option<String>,
    pub api_version: Option<String>,
    pub temperature: Option<f32>,
    pub max_completion_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub prompt_token_ceiling: Option<usize>,
}

/// `[templates]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
    pub solution: Option<PathBuf>,
    pub pov: Option<PathBuf>,
    pub migration_header: Option<PathBuf>,
}

/// `[output]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
}

/// Fully resolved LLM connection settings.
///
/// Obtained through [`Config::llm_settings`], which fails when any required
/// field is absent.
#[derive(Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub timeout: Duration,
    pub prompt_token_ceiling: usize,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("temperature", &self.temperature)
            .field("max_completion_tokens", &self.max_completion_tokens)
            .field("timeout", &self.timeout)
            .field("prompt_token_ceiling", &self.prompt_token_ceiling)
            .finish()
    }
}

/// Resolved template locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePaths {
    pub solution: PathBuf,
    pub pov: PathBuf,
    pub migration_header: PathBuf,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub deployment: Option<String>,
}
