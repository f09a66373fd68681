use std::collections::BTreeMap;

use poegen_utils::types::ConfigSource;

use super::{
    Config, DEFAULT_API_VERSION, DEFAULT_MAX_COMPLETION_TOKENS, DEFAULT_PROMPT_TOKEN_CEILING,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};

fn source_label(source: Option<&ConfigSource>) -> String {
    source.unwrap_or(&ConfigSource::Defaults).label().to_string()
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    ///
    /// The API key is never shown; only whether it is set.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source));
        };

        let unset = || "<unset>".to_string();

        add(
            "endpoint",
            self.llm.endpoint.clone().unwrap_or_else(unset),
        );
        add(
            "api_key",
            if self.llm.api_key.is_some() {
                "<set>".to_string()
            } else {
                unset()
            },
        );
        add(
            "deployment",
            self.llm.deployment.clone().unwrap_or_else(unset),
        );
        add(
            "api_version",
            self.llm
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        );
        add(
            "temperature",
            self.llm.temperature.unwrap_or(DEFAULT_TEMPERATURE).to_string(),
        );
        add(
            "max_completion_tokens",
            self.llm
                .max_completion_tokens
                .unwrap_or(DEFAULT_MAX_COMPLETION_TOKENS)
                .to_string(),
        );
        add(
            "timeout_secs",
            self.llm.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).to_string(),
        );
        add(
            "prompt_token_ceiling",
            self.llm
                .prompt_token_ceiling
                .unwrap_or(DEFAULT_PROMPT_TOKEN_CEILING)
                .to_string(),
        );

        let paths = self.template_paths();
        add("templates.solution", paths.solution.display().to_string());
        add("templates.pov", paths.pov.display().to_string());
        add(
            "templates.migration_header",
            paths.migration_header.display().to_string(),
        );
        add("output.dir", self.output_dir().display().to_string());

        config
    }
}
