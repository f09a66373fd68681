use poegen_utils::error::ConfigError;

use super::Config;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Absent values are fine here; required LLM fields are checked by
    /// [`Config::llm_settings`] so that `poegen config` and `poegen templates`
    /// work without credentials.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(temperature) = self.llm.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(invalid("temperature", "must be between 0.0 and 2.0"));
        }

        if let Some(max_tokens) = self.llm.max_completion_tokens {
            if max_tokens == 0 {
                return Err(invalid("max_completion_tokens", "must be greater than 0"));
            }
            if max_tokens > 128_000 {
                return Err(invalid(
                    "max_completion_tokens",
                    "exceeds maximum limit of 128000",
                ));
            }
        }

        if let Some(timeout) = self.llm.timeout_secs {
            if timeout < 5 {
                return Err(invalid("timeout_secs", "must be at least 5 seconds"));
            }
            if timeout > 3600 {
                return Err(invalid(
                    "timeout_secs",
                    "exceeds maximum limit of 3600 seconds (1 hour)",
                ));
            }
        }

        if let Some(ceiling) = self.llm.prompt_token_ceiling
            && ceiling < 1024
        {
            return Err(invalid("prompt_token_ceiling", "must be at least 1024"));
        }

        if let Some(endpoint) = &self.llm.endpoint {
            let trimmed = endpoint.trim();
            if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                return Err(invalid("endpoint", "must start with https:// or http://"));
            }
        }

        if let Some(deployment) = &self.llm.deployment
            && deployment.contains('/')
        {
            return Err(invalid("deployment", "must not contain '/'"));
        }

        Ok(())
    }
}
