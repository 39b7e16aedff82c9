use std::collections::HashMap;
use std::env;

use tracing::debug;

use crate::domain::{CredentialSource, EngineCredentials, EngineId};

/// Environment variable names for one engine
#[derive(Debug, Clone)]
pub struct EnvMapping {
    pub api_key_var: String,
    pub base_url_var: Option<String>,
}

impl EnvMapping {
    pub fn new(api_key_var: impl Into<String>) -> Self {
        Self {
            api_key_var: api_key_var.into(),
            base_url_var: None,
        }
    }

    pub fn with_base_url_var(mut self, var: impl Into<String>) -> Self {
        self.base_url_var = Some(var.into());
        self
    }
}

/// Default vendor credentials read from the environment
///
/// Variables are read once when the source is built. Rotating a key means
/// restarting or disposing the cached engine after rebuilding the source.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialSource {
    mappings: HashMap<EngineId, EnvMapping>,
    snapshot: HashMap<EngineId, EngineCredentials>,
}

impl EnvCredentialSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, engine: EngineId, mapping: EnvMapping) -> Self {
        self.mappings.insert(engine, mapping);
        self
    }

    pub fn with_defaults(self) -> Self {
        self.with_mapping(
            EngineId::OpenAi,
            EnvMapping::new("OPENAI_API_KEY").with_base_url_var("OPENAI_BASE_URL"),
        )
        .with_mapping(
            EngineId::ElevenLabs,
            EnvMapping::new("ELEVENLABS_API_KEY").with_base_url_var("ELEVENLABS_BASE_URL"),
        )
    }

    /// Provide credentials directly instead of via the environment
    pub fn with_credentials(mut self, engine: EngineId, credentials: EngineCredentials) -> Self {
        self.snapshot.insert(engine, credentials);
        self
    }

    /// Read every mapped variable now
    pub fn load(mut self) -> Self {
        self.load_with(|var| env::var(var).ok());
        self
    }

    fn load_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (engine, mapping) in &self.mappings {
            let Some(api_key) = lookup(&mapping.api_key_var).filter(|k| !k.trim().is_empty())
            else {
                debug!(engine = %engine, var = %mapping.api_key_var, "No default credentials");
                continue;
            };

            let mut credentials = EngineCredentials::new(api_key.trim());
            if let Some(base_url) = mapping.base_url_var.as_deref().and_then(&lookup) {
                credentials = credentials.with_base_url(base_url);
            }
            debug!(engine = %engine, "Loaded default credentials from environment");
            self.snapshot.insert(*engine, credentials);
        }
    }

    pub fn configured_engines(&self) -> Vec<EngineId> {
        let mut engines: Vec<EngineId> = self.snapshot.keys().copied().collect();
        engines.sort_by_key(|e| e.as_str());
        engines
    }
}

impl CredentialSource for EnvCredentialSource {
    fn default_credentials(&self, engine: EngineId) -> Option<EngineCredentials> {
        self.snapshot.get(&engine).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_load_from_environment_values() {
        let mut source = EnvCredentialSource::new().with_defaults();
        source.load_with(lookup_from(&[
            ("OPENAI_API_KEY", " sk-openai "),
            ("OPENAI_BASE_URL", "http://localhost:8080"),
        ]));

        let openai = source.default_credentials(EngineId::OpenAi).unwrap();
        assert_eq!(openai.api_key(), "sk-openai");
        assert_eq!(openai.base_url(), Some("http://localhost:8080"));
        assert!(source.default_credentials(EngineId::ElevenLabs).is_none());
        assert_eq!(source.configured_engines(), vec![EngineId::OpenAi]);
    }

    #[test]
    fn test_blank_key_is_ignored() {
        let mut source = EnvCredentialSource::new().with_defaults();
        source.load_with(lookup_from(&[("ELEVENLABS_API_KEY", "   ")]));

        assert!(source.default_credentials(EngineId::ElevenLabs).is_none());
    }

    #[test]
    fn test_explicit_credentials() {
        let source = EnvCredentialSource::new()
            .with_credentials(EngineId::ElevenLabs, EngineCredentials::new("xi"));

        assert_eq!(
            source
                .default_credentials(EngineId::ElevenLabs)
                .unwrap()
                .api_key(),
            "xi"
        );
        assert!(source.default_credentials(EngineId::Synthetic).is_none());
    }
}
