use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// The closed set of speech engines the gateway knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    OpenAi,
    ElevenLabs,
    /// Local tone generator, needs no vendor account
    Synthetic,
}

impl EngineId {
    pub const ALL: [EngineId; 3] = [Self::OpenAi, Self::ElevenLabs, Self::Synthetic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::ElevenLabs => "elevenlabs",
            Self::Synthetic => "synthetic",
        }
    }

    /// Whether the engine refuses to start without credentials
    pub fn requires_key(&self) -> bool {
        !matches!(self, Self::Synthetic)
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        value.parse()
    }
}

impl std::str::FromStr for EngineId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| DomainError::not_found(format!("Unsupported engine '{}'", s)))
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
