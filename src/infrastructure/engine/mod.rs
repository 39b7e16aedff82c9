//! Speech engine implementations and the adapter registry

mod credentials;
mod elevenlabs;
mod factory;
mod http_client;
mod openai;
mod registry;
mod synthetic;

pub use credentials::{EnvCredentialSource, EnvMapping};
pub use elevenlabs::ElevenLabsEngine;
pub use factory::DefaultEngineFactory;
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiEngine;
pub use registry::{EngineRegistry, EngineSummary};
pub use synthetic::{wav_header, SyntheticEngine};
