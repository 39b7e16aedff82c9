//! Speech engine domain: identifiers, capability contract and credentials

mod adapter;
mod credentials;
mod id;

pub use adapter::{AudioSink, EngineAdapter, EngineCapabilities, EngineFactory, EngineStatus};
pub use credentials::{
    resolve_credentials, CredentialResolution, CredentialSource, EngineCredentials,
};
pub use id::EngineId;

#[cfg(test)]
pub use adapter::mock;
