//! Synthesis request router
//!
//! Picks the capability path for a request, checks it against the engine's
//! capabilities before any vendor call, applies the deployment's format
//! policy, enforces the deadline and records usage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::usage::{RequestPath, UsageRecord};
use crate::domain::{
    AudioFormat, AudioSink, DomainError, EngineAdapter, EngineId, SynthesisRequest,
    TimestampedAudio,
};
use crate::infrastructure::engine::EngineRegistry;
use crate::infrastructure::observability::{record_synthesis, SynthesisMetricParams};
use crate::infrastructure::usage::UsageRecorder;

/// What to do when a request asks for a format the engine cannot produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatPolicy {
    /// Fail with `UnsupportedFormat`
    #[default]
    Reject,
    /// Serve the engine's native format and report it
    Passthrough,
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub default_engine: EngineId,
    pub format_policy: FormatPolicy,
    pub request_timeout: Duration,
    pub stream_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_engine: EngineId::Synthetic,
            format_policy: FormatPolicy::Reject,
            request_timeout: Duration::from_secs(30),
            stream_timeout: Duration::from_secs(120),
        }
    }
}

/// How the caller wants the audio delivered
#[derive(Debug, Default)]
pub struct RouteOptions {
    pub timestamps: bool,
    pub sink: Option<AudioSink>,
}

impl RouteOptions {
    pub fn batch() -> Self {
        Self::default()
    }

    pub fn with_timestamps() -> Self {
        Self {
            timestamps: true,
            sink: None,
        }
    }

    pub fn streaming(sink: AudioSink) -> Self {
        Self {
            timestamps: false,
            sink: Some(sink),
        }
    }

    /// Timestamps win over streaming, streaming over batch
    pub fn path(&self) -> RequestPath {
        if self.timestamps {
            RequestPath::Timestamps
        } else if self.sink.is_some() {
            RequestPath::Stream
        } else {
            RequestPath::Batch
        }
    }
}

/// A request checked against its engine, ready for the vendor call
#[derive(Debug)]
pub struct RoutePlan {
    adapter: Arc<dyn EngineAdapter>,
    request: SynthesisRequest,
    engine: EngineId,
    path: RequestPath,
    voice: Option<String>,
    format_substituted: bool,
}

impl RoutePlan {
    pub fn engine(&self) -> EngineId {
        self.engine
    }

    pub fn path(&self) -> RequestPath {
        self.path
    }

    /// Format that will actually be produced
    pub fn format(&self) -> AudioFormat {
        self.request.format()
    }

    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn format_substituted(&self) -> bool {
        self.format_substituted
    }

    pub fn request(&self) -> &SynthesisRequest {
        &self.request
    }
}

#[derive(Debug)]
pub enum SynthesisOutput {
    Audio(Bytes),
    Timestamped(TimestampedAudio),
    /// Audio went to the sink
    Streamed,
}

#[derive(Debug)]
pub struct RoutedSynthesis {
    pub engine: EngineId,
    pub path: RequestPath,
    pub format: AudioFormat,
    pub voice: Option<String>,
    pub output: SynthesisOutput,
}

#[derive(Debug)]
pub struct SynthesisRouter {
    registry: Arc<EngineRegistry>,
    usage: Arc<UsageRecorder>,
    config: RouterConfig,
}

impl SynthesisRouter {
    pub fn new(registry: Arc<EngineRegistry>, usage: Arc<UsageRecorder>, config: RouterConfig) -> Self {
        Self {
            registry,
            usage,
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }

    pub async fn route(
        &self,
        key_id: &str,
        request: SynthesisRequest,
        options: RouteOptions,
    ) -> Result<RoutedSynthesis, DomainError> {
        let plan = self.plan(key_id, request, &options).await?;
        self.execute(key_id, plan, options).await
    }

    /// Resolve the engine and validate the request without contacting the vendor
    pub async fn plan(
        &self,
        key_id: &str,
        request: SynthesisRequest,
        options: &RouteOptions,
    ) -> Result<RoutePlan, DomainError> {
        let engine = request.engine().unwrap_or(self.config.default_engine);
        let path = options.path();
        let started = Instant::now();

        match self.check(engine, path, request).await {
            Ok(plan) => Ok(plan),
            Err((e, characters)) => {
                self.finish(key_id, engine, path, characters, started, Err(&e), 0)
                    .await;
                Err(e)
            }
        }
    }

    async fn check(
        &self,
        engine: EngineId,
        path: RequestPath,
        request: SynthesisRequest,
    ) -> Result<RoutePlan, (DomainError, usize)> {
        let characters = request.character_count();
        let adapter = self
            .registry
            .get_engine(engine)
            .await
            .map_err(|e| (e, characters))?;
        let capabilities = adapter.capabilities();

        let missing = match path {
            RequestPath::Timestamps if !capabilities.supports_timestamps => Some("timestamps"),
            RequestPath::Stream if !capabilities.supports_streaming => Some("streaming"),
            _ => None,
        };
        if let Some(capability) = missing {
            return Err((
                DomainError::unsupported_capability(engine.as_str(), capability),
                characters,
            ));
        }

        let mut request = request;
        let mut format_substituted = false;
        if !capabilities.supports_format(request.format()) {
            match self.config.format_policy {
                FormatPolicy::Reject => {
                    return Err((
                        DomainError::unsupported_format(engine.as_str(), request.format().as_str()),
                        characters,
                    ));
                }
                FormatPolicy::Passthrough => {
                    debug!(
                        engine = %engine,
                        requested = %request.format(),
                        native = %capabilities.native_format,
                        "Substituting native format"
                    );
                    request = request.with_format(capabilities.native_format);
                    format_substituted = true;
                }
            }
        }

        let voice = request
            .voice()
            .or(adapter.default_voice())
            .map(str::to_string);

        Ok(RoutePlan {
            adapter,
            request,
            engine,
            path,
            voice,
            format_substituted,
        })
    }

    /// Call the vendor under the deadline and record the outcome
    pub async fn execute(
        &self,
        key_id: &str,
        plan: RoutePlan,
        options: RouteOptions,
    ) -> Result<RoutedSynthesis, DomainError> {
        let started = Instant::now();
        let deadline = match plan.path {
            RequestPath::Stream => self.config.stream_timeout,
            _ => self.config.request_timeout,
        };

        let sink = options.sink;
        let call = async {
            match (plan.path, sink) {
                (RequestPath::Timestamps, _) => plan
                    .adapter
                    .synthesize_with_timestamps(&plan.request)
                    .await
                    .map(SynthesisOutput::Timestamped),
                (RequestPath::Stream, Some(sink)) => plan
                    .adapter
                    .synthesize_stream(&plan.request, sink)
                    .await
                    .map(|_| SynthesisOutput::Streamed),
                _ => plan
                    .adapter
                    .synthesize(&plan.request)
                    .await
                    .map(SynthesisOutput::Audio),
            }
        };

        let result = match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(engine = %plan.engine, path = %plan.path, ?deadline, "Synthesis deadline exceeded");
                Err(DomainError::timeout(deadline))
            }
        };

        let audio_bytes = match &result {
            Ok(SynthesisOutput::Audio(audio)) => audio.len(),
            Ok(SynthesisOutput::Timestamped(t)) => t.audio.len(),
            _ => 0,
        };

        self.finish(
            key_id,
            plan.engine,
            plan.path,
            plan.request.character_count(),
            started,
            result.as_ref().map(|_| ()),
            audio_bytes,
        )
        .await;

        let output = result?;
        info!(
            key_id,
            engine = %plan.engine,
            path = %plan.path,
            format = %plan.request.format(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Synthesis completed"
        );

        Ok(RoutedSynthesis {
            engine: plan.engine,
            path: plan.path,
            format: plan.request.format(),
            voice: plan.voice,
            output,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        key_id: &str,
        engine: EngineId,
        path: RequestPath,
        characters: usize,
        started: Instant,
        outcome: Result<(), &DomainError>,
        audio_bytes: usize,
    ) {
        let duration = started.elapsed();
        let status_code = match outcome {
            Ok(()) => 200,
            Err(e) => {
                debug!(key_id, engine = %engine, error = %e, "Synthesis failed");
                e.status_code()
            }
        };

        record_synthesis(SynthesisMetricParams {
            engine: engine.as_str(),
            path: path.as_str(),
            duration,
            success: outcome.is_ok(),
            characters: characters as u64,
            audio_bytes: audio_bytes as u64,
        });

        self.usage
            .append_usage(
                UsageRecord::new(key_id, engine, path)
                    .with_character_count(characters)
                    .with_duration_ms(duration.as_millis() as u64)
                    .with_status_code(status_code),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::mock::{MockCounters, MockEngineFactory};
    use crate::domain::EngineCapabilities;
    use crate::infrastructure::engine::EnvCredentialSource;
    use crate::infrastructure::usage::InMemoryUsageRepository;
    use tokio::sync::mpsc;

    struct Harness {
        router: SynthesisRouter,
        counters: Arc<MockCounters>,
        usage: Arc<UsageRecorder>,
    }

    fn harness_with(factory: MockEngineFactory, config: RouterConfig) -> Harness {
        let counters = factory.counters.clone();
        let registry = Arc::new(EngineRegistry::new(
            Arc::new(factory),
            Arc::new(EnvCredentialSource::new()),
        ));
        let usage = Arc::new(UsageRecorder::new(
            Arc::new(InMemoryUsageRepository::default()),
            64,
        ));
        Harness {
            router: SynthesisRouter::new(registry, usage.clone(), config),
            counters,
            usage,
        }
    }

    fn harness() -> Harness {
        harness_with(MockEngineFactory::new(), RouterConfig::default())
    }

    fn batch_only() -> EngineCapabilities {
        EngineCapabilities {
            supports_streaming: false,
            supports_timestamps: false,
            supported_formats: vec![AudioFormat::Wav],
            native_format: AudioFormat::Wav,
        }
    }

    fn request(format: AudioFormat) -> SynthesisRequest {
        SynthesisRequest::builder("hello there")
            .format(format)
            .build()
            .unwrap()
    }

    #[test]
    fn test_path_precedence() {
        let (tx, _rx) = mpsc::channel(1);
        let both = RouteOptions {
            timestamps: true,
            sink: Some(tx.clone()),
        };
        assert_eq!(both.path(), RequestPath::Timestamps);
        assert_eq!(RouteOptions::streaming(tx).path(), RequestPath::Stream);
        assert_eq!(RouteOptions::batch().path(), RequestPath::Batch);
    }

    #[tokio::test]
    async fn test_batch_route() {
        let h = harness();

        let routed = h
            .router
            .route("key-1", request(AudioFormat::Wav), RouteOptions::batch())
            .await
            .unwrap();

        assert_eq!(routed.engine, EngineId::Synthetic);
        assert_eq!(routed.path, RequestPath::Batch);
        assert_eq!(routed.voice.as_deref(), Some("mock-voice"));
        assert!(matches!(routed.output, SynthesisOutput::Audio(ref a) if &a[..] == b"mock-audio"));
    }

    #[tokio::test]
    async fn test_timestamps_take_precedence_over_sink() {
        let h = harness();
        let (tx, _rx) = mpsc::channel(4);
        let options = RouteOptions {
            timestamps: true,
            sink: Some(tx),
        };

        let routed = h
            .router
            .route("key-1", request(AudioFormat::Wav), options)
            .await
            .unwrap();

        assert_eq!(routed.path, RequestPath::Timestamps);
        assert!(matches!(routed.output, SynthesisOutput::Timestamped(_)));
    }

    #[tokio::test]
    async fn test_stream_route_delivers_in_order() {
        let factory = MockEngineFactory::new();
        let h = harness_with(factory, RouterConfig::default());
        let (tx, mut rx) = mpsc::channel(8);

        let routed = h
            .router
            .route("key-1", request(AudioFormat::Wav), RouteOptions::streaming(tx))
            .await
            .unwrap();

        assert!(matches!(routed.output, SynthesisOutput::Streamed));
        assert_eq!(rx.recv().await.unwrap(), "mock-audio");
    }

    #[tokio::test]
    async fn test_unsupported_capability_skips_vendor() {
        let h = harness_with(
            MockEngineFactory::new().with_capabilities(batch_only()),
            RouterConfig::default(),
        );

        let result = h
            .router
            .route("key-1", request(AudioFormat::Wav), RouteOptions::with_timestamps())
            .await;
        assert!(matches!(
            result,
            Err(DomainError::UnsupportedCapability { ref capability, .. }) if capability == "timestamps"
        ));

        let (tx, _rx) = mpsc::channel(1);
        let result = h
            .router
            .route("key-1", request(AudioFormat::Wav), RouteOptions::streaming(tx))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::UnsupportedCapability { ref capability, .. }) if capability == "streaming"
        ));

        assert_eq!(h.counters.vendor_calls(), 0);
    }

    #[tokio::test]
    async fn test_format_reject_policy() {
        let h = harness();

        let result = h
            .router
            .route("key-1", request(AudioFormat::Mp3), RouteOptions::batch())
            .await;

        assert!(matches!(result, Err(DomainError::UnsupportedFormat { .. })));
        assert_eq!(h.counters.vendor_calls(), 0);
    }

    #[tokio::test]
    async fn test_format_passthrough_policy() {
        let config = RouterConfig {
            format_policy: FormatPolicy::Passthrough,
            ..Default::default()
        };
        let h = harness_with(MockEngineFactory::new(), config);

        let plan = h
            .router
            .plan("key-1", request(AudioFormat::Mp3), &RouteOptions::batch())
            .await
            .unwrap();
        assert!(plan.format_substituted());
        assert_eq!(plan.format(), AudioFormat::Wav);

        let routed = h
            .router
            .execute("key-1", plan, RouteOptions::batch())
            .await
            .unwrap();
        assert_eq!(routed.format, AudioFormat::Wav);
    }

    #[tokio::test]
    async fn test_deadline_aborts_vendor_call() {
        let config = RouterConfig {
            request_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let h = harness_with(
            MockEngineFactory::new().with_synthesis_delay(Duration::from_secs(5)),
            config,
        );

        let started = Instant::now();
        let result = h
            .router
            .route("key-1", request(AudioFormat::Wav), RouteOptions::batch())
            .await;

        assert!(matches!(result, Err(DomainError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_missing_credentials_for_default_engine() {
        let config = RouterConfig {
            default_engine: EngineId::OpenAi,
            ..Default::default()
        };
        let h = harness_with(MockEngineFactory::new(), config);

        let result = h
            .router
            .route("key-1", request(AudioFormat::Wav), RouteOptions::batch())
            .await;
        assert!(matches!(result, Err(DomainError::MissingCredentials { .. })));
    }

    #[tokio::test]
    async fn test_usage_recorded_for_success_and_failure() {
        let h = harness();

        h.router
            .route("key-1", request(AudioFormat::Wav), RouteOptions::batch())
            .await
            .unwrap();
        let _ = h
            .router
            .route("key-1", request(AudioFormat::Mp3), RouteOptions::batch())
            .await;

        let records = h.usage.get_usage(None, None).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.key_id() == "key-1"));
        assert!(records.iter().all(|r| r.character_count() == 11));

        let mut codes: Vec<u16> = records.iter().map(|r| r.status_code()).collect();
        codes.sort();
        assert_eq!(codes, vec![200, 415]);
    }
}
