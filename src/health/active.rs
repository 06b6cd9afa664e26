//! Active health checking.
//!
//! # Responsibilities
//! - Probe every upstream service concurrently on demand
//! - Provide a quick liveness answer from the image upstream alone

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::UpstreamConfig;
use crate::health::state::{HealthReport, OverallStatus, ServicesHealth};
use crate::upstream::UpstreamClient;

pub struct HealthMonitor {
    upstream: Arc<UpstreamClient>,
    started: Instant,
    probe_timeout: Duration,
    quick_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(upstream: Arc<UpstreamClient>, config: &UpstreamConfig) -> Self {
        Self {
            upstream,
            started: Instant::now(),
            probe_timeout: Duration::from_secs(config.health_timeout_secs),
            quick_timeout: Duration::from_secs(config.health_quick_timeout_secs),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Full report: HEAD every upstream at once.
    pub async fn report(&self) -> HealthReport {
        let [(_, image), (_, text), (_, speech), (_, transcription)] = self.upstream.probe_targets();
        let timeout = self.probe_timeout;

        let (image, text, speech, transcription) = tokio::join!(
            self.upstream.probe(image, timeout),
            self.upstream.probe(text, timeout),
            self.upstream.probe(speech, timeout),
            self.upstream.probe(transcription, timeout),
        );

        let services = ServicesHealth {
            text_to_image: image.into(),
            text_to_text: text.into(),
            text_to_speech: speech.into(),
            speech_to_text: transcription.into(),
        };
        let unhealthy = services.unhealthy_count();
        if unhealthy > 0 {
            tracing::warn!(unhealthy, "Upstream health degraded");
        }

        HealthReport {
            status: OverallStatus::from_unhealthy_count(unhealthy),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime: self.uptime().as_secs(),
            services,
        }
    }

    /// Liveness: the image upstream answers a HEAD in time.
    pub async fn quick_check(&self) -> bool {
        self.upstream
            .probe(self.upstream.image_probe_target(), self.quick_timeout)
            .await
            .healthy
    }
}
