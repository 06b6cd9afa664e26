//! Health report types.
//!
//! Overall status is derived from how many upstream services are down:
//! none → healthy, one or two → degraded, three or more → unhealthy.

use serde::Serialize;

use crate::upstream::ProbeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl OverallStatus {
    pub fn from_unhealthy_count(unhealthy: usize) -> Self {
        match unhealthy {
            0 => OverallStatus::Healthy,
            1..=2 => OverallStatus::Degraded,
            _ => OverallStatus::Unhealthy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    /// Milliseconds spent on the probe.
    pub response_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ProbeResult> for ServiceHealth {
    fn from(probe: ProbeResult) -> Self {
        Self {
            status: if probe.healthy {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Unhealthy
            },
            response_time: probe.elapsed.as_millis() as u64,
            error: probe.error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesHealth {
    pub text_to_image: ServiceHealth,
    pub text_to_text: ServiceHealth,
    pub text_to_speech: ServiceHealth,
    pub speech_to_text: ServiceHealth,
}

impl ServicesHealth {
    pub fn unhealthy_count(&self) -> usize {
        [
            &self.text_to_image,
            &self.text_to_text,
            &self.text_to_speech,
            &self.speech_to_text,
        ]
        .iter()
        .filter(|s| s.status == ServiceStatus::Unhealthy)
        .count()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: OverallStatus,
    pub timestamp: String,
    /// Seconds since the gateway started.
    pub uptime: u64,
    pub services: ServicesHealth,
}
