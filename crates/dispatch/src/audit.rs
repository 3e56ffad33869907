use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event_type: String,
    pub job_id: String,
    pub kind: String,
    pub state: String,
    pub provider_ref: Option<String>,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: &str, job_id: &str, kind: &str, state: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event_type: event_type.to_string(),
            job_id: job_id.to_string(),
            kind: kind.to_string(),
            state: state.to_string(),
            provider_ref: None,
            error: None,
        }
    }

    pub fn with_provider_ref(mut self, provider_ref: String) -> Self {
        self.provider_ref = Some(provider_ref);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

pub fn write_audit_event(path: &Path, event: &AuditEvent) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(event)?;
    writeln!(file, "{}", json)?;
    tracing::debug!(event_type=%event.event_type, job_id=%event.job_id, "Audit event written");
    Ok(())
}
