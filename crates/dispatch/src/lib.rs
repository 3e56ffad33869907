//! Side-effect dispatcher. The conversation decides; this crate delivers.
//!
//! Each accepted effect becomes a job record in sled and a spawned task that
//! calls the matching collaborator. Delivery never blocks the conversational
//! response, and delivery failures are logged and audited rather than
//! surfaced: the user was already told the prompt "will appear."

mod audit;

use anyhow::{anyhow, Result};
use audit::{write_audit_event, AuditEvent};
use chrono::{DateTime, Utc};
use provider::{CheckoutPayload, PaymentsClient, SmsClient, SmsPayload};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{timeout, Duration};

const EFFECT_TIMEOUT: Duration = Duration::from_secs(15);

/// An outbound effect as handed to the dispatcher by the channel adapters
/// or API handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectJob {
    SendSms(SmsPayload),
    MobileCheckout(CheckoutPayload),
}

impl EffectJob {
    fn kind(&self) -> &'static str {
        match self {
            EffectJob::SendSms(_) => "send_sms",
            EffectJob::MobileCheckout(_) => "mobile_checkout",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub kind: String,
    pub state: String,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub provider_ref: Option<String>,
}

pub struct Dispatcher {
    db: Db,
    sms: Option<Arc<dyn SmsClient>>,
    payments: Option<Arc<dyn PaymentsClient>>,
    audit_path: PathBuf,
}

impl Dispatcher {
    pub fn open(
        dir: impl AsRef<Path>,
        sms: Option<Arc<dyn SmsClient>>,
        payments: Option<Arc<dyn PaymentsClient>>,
    ) -> Result<Arc<Self>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let db = sled::open(dir.join("jobs.db"))?;
        Ok(Arc::new(Self {
            db,
            sms,
            payments,
            audit_path: dir.join("audit.jsonl"),
        }))
    }

    fn jobs_tree(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree("jobs")?)
    }

    fn payloads_tree(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree("payloads")?)
    }

    /// Records the job and spawns delivery. Returns immediately with the
    /// job id; the response path never waits on the collaborator.
    pub fn dispatch(self: &Arc<Self>, job: EffectJob) -> Result<String> {
        let job_id = generate_job_id();
        let now = Utc::now();
        let rec = JobRecord {
            job_id: job_id.clone(),
            kind: job.kind().to_string(),
            state: "queued".to_string(),
            last_error: None,
            created_at: now,
            updated_at: now,
            provider_ref: None,
        };

        self.jobs_tree()?
            .insert(job_id.as_bytes(), serde_json::to_vec(&rec)?)?;
        self.payloads_tree()?
            .insert(job_id.as_bytes(), serde_json::to_vec(&job)?)?;

        let _ = write_audit_event(
            &self.audit_path,
            &AuditEvent::new("effect_queued", &job_id, job.kind(), "queued"),
        );

        let this = Arc::clone(self);
        let spawn_id = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::process_job(this, spawn_id.clone()).await {
                tracing::error!(job_id=%spawn_id, error=%e, "effect processing failed");
            }
        });

        Ok(job_id)
    }

    async fn process_job(this: Arc<Self>, job_id: String) -> Result<()> {
        let jobs = this.jobs_tree()?;
        let payloads = this.payloads_tree()?;

        update_state(&jobs, &job_id, |rec| {
            rec.state = "in_flight".into();
            rec.updated_at = Utc::now();
            rec.last_error = None;
        })?;

        let payload_bytes = payloads
            .get(job_id.as_bytes())?
            .ok_or_else(|| anyhow!("payload missing"))?;
        let job: EffectJob = serde_json::from_slice(&payload_bytes)?;
        let kind = job.kind();

        let outcome = match &job {
            EffectJob::SendSms(payload) => match &this.sms {
                Some(client) => Some(deliver(client.send(payload)).await),
                None => None,
            },
            EffectJob::MobileCheckout(payload) => match &this.payments {
                Some(client) => Some(deliver(client.mobile_checkout(payload)).await),
                None => None,
            },
        };

        match outcome {
            None => {
                // Collaborator not configured: the conversation already
                // completed, only the delivery attempt is dropped.
                tracing::warn!(job_id=%job_id, kind, "collaborator not configured, skipping effect");
                update_state(&jobs, &job_id, |rec| {
                    rec.state = "skipped".into();
                    rec.updated_at = Utc::now();
                })?;
                let _ = write_audit_event(
                    &this.audit_path,
                    &AuditEvent::new("effect_skipped", &job_id, kind, "skipped"),
                );
            }
            Some(Ok(provider_ref)) => {
                tracing::info!(job_id=%job_id, kind, %provider_ref, "effect delivered");
                update_state(&jobs, &job_id, |rec| {
                    rec.state = "sent".into();
                    rec.updated_at = Utc::now();
                    rec.provider_ref = Some(provider_ref.clone());
                })?;
                let _ = write_audit_event(
                    &this.audit_path,
                    &AuditEvent::new("effect_sent", &job_id, kind, "sent")
                        .with_provider_ref(provider_ref),
                );
            }
            Some(Err(err)) => {
                tracing::error!(job_id=%job_id, kind, error=%err, "effect delivery failed");
                update_state(&jobs, &job_id, |rec| {
                    rec.state = "failed".into();
                    rec.updated_at = Utc::now();
                    rec.last_error = Some(err.to_string());
                })?;
                let _ = write_audit_event(
                    &this.audit_path,
                    &AuditEvent::new("effect_failed", &job_id, kind, "failed")
                        .with_error(err.to_string()),
                );
            }
        }

        Ok(())
    }

    pub fn job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let jobs = self.jobs_tree()?;
        match jobs.get(job_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> Result<Vec<JobRecord>> {
        let jobs = self.jobs_tree()?;
        let mut out = Vec::new();
        for item in jobs.iter() {
            let (_k, v) = item?;
            let rec: JobRecord = serde_json::from_slice(&v)?;
            out.push(rec);
        }
        out.sort_by_key(|r| r.created_at);
        out.reverse();
        Ok(out)
    }
}

/// Bounds a collaborator call so a hung transport cannot pin a task forever.
async fn deliver(fut: impl std::future::Future<Output = Result<String>>) -> Result<String> {
    match timeout(EFFECT_TIMEOUT, fut).await {
        Ok(res) => res,
        Err(_) => Err(anyhow!("timed out after {:?}", EFFECT_TIMEOUT)),
    }
}

fn generate_job_id() -> String {
    use rand::{distributions::Alphanumeric, Rng};
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

fn update_state<F>(jobs: &sled::Tree, job_id: &str, mut f: F) -> Result<()>
where
    F: FnMut(&mut JobRecord),
{
    let key = job_id.as_bytes();
    let existing = jobs
        .get(key)?
        .ok_or_else(|| anyhow!("job not found: {job_id}"))?;
    let mut rec: JobRecord = serde_json::from_slice(&existing)?;
    f(&mut rec);
    jobs.insert(key, serde_json::to_vec(&rec)?)?;
    Ok(())
}
