use super::{CheckoutPayload, PaymentsClient, SmsClient, SmsPayload};
use anyhow::{bail, Result};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

fn random_ref(prefix: &str) -> String {
    let id: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("{prefix}{id}")
}

/// Recording fake for the messaging collaborator. Every accepted payload is
/// kept for inspection; flipping `fail` makes subsequent sends error, which
/// exercises the dispatcher's failure path.
#[derive(Default)]
pub struct MockSmsClient {
    outbox: Mutex<Vec<SmsPayload>>,
    fail: AtomicBool,
}

impl MockSmsClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SmsPayload> {
        self.outbox.lock().expect("outbox poisoned").clone()
    }
}

#[async_trait]
impl SmsClient for MockSmsClient {
    async fn send(&self, payload: &SmsPayload) -> Result<String> {
        // simulate network latency
        sleep(Duration::from_millis(25)).await;
        if self.fail.load(Ordering::SeqCst) {
            bail!("mock messaging outage");
        }
        self.outbox
            .lock()
            .expect("outbox poisoned")
            .push(payload.clone());
        Ok(random_ref("ATXid_"))
    }
}

/// Recording fake for the charge-initiation collaborator.
#[derive(Default)]
pub struct MockPaymentsClient {
    charges: Mutex<Vec<CheckoutPayload>>,
    fail: AtomicBool,
}

impl MockPaymentsClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn charges(&self) -> Vec<CheckoutPayload> {
        self.charges.lock().expect("charges poisoned").clone()
    }
}

#[async_trait]
impl PaymentsClient for MockPaymentsClient {
    async fn mobile_checkout(&self, payload: &CheckoutPayload) -> Result<String> {
        sleep(Duration::from_millis(25)).await;
        if self.fail.load(Ordering::SeqCst) {
            bail!("mock payments outage");
        }
        self.charges
            .lock()
            .expect("charges poisoned")
            .push(payload.clone());
        Ok(random_ref("ATPid_"))
    }
}
