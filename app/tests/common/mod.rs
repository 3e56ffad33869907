use config::AppConfig;
use dispatch::Dispatcher;
use provider::mock::{MockPaymentsClient, MockSmsClient};
use provider::{PaymentsClient, SmsClient};
use sme_inv_app::App;
use sme_inv_core::channels::sms::InboundSms;
use sme_inv_core::channels::ussd::UssdRequest;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::{sleep, Duration};

pub const PHONE: &str = "+255700000001";

pub struct Harness {
    pub app: App,
    pub sms: Arc<MockSmsClient>,
    pub payments: Arc<MockPaymentsClient>,
    _dir: TempDir,
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let sms = MockSmsClient::new();
    let payments = MockPaymentsClient::new();
    let dispatcher = Dispatcher::open(
        dir.path(),
        Some(sms.clone() as Arc<dyn SmsClient>),
        Some(payments.clone() as Arc<dyn PaymentsClient>),
    )
    .expect("dispatcher");
    Harness {
        app: App::new(AppConfig::default(), dispatcher),
        sms,
        payments,
        _dir: dir,
    }
}

/// Waits until every dispatched job has left the queued/in-flight states.
pub async fn settle(h: &Harness) {
    for _ in 0..200 {
        let jobs = h.app.dispatcher.list().expect("list jobs");
        if jobs
            .iter()
            .all(|j| j.state != "queued" && j.state != "in_flight")
        {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("dispatched jobs never settled");
}

pub fn ussd(text: &str) -> UssdRequest {
    UssdRequest {
        session_id: "ATUid_test".into(),
        service_code: "*384*1234#".into(),
        phone_number: PHONE.into(),
        text: text.into(),
    }
}

pub fn sms(text: &str) -> InboundSms {
    InboundSms {
        from: PHONE.into(),
        to: "18338".into(),
        text: text.into(),
        date: "2024-01-01 12:00:00".into(),
        id: "test".into(),
    }
}
