//! Africa's Talking REST client implementing both collaborator traits.
//! The messaging endpoint takes a form-encoded body; mobile checkout takes
//! JSON. Both authenticate with the account api key in the `apiKey` header.

use super::{CheckoutPayload, PaymentsClient, SmsClient, SmsPayload};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const LIVE_MESSAGING_URL: &str = "https://api.africastalking.com/version1/messaging";
const SANDBOX_MESSAGING_URL: &str = "https://api.sandbox.africastalking.com/version1/messaging";
const PAYMENTS_URL: &str = "https://payments.africastalking.com/mobile/checkout";

#[derive(Clone)]
pub struct AfricasTalkingClient {
    username: String,
    api_key: String,
    messaging_url: String,
    payments_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SmsResponse {
    #[serde(rename = "SMSMessageData")]
    message_data: SmsMessageData,
}

#[derive(Debug, Deserialize)]
struct SmsMessageData {
    #[serde(rename = "Recipients", default)]
    recipients: Vec<SmsRecipient>,
}

#[derive(Debug, Deserialize)]
struct SmsRecipient {
    #[serde(rename = "messageId")]
    message_id: String,
    status: String,
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    username: &'a str,
    #[serde(flatten)]
    payload: &'a CheckoutPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutResponse {
    status: String,
    description: String,
    transaction_id: Option<String>,
}

impl AfricasTalkingClient {
    pub fn new(username: String, api_key: String, sandbox: bool) -> Arc<Self> {
        let messaging_url = if sandbox {
            SANDBOX_MESSAGING_URL
        } else {
            LIVE_MESSAGING_URL
        };
        Arc::new(Self {
            username,
            api_key,
            messaging_url: messaging_url.to_string(),
            payments_url: PAYMENTS_URL.to_string(),
            http_client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl SmsClient for AfricasTalkingClient {
    async fn send(&self, payload: &SmsPayload) -> Result<String> {
        let mut form = vec![
            ("username", self.username.clone()),
            ("to", payload.to.join(",")),
            ("message", payload.message.clone()),
        ];
        if !payload.from.is_empty() {
            form.push(("from", payload.from.clone()));
        }

        let resp = self
            .http_client
            .post(&self.messaging_url)
            .header("apiKey", &self.api_key)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .context("Failed to call messaging endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Messaging request failed: {} - {}", status, body);
        }

        let sms_resp: SmsResponse = resp
            .json()
            .await
            .context("Failed to parse messaging response")?;

        let recipient = sms_resp
            .message_data
            .recipients
            .into_iter()
            .next()
            .context("Messaging response carried no recipients")?;

        tracing::info!(
            message_id = %recipient.message_id,
            status = %recipient.status,
            "sms handed to gateway"
        );
        Ok(recipient.message_id)
    }
}

#[async_trait]
impl PaymentsClient for AfricasTalkingClient {
    async fn mobile_checkout(&self, payload: &CheckoutPayload) -> Result<String> {
        let body = CheckoutRequest {
            username: &self.username,
            payload,
        };

        let resp = self
            .http_client
            .post(&self.payments_url)
            .header("apiKey", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to call mobile checkout endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Mobile checkout failed: {} - {}", status, body);
        }

        let checkout: CheckoutResponse = resp
            .json()
            .await
            .context("Failed to parse checkout response")?;

        match checkout.transaction_id {
            Some(txn_id) => {
                tracing::info!(
                    transaction_id = %txn_id,
                    status = %checkout.status,
                    "mobile checkout initiated"
                );
                Ok(txn_id)
            }
            None => bail!(
                "Checkout rejected: {} - {}",
                checkout.status,
                checkout.description
            ),
        }
    }
}
