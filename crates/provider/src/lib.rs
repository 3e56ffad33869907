use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outbound message request as handed to the messaging collaborator.
/// `from` stays empty in sandbox environments; live traffic carries the
/// approved sender id (policy decided by the caller, not here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsPayload {
    pub to: Vec<String>,
    pub message: String,
    pub from: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

/// Mobile-money checkout request: prompts the subscriber's handset for a
/// PIN to authorize the debit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_channel: Option<String>,
    pub phone_number: String,
    pub currency_code: String,
    pub amount: f64,
    pub metadata: CheckoutMetadata,
}

#[async_trait]
pub trait SmsClient: Send + Sync {
    /// Returns the provider's message id.
    async fn send(&self, payload: &SmsPayload) -> Result<String>;
}

#[async_trait]
pub trait PaymentsClient: Send + Sync {
    /// Returns the provider's transaction id.
    async fn mobile_checkout(&self, payload: &CheckoutPayload) -> Result<String>;
}

pub mod africastalking;
pub mod mock;
