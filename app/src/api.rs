//! Direct API operations: invoice CRUD, invoice delivery by SMS, mobile
//! checkout, and the payment callback/simulator that finalize invoices.

use crate::error::ApiError;
use crate::App;
use chrono::Utc;
use dispatch::EffectJob;
use provider::{CheckoutMetadata, CheckoutPayload, SmsPayload};
use serde::{Deserialize, Serialize};
use sme_inv_core::menu::invoice_message;
use sme_inv_core::models::{Invoice, InvoiceStatus};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub customer_phone: String,
    pub amount: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceSmsRequest {
    pub phone_number: String,
    pub amount: String,
    pub invoice_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub phone_number: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub invoice_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    pub invoice_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub txn_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub username: String,
    pub environment: String,
    pub is_sandbox: bool,
    pub from_address_set: bool,
}

impl App {
    pub fn create_invoice(&self, req: CreateInvoiceRequest) -> Result<Invoice, ApiError> {
        if req.customer_phone.is_empty() || req.amount.is_empty() {
            return Err(ApiError::InvalidRequest(
                "customerPhone and amount are required".into(),
            ));
        }
        let id = self.invoices.next_id();
        let invoice = Invoice::pending(id.clone(), req.customer_phone, req.amount, req.description);
        self.invoices.put(&id, invoice.clone());
        tracing::info!(invoice_id = %id, "invoice created via api");
        Ok(invoice)
    }

    pub fn get_invoice(&self, id: &str) -> Result<Invoice, ApiError> {
        self.invoices
            .get(id)
            .ok_or_else(|| ApiError::NotFound("Invoice not found".into()))
    }

    /// Queues the standard invoice SMS for an existing invoice. Returns the
    /// dispatch job id; delivery itself is fire-and-log.
    pub async fn send_invoice(&self, id: &str) -> Result<String, ApiError> {
        let invoice = self.get_invoice(id)?;
        let job_id = self.dispatcher.dispatch(EffectJob::SendSms(SmsPayload {
            to: vec![invoice.customer_phone.clone()],
            message: invoice_message(&invoice.id, &invoice.amount),
            from: self.cfg.resolve_from_address(),
        }))?;
        tracing::info!(invoice_id = %id, %job_id, "invoice sms queued");
        Ok(job_id)
    }

    /// Ad-hoc variant: SMS an invoice notice without requiring a stored
    /// record.
    pub async fn send_invoice_sms(&self, req: SendInvoiceSmsRequest) -> Result<String, ApiError> {
        if req.phone_number.is_empty() || req.invoice_id.is_empty() {
            return Err(ApiError::InvalidRequest(
                "phoneNumber and invoiceId are required".into(),
            ));
        }
        let job_id = self.dispatcher.dispatch(EffectJob::SendSms(SmsPayload {
            to: vec![req.phone_number],
            message: invoice_message(&req.invoice_id, &req.amount),
            from: self.cfg.resolve_from_address(),
        }))?;
        Ok(job_id)
    }

    /// Initiates a mobile-money checkout (handset PIN prompt).
    pub async fn checkout(&self, req: CheckoutRequest) -> Result<String, ApiError> {
        if req.phone_number.is_empty() {
            return Err(ApiError::InvalidRequest("phoneNumber is required".into()));
        }
        if !req.amount.is_finite() || req.amount <= 0.0 {
            return Err(ApiError::InvalidRequest(
                "amount must be a positive number".into(),
            ));
        }
        let currency_code = req
            .currency
            .as_deref()
            .map(str::to_ascii_uppercase)
            .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
            .unwrap_or_else(|| self.cfg.payments.currency_code.clone());

        let job_id = self
            .dispatcher
            .dispatch(EffectJob::MobileCheckout(CheckoutPayload {
                product_name: self.cfg.payments.product_name.clone(),
                provider_channel: Some(self.cfg.payments.provider_channel.clone()),
                phone_number: req.phone_number,
                currency_code,
                amount: req.amount,
                metadata: CheckoutMetadata {
                    invoice_id: req.invoice_id,
                    via: None,
                },
            }))?;
        Ok(job_id)
    }

    /// Payment provider callback. Finalizes a pending invoice; an invoice
    /// that is already Paid or Failed is returned unchanged (first write
    /// wins, matching the record's immutability rules).
    pub fn payment_callback(&self, cb: PaymentCallback) -> Result<Invoice, ApiError> {
        let status = match cb.status.as_deref() {
            Some("FAILED") => InvoiceStatus::Failed,
            _ => InvoiceStatus::Paid,
        };
        let txn_id = cb
            .txn_id
            .unwrap_or_else(|| format!("TX-{}", Utc::now().timestamp_millis()));
        self.finalize_invoice(&cb.invoice_id, status, txn_id)
    }

    /// Test helper mirroring the provider callback: marks an invoice paid.
    pub fn simulate_payment(&self, invoice_id: &str) -> Result<Invoice, ApiError> {
        let txn_id = format!("SIM-{}", Utc::now().timestamp_millis());
        self.finalize_invoice(invoice_id, InvoiceStatus::Paid, txn_id)
    }

    fn finalize_invoice(
        &self,
        invoice_id: &str,
        status: InvoiceStatus,
        txn_id: String,
    ) -> Result<Invoice, ApiError> {
        let mut finalized = false;
        let invoice = self
            .invoices
            .update(invoice_id, &mut |inv| {
                finalized = inv.finalize(status, txn_id.clone());
            })
            .ok_or_else(|| ApiError::NotFound("Invoice not found".to_string()))?;
        if finalized {
            tracing::info!(%invoice_id, status = %invoice.status, "payment update");
        } else {
            tracing::warn!(
                %invoice_id,
                status = %invoice.status,
                "payment update ignored, invoice already finalized"
            );
        }
        Ok(invoice)
    }

    pub fn config_summary(&self) -> ConfigSummary {
        ConfigSummary {
            username: self.cfg.account.username.clone(),
            environment: self.cfg.account.environment.clone(),
            is_sandbox: self.cfg.is_sandbox(),
            from_address_set: !self.cfg.resolve_from_address().is_empty(),
        }
    }
}
