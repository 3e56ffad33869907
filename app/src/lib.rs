//! Application facade wiring the menu engine, stores, config and the
//! side-effect dispatcher. Every webhook and API operation is a typed
//! handler here; the HTTP boundary that mounts them is out of scope.

pub mod api;
pub mod console;
pub mod error;

use config::AppConfig;
use dispatch::{Dispatcher, EffectJob};
use provider::{CheckoutMetadata, CheckoutPayload, SmsPayload};
use sme_inv_core::channels::sms::InboundSms;
use sme_inv_core::channels::ussd::{self, UssdRequest};
use sme_inv_core::channels::{sms, ChannelResponse};
use sme_inv_core::menu::Effect;
use sme_inv_core::session::{InMemorySessionStore, SessionStore};
use sme_inv_core::store::{InMemoryInvoiceStore, InvoiceStore};
use std::sync::Arc;

pub struct App {
    pub cfg: AppConfig,
    pub invoices: Arc<dyn InvoiceStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub dispatcher: Arc<Dispatcher>,
}

impl App {
    pub fn new(cfg: AppConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            cfg,
            invoices: Arc::new(InMemoryInvoiceStore::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
            dispatcher,
        }
    }

    /// USSD webhook. Returns the plain-text body, `CON `- or `END `-prefixed.
    pub async fn handle_ussd(&self, req: UssdRequest) -> String {
        let res = ussd::handle(&req, self.invoices.as_ref());
        self.queue_effects(res.effects);
        res.text
    }

    /// Inbound SMS webhook. `None` means the message was not for the service
    /// shortcode and only needs an acknowledgment; `Some(reply)` carries the
    /// engine's response, which has also been queued as an outbound SMS.
    pub async fn handle_inbound_sms(&self, msg: InboundSms) -> Option<String> {
        let res = sms::handle(
            &msg,
            &self.cfg.messaging.shortcode,
            self.sessions.as_ref(),
            self.invoices.as_ref(),
        )?;
        let ChannelResponse { text, effects } = res;
        self.queue_effects(effects);
        Some(text)
    }

    /// Translates engine effects into dispatcher jobs, applying the
    /// config-level delivery policy (from-address, payment product). Queueing
    /// failures are logged and dropped: the conversation already answered.
    fn queue_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            let job = match self.effect_to_job(effect) {
                Some(job) => job,
                None => continue,
            };
            match self.dispatcher.dispatch(job) {
                Ok(job_id) => tracing::debug!(%job_id, "effect queued"),
                Err(e) => tracing::error!(error = %e, "failed to queue effect"),
            }
        }
    }

    fn effect_to_job(&self, effect: Effect) -> Option<EffectJob> {
        match effect {
            Effect::SendSms { to, message } => Some(EffectJob::SendSms(SmsPayload {
                to: vec![to],
                message,
                from: self.cfg.resolve_from_address(),
            })),
            Effect::InitiateCharge {
                phone_number,
                amount,
                via,
            } => Some(EffectJob::MobileCheckout(CheckoutPayload {
                product_name: self.cfg.payments.product_name.clone(),
                provider_channel: Some(self.cfg.payments.provider_channel.clone()),
                phone_number,
                currency_code: self.cfg.payments.currency_code.clone(),
                amount,
                metadata: CheckoutMetadata {
                    invoice_id: None,
                    via: Some(via),
                },
            })),
            Effect::UpsertInvoice { id, .. } => {
                // adapters apply store mutations before handing effects over
                tracing::warn!(invoice_id = %id, "unexpected store effect at dispatch boundary");
                None
            }
        }
    }
}
