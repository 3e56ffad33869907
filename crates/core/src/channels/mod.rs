pub mod sms;
pub mod ussd;

use crate::menu::Effect;
use crate::models::Invoice;
use crate::store::InvoiceStore;

/// What an adapter hands back to the caller: the rendered reply (already
/// carrying its `CON `/`END ` marker) and the outbound effects left to
/// dispatch. Store mutations have already been applied.
#[derive(Debug)]
pub struct ChannelResponse {
    pub text: String,
    pub effects: Vec<Effect>,
}

/// Applies invoice upserts synchronously so a follow-up check within the
/// same conversation sees the record; returns the effects that need a
/// collaborator (send-message, initiate-charge) untouched.
fn apply_store_effects(effects: Vec<Effect>, invoices: &dyn InvoiceStore) -> Vec<Effect> {
    let mut outbound = Vec::with_capacity(effects.len());
    for effect in effects {
        match effect {
            Effect::UpsertInvoice {
                id,
                customer_phone,
                amount,
                description,
            } => {
                tracing::info!(invoice_id = %id, %amount, "invoice created");
                let invoice = Invoice::pending(id.clone(), customer_phone, amount, description);
                invoices.put(&id, invoice);
            }
            other => outbound.push(other),
        }
    }
    outbound
}
