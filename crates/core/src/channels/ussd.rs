//! USSD channel adapter. Stateless by design: the carrier gateway replays
//! the entire `*`-joined input history on every request, so the adapter
//! re-derives the conversation position by folding the fragments through the
//! state machine instead of keeping a step token anywhere. Server restarts
//! are invisible to the caller.

use super::{apply_store_effects, ChannelResponse};
use crate::menu::{self, Channel, Reply, Step, Transition, TurnCtx, MENU_TEXT};
use crate::store::InvoiceStore;
use serde::Deserialize;
use std::collections::HashMap;

/// Webhook input: `text` is the full input history (empty on first contact).
/// `session_id` is opaque to the logic and only logged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UssdRequest {
    pub session_id: String,
    pub service_code: String,
    pub phone_number: String,
    pub text: String,
}

pub fn handle(req: &UssdRequest, invoices: &dyn InvoiceStore) -> ChannelResponse {
    tracing::info!(
        session_id = %req.session_id,
        service_code = %req.service_code,
        phone = %req.phone_number,
        text = %req.text,
        "ussd hit"
    );

    if req.text.is_empty() {
        return ChannelResponse {
            text: Reply::Continue(MENU_TEXT.to_string()).prefixed(),
            effects: Vec::new(),
        };
    }

    let mut step = Step::Menu;
    let mut pending: HashMap<String, String> = HashMap::new();
    let mut last: Option<Transition> = None;

    for fragment in req.text.split('*') {
        let ctx = TurnCtx {
            subscriber: &req.phone_number,
            channel: Channel::Ussd,
            pending: &pending,
        };
        let t = menu::transition(step, fragment, &ctx, invoices);
        for (key, value) in &t.remember {
            pending.insert(key.clone(), value.clone());
        }
        step = t.next;
        last = Some(t);
    }

    // Only the final transition corresponds to new input; earlier fragments
    // were already answered (and their effects applied) on previous calls.
    let t = last.expect("split yields at least one fragment");
    ChannelResponse {
        text: t.reply.prefixed(),
        effects: apply_store_effects(t.effects, invoices),
    }
}
