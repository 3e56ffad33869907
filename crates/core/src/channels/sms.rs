//! SMS channel adapter. Stateful across webhook calls: the conversation
//! position lives in the session store, keyed by sender phone number. Only
//! messages addressed to the service shortcode enter the engine; everything
//! else is acknowledged without processing.

use super::{apply_store_effects, ChannelResponse};
use crate::menu::{self, Channel, Effect, Reply, TurnCtx};
use crate::session::SessionStore;
use crate::store::InvoiceStore;
use serde::Deserialize;

/// Inbound SMS webhook payload (the gateway posts it form-encoded).
#[derive(Debug, Clone, Deserialize)]
pub struct InboundSms {
    pub from: String,
    pub to: String,
    pub text: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub id: String,
}

/// Runs one conversational turn. Returns `None` when the message was not
/// for the shortcode (the webhook acknowledges it and nothing more). When
/// the engine runs, the reply is also queued as an outbound SMS back to the
/// sender, in addition to being returned for the webhook response.
pub fn handle(
    msg: &InboundSms,
    shortcode: &str,
    sessions: &dyn SessionStore,
    invoices: &dyn InvoiceStore,
) -> Option<ChannelResponse> {
    tracing::info!(from = %msg.from, to = %msg.to, text = %msg.text, id = %msg.id, "inbound sms");

    if msg.to != shortcode || msg.text.trim().is_empty() {
        tracing::debug!(to = %msg.to, "not for the service shortcode, acknowledging only");
        return None;
    }

    let input = msg.text.trim();
    let mut outcome: Option<(Reply, Vec<Effect>)> = None;

    sessions.with_turn(&msg.from, &mut |session| {
        let ctx = TurnCtx {
            subscriber: &msg.from,
            channel: Channel::Sms,
            pending: &session.pending,
        };
        let t = menu::transition(session.step, input, &ctx, invoices);
        for (key, value) in t.remember {
            session.pending.insert(key, value);
        }
        session.step = t.next;
        outcome = Some((t.reply, t.effects));
    });

    let (reply, effects) = outcome.expect("with_turn runs the closure");
    let text = reply.prefixed();

    let mut effects = apply_store_effects(effects, invoices);
    effects.push(Effect::SendSms {
        to: msg.from.clone(),
        message: text.clone(),
    });

    Some(ChannelResponse { text, effects })
}
