//! The menu state machine shared by the USSD and SMS channels.
//!
//! `transition` is pure and total: every (step, input) pair maps to exactly
//! one next step and reply. It performs no I/O beyond reading the injected
//! invoice store for the check flow; everything that must touch the outside
//! world is returned as an [`Effect`] for the caller to apply or dispatch.

use crate::store::InvoiceStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MENU_TEXT: &str =
    "Welcome to SME Invoice Tool\n1. Send Invoice\n2. Check Invoice\n3. Pay Now\n4. Help";

const PROMPT_INVOICE_ID: &str = "Enter Invoice ID";
const PROMPT_INVOICE_ID_CHECK: &str = "Enter Invoice ID to check";
const PROMPT_AMOUNT: &str = "Enter Amount (TZS)";
const TEXT_HELP: &str = "For help, contact support.";
const TEXT_NOT_FOUND: &str = "Invoice not found.";
const TEXT_INVALID_INPUT: &str = "Invalid input.";
const TEXT_INVALID_AMOUNT: &str = "Invalid amount. Please try again.";

/// Key under which the send-invoice flow parks the chosen invoice id.
pub const PENDING_INVOICE_ID: &str = "invoice_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Ussd,
    Sms,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Ussd => "ussd",
            Channel::Sms => "sms",
        }
    }

    fn default_description(self) -> &'static str {
        match self {
            Channel::Ussd => "Created via USSD",
            Channel::Sms => "Created via SMS",
        }
    }

    fn invalid_option_text(self) -> &'static str {
        match self {
            Channel::Ussd => "Invalid option.",
            Channel::Sms => "Invalid option. Send 'menu' to start.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Menu,
    SendInvoiceId,
    SendInvoiceAmount,
    CheckInvoiceId,
    PayAmount,
}

/// Conversational output. `Continue` expects more input, `End` terminates the
/// interaction; the channel adapters render these as `CON `/`END ` prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Continue(String),
    End(String),
}

impl Reply {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Reply::End(_))
    }

    pub fn prefixed(&self) -> String {
        match self {
            Reply::Continue(text) => format!("CON {text}"),
            Reply::End(text) => format!("END {text}"),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Reply::Continue(text) | Reply::End(text) => text,
        }
    }
}

/// Side-effect requests emitted by a transition, never executed in-line.
/// `UpsertInvoice` is applied synchronously by the adapters; the rest go to
/// the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    UpsertInvoice {
        id: String,
        customer_phone: String,
        amount: String,
        description: String,
    },
    SendSms {
        to: String,
        message: String,
    },
    InitiateCharge {
        phone_number: String,
        amount: f64,
        via: String,
    },
}

#[derive(Debug)]
pub struct Transition {
    pub next: Step,
    pub reply: Reply,
    pub effects: Vec<Effect>,
    /// Pending-data entries to merge into the conversation state.
    pub remember: Vec<(String, String)>,
}

impl Transition {
    fn prompt(next: Step, text: impl Into<String>) -> Self {
        Self {
            next,
            reply: Reply::Continue(text.into()),
            effects: Vec::new(),
            remember: Vec::new(),
        }
    }

    fn end(text: impl Into<String>) -> Self {
        Self {
            next: Step::Menu,
            reply: Reply::End(text.into()),
            effects: Vec::new(),
            remember: Vec::new(),
        }
    }
}

/// Context for one conversational turn: who is talking, over which channel,
/// and what the flow has captured so far.
pub struct TurnCtx<'a> {
    pub subscriber: &'a str,
    pub channel: Channel,
    pub pending: &'a HashMap<String, String>,
}

/// The SMS body sent to a customer when an invoice goes out. The payment
/// reference equals the invoice id.
pub fn invoice_message(id: &str, amount: &str) -> String {
    format!("Invoice {id}\nAmount: TZS {amount}\nPay via M-Pesa Ref: {id}")
}

/// Accepts any finite number strictly greater than zero.
pub fn parse_positive_amount(input: &str) -> Option<f64> {
    let amount: f64 = input.trim().parse().ok()?;
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

pub fn transition(
    step: Step,
    input: &str,
    ctx: &TurnCtx<'_>,
    invoices: &dyn InvoiceStore,
) -> Transition {
    let input = input.trim();
    match step {
        Step::Menu => match input {
            "1" => Transition::prompt(Step::SendInvoiceId, PROMPT_INVOICE_ID),
            "2" => Transition::prompt(Step::CheckInvoiceId, PROMPT_INVOICE_ID_CHECK),
            "3" => Transition::prompt(Step::PayAmount, PROMPT_AMOUNT),
            "4" => Transition::end(TEXT_HELP),
            other
                if other.eq_ignore_ascii_case("menu") || other.eq_ignore_ascii_case("start") =>
            {
                Transition::prompt(Step::Menu, MENU_TEXT)
            }
            _ => Transition::end(ctx.channel.invalid_option_text()),
        },

        Step::SendInvoiceId => {
            if input.is_empty() {
                return Transition::end(TEXT_INVALID_INPUT);
            }
            let mut t = Transition::prompt(Step::SendInvoiceAmount, PROMPT_AMOUNT);
            t.remember
                .push((PENDING_INVOICE_ID.to_string(), input.to_string()));
            t
        }

        Step::SendInvoiceAmount => {
            // Baseline behavior: the amount is accepted and stored verbatim,
            // no numeric validation at this step.
            let Some(invoice_id) = ctx.pending.get(PENDING_INVOICE_ID) else {
                return Transition::end(TEXT_INVALID_INPUT);
            };
            if input.is_empty() {
                return Transition::end(TEXT_INVALID_INPUT);
            }
            let mut t = Transition::end(format!(
                "Invoice {invoice_id} of TZS {input} will be sent via SMS."
            ));
            t.effects.push(Effect::UpsertInvoice {
                id: invoice_id.clone(),
                customer_phone: ctx.subscriber.to_string(),
                amount: input.to_string(),
                description: ctx.channel.default_description().to_string(),
            });
            t.effects.push(Effect::SendSms {
                to: ctx.subscriber.to_string(),
                message: invoice_message(invoice_id, input),
            });
            t
        }

        Step::CheckInvoiceId => {
            if input.is_empty() {
                return Transition::end(TEXT_INVALID_INPUT);
            }
            match invoices.get(input) {
                Some(inv) => {
                    Transition::end(format!("Invoice {} status: {}", inv.id, inv.status))
                }
                None => Transition::end(TEXT_NOT_FOUND),
            }
        }

        Step::PayAmount => match parse_positive_amount(input) {
            Some(amount) => {
                let mut t = Transition::end(format!(
                    "Payment prompt will appear on {}. Enter PIN to confirm.",
                    ctx.subscriber
                ));
                t.effects.push(Effect::InitiateCharge {
                    phone_number: ctx.subscriber.to_string(),
                    amount,
                    via: ctx.channel.as_str().to_string(),
                });
                t
            }
            None => Transition::end(TEXT_INVALID_AMOUNT),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Invoice;
    use crate::store::{InMemoryInvoiceStore, InvoiceStore};

    const PHONE: &str = "+255700000001";

    fn ctx<'a>(channel: Channel, pending: &'a HashMap<String, String>) -> TurnCtx<'a> {
        TurnCtx {
            subscriber: PHONE,
            channel,
            pending,
        }
    }

    fn step(
        store: &dyn InvoiceStore,
        at: Step,
        input: &str,
        channel: Channel,
        pending: &HashMap<String, String>,
    ) -> Transition {
        transition(at, input, &ctx(channel, pending), store)
    }

    #[test]
    fn menu_options_route_to_prompts() {
        let store = InMemoryInvoiceStore::new();
        let pending = HashMap::new();

        let t = step(&store, Step::Menu, "1", Channel::Ussd, &pending);
        assert_eq!(t.next, Step::SendInvoiceId);
        assert_eq!(t.reply, Reply::Continue("Enter Invoice ID".into()));

        let t = step(&store, Step::Menu, "2", Channel::Ussd, &pending);
        assert_eq!(t.next, Step::CheckInvoiceId);
        assert_eq!(t.reply, Reply::Continue("Enter Invoice ID to check".into()));

        let t = step(&store, Step::Menu, "3", Channel::Ussd, &pending);
        assert_eq!(t.next, Step::PayAmount);
        assert_eq!(t.reply, Reply::Continue("Enter Amount (TZS)".into()));

        let t = step(&store, Step::Menu, "4", Channel::Ussd, &pending);
        assert_eq!(t.reply, Reply::End("For help, contact support.".into()));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn menu_keyword_reprints_root_menu() {
        let store = InMemoryInvoiceStore::new();
        let pending = HashMap::new();
        for input in ["menu", "MENU", "start", "Start"] {
            let t = step(&store, Step::Menu, input, Channel::Sms, &pending);
            assert_eq!(t.next, Step::Menu);
            assert_eq!(t.reply, Reply::Continue(MENU_TEXT.into()));
        }
    }

    #[test]
    fn invalid_option_text_differs_per_channel() {
        let store = InMemoryInvoiceStore::new();
        let pending = HashMap::new();

        let t = step(&store, Step::Menu, "9", Channel::Ussd, &pending);
        assert_eq!(t.reply, Reply::End("Invalid option.".into()));
        assert!(t.effects.is_empty());
        assert_eq!(t.next, Step::Menu);

        let t = step(&store, Step::Menu, "9", Channel::Sms, &pending);
        assert_eq!(
            t.reply,
            Reply::End("Invalid option. Send 'menu' to start.".into())
        );
    }

    #[test]
    fn send_invoice_captures_id_then_emits_effects() {
        let store = InMemoryInvoiceStore::new();
        let pending = HashMap::new();

        let t = step(&store, Step::SendInvoiceId, "ID", Channel::Ussd, &pending);
        assert_eq!(t.next, Step::SendInvoiceAmount);
        assert_eq!(t.remember, vec![("invoice_id".to_string(), "ID".to_string())]);

        let mut pending = HashMap::new();
        pending.insert("invoice_id".to_string(), "ID".to_string());
        let t = step(&store, Step::SendInvoiceAmount, "100", Channel::Ussd, &pending);
        assert_eq!(
            t.reply,
            Reply::End("Invoice ID of TZS 100 will be sent via SMS.".into())
        );
        assert_eq!(t.next, Step::Menu);
        assert_eq!(t.effects.len(), 2);
        assert_eq!(
            t.effects[0],
            Effect::UpsertInvoice {
                id: "ID".into(),
                customer_phone: PHONE.into(),
                amount: "100".into(),
                description: "Created via USSD".into(),
            }
        );
        assert_eq!(
            t.effects[1],
            Effect::SendSms {
                to: PHONE.into(),
                message: "Invoice ID\nAmount: TZS 100\nPay via M-Pesa Ref: ID".into(),
            }
        );
    }

    #[test]
    fn amount_step_accepts_any_nonempty_string() {
        let store = InMemoryInvoiceStore::new();
        let mut pending = HashMap::new();
        pending.insert("invoice_id".to_string(), "A".to_string());
        let t = step(&store, Step::SendInvoiceAmount, "lots", Channel::Sms, &pending);
        assert_eq!(
            t.reply,
            Reply::End("Invoice A of TZS lots will be sent via SMS.".into())
        );
    }

    #[test]
    fn amount_step_without_captured_id_is_invalid_input() {
        let store = InMemoryInvoiceStore::new();
        let pending = HashMap::new();
        let t = step(&store, Step::SendInvoiceAmount, "100", Channel::Sms, &pending);
        assert_eq!(t.reply, Reply::End("Invalid input.".into()));
        assert_eq!(t.next, Step::Menu);
    }

    #[test]
    fn check_invoice_reports_status_or_not_found() {
        let store = InMemoryInvoiceStore::new();
        store.put("INV1", Invoice::pending("INV1", PHONE, "500", ""));
        let pending = HashMap::new();

        let t = step(&store, Step::CheckInvoiceId, "INV1", Channel::Ussd, &pending);
        assert_eq!(t.reply, Reply::End("Invoice INV1 status: PENDING".into()));
        assert_eq!(t.next, Step::Menu);

        let t = step(&store, Step::CheckInvoiceId, "NOPE", Channel::Ussd, &pending);
        assert_eq!(t.reply, Reply::End("Invoice not found.".into()));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn pay_rejects_bad_amounts_without_charging() {
        let store = InMemoryInvoiceStore::new();
        let pending = HashMap::new();
        for input in ["-5", "abc", "0", ""] {
            let t = step(&store, Step::PayAmount, input, Channel::Sms, &pending);
            assert_eq!(
                t.reply,
                Reply::End("Invalid amount. Please try again.".into()),
                "input {input:?}"
            );
            assert!(t.effects.is_empty());
            assert_eq!(t.next, Step::Menu);
        }
    }

    #[test]
    fn pay_valid_amount_charges_once() {
        let store = InMemoryInvoiceStore::new();
        let pending = HashMap::new();
        let t = step(&store, Step::PayAmount, "1000", Channel::Ussd, &pending);
        assert_eq!(
            t.reply,
            Reply::End(format!(
                "Payment prompt will appear on {PHONE}. Enter PIN to confirm."
            ))
        );
        assert_eq!(
            t.effects,
            vec![Effect::InitiateCharge {
                phone_number: PHONE.into(),
                amount: 1000.0,
                via: "ussd".into(),
            }]
        );
    }

    #[test]
    fn empty_input_mid_flow_is_invalid() {
        let store = InMemoryInvoiceStore::new();
        let pending = HashMap::new();
        for at in [Step::SendInvoiceId, Step::CheckInvoiceId] {
            let t = step(&store, at, "  ", Channel::Sms, &pending);
            assert_eq!(t.reply, Reply::End("Invalid input.".into()));
            assert_eq!(t.next, Step::Menu);
        }
    }
}
