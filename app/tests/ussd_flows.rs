mod common;

use common::{harness, settle, ussd, PHONE};
use sme_inv_core::models::InvoiceStatus;

#[tokio::test]
async fn send_invoice_history_creates_invoice_and_queues_sms() {
    let h = harness();

    let text = h.app.handle_ussd(ussd("1*ID*100")).await;
    assert_eq!(text, "END Invoice ID of TZS 100 will be sent via SMS.");

    let inv = h.app.get_invoice("ID").expect("invoice exists");
    assert_eq!(inv.amount, "100");
    assert_eq!(inv.status, InvoiceStatus::Pending);
    assert_eq!(inv.customer_phone, PHONE);

    settle(&h).await;
    let sent = h.sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec![PHONE.to_string()]);
    assert_eq!(
        sent[0].message,
        "Invoice ID\nAmount: TZS 100\nPay via M-Pesa Ref: ID"
    );
    // sandbox config sends from an empty address
    assert_eq!(sent[0].from, "");
}

#[tokio::test]
async fn replayed_history_yields_identical_text() {
    let h = harness();
    let first = h.app.handle_ussd(ussd("1*ID*100")).await;
    let second = h.app.handle_ussd(ussd("1*ID*100")).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn check_unknown_invoice_is_not_found_without_mutation() {
    let h = harness();
    let text = h.app.handle_ussd(ussd("2*GHOST")).await;
    assert_eq!(text, "END Invoice not found.");
    assert!(h.app.get_invoice("GHOST").is_err());

    settle(&h).await;
    assert!(h.sms.sent().is_empty());
    assert!(h.payments.charges().is_empty());
}

#[tokio::test]
async fn pay_now_initiates_exactly_one_charge() {
    let h = harness();
    let text = h.app.handle_ussd(ussd("3*1000")).await;
    assert_eq!(
        text,
        format!("END Payment prompt will appear on {PHONE}. Enter PIN to confirm.")
    );

    settle(&h).await;
    let charges = h.payments.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount, 1000.0);
    assert_eq!(charges[0].phone_number, PHONE);
    assert_eq!(charges[0].currency_code, "TZS");
    assert_eq!(charges[0].metadata.via.as_deref(), Some("ussd"));
}

#[tokio::test]
async fn invalid_pay_amounts_never_charge() {
    let h = harness();
    for history in ["3*-5", "3*abc"] {
        let text = h.app.handle_ussd(ussd(history)).await;
        assert_eq!(text, "END Invalid amount. Please try again.");
    }
    settle(&h).await;
    assert!(h.payments.charges().is_empty());
}

#[tokio::test]
async fn unknown_option_ends_without_effects() {
    let h = harness();
    let text = h.app.handle_ussd(ussd("9")).await;
    assert_eq!(text, "END Invalid option.");
    settle(&h).await;
    assert!(h.sms.sent().is_empty());
    assert!(h.payments.charges().is_empty());
}
