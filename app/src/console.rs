//! Line-oriented operator console. Each command maps onto one API
//! operation or a config/credential action; the binary just feeds it
//! stdin lines.

use crate::api::{CheckoutRequest, CreateInvoiceRequest};
use crate::App;
use anyhow::{anyhow, Result};
use chrono::Utc;
use sme_inv_core::channels::sms::InboundSms;
use sme_inv_core::channels::ussd::UssdRequest;

pub const HELP: &str = "\
commands:
  ussd <phone> [history]        simulate a USSD webhook call ('*'-joined history)
  sms <from> <text>             simulate an inbound SMS to the service shortcode
  invoice <phone> <amount> [description]
  get <id>                      fetch an invoice
  send <id>                     queue the invoice SMS
  pay <id>                      simulate a successful payment
  checkout <phone> <amount>     initiate a mobile-money charge
  jobs                          list dispatched side-effect jobs
  config [save]                 show the resolved environment, or persist it
  apikey set <value> | clear    store or remove the provider key in the keychain
  quit";

/// Runs one console line against the app. `Ok(None)` means quit.
pub async fn run_command(app: &App, line: &str) -> Result<Option<String>> {
    let mut args = line.split_whitespace();
    let Some(command) = args.next() else {
        return Ok(Some(String::new()));
    };
    let out = match command {
        "ussd" => {
            let phone = args.next().ok_or_else(|| anyhow!("usage: ussd <phone> [history]"))?;
            let text = args.next().unwrap_or("");
            app.handle_ussd(UssdRequest {
                session_id: format!("console-{}", Utc::now().timestamp_millis()),
                service_code: "*384*1234#".to_string(),
                phone_number: phone.to_string(),
                text: text.to_string(),
            })
            .await
        }
        "sms" => {
            let from = args.next().ok_or_else(|| anyhow!("usage: sms <from> <text>"))?;
            let text = args.collect::<Vec<_>>().join(" ");
            let reply = app
                .handle_inbound_sms(InboundSms {
                    from: from.to_string(),
                    to: app.cfg.messaging.shortcode.clone(),
                    text,
                    date: Utc::now().to_rfc3339(),
                    id: format!("console-{}", Utc::now().timestamp_millis()),
                })
                .await;
            reply.unwrap_or_else(|| "(acknowledged)".to_string())
        }
        "invoice" => {
            let phone = args.next().ok_or_else(|| anyhow!("usage: invoice <phone> <amount>"))?;
            let amount = args.next().ok_or_else(|| anyhow!("usage: invoice <phone> <amount>"))?;
            let description = args.collect::<Vec<_>>().join(" ");
            let invoice = app.create_invoice(CreateInvoiceRequest {
                customer_phone: phone.to_string(),
                amount: amount.to_string(),
                description,
            })?;
            serde_json::to_string_pretty(&invoice)?
        }
        "get" => {
            let id = args.next().ok_or_else(|| anyhow!("usage: get <id>"))?;
            serde_json::to_string_pretty(&app.get_invoice(id)?)?
        }
        "send" => {
            let id = args.next().ok_or_else(|| anyhow!("usage: send <id>"))?;
            format!("queued job {}", app.send_invoice(id).await?)
        }
        "pay" => {
            let id = args.next().ok_or_else(|| anyhow!("usage: pay <id>"))?;
            serde_json::to_string_pretty(&app.simulate_payment(id)?)?
        }
        "checkout" => {
            let phone = args.next().ok_or_else(|| anyhow!("usage: checkout <phone> <amount>"))?;
            let amount: f64 = args
                .next()
                .ok_or_else(|| anyhow!("usage: checkout <phone> <amount>"))?
                .parse()
                .map_err(|_| anyhow!("amount must be a number"))?;
            let job_id = app
                .checkout(CheckoutRequest {
                    phone_number: phone.to_string(),
                    amount,
                    currency: None,
                    invoice_id: None,
                })
                .await?;
            format!("queued job {job_id}")
        }
        "jobs" => {
            let jobs = app.dispatcher.list()?;
            serde_json::to_string_pretty(&jobs)?
        }
        "config" => match args.next() {
            Some("save") => {
                config::store(&app.cfg)?;
                "configuration saved".to_string()
            }
            Some(other) => return Err(anyhow!("unknown config subcommand: {other}")),
            None => serde_json::to_string_pretty(&app.config_summary())?,
        },
        "apikey" => match args.next() {
            Some("set") => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("usage: apikey set <value>"))?;
                config::store_secret(config::API_KEY_SECRET, value)?;
                "api key stored in keychain".to_string()
            }
            Some("clear") => {
                config::delete_secret(config::API_KEY_SECRET)?;
                "api key removed from keychain".to_string()
            }
            _ => return Err(anyhow!("usage: apikey set <value> | apikey clear")),
        },
        "quit" | "exit" => return Ok(None),
        "help" => HELP.to_string(),
        other => format!("unknown command: {other}\n{HELP}"),
    };
    Ok(Some(out))
}
