use anyhow::{anyhow, Result};
use config::AppConfig;
use dispatch::Dispatcher;
use provider::africastalking::AfricasTalkingClient;
use provider::mock::{MockPaymentsClient, MockSmsClient};
use provider::{PaymentsClient, SmsClient};
use sme_inv_app::{console, App};
use std::io::BufRead;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

type Collaborators = (Option<Arc<dyn SmsClient>>, Option<Arc<dyn PaymentsClient>>);

fn create_collaborators(cfg: &AppConfig) -> Result<Collaborators> {
    match cfg.provider.kind.as_str() {
        "africastalking" => {
            let api_key = std::env::var("AT_API_KEY")
                .or_else(|_| config::get_secret(config::API_KEY_SECRET))
                .map_err(|_| anyhow!("Africa's Talking api key not found in env or keychain"))?;
            tracing::info!(username = %cfg.account.username, sandbox = cfg.is_sandbox(),
                "Using Africa's Talking collaborators");
            let client =
                AfricasTalkingClient::new(cfg.account.username.clone(), api_key, cfg.is_sandbox());
            Ok((
                Some(client.clone() as Arc<dyn SmsClient>),
                Some(client as Arc<dyn PaymentsClient>),
            ))
        }
        _ => {
            tracing::info!("Using mock collaborators");
            Ok((
                Some(MockSmsClient::new() as Arc<dyn SmsClient>),
                Some(MockPaymentsClient::new() as Arc<dyn PaymentsClient>),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut cfg = config::load().unwrap_or_default();
    config::overlay_env(&mut cfg);

    let (sms, payments) = create_collaborators(&cfg)?;
    let dispatcher = Dispatcher::open(".sme_dispatch", sms, payments)?;
    let app = App::new(cfg, dispatcher);

    println!("SME Invoice Tool console (shortcode {})", app.cfg.messaging.shortcode);
    println!("{}", console::HELP);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match console::run_command(&app, &line).await {
            Ok(Some(output)) => println!("{output}"),
            Ok(None) => break,
            Err(e) => println!("error: {e}"),
        }
    }

    Ok(())
}
