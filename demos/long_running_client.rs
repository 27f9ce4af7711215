// ABOUTME: Long-running SMPP client example built on the session supervisor
// ABOUTME: Keeps a session bound with keep-alive pings, reconnects and acknowledges deliveries

//! # Long-Running SMPP Client
//!
//! This example keeps an ESME bound to an SMSC for a while:
//!
//! * The supervisor reconnects after failures and pings the link
//! * Inbound deliver_sm PDUs are logged and acknowledged
//! * Optionally sends periodic SMS messages
//! * Ceases cleanly (with unbind) once the run duration has elapsed
//!
//! ## Usage
//!
//! ```bash
//! # Keep a transceiver session alive for five minutes
//! cargo run --example long_running_client -- --system-id test --password secret
//!
//! # With periodic SMS sending
//! cargo run --example long_running_client -- \
//!   --system-id test --password secret \
//!   --to 123456789 --from 987654321 \
//!   --sms-interval 120
//!
//! # Custom keep-alive and reconnect settings
//! cargo run --example long_running_client -- \
//!   --system-id test --password secret \
//!   --ping-interval 60 \
//!   --response-timeout 15 \
//!   --reconnect-delay 10 \
//!   --role xcvr \
//!   --run-duration 600
//! ```

use argh::FromArgs;
use smpp_session::client::{
    BindType, HandlerResult, SessionConfig, SmppError, SmsMessage, SubmitConfig, Supervisor,
};
use smpp_session::datatypes::{NumericPlanIndicator, TypeOfNumber};
use smpp_session::Frame;
use std::error::Error;
use std::time::Duration;
use tokio::time::{interval, sleep};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Long-running SMPP client kept alive by the session supervisor
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname of IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u32>,

    /// bind role: receiver|rcvr, transmitter|xmit or transceiver|xcvr (default: transceiver)
    #[argh(option)]
    role: Option<String>,

    /// enquire_link interval in seconds (default: 30)
    #[argh(option)]
    ping_interval: Option<u64>,

    /// seconds to wait for any response (default: 3)
    #[argh(option)]
    response_timeout: Option<u64>,

    /// seconds between reconnect attempts (default: 30)
    #[argh(option)]
    reconnect_delay: Option<u64>,

    /// how long to run the client in seconds (default: 300, i.e., 5 minutes)
    #[argh(option)]
    run_duration: Option<u64>,

    /// interval between SMS sends in seconds (default: 60)
    #[argh(option)]
    sms_interval: Option<u64>,

    /// the recipient telephone number (optional - no SMS sent if not provided)
    #[argh(option, short = 't')]
    to: Option<String>,

    /// the telephone number that the message will be from (optional)
    #[argh(option, short = 'f')]
    from: Option<String>,
}

async fn on_delivery(request: Frame) -> HandlerResult {
    if let Frame::DeliverSm(deliver_sm) = &request {
        if deliver_sm.is_delivery_receipt() {
            info!("Delivery receipt from {}", deliver_sm.source_addr);
        } else {
            info!(
                "Message from {} ({} octets)",
                deliver_sm.source_addr,
                deliver_sm.short_message.len()
            );
        }
    }
    Ok(request.create_response())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let role: BindType = cli_args.role.as_deref().unwrap_or("transceiver").parse()?;
    let run_duration = Duration::from_secs(cli_args.run_duration.unwrap_or(300));
    let sms_interval = Duration::from_secs(cli_args.sms_interval.unwrap_or(60));

    let mut config = SessionConfig::new(format!("{host}:{port}"))
        .with_credentials(
            cli_args.system_id.unwrap_or_default(),
            cli_args.password.unwrap_or_default(),
        )
        .with_role(role)
        .with_ping_interval(Duration::from_secs(cli_args.ping_interval.unwrap_or(30)));

    if let Some(timeout) = cli_args.response_timeout {
        config = config.with_response_timeout(Duration::from_secs(timeout));
    }
    if let Some(delay) = cli_args.reconnect_delay {
        config = config.with_reconnect_delay(Duration::from_secs(delay));
    }
    if let Some(from) = &cli_args.from {
        config = config.with_submit(SubmitConfig::default().with_source(
            TypeOfNumber::International,
            NumericPlanIndicator::Isdn,
            from.clone(),
        ));
    }

    info!("Starting long-running SMPP client for {host}:{port} as {role}");
    info!("Will run for {} seconds", run_duration.as_secs());

    let supervisor = Supervisor::new(config, on_delivery)?;
    supervisor.start();

    let mut sms_timer = cli_args.to.as_ref().map(|_| interval(sms_interval));
    let mut status_timer = interval(Duration::from_secs(60));
    let deadline = sleep(run_duration);
    tokio::pin!(deadline);

    let start_time = std::time::Instant::now();
    let mut message_count = 0;

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Run duration elapsed, shutting down");
                break;
            }

            _ = status_timer.tick() => {
                let status = supervisor.keep_alive_status();
                info!(
                    "Session {}: pings={}, pongs={}, failures={}",
                    supervisor.state(),
                    status.total_pings,
                    status.total_pongs,
                    status.consecutive_failures
                );
            }

            _ = async {
                match sms_timer.as_mut() {
                    Some(timer) => { timer.tick().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                if let Some(to) = &cli_args.to {
                    message_count += 1;
                    let text = format!("Test message #{message_count} from long-running client");

                    match supervisor.submit(&SmsMessage::new(to, text)).await {
                        Ok(message_id) => {
                            info!("Message {message_count} sent successfully! ID: {message_id:?}");
                        }
                        Err(SmppError::Unavailable) => {
                            warn!("Message {message_count} not sent, no session is bound");
                        }
                        Err(e) => error!("Failed to send message {message_count}: {e}"),
                    }
                }
            }
        }
    }

    supervisor.cease().await;

    let final_status = supervisor.keep_alive_status();
    info!("Final keep-alive statistics:");
    info!("  Total pings sent: {}", final_status.total_pings);
    info!("  Total pongs received: {}", final_status.total_pongs);
    info!("  Total SMS messages attempted: {}", message_count);
    info!("Client ran for {:.1} seconds", start_time.elapsed().as_secs_f64());

    Ok(())
}
