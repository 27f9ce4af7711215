// ABOUTME: Example application sending one SMS over a single, unsupervised SMPP session
// ABOUTME: Shows the bind, submit_sm and unbind flow of Session

use argh::FromArgs;
use smpp_session::client::{BindType, Session, SessionConfig, SmsMessage, SubmitConfig};
use smpp_session::datatypes::{NumericPlanIndicator, TypeOfNumber};
use smpp_session::Frame;
use std::error::Error;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Example application to show the simplest case of sending an SMS message
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

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: String,
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
    let system_id = cli_args.system_id.unwrap_or_default();
    let password = cli_args.password.unwrap_or_default();

    let config = SessionConfig::new(format!("{host}:{port}"))
        .with_credentials(system_id, password)
        .with_role(BindType::Transmitter);
    let submit = SubmitConfig::default().with_source(
        TypeOfNumber::International,
        NumericPlanIndicator::Isdn,
        cli_args.from,
    );

    let session = Session::new(config)?;
    session.start().await.map_err(|e| {
        eprintln!("Connection/bind failed: {e}");
        e
    })?;

    println!("Connected and bound successfully");

    let sms = SmsMessage::new(cli_args.to, cli_args.message).with_destination_numbering(
        TypeOfNumber::International,
        NumericPlanIndicator::Isdn,
    );
    let frame = Frame::SubmitSm(Box::new(sms.to_submit_sm(&submit)?));

    let result = session.send(frame, Some(Duration::from_secs(10))).await;
    session.stop().await;

    match result {
        Ok(Some(Frame::SubmitSmResp(response))) => {
            println!("Message sent successfully! Message ID: {}", response.message_id);
            Ok(())
        }
        Ok(other) => Err(format!("unexpected answer to submit_sm: {other:?}").into()),
        Err(e) => {
            eprintln!("Failed to send message: {e}");
            Err(e.into())
        }
    }
}
