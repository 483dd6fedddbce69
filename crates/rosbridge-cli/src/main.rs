//! # rosbridge
//!
//! Command-line client for a rosbridge server: discovery, topic echo and
//! publish, service calls and parameter access.

#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rosbridge_client::{
    ClientError, ConnectionStateListener, Listener, ProtocolError, RosClient, TransportError,
};
use rosbridge_settings::RosbridgeSettings;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};

/// rosbridge command-line client.
#[derive(Parser, Debug)]
#[command(name = "rosbridge", version, about)]
struct Cli {
    /// rosbridge WebSocket URL (overrides settings).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Log level (overrides settings; `RUST_LOG` wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// How long to wait for a response.
    #[arg(long, global = true, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List topics
    Topics,

    /// List services
    Services,

    /// List parameter names
    Params,

    /// Print messages published on a topic
    Echo {
        /// Topic name
        topic: String,

        /// Message type
        #[arg(long = "type")]
        message_type: Option<String>,

        /// Stop after this many messages
        #[arg(long)]
        count: Option<usize>,
    },

    /// Publish one message
    Pub {
        /// Topic name
        topic: String,

        /// Message type
        message_type: String,

        /// Message as JSON
        message: String,
    },

    /// Call a service and print its response
    Call {
        /// Service name
        service: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Read or write a parameter
    #[command(subcommand)]
    Param(ParamCommand),
}

#[derive(Subcommand, Debug)]
enum ParamCommand {
    /// Print a parameter value
    Get {
        /// Parameter name
        name: String,
    },

    /// Set a parameter value
    Set {
        /// Parameter name
        name: String,

        /// Value as JSON
        value: String,
    },
}

/// Logs connection trouble and flags the end of the connection; the
/// command itself reports request failures.
struct CliEvents {
    ended: watch::Sender<bool>,
}

impl CliEvents {
    fn new() -> Self {
        let (ended, _) = watch::channel(false);
        Self { ended }
    }
}

impl ConnectionStateListener for CliEvents {
    fn on_error(&self, error: &TransportError) {
        tracing::error!(%error, "connection error");
        let _ = self.ended.send_replace(true);
    }

    fn on_close(&self) {
        tracing::debug!("connection closed");
        let _ = self.ended.send_replace(true);
    }

    fn on_protocol_error(&self, error: &ProtocolError) {
        tracing::debug!(%error, "protocol error");
    }
}

fn parse_json(text: &str, what: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{what} is not valid JSON: {text}"))
}

fn parse_args(text: &str) -> Result<Map<String, Value>> {
    match parse_json(text, "service arguments")? {
        Value::Object(map) => Ok(map),
        other => bail!("service arguments must be a JSON object, got {other}"),
    }
}

fn init_logging(settings: &RosbridgeSettings, level: Option<&str>) {
    let level = level.unwrap_or(&settings.logging.level);
    if settings.logging.json {
        rosbridge_core::logging::init_json_subscriber(level);
    } else {
        rosbridge_core::logging::init_subscriber(level);
    }
}

fn list(names: Result<Vec<String>, ClientError>) -> Result<()> {
    for name in names? {
        println!("{name}");
    }
    Ok(())
}

async fn echo(
    client: &RosClient,
    events: &CliEvents,
    topic: String,
    message_type: Option<String>,
    count: Option<usize>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let topic = client.topic(topic, message_type);
    topic.subscribe(Listener::new(move |msg| {
        let _ = tx.send(msg.clone());
    }))?;

    let mut ended = events.ended.subscribe();
    tokio::select! {
        result = forward_messages(&mut rx, &mut ended, count, |msg| println!("{msg}")) => result?,
        _ = tokio::signal::ctrl_c() => {}
    }

    topic.unsubscribe()?;
    Ok(())
}

/// Hand received messages to `emit` until `count` is reached. Fails once
/// the connection ends.
async fn forward_messages(
    rx: &mut mpsc::UnboundedReceiver<Value>,
    ended: &mut watch::Receiver<bool>,
    count: Option<usize>,
    mut emit: impl FnMut(&Value),
) -> Result<()> {
    let mut received = 0;
    while count.is_none_or(|n| received < n) {
        tokio::select! {
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                emit(&msg);
                received += 1;
            }
            _ = ended.wait_for(|ended| *ended) => bail!("connection to rosbridge ended"),
        }
    }
    Ok(())
}

async fn run(cli: Cli, settings: RosbridgeSettings) -> Result<()> {
    let timeout = Duration::from_millis(cli.timeout_ms);
    let url = settings.connection.url.clone();
    let events = Arc::new(CliEvents::new());
    let client = RosClient::connect(&settings, events.clone())
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    let result = execute(&client, &events, cli.command, timeout).await;

    // flushes queued frames; `pub` and `param set` only queue theirs
    client.disconnect().await;
    result
}

async fn execute(
    client: &RosClient,
    events: &CliEvents,
    command: Commands,
    timeout: Duration,
) -> Result<()> {
    match command {
        Commands::Topics => list(client.list_topics(timeout).await),
        Commands::Services => list(client.list_services(timeout).await),
        Commands::Params => list(client.list_params(timeout).await),
        Commands::Echo {
            topic,
            message_type,
            count,
        } => echo(client, events, topic, message_type, count).await,
        Commands::Pub {
            topic,
            message_type,
            message,
        } => {
            let message = parse_json(&message, "message")?;
            client.topic(topic, Some(message_type)).publish(message)?;
            Ok(())
        }
        Commands::Call { service, args } => {
            let args = parse_args(&args)?;
            let values = client.service(service, None).call(args, timeout).await?;
            println!("{}", serde_json::to_string_pretty(&values)?);
            Ok(())
        }
        Commands::Param(ParamCommand::Get { name }) => {
            let value = client.param(name).fetch(timeout).await?;
            println!("{value}");
            Ok(())
        }
        Commands::Param(ParamCommand::Set { name, value }) => {
            let value = parse_json(&value, "parameter value")?;
            let _ = client.param(name).set(value)?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = rosbridge_settings::load_settings().unwrap_or_default();
    if let Some(url) = &cli.url {
        settings.connection.url.clone_from(url);
    }
    init_logging(&settings, cli.log_level.as_deref());

    run(cli, settings).await
}
