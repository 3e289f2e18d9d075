// Copyright 2025 svcproxy Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # svcproxy CLI
//!
//! Runs a ZeroMQ broker and makes one-off calls over either binding.
//!
//! ## Usage
//!
//! ```bash
//! # Start a broker on the default endpoints
//! svcproxy broker
//!
//! # Call an operation through the broker (prints raw JSON)
//! svcproxy call calculator::Calculator Sum '[1, 2]'
//!
//! # Same call over Redis queues, giving up after 5 seconds
//! svcproxy queue-call calculator::Calculator Sum '[1, 2]' --send-queue calculator --timeout-ms 5000
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG` (default `info`); `call`
//! and `queue-call` only log warnings so stdout stays pipeable.

use anyhow::{bail, Context as _, Result};
use argh::FromArgs;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use svcproxy_client::TimeoutClient;
use svcproxy_common::transport::{Client, Codec};
use svcproxy_common::RequestData;
use svcproxy_queue::{QueueClient, QueueClientConfig, RedisConfig, RedisStore};
use svcproxy_zmq::{BrokerConfig, ZmqBroker, ZmqClient, ZmqClientConfig};

/// Parses a `--codec` value.
fn parse_codec(value: &str) -> std::result::Result<Codec, String> {
    match value {
        "json" => Ok(Codec::Json),
        "msgpack" | "messagepack" => Ok(Codec::MessagePack),
        other => Err(format!("unknown codec '{}', expected json or msgpack", other)),
    }
}

/// Parses the positional argument list of a call.
///
/// Accepts a JSON array, or a single JSON value which is sent as the only
/// argument.
fn parse_arguments(json: &str) -> Result<Vec<Value>> {
    let value: Value =
        serde_json::from_str(json).with_context(|| format!("invalid JSON arguments: {}", json))?;
    Ok(match value {
        Value::Array(items) => items,
        single => vec![single],
    })
}

#[derive(FromArgs)]
/// svcproxy - transport-independent service proxies
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Broker(BrokerArgs),
    Call(CallArgs),
    QueueCall(QueueCallArgs),
}

/// Arguments for running a broker.
///
/// Defaults are four consecutive ports from 5555 on localhost, matching
/// `BrokerConfig::default()`.
#[derive(FromArgs)]
#[argh(subcommand, name = "broker")]
/// run a ZeroMQ broker until interrupted
struct BrokerArgs {
    /// endpoint replies are routed out of, towards clients
    #[argh(option, default = "\"tcp://127.0.0.1:5555\".into()")]
    client_inbound: String,

    /// endpoint client requests arrive on
    #[argh(option, default = "\"tcp://127.0.0.1:5556\".into()")]
    client_outbound: String,

    /// endpoint requests are spread from, across servers
    #[argh(option, default = "\"tcp://127.0.0.1:5557\".into()")]
    server_inbound: String,

    /// endpoint server replies arrive on
    #[argh(option, default = "\"tcp://127.0.0.1:5558\".into()")]
    server_outbound: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call an operation through a ZeroMQ broker
struct CallArgs {
    /// service id of the contract
    #[argh(positional)]
    service: String,

    /// operation name
    #[argh(positional)]
    operation: String,

    /// arguments as a JSON array
    #[argh(positional, default = "\"[]\".into()")]
    args: String,

    /// broker endpoint replies come from
    #[argh(option, default = "\"tcp://127.0.0.1:5555\".into()")]
    inbound: String,

    /// broker endpoint requests go to
    #[argh(option, default = "\"tcp://127.0.0.1:5556\".into()")]
    outbound: String,

    /// payload codec, json or msgpack
    #[argh(option, default = "Codec::Json", from_str_fn(parse_codec))]
    codec: Codec,

    /// give up after this many milliseconds
    #[argh(option)]
    timeout_ms: Option<u64>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "queue-call")]
/// call an operation through Redis queues
struct QueueCallArgs {
    /// service id of the contract
    #[argh(positional)]
    service: String,

    /// operation name
    #[argh(positional)]
    operation: String,

    /// arguments as a JSON array
    #[argh(positional, default = "\"[]\".into()")]
    args: String,

    /// redis host
    #[argh(option, default = "\"127.0.0.1\".into()")]
    host: String,

    /// redis port
    #[argh(option, default = "6379")]
    port: u16,

    /// redis password
    #[argh(option)]
    password: Option<String>,

    /// queue the servers read requests from
    #[argh(option)]
    send_queue: String,

    /// queue to read the reply from; a fresh one by default
    #[argh(option)]
    receive_queue: Option<String>,

    /// payload codec, json or msgpack
    #[argh(option, default = "Codec::Json", from_str_fn(parse_codec))]
    codec: Codec,

    /// give up after this many milliseconds
    #[argh(option)]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    let default_level = match cli.command {
        Commands::Broker(_) => "info",
        Commands::Call(_) | Commands::QueueCall(_) => "warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Broker(args) => run_broker(args).await,
        Commands::Call(args) => run_call(args).await,
        Commands::QueueCall(args) => run_queue_call(args).await,
    }
}

async fn run_broker(args: BrokerArgs) -> Result<()> {
    let config = BrokerConfig {
        client_inbound: args.client_inbound,
        client_outbound: args.client_outbound,
        server_inbound: args.server_inbound,
        server_outbound: args.server_outbound,
        ..BrokerConfig::default()
    };

    let context = zmq::Context::new();
    let broker = ZmqBroker::new(&context, config);
    broker.listen().context("failed to start broker")?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupted, shutting down");
    broker.shutdown();

    tracing::info!(
        requests = broker.stats().requests(),
        replies = broker.stats().replies(),
        "broker stopped"
    );
    Ok(())
}

async fn run_call(args: CallArgs) -> Result<()> {
    let arguments = parse_arguments(&args.args)?;
    let config = ZmqClientConfig {
        inbound_address: args.inbound,
        outbound_address: args.outbound,
        codec: args.codec,
        ..ZmqClientConfig::default()
    };

    let context = zmq::Context::new();
    let client = ZmqClient::new(&context, config).context("failed to connect to broker")?;
    let request = RequestData::new(args.service, args.operation, arguments);

    let result = send(client, request, args.timeout_ms).await?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

async fn run_queue_call(args: QueueCallArgs) -> Result<()> {
    let arguments = parse_arguments(&args.args)?;
    let redis = RedisConfig {
        host: args.host,
        port: args.port,
        password: args.password,
    };
    let store = RedisStore::connect(&redis)
        .await
        .with_context(|| format!("failed to connect to redis at {}:{}", redis.host, redis.port))?;

    let mut config = QueueClientConfig::new(args.send_queue);
    if let Some(receive_queue) = args.receive_queue {
        config.receive_queue = receive_queue;
    }
    config.codec = args.codec;

    let client = Arc::new(QueueClient::new(store, config)?);
    let request = RequestData::new(args.service, args.operation, arguments);

    let result = send(Arc::clone(&client), request, args.timeout_ms).await;
    client.shutdown().await;

    println!("{}", serde_json::to_string(&result?)?);
    Ok(())
}

/// Sends one request, cancelling it on Ctrl-C, and unwraps the response.
async fn send<C: Client>(client: C, request: RequestData, timeout_ms: Option<u64>) -> Result<Value> {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let response = match timeout_ms {
        Some(ms) => {
            TimeoutClient::new(client, Duration::from_millis(ms))
                .request(request, cancel)
                .await
        }
        None => client.request(request, cancel).await,
    };
    interrupt.abort();

    match response?.into_result() {
        Ok(value) => Ok(value),
        Err(fault) => bail!("remote fault {}", fault),
    }
}

#[cfg(test)]
mod tests;
