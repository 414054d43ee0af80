// socknet binary: a publish component, a procedure component and a WebSocket
// front end sharing one in-process broker.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::net::TcpListener;

use socknet::{
    shutdown, telemetry, BrokerBridge, Bus, Echo, LocalBroker, LogWriter, MultiTableSource,
    Observer, ProcedureConfig, ProcedureGateway, PublishConfig, PublishController, RuntimeConfig,
    WsServer,
};

const DEFAULT_INTERVAL_SECS: f64 = 10.0;
const DEFAULT_RPC: &str = "sampleRPC";
const DEFAULT_WS_BIND: &str = "127.0.0.1:9000";

// Settings sourced from environment variables; validated before any broker use.
#[derive(Debug, Clone)]
struct AppConfig {
    publish: PublishConfig,
    procedure: ProcedureConfig,
    runtime: RuntimeConfig,
    ws_bind: SocketAddr,
}

impl AppConfig {
    fn from_env() -> Result<Self> {
        let interval = match std::env::var("SOCKNET_INTERVAL") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("SOCKNET_INTERVAL must be a number, got {raw:?}"))?,
            Err(_) => DEFAULT_INTERVAL_SECS,
        };
        let rpc = std::env::var("SOCKNET_RPC").unwrap_or_else(|_| DEFAULT_RPC.to_string());

        // Same path a broker session's "extra" map takes.
        let publish = PublishConfig::from_extra(&json!({ "interval": interval }))
            .context("invalid publish config")?;
        let procedure =
            ProcedureConfig::from_extra(&json!({ "rpc": rpc })).context("invalid procedure config")?;

        let mut runtime = RuntimeConfig::default();
        if let Ok(raw) = std::env::var("SOCKNET_GRACE_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("SOCKNET_GRACE_SECS must be whole seconds, got {raw:?}"))?;
            runtime.grace = Duration::from_secs(secs);
        }

        let ws_bind = std::env::var("SOCKNET_WS_BIND")
            .unwrap_or_else(|_| DEFAULT_WS_BIND.to_string())
            .parse()
            .context("parse SOCKNET_WS_BIND")?;

        Ok(Self {
            publish,
            procedure,
            runtime,
            ws_bind,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_logging("info");
    let config = AppConfig::from_env()?;
    tracing::info!(?config, "starting socknet");

    let broker = LocalBroker::new();
    let bus = Bus::new(config.runtime.bus_capacity_clamped());

    let controller = PublishController::builder(
        config.publish,
        Arc::new(broker.clone()),
        Arc::new(MultiTableSource),
    )
    .with_runtime(config.runtime.clone())
    .with_bus(bus.clone())
    .with_observers(vec![Arc::new(LogWriter::new()) as Arc<dyn Observer>])
    .build();
    let mut listener = controller
        .start()
        .await
        .context("join publish component")?;

    let gateway = Arc::new(ProcedureGateway::new(config.procedure, Arc::new(Echo)).with_bus(bus));
    gateway
        .on_join(&broker)
        .await
        .context("register procedure")?;

    let stop = shutdown::cancel_on_signal();
    let ws_listener = TcpListener::bind(config.ws_bind)
        .await
        .with_context(|| format!("bind websocket listener on {}", config.ws_bind))?;
    // Peers reach the procedure with {"request": rpc, ..} and start emission
    // with {"request": "subscribe", "data": {"topic": ..}}.
    let bridge = BrokerBridge::new(Arc::new(broker.clone())).with_topics(broker.clone());
    let server = WsServer::new("socknet", Arc::new(bridge));
    let ws_task = {
        let stop = stop.clone();
        tokio::spawn(async move { server.serve(ws_listener, stop).await })
    };

    // Runs until a signal arrives or the meta-event listener faults.
    let early = tokio::select! {
        _ = stop.cancelled() => None,
        joined = &mut listener => Some(joined),
    };
    stop.cancel();

    if let Err(e) = controller.shutdown().await {
        tracing::warn!(error = %e, label = e.as_label(), "publish component did not stop in time");
    }
    match ws_task.await {
        Ok(Err(e)) => tracing::warn!(error = %e, "websocket server failed"),
        Err(e) => tracing::warn!(error = %e, "websocket server task panicked"),
        Ok(Ok(())) => {}
    }
    broker.close();

    let joined = match early {
        Some(joined) => joined,
        None => listener.await,
    };
    joined
        .context("meta-event listener panicked")?
        .context("publish component failed")?;
    tracing::info!("socknet stopped");
    Ok(())
}
