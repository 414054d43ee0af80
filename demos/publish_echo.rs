//! # Example: Publish lifecycle and echo procedure
//!
//! One in-process broker serves both components:
//! - a `PublishController` streams the multiplication table of each numeric
//!   topic while somebody is subscribed;
//! - a `ProcedureGateway` registers `sampleRPC`, which echoes its `value`.
//!
//! ```text
//! subscribe("3") ──► 3.0, 6.0, 9.0 ... ──► drop ──► emission stops
//! call("sampleRPC", value="hello") ──► "hello"
//! call("sampleRPC", 1)             ──► {"response":"error", ...}
//! ```
//!
//! Run with: `cargo run --example publish_echo`

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use socknet::{
    telemetry, BrokerSession, Echo, Invocation, LocalBroker, LogWriter, MultiTableSource,
    Observer, ProcedureConfig, ProcedureGateway, PublishConfig, PublishController,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    telemetry::init_logging("debug");

    let broker = LocalBroker::new();
    let ctrl = PublishController::builder(
        PublishConfig::from_extra(&json!({ "interval": 0.2 }))?,
        Arc::new(broker.clone()),
        Arc::new(MultiTableSource),
    )
    .with_observers(vec![Arc::new(LogWriter::new()) as Arc<dyn Observer>])
    .build();
    let listener = ctrl.start().await?;

    let gateway = Arc::new(ProcedureGateway::new(
        ProcedureConfig::new("sampleRPC")?,
        Arc::new(Echo),
    ));
    gateway.on_join(&broker).await?;

    let mut sub = broker.subscribe("3")?;
    for _ in 0..4 {
        if let Some(env) = sub.recv().await {
            println!("[subscriber] topic 3 -> {}", serde_json::to_string(&env)?);
        }
    }
    drop(sub);
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("[subscriber] left; active = {:?}", ctrl.active().await);

    let ok = broker
        .call("sampleRPC", Invocation::new().kwarg("value", "hello"))
        .await?;
    println!("[caller] sampleRPC(value=\"hello\") -> {ok}");

    let rejected = broker.call("sampleRPC", Invocation::new().arg(1)).await?;
    println!("[caller] sampleRPC(1) -> {rejected}");

    ctrl.shutdown().await?;
    listener.await??;
    Ok(())
}
