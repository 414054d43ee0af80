//! # socknet
//!
//! **socknet** connects application logic to a publish/subscribe broker:
//! it streams events to a topic exactly while somebody is subscribed to it,
//! and exposes validated remote procedures.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            ┌──────────────────────────── BrokerSession ───────────────────────────┐
//!            │  list / lookup subscriptions · meta-events · register · call · publish│
//!            └──────┬───────────────────────────────▲──────────────────┬────────────┘
//!                   │ MetaStream                     │ publish          │ call
//!                   ▼                                │                  ▼
//! ┌───────────────────────────────────┐              │      ┌──────────────────────┐
//! │ PublishController                 │              │      │ ProcedureGateway     │
//! │  - SubscriptionRegistry (active)  │              │      │  - validate          │
//! │  - SourceMap (EventSource per key)│              │      │  - Procedure::call   │
//! └──────┬────────────────────────────┘              │      └──────────────────────┘
//!        │ one per active subscription               │                  ▲
//!        ▼                                           │                  │ call
//!   ┌──────────┐  ┌──────────┐                       │      ┌──────────────────────┐
//!   │ Emitter  │  │ Emitter  │ ──────────────────────┘      │ WsServer/WireProtocol│
//!   └──────────┘  └──────────┘                              │  (BrokerBridge)      │
//!        │                                                  └──────────────────────┘
//!        ▼  lifecycle events
//!   ┌──────────────────────┐      ┌─────────────┐
//!   │ Bus (broadcast)      │ ───► │ ObserverSet │ ──► LogWriter, custom observers
//!   └──────────────────────┘      └─────────────┘
//! ```
//!
//! ### Publish lifecycle
//! ```text
//! Created(id?, uri) ──► id or lookup(uri) ──► registry.insert(id) ──► spawn Emitter(id, uri)
//!
//! Emitter loop {
//!   ├─► env = source.fetch(uri)
//!   ├─► id gone or env is "error" ─► stop
//!   ├─► publish(uri, env)
//!   └─► sleep(interval)
//! }
//!
//! Deleted(id) ──► registry.remove(id)   (unknown id: fatal inconsistency)
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                              |
//! |-------------------|----------------------------------------------------------|-------------------------------------------------|
//! | **Publishing**    | Subscription-driven emission tasks                       | [`PublishController`], [`SubscriptionRegistry`] |
//! | **Sources**       | Pluggable per-topic event producers                      | [`EventSource`], [`SourceFactory`], [`SourceMap`] |
//! | **Procedures**    | Validated remote procedures                              | [`Procedure`], [`ProcedureGateway`]             |
//! | **Broker**        | Session contract and in-process broker                   | [`BrokerSession`], [`LocalBroker`]              |
//! | **Wire**          | WebSocket framing and `{response, data}` envelope        | [`WireProtocol`], [`Envelope`]                  |
//! | **Observability** | Lifecycle events and observers                           | [`Bus`], [`Event`], [`Observer`], [`LogWriter`] |
//! | **Configuration** | Construction-time validated settings                     | [`PublishConfig`], [`ProcedureConfig`]          |
//!
//! ## Optional features
//! - `ws` (default): `WsServer`, a `tokio-tungstenite` WebSocket front end.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use socknet::{Envelope, LocalBroker, MultiTableSource, PublishConfig, PublishController};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = LocalBroker::new();
//!     let ctrl = PublishController::builder(
//!         PublishConfig::new(0.01)?,
//!         Arc::new(broker.clone()),
//!         Arc::new(MultiTableSource),
//!     )
//!     .build();
//!     let listener = ctrl.start().await?;
//!
//!     let mut sub = broker.subscribe("3")?;
//!     assert_eq!(sub.recv().await, Some(Envelope::data(3.0)));
//!     assert_eq!(sub.recv().await, Some(Envelope::data(6.0)));
//!
//!     ctrl.shutdown().await?;
//!     listener.await??;
//!     Ok(())
//! }
//! ```

mod broker;
mod config;
mod controller;
mod envelope;
mod error;
mod events;
mod gateway;
mod observers;
mod source;
mod wire;

pub mod shutdown;
pub mod telemetry;

// ---- Public re-exports ----

pub use broker::{
    BrokerSession, Callee, Invocation, LocalBroker, MetaEvent, MetaStream, Subscription,
    SubscriptionDetails, SubscriptionId,
};
pub use config::{ProcedureConfig, PublishConfig, RuntimeConfig};
pub use controller::{PublishController, PublishControllerBuilder, SubscriptionRegistry};
pub use envelope::{Envelope, Response};
pub use error::{ConfigError, ControllerError, RuntimeError, SessionError, WireError};
pub use events::{Bus, Event, EventKind, StopReason};
pub use gateway::{Echo, Procedure, ProcedureGateway, ECHO_USAGE};
pub use observers::{LogWriter, Observer, ObserverSet};
pub use source::{
    EventSource, MultiTable, MultiTableSource, SourceFactory, SourceMap, NOT_A_NUMBER, OUT_OF_RANGE,
};
pub use wire::{
    BrokerBridge, Frame, MessageHandler, Outbound, WireProtocol, SUBSCRIBE_REQUEST, TEXT_ACK,
    TOPIC_USAGE, WRONG_FORMAT,
};

#[cfg(feature = "ws")]
pub use wire::WsServer;
