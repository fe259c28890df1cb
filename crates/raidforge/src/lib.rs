//! # Raidforge
//!
//! Realtime server for co-operative raid battles: up to four players
//! gather in a room, the leader starts the raid, and they take turns
//! against a boss until one side falls.
//!
//! The server is split into layers, each in its own crate:
//!
//! ```text
//! raidforge-transport   WebSocket frames, connection ids
//! raidforge-protocol    events, snapshots, JSON codec
//! raidforge-session     session tokens → SessionContext
//! raidforge-store       shared key-value store (memory / Redis)
//! raidforge-room        room membership and battle persistence
//! raidforge-battle      pure turn engine
//! raidforge (this)      coordinator, broadcasting, rewards, server
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use raidforge::{MemoryCatalog, MemoryLedger, RaidServer};
//! use raidforge_session::{MemorySessionStore, SessionConfig};
//! use raidforge_store::MemoryStore;
//!
//! # async fn run() -> Result<(), raidforge::RaidError> {
//! let server = RaidServer::<MemoryStore, MemoryCatalog, MemoryLedger, MemorySessionStore>::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(
//!         MemoryStore::new(),
//!         MemoryCatalog::new(),
//!         Arc::new(MemoryLedger::new()),
//!         Arc::new(MemorySessionStore::new(SessionConfig::default())),
//!     )
//!     .await?;
//! server.run().await
//! # }
//! ```

mod broadcast;
mod catalog;
mod config;
mod coordinator;
mod error;
mod handler;
mod http;
mod reward;
mod server;

pub use broadcast::{Broadcaster, Outbound, OutboundSender};
pub use catalog::{CatalogError, MemoryCatalog, UserCatalog};
pub use config::{CoordinatorConfig, ServerConfig};
pub use coordinator::RaidCoordinator;
pub use error::RaidError;
pub use reward::{
    LedgerError, LedgerService, MemoryLedger, RewardDispatcher, RewardPolicy,
};
pub use server::{RaidServer, RaidServerBuilder};
