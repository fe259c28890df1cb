//! Session handling for Raidforge.
//!
//! This crate answers "who is on the other end of this connection?":
//!
//! 1. **Resolution** — turning a session token into a [`UserId`] through
//!    the [`SessionStore`] collaborator (token issuance lives elsewhere).
//! 2. **Context** — the resolved identity is packaged as a
//!    [`SessionContext`] value and threaded through every handler call.
//! 3. **Tracking** — [`SessionManager`] knows which connections are live
//!    and which user each belongs to, so the server can tell when a
//!    user's *last* connection has gone away.
//!
//! ```text
//! Coordinator (above)  ← receives SessionContext with every command
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Transport / Protocol (below)  ← ConnectionId, UserId
//! ```
//!
//! [`UserId`]: raidforge_protocol::UserId

#![allow(async_fn_in_trait)]

mod error;
mod manager;
mod session;
mod store;

pub use error::SessionError;
pub use manager::{SessionManager, Unregistered};
pub use session::{SessionConfig, SessionContext};
pub use store::{MemorySessionStore, SessionStore};
