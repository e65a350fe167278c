//! Terminal chat hub over plain TCP.
//!
//! One process runs the hub: it accepts peers, gives each a unique
//! nickname and relays every message to everyone else, while its operator
//! types into the same conversation. The same crate provides the
//! participant side.
//!
//! - [`channel`] treats each socket read or write as one message.
//! - [`connection`] models a connection's lifecycle as a typestate.
//! - [`nickname`] negotiates a unique nickname before admission.
//! - [`registry`] is the lock-guarded set of admitted connections.
//! - [`broadcast`] fans a message out to a registry snapshot.
//! - [`session`] is the per-connection receive loop.
//! - [`server`] runs the accept loop and owns the shared [`server::Hub`].
//! - [`terminal`] is the raw-mode line editor and the thread that owns the
//!   terminal.
//! - [`operator`] and [`client`] act on submitted lines for the hub operator
//!   and for a participant.

pub mod broadcast;
pub mod channel;
pub mod cli;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod logger;
pub mod message;
pub mod nickname;
pub mod operator;
pub mod registry;
pub mod server;
pub mod session;
pub mod terminal;
pub mod types;
