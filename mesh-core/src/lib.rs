//! # mesh-core
//!
//! Pure logic for docmesh transports (no I/O, instant tests).
//!
//! This crate implements the lifecycle state machine and the discovery
//! handshake without any channel or runtime, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`TransportState`] turns lifecycle events into [`Action`]s
//! - [`Handshake`] turns one received [`mesh_types::Frame`] into [`Dispatch`]es
//!
//! The actual I/O (posting frames, emitting events) is performed by
//! `mesh-network`, which interprets what these produce.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod handshake;
pub mod state;

pub use handshake::{Dispatch, Handshake};
pub use state::{Action, Event, TransportState};
