//! External platform collaborators.
//!
//! The orchestrator only ever talks to the platform through the async traits
//! in [`collaborators`]. Two families of implementations are provided:
//!
//! - [`rest`]: thin `reqwest` adapters over the platform's public REST APIs,
//!   including [`rest::RealtimeVerdictSource`], which reads test verdicts
//!   back out of the realtime store.
//! - [`memory`]: in-process implementations that record every call, used by
//!   tests and local wiring.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod memory;
pub mod rest;

pub use collaborators::{
    CallableInvoker, DocumentStore, IdentityDirectory, NewUser, Platform, PubSubTopic,
    RealtimeStore, UserRecord,
};
pub use config::{ConfigError, PlatformConfig};
pub use error::PlatformError;
