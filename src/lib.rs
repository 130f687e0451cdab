//! # osmnotes-gateway - LoRa mesh to OpenStreetMap Notes store-and-forward gateway
//!
//! Bridges a low-bandwidth LoRa mesh radio network to the public
//! OpenStreetMap Notes API for crowd-sourced map editing. A radio-attached
//! host receives `#osmnote <body>` commands from mesh participants, pairs
//! each with the sender's most recent GPS fix, validates and durably
//! queues it, and asynchronously submits it to the remote Notes endpoint.
//! Successful submissions are confirmed back to the sender as a direct
//! radio reply; failures degrade gracefully by retrying from the local
//! queue when connectivity returns.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! osmnotes-gateway = "1.0.0"
//! ```
//!
//! ```rust,no_run
//! use osmnotes_gateway::{config::Config, orchestrator::Orchestrator, transport::serial::SerialTransport};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), osmnotes_gateway::error::GatewayError> {
//! let config = Config::from_env()?;
//! let transport = Arc::new(SerialTransport::new(config.serial_port.clone()));
//! let orchestrator = Orchestrator::new(config, transport).await?;
//! orchestrator.run().await
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod geocoder;
pub mod i18n;
pub mod logging;
pub mod notifier;
pub mod ntp;
pub mod orchestrator;
pub mod position_cache;
pub mod rate_limiter;
pub mod store;
pub mod submitter;
pub mod transport;

pub use crate::config::Config;
pub use crate::error::GatewayError;
pub use crate::logging::{init_logger, log_info};
pub use crate::orchestrator::Orchestrator;
pub use crate::store::Store;
