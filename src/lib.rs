//! deCONZ Prometheus Exporter
//!
//! Polls deCONZ / Phoscon Zigbee gateways for sensor readings and exposes them in
//! Prometheus format.
//!
//! # Overview
//!
//! At startup the exporter looks up gateways through the Phoscon discovery service
//! and pairs with each one that has no stored API key (the operator unlocks the
//! gateway once, keys are persisted for later runs). Every scrape of `/metrics` then
//! fetches the live sensor list from each gateway and translates temperature,
//! humidity, pressure, power and consumption sensors into gauges.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   GET /discover    ┌──────────────┐
//! │  Phoscon    │ ◄────────────────  │   Exporter   │
//! │  discovery  │                    │              │
//! └─────────────┘                    │  ┌────────┐  │
//! ┌─────────────┐   POST /api        │  │Pairing │  │
//! │   deCONZ    │ ◄────────────────  │  └────────┘  │      HTTP      ┌────────────┐
//! │   gateway   │   GET /api/{key}/  │  ┌────────┐  │ ◄────────────► │ Prometheus │
//! │             │ ◄──── sensors ───  │  │Collect │  │   /metrics     └────────────┘
//! └─────────────┘                    │  └────────┘  │
//!                                    └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`deconz`] - REST client and API type definitions
//! - [`pairing`] - API key pairing state machine and key storage
//! - [`collectors`] - sensor translation and per-gateway collectors
//! - [`metrics`] - Prometheus metric definitions
//! - [`server`] - HTTP server
//! - [`config`] - Configuration management
//! - [`error`] - Error types

pub mod collectors;
pub mod config;
pub mod deconz;
pub mod error;
pub mod metrics;
pub mod pairing;
pub mod server;
