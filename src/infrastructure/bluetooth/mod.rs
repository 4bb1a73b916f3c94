//! Bluetooth Module
//!
//! Pairs with the keyboard peripheral and hands it the credential.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │        (implements CredentialLink for the worker)        │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌───────────┐
//! │  Scanner  │  │ Connection │  │ Protocol  │
//! │           │  │            │  │           │
//! │ - scoped  │  │ - connect  │  │ - UUIDs   │
//! │   scan    │  │ - GATT     │  │ - payload │
//! └───────────┘  └────────────┘  └───────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - GATT addressing and credential payloads
//! - [`scanner`] - Name-fragment discovery with guaranteed scan teardown
//! - [`connection`] - Connection, service discovery and credential write
//! - [`service`] - Coordinator used by the worker

pub mod connection;
pub mod protocol;
pub mod scanner;
pub mod service;

use crate::domain::models::ScannedDevice;
use async_trait::async_trait;
use thiserror::Error;

// Re-export main service for convenience
pub use service::BluetoothService;

#[derive(Debug, Error)]
pub enum BleError {
    #[error("bluetooth: {0}")]
    Btleplug(#[from] btleplug::Error),
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),
    #[error("no device matching \"{0}\" found")]
    NotFound(String),
    #[error("characteristic {characteristic} not found in service {service}")]
    CharacteristicNotFound {
        service: String,
        characteristic: String,
    },
    #[error("no peripheral connected")]
    NotConnected,
    #[error("response carries no credential")]
    MissingCredential,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// The peripheral side of the pairing flow, as seen by the worker
#[async_trait]
pub trait CredentialLink: Send + Sync {
    /// Scan until the first matching device is seen
    async fn scan(&self) -> Result<ScannedDevice, BleError>;

    /// Connect to the device returned by `scan` and discover its services
    async fn connect(&self, device: &ScannedDevice) -> Result<(), BleError>;

    async fn is_connected(&self) -> bool;

    /// Write without requesting a response
    async fn write_credential(&self, payload: &[u8]) -> Result<(), BleError>;

    async fn disconnect(&self);
}
