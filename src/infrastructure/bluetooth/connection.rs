//! BLE Connection Module
//!
//! Handles connection, GATT discovery and the credential write.

use crate::infrastructure::bluetooth::{protocol, BleError};
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use tracing::{info, warn};

/// Configuration for connection behavior
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Substring of the advertised name to look for
    pub name_fragment: String,
    /// How long a scan may run before giving up
    pub scan_timeout_secs: u64,
    /// Service UUID holding the credential characteristic
    pub service_uuid: String,
    /// Credential characteristic UUID
    pub credential_char_uuid: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name_fragment: "ESP32".to_string(),
            scan_timeout_secs: 30,
            service_uuid: protocol::SERVICE_UUID.to_string(),
            credential_char_uuid: protocol::CREDENTIAL_CHAR_UUID.to_string(),
        }
    }
}

/// Result of a successful connection
pub struct ConnectionResult {
    pub peripheral: Peripheral,
    pub credential_characteristic: Characteristic,
}

impl ConnectionResult {
    pub async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    pub async fn write_credential(&self, payload: &[u8]) -> Result<(), BleError> {
        self.peripheral
            .write(
                &self.credential_characteristic,
                payload,
                WriteType::WithoutResponse,
            )
            .await?;
        info!("Wrote {} byte credential", payload.len());
        Ok(())
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.peripheral.disconnect().await {
            warn!("Disconnect failed: {}", e);
        }
    }
}

/// BLE Connection handler
pub struct BleConnection {
    config: ConnectionConfig,
}

impl BleConnection {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub async fn connect(&self, peripheral: Peripheral) -> Result<ConnectionResult, BleError> {
        let service_uuid = protocol::parse_uuid(&self.config.service_uuid)?;
        let char_uuid = protocol::parse_uuid(&self.config.credential_char_uuid)?;

        info!("Connecting to {}", peripheral.id());
        if !peripheral.is_connected().await.unwrap_or(false) {
            peripheral.connect().await?;
        }

        peripheral.discover_services().await?;
        info!("Discovered {} services", peripheral.services().len());

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service_uuid && c.uuid == char_uuid);

        match characteristic {
            Some(credential_characteristic) => {
                info!("Found credential characteristic");
                Ok(ConnectionResult {
                    peripheral,
                    credential_characteristic,
                })
            }
            None => {
                // leave nothing half-open behind
                let _ = peripheral.disconnect().await;
                Err(BleError::CharacteristicNotFound {
                    service: self.config.service_uuid.clone(),
                    characteristic: self.config.credential_char_uuid.clone(),
                })
            }
        }
    }
}
