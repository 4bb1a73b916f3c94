//! Bluetooth Service Module
//!
//! Main service that coordinates scanning, connection and the credential
//! write for the keyboard peripheral.

use crate::domain::models::{AppEvent, PeripheralEvent, ScannedDevice};
use crate::infrastructure::bluetooth::{
    connection::{BleConnection, ConnectionConfig, ConnectionResult},
    scanner::{self, BleScanner},
    BleError, CredentialLink,
};
use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Main Bluetooth service coordinating all BLE operations
pub struct BluetoothService {
    config: ConnectionConfig,
    adapter: Mutex<Option<Adapter>>,
    /// Peripheral returned by the last scan, waiting to be connected
    candidate: Mutex<Option<Peripheral>>,
    connection: Mutex<Option<ConnectionResult>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl BluetoothService {
    /// Create a new Bluetooth service
    pub fn new(config: ConnectionConfig, event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            config,
            adapter: Mutex::new(None),
            candidate: Mutex::new(None),
            connection: Mutex::new(None),
            watcher: Mutex::new(None),
            event_sender,
        }
    }

    async fn adapter(&self) -> Result<Adapter, BleError> {
        let mut slot = self.adapter.lock().await;
        if let Some(adapter) = slot.as_ref() {
            return Ok(adapter.clone());
        }
        let adapter = scanner::default_adapter().await?;
        *slot = Some(adapter.clone());
        Ok(adapter)
    }

    /// Report an unrequested disconnect of the connected peripheral
    async fn watch_disconnect(&self, adapter: &Adapter, peripheral: &Peripheral) {
        let id = peripheral.id();
        let mut events = match adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Cannot watch for disconnects: {}", e);
                return;
            }
        };
        let sender = self.event_sender.clone();

        let handle = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(gone) = event {
                    if gone == id {
                        info!("Peripheral {} went away", gone);
                        let _ = sender.send(AppEvent::Peripheral(PeripheralEvent::Disconnected));
                        break;
                    }
                }
            }
        });

        if let Some(previous) = self.watcher.lock().await.replace(handle) {
            previous.abort();
        }
    }
}

#[async_trait]
impl CredentialLink for BluetoothService {
    async fn scan(&self) -> Result<ScannedDevice, BleError> {
        let adapter = self.adapter().await?;
        let scanner = BleScanner::new(
            self.config.name_fragment.clone(),
            Duration::from_secs(self.config.scan_timeout_secs),
        );
        let (peripheral, device) = scanner.find_first(&adapter).await?;
        *self.candidate.lock().await = Some(peripheral);
        Ok(device)
    }

    async fn connect(&self, device: &ScannedDevice) -> Result<(), BleError> {
        let peripheral = self
            .candidate
            .lock()
            .await
            .take()
            .filter(|p| p.id().to_string() == device.id)
            .ok_or_else(|| BleError::NotFound(device.name.clone()))?;

        let adapter = self.adapter().await?;
        let result = BleConnection::new(self.config.clone())
            .connect(peripheral)
            .await?;

        self.watch_disconnect(&adapter, &result.peripheral).await;
        *self.connection.lock().await = Some(result);
        info!("Connected to {}", device.name);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        match self.connection.lock().await.as_ref() {
            Some(connection) => connection.is_connected().await,
            None => false,
        }
    }

    async fn write_credential(&self, payload: &[u8]) -> Result<(), BleError> {
        let guard = self.connection.lock().await;
        let connection = guard.as_ref().ok_or(BleError::NotConnected)?;
        connection.write_credential(payload).await
    }

    async fn disconnect(&self) {
        if let Some(watcher) = self.watcher.lock().await.take() {
            watcher.abort();
        }
        // a scan interrupted by shutdown may still be running
        if let Some(adapter) = self.adapter.lock().await.as_ref() {
            if let Err(e) = adapter.stop_scan().await {
                debug!("stop_scan on disconnect: {}", e);
            }
        }
        if let Some(connection) = self.connection.lock().await.take() {
            connection.disconnect().await;
            info!("Disconnected from peripheral");
        }
    }
}
