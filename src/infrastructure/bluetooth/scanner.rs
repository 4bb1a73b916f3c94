//! BLE Scanner Module
//!
//! Finds the first peripheral whose advertised name contains a fragment.
//! The scan is held by a [`ScanGuard`], so it is stopped when a device is
//! found, when the timeout elapses, or when the scanning task is dropped.

use crate::domain::models::ScannedDevice;
use crate::infrastructure::bluetooth::{protocol, BleError};
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Get the default Bluetooth adapter
pub async fn default_adapter() -> Result<Adapter, BleError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(BleError::NoAdapter)
}

/// Keeps a scan running for as long as it is alive
pub struct ScanGuard {
    adapter: Option<Adapter>,
}

impl ScanGuard {
    /// Start an unfiltered scan
    pub async fn start(adapter: &Adapter) -> Result<Self, BleError> {
        adapter.start_scan(ScanFilter::default()).await?;
        info!("BLE scan started");
        Ok(Self {
            adapter: Some(adapter.clone()),
        })
    }

    /// Stop the scan now and wait for the adapter to confirm
    pub async fn stop(mut self) {
        if let Some(adapter) = self.adapter.take() {
            stop_scan(&adapter).await;
        }
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        let Some(adapter) = self.adapter.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { stop_scan(&adapter).await });
            }
            Err(_) => warn!("BLE scan dropped outside a runtime; it may keep running"),
        }
    }
}

async fn stop_scan(adapter: &Adapter) {
    match adapter.stop_scan().await {
        Ok(()) => info!("BLE scan stopped"),
        Err(e) => warn!("Failed to stop BLE scan: {}", e),
    }
}

/// BLE Scanner for the credential peripheral
pub struct BleScanner {
    name_fragment: String,
    timeout: Duration,
}

impl BleScanner {
    pub fn new(name_fragment: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name_fragment: name_fragment.into(),
            timeout,
        }
    }

    /// Scan until the first device whose name contains the fragment
    pub async fn find_first(
        &self,
        adapter: &Adapter,
    ) -> Result<(Peripheral, ScannedDevice), BleError> {
        // subscribe before starting so early advertisements are not missed
        let mut events = adapter.events().await?;
        let guard = ScanGuard::start(adapter).await?;

        let search = async {
            while let Some(event) = events.next().await {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => continue,
                };
                if let Some(found) = self.check(adapter, &id).await {
                    return Some(found);
                }
            }
            None
        };

        let result = tokio::time::timeout(self.timeout, search).await;
        guard.stop().await;

        match result {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(BleError::NotFound(self.name_fragment.clone())),
            Err(_) => {
                info!("No \"{}\" device within {:?}", self.name_fragment, self.timeout);
                Err(BleError::NotFound(self.name_fragment.clone()))
            }
        }
    }

    async fn check(
        &self,
        adapter: &Adapter,
        id: &PeripheralId,
    ) -> Option<(Peripheral, ScannedDevice)> {
        let peripheral = adapter.peripheral(id).await.ok()?;
        let props = peripheral.properties().await.ok().flatten()?;
        let name = props.local_name?;

        if !protocol::name_matches(&name, &self.name_fragment) {
            debug!("Skipping {}", name);
            return None;
        }

        info!("Found peripheral {} ({})", name, peripheral.id());
        let device = ScannedDevice {
            name,
            id: peripheral.id().to_string(),
            signal_strength: props.rssi,
        };
        Some((peripheral, device))
    }
}
