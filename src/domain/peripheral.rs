use crate::domain::models::{PeripheralEvent, ScannedDevice};
use tracing::debug;

/// Lifecycle of the single tracked peripheral
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PeripheralState {
    #[default]
    Idle,
    Scanning,
    Found(ScannedDevice),
    Connecting(ScannedDevice),
    Connected(ScannedDevice),
    Disconnected(Option<ScannedDevice>),
}

impl PeripheralState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// A fresh scan may start: nothing connected and nothing in progress
    pub fn can_scan(&self) -> bool {
        matches!(self, Self::Idle | Self::Disconnected(_))
    }

    pub fn device(&self) -> Option<&ScannedDevice> {
        match self {
            Self::Found(d) | Self::Connecting(d) | Self::Connected(d) => Some(d),
            Self::Disconnected(d) => d.as_ref(),
            Self::Idle | Self::Scanning => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Scanning => "SCANNING",
            Self::Found(_) => "FOUND",
            Self::Connecting(_) => "CONNECTING",
            Self::Connected(_) => "CONNECTED",
            Self::Disconnected(_) => "DISCONNECTED",
        }
    }

    /// Record a discovered device. Only accepted while scanning; the first
    /// match wins.
    pub fn found(&mut self, device: ScannedDevice) -> bool {
        if matches!(self, Self::Scanning) {
            *self = Self::Found(device);
            true
        } else {
            debug!("Ignoring discovery of {} in {}", device.name, self.label());
            false
        }
    }

    /// Apply a lifecycle event. Returns false and leaves the state untouched
    /// when the event does not apply.
    pub fn apply(&mut self, event: PeripheralEvent) -> bool {
        let next = match (&*self, event) {
            (Self::Idle | Self::Disconnected(_), PeripheralEvent::ScanStarted) => Self::Scanning,
            (Self::Scanning, PeripheralEvent::ScanStopped) => Self::Idle,
            (Self::Found(d), PeripheralEvent::Connecting) => Self::Connecting(d.clone()),
            (Self::Connecting(d), PeripheralEvent::Connected) => Self::Connected(d.clone()),
            (
                Self::Found(d) | Self::Connecting(d) | Self::Connected(d),
                PeripheralEvent::Disconnected,
            ) => Self::Disconnected(Some(d.clone())),
            // scan stopping after a match is the normal path
            (Self::Found(_), PeripheralEvent::ScanStopped) => return true,
            (state, event) => {
                debug!("Ignoring {:?} in {}", event, state.label());
                return false;
            }
        };
        *self = next;
        true
    }
}
