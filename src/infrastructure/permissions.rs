//! Runtime permission checks.
//!
//! On the desktop there is no consent dialog. Camera access is "granted" when
//! the configured capture program can be started, and Bluetooth access when
//! an adapter can be opened.

use crate::domain::models::PermissionOutcome;
use crate::infrastructure::bluetooth::scanner;
use crate::infrastructure::process;
use async_trait::async_trait;
use tracing::{info, warn};

#[async_trait]
pub trait PermissionGateway: Send + Sync {
    /// Request every permission the screen needs in one pass
    async fn request(&self) -> PermissionOutcome;
}

pub struct DesktopPermissions {
    capture_program: Option<String>,
    require_bluetooth: bool,
}

impl DesktopPermissions {
    pub fn new(capture_program: Option<String>, require_bluetooth: bool) -> Self {
        Self {
            capture_program,
            require_bluetooth,
        }
    }
}

#[async_trait]
impl PermissionGateway for DesktopPermissions {
    async fn request(&self) -> PermissionOutcome {
        let camera = self
            .capture_program
            .as_deref()
            .map(process::resolves)
            .unwrap_or(false);
        if !camera {
            warn!("Capture program {:?} is not available", self.capture_program);
        }

        let bluetooth = if self.require_bluetooth {
            let available = match scanner::default_adapter().await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Bluetooth unavailable: {}", e);
                    false
                }
            };
            Some(available)
        } else {
            None
        };

        let outcome = PermissionOutcome { camera, bluetooth };
        info!("Permissions resolved: {:?}", outcome);
        outcome
    }
}
