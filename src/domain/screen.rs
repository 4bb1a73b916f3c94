//! Capture screen state machine.
//!
//! ```text
//! PermissionPending ──denied──▶ PermissionDenied ──retry──▶ PermissionPending
//!        │ granted
//!        ▼
//!   Viewfinder ──capture──▶ Capturing ──image──▶ Extracting ──serial──▶ Captured
//!        ▲                      │ failed             │ failed              │  ▲
//!        └──────────────────────┴────────────────────┘        submit       ▼  │ failed
//!        ▲                                                           Submitting
//!        └──────────────────────── retake ───── Captured / Submitted ◀──┘ ok
//! ```

use crate::domain::models::{CapturedImage, PermissionOutcome, SerialNumber};
use crate::domain::serial::SerialExtractor;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub image: CapturedImage,
    pub serial: SerialNumber,
    pub customer: String,
}

impl CaptureSession {
    fn new(image: CapturedImage, serial: SerialNumber) -> Self {
        Self {
            image,
            serial,
            customer: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
    PermissionPending,
    PermissionDenied,
    Viewfinder,
    Capturing,
    Extracting(CapturedImage),
    Captured(CaptureSession),
    Submitting(CaptureSession),
    Submitted(CaptureSession),
}

impl ScreenState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PermissionPending => "permission-pending",
            Self::PermissionDenied => "permission-denied",
            Self::Viewfinder => "viewfinder",
            Self::Capturing => "capturing",
            Self::Extracting(_) => "extracting",
            Self::Captured(_) => "captured",
            Self::Submitting(_) => "submitting",
            Self::Submitted(_) => "submitted",
        }
    }

    /// An asynchronous chain is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Capturing | Self::Extracting(_) | Self::Submitting(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} while {state}")]
    Busy {
        action: &'static str,
        state: &'static str,
    },
    #[error("cannot {action} from {state}")]
    NotAllowed {
        action: &'static str,
        state: &'static str,
    },
    #[error("customer code is empty")]
    EmptyCustomerCode,
}

/// Owner of the screen state. All changes go through the transition methods.
#[derive(Debug)]
pub struct Screen {
    state: ScreenState,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen {
    pub fn new() -> Self {
        Self {
            state: ScreenState::PermissionPending,
        }
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        match &self.state {
            ScreenState::Extracting(image) => Some(image),
            ScreenState::Captured(session)
            | ScreenState::Submitting(session)
            | ScreenState::Submitted(session) => Some(&session.image),
            _ => None,
        }
    }

    pub fn serial(&self) -> Option<&SerialNumber> {
        self.session().map(|session| &session.serial)
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        match &self.state {
            ScreenState::Captured(session)
            | ScreenState::Submitting(session)
            | ScreenState::Submitted(session) => Some(session),
            _ => None,
        }
    }

    /// Editable customer code, available once a serial is present and no
    /// submission is outstanding
    pub fn customer_mut(&mut self) -> Option<&mut String> {
        match &mut self.state {
            ScreenState::Captured(session) | ScreenState::Submitted(session) => {
                Some(&mut session.customer)
            }
            _ => None,
        }
    }

    pub fn can_submit(&self) -> bool {
        match &self.state {
            ScreenState::Captured(session) | ScreenState::Submitted(session) => {
                !session.customer.is_empty()
            }
            _ => false,
        }
    }

    pub fn permissions_resolved(
        &mut self,
        outcome: PermissionOutcome,
    ) -> Result<(), TransitionError> {
        match self.state {
            ScreenState::PermissionPending | ScreenState::PermissionDenied => {
                // Bluetooth denial does not gate the screen
                self.state = if outcome.camera {
                    ScreenState::Viewfinder
                } else {
                    ScreenState::PermissionDenied
                };
                Ok(())
            }
            _ => Err(self.not_allowed("resolve permissions")),
        }
    }

    pub fn retry_permissions(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ScreenState::PermissionDenied => {
                self.state = ScreenState::PermissionPending;
                Ok(())
            }
            _ => Err(self.not_allowed("request permissions")),
        }
    }

    pub fn begin_capture(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ScreenState::Viewfinder => {
                self.state = ScreenState::Capturing;
                Ok(())
            }
            _ => Err(self.rejected("capture")),
        }
    }

    pub fn captured(&mut self, image: CapturedImage) -> Result<(), TransitionError> {
        match self.state {
            ScreenState::Capturing => {
                self.state = ScreenState::Extracting(image);
                Ok(())
            }
            _ => {
                image.discard();
                Err(self.not_allowed("accept image"))
            }
        }
    }

    pub fn capture_failed(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ScreenState::Capturing => {
                self.state = ScreenState::Viewfinder;
                Ok(())
            }
            _ => Err(self.not_allowed("fail capture")),
        }
    }

    pub fn serial_extracted(&mut self, serial: SerialNumber) -> Result<(), TransitionError> {
        debug_assert!(SerialExtractor::is_serial_shaped(serial.as_str()));
        match std::mem::replace(&mut self.state, ScreenState::Viewfinder) {
            ScreenState::Extracting(image) => {
                self.state = ScreenState::Captured(CaptureSession::new(image, serial));
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.not_allowed("accept serial"))
            }
        }
    }

    /// Discards the image and returns to the viewfinder
    pub fn extraction_failed(&mut self) -> Result<(), TransitionError> {
        match std::mem::replace(&mut self.state, ScreenState::Viewfinder) {
            ScreenState::Extracting(image) => {
                image.discard();
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.not_allowed("fail extraction"))
            }
        }
    }

    /// Discards image and serial and returns to the viewfinder
    pub fn retake(&mut self) -> Result<(), TransitionError> {
        match std::mem::replace(&mut self.state, ScreenState::Viewfinder) {
            ScreenState::Captured(session) | ScreenState::Submitted(session) => {
                session.image.discard();
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.rejected("retake"))
            }
        }
    }

    /// Move to Submitting and hand back what the webhook call needs.
    /// An empty customer code leaves the state untouched.
    pub fn begin_submit(&mut self) -> Result<(SerialNumber, String), TransitionError> {
        if let ScreenState::Captured(session) | ScreenState::Submitted(session) = &self.state {
            if session.customer.is_empty() {
                return Err(TransitionError::EmptyCustomerCode);
            }
        }

        match std::mem::replace(&mut self.state, ScreenState::Viewfinder) {
            ScreenState::Captured(session) | ScreenState::Submitted(session) => {
                let request = (session.serial.clone(), session.customer.clone());
                self.state = ScreenState::Submitting(session);
                Ok(request)
            }
            other => {
                self.state = other;
                Err(self.rejected("submit"))
            }
        }
    }

    pub fn submission_resolved(&mut self, succeeded: bool) -> Result<(), TransitionError> {
        match std::mem::replace(&mut self.state, ScreenState::Viewfinder) {
            ScreenState::Submitting(session) => {
                self.state = if succeeded {
                    ScreenState::Submitted(session)
                } else {
                    ScreenState::Captured(session)
                };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.not_allowed("resolve submission"))
            }
        }
    }

    fn rejected(&self, action: &'static str) -> TransitionError {
        if self.state.is_busy() {
            TransitionError::Busy {
                action,
                state: self.state.name(),
            }
        } else {
            self.not_allowed(action)
        }
    }

    fn not_allowed(&self, action: &'static str) -> TransitionError {
        TransitionError::NotAllowed {
            action,
            state: self.state.name(),
        }
    }
}
