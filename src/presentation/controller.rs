//! Screen controller.
//!
//! Owns the screen and peripheral state machines, the notice board and the
//! latest viewfinder frame. Turns user actions into [`WorkerCommand`]s and
//! applies the worker's [`AppEvent`]s. Rendering lives in `views`; nothing
//! here touches egui.

use crate::domain::models::{
    AppEvent, CapturedImage, Chain, Failure, MessageSeverity, StatusMessage, WorkerCommand,
};
use crate::domain::notice::{self, NoticeBoard};
use crate::domain::peripheral::PeripheralState;
use crate::domain::screen::{Screen, ScreenState, TransitionError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct ScreenController {
    screen: Screen,
    notices: NoticeBoard,
    peripheral: PeripheralState,
    commands: mpsc::UnboundedSender<WorkerCommand>,
    pairing_enabled: bool,
    preview: Option<CapturedImage>,
    /// `None` when the live feed is off
    preview_interval: Option<Duration>,
    last_preview_request: Option<Instant>,
    /// Frames the UI should drop from its texture cache
    stale_images: Vec<String>,
}

impl ScreenController {
    pub fn new(
        commands: mpsc::UnboundedSender<WorkerCommand>,
        notice_duration: Duration,
        preview_interval: Duration,
        pairing_enabled: bool,
    ) -> Self {
        Self {
            screen: Screen::new(),
            notices: NoticeBoard::new(notice_duration),
            peripheral: PeripheralState::default(),
            commands,
            pairing_enabled,
            preview: None,
            preview_interval: (!preview_interval.is_zero()).then_some(preview_interval),
            last_preview_request: None,
            stale_images: Vec::new(),
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn peripheral(&self) -> &PeripheralState {
        &self.peripheral
    }

    pub fn pairing_enabled(&self) -> bool {
        self.pairing_enabled
    }

    pub fn customer_mut(&mut self) -> Option<&mut String> {
        self.screen.customer_mut()
    }

    /// Latest viewfinder frame
    pub fn preview(&self) -> Option<&CapturedImage> {
        self.preview.as_ref()
    }

    /// Image URIs replaced or discarded since the last call
    pub fn take_stale_images(&mut self) -> Vec<String> {
        std::mem::take(&mut self.stale_images)
    }

    /// Called once when the screen appears
    pub fn mount(&mut self) {
        self.send(WorkerCommand::RequestPermissions);
        // Bluetooth denial does not gate the scan
        self.pair();
    }

    pub fn grant_permission(&mut self) {
        if accepted(self.screen.retry_permissions()) {
            self.send(WorkerCommand::RequestPermissions);
        }
    }

    pub fn capture(&mut self) {
        if accepted(self.screen.begin_capture()) {
            self.send(WorkerCommand::Capture);
        }
    }

    pub fn retake(&mut self) {
        accepted(self.screen.retake());
    }

    pub fn submit(&mut self, now: Instant) {
        match self.screen.begin_submit() {
            Ok((serial, customer)) => self.send(WorkerCommand::Submit { serial, customer }),
            Err(TransitionError::EmptyCustomerCode) => {
                self.notices.report(&Failure::EmptyCustomerCode, now);
            }
            Err(e) => debug!("Submit rejected: {}", e),
        }
    }

    /// Start a scan if pairing is on and nothing is connected or in progress
    pub fn pair(&mut self) {
        if self.pairing_enabled && self.peripheral.can_scan() {
            self.send(WorkerCommand::StartPairing);
        }
    }

    pub fn disconnect_peripheral(&mut self) {
        if self.peripheral.is_connected() {
            self.send(WorkerCommand::Disconnect);
        }
    }

    pub fn shutdown(&mut self) {
        self.clear_preview();
        self.send(WorkerCommand::Shutdown);
    }

    /// Ask for the next viewfinder frame once the interval has passed
    pub fn refresh_preview(&mut self, now: Instant) {
        let Some(interval) = self.preview_interval else {
            return;
        };
        if !matches!(self.screen.state(), ScreenState::Viewfinder) {
            return;
        }
        let due = self
            .last_preview_request
            .map_or(true, |last| now.saturating_duration_since(last) >= interval);
        if due {
            self.last_preview_request = Some(now);
            self.send(WorkerCommand::Preview);
        }
    }

    fn clear_preview(&mut self) {
        if let Some(frame) = self.preview.take() {
            frame.discard();
            self.stale_images.push(frame.uri());
        }
    }

    pub fn handle_event(&mut self, event: AppEvent, now: Instant) {
        debug!("Event: {:?}", event);
        match event {
            AppEvent::Permissions(outcome) => {
                if !outcome.granted() {
                    info!("Permissions not fully granted: {:?}", outcome);
                }
                accepted(self.screen.permissions_resolved(outcome));
            }
            AppEvent::PreviewFrame(frame) => {
                if matches!(self.screen.state(), ScreenState::Viewfinder) {
                    self.clear_preview();
                    self.preview = Some(frame);
                } else {
                    frame.discard();
                }
            }
            AppEvent::Captured(image) => {
                accepted(self.screen.captured(image));
                self.clear_preview();
            }
            AppEvent::SerialExtracted(serial) => {
                accepted(self.screen.serial_extracted(serial));
            }
            AppEvent::Submitted(_) => {
                accepted(self.screen.submission_resolved(true));
                self.notices.post(
                    StatusMessage::new(notice::SUBMITTED, MessageSeverity::Success),
                    now,
                );
            }
            AppEvent::CredentialSent => {
                self.notices.post(
                    StatusMessage::new(notice::CREDENTIAL_SENT, MessageSeverity::Success),
                    now,
                );
            }
            AppEvent::Peripheral(event) => {
                if self.peripheral.apply(event) {
                    info!("Peripheral {}", self.peripheral.label());
                }
            }
            AppEvent::DeviceFound(device) => {
                self.peripheral.found(device);
            }
            AppEvent::Failed(failure) => {
                match &failure {
                    Failure::CaptureFailed(_) => {
                        accepted(self.screen.capture_failed());
                    }
                    Failure::ExtractionFailed => {
                        accepted(self.screen.extraction_failed());
                    }
                    Failure::SubmissionFailed(_) => {
                        accepted(self.screen.submission_resolved(false));
                    }
                    _ => {}
                }
                self.notices.report(&failure, now);
            }
            AppEvent::Rejected(chain) => self.rejected(chain, now),
            AppEvent::LogMessage(message) => self.notices.post(message, now),
        }
    }

    pub fn notify(&mut self, message: StatusMessage, now: Instant) {
        self.notices.post(message, now);
    }

    /// Expire notices. Returns how long until the current one clears.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        self.notices.tick(now);
        self.notices.remaining(now)
    }

    /// Undo a transition the worker refused to act on
    fn rejected(&mut self, chain: Chain, now: Instant) {
        let undone = match chain {
            Chain::Submit => accepted(self.screen.submission_resolved(false))
                .then_some(notice::SUBMIT_BUSY),
            Chain::Capture => {
                accepted(self.screen.capture_failed()).then_some(notice::CAPTURE_BUSY)
            }
            // the running chain reports its own outcome
            Chain::Permissions | Chain::Pairing | Chain::Preview => None,
        };
        if let Some(message) = undone {
            self.notices.post(StatusMessage::new(message, MessageSeverity::Warning), now);
        }
    }

    fn send(&self, command: WorkerCommand) {
        if self.commands.send(command).is_err() {
            tracing::error!("Worker is not running");
        }
    }
}

/// Rejected transitions are expected (double clicks, late events) and only logged
fn accepted(result: Result<(), TransitionError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("Ignored: {}", e);
            false
        }
    }
}
