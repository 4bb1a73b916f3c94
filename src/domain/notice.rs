//! Transient user notices.
//!
//! Every failure goes through [`NoticeBoard::report`], which logs it and,
//! depending on [`Visibility`], shows a notice that clears itself after a
//! fixed delay.

use crate::domain::models::{Failure, MessageSeverity, StatusMessage};
use std::time::{Duration, Instant};
use tracing::{error, warn};

pub const CAPTURE_FAILED: &str = "Could not capture photo";
pub const EXTRACTION_FAILED: &str = "Could not read serial number";
pub const EMPTY_CUSTOMER_CODE: &str = "Enter a customer code";
pub const SUBMISSION_FAILED: &str = "Submission failed";
pub const CREDENTIAL_WRITE_FAILED: &str = "Could not send credential";
pub const UNTYPEABLE_CREDENTIAL: &str = "Credential contains characters the keyboard cannot type";
pub const SUBMITTED: &str = "Submitted";
pub const CREDENTIAL_SENT: &str = "Credential sent";
pub const SUBMIT_BUSY: &str = "Still sending the previous submission";
pub const CAPTURE_BUSY: &str = "Camera is busy, try again";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Logged and shown to the user
    Visible(StatusMessage),
    /// Logged only
    Silent,
}

impl Failure {
    pub fn visibility(&self) -> Visibility {
        use MessageSeverity::{Error, Warning};

        let visible =
            |text: &str, severity| Visibility::Visible(StatusMessage::new(text, severity));
        match self {
            Failure::CaptureFailed(_) => visible(CAPTURE_FAILED, Error),
            Failure::ExtractionFailed => visible(EXTRACTION_FAILED, Error),
            Failure::EmptyCustomerCode => visible(EMPTY_CUSTOMER_CODE, Warning),
            Failure::SubmissionFailed(_) => visible(SUBMISSION_FAILED, Error),
            Failure::ScanFailed(_) | Failure::ConnectFailed(_) => Visibility::Silent,
            Failure::CredentialWriteFailed(_) => visible(CREDENTIAL_WRITE_FAILED, Error),
            Failure::UntypeableCredential(_) => visible(UNTYPEABLE_CREDENTIAL, Warning),
        }
    }
}

#[derive(Debug, Clone)]
struct Notice {
    message: StatusMessage,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct NoticeBoard {
    current: Option<Notice>,
    duration: Duration,
}

impl NoticeBoard {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: None,
            duration,
        }
    }

    /// Log a failure and show a notice if its kind is user-visible
    pub fn report(&mut self, failure: &Failure, now: Instant) {
        match failure.visibility() {
            Visibility::Visible(message) => {
                error!("{:?}", failure);
                self.post(message, now);
            }
            Visibility::Silent => warn!("{:?}", failure),
        }
    }

    /// Show a message, replacing any current one
    pub fn post(&mut self, message: StatusMessage, now: Instant) {
        self.current = Some(Notice {
            message,
            expires_at: now + self.duration,
        });
    }

    /// Drop the current notice once its delay has elapsed
    pub fn tick(&mut self, now: Instant) {
        if self
            .current
            .as_ref()
            .is_some_and(|notice| now >= notice.expires_at)
        {
            self.current = None;
        }
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref().map(|notice| &notice.message)
    }

    /// Time until the current notice clears
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.current
            .as_ref()
            .map(|notice| notice.expires_at.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_failure_clears_after_delay() {
        let start = Instant::now();
        let mut board = NoticeBoard::new(Duration::from_millis(3000));

        board.report(&Failure::ExtractionFailed, start);
        assert_eq!(
            board.current().map(|m| m.message.as_str()),
            Some("Could not read serial number")
        );

        board.tick(start + Duration::from_millis(2999));
        assert!(board.current().is_some());

        board.tick(start + Duration::from_millis(3000));
        assert!(board.current().is_none());
    }

    #[test]
    fn test_silent_failures_are_not_shown() {
        let mut board = NoticeBoard::new(Duration::from_secs(3));
        board.report(&Failure::ScanFailed("no adapter".into()), Instant::now());
        board.report(&Failure::ConnectFailed("timeout".into()), Instant::now());
        assert!(board.current().is_none());
    }

    #[test]
    fn test_new_notice_replaces_and_restarts_delay() {
        let start = Instant::now();
        let mut board = NoticeBoard::new(Duration::from_secs(3));

        board.report(&Failure::ExtractionFailed, start);
        let later = start + Duration::from_secs(2);
        board.report(&Failure::SubmissionFailed("timeout".into()), later);

        board.tick(start + Duration::from_secs(4));
        let current = board.current().unwrap();
        assert_eq!(current.message, SUBMISSION_FAILED);
        assert_eq!(current.severity, MessageSeverity::Error);
        assert_eq!(
            board.remaining(start + Duration::from_secs(4)),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_policy_severities() {
        assert_eq!(
            Failure::EmptyCustomerCode.visibility(),
            Visibility::Visible(StatusMessage::new(
                EMPTY_CUSTOMER_CODE,
                MessageSeverity::Warning
            ))
        );
        assert_eq!(
            Failure::UntypeableCredential(vec!['é']).visibility(),
            Visibility::Visible(StatusMessage::new(
                UNTYPEABLE_CREDENTIAL,
                MessageSeverity::Warning
            ))
        );
        assert!(matches!(
            Failure::CredentialWriteFailed("gatt".into()).visibility(),
            Visibility::Visible(_)
        ));
    }
}
