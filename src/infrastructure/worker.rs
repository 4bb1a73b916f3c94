//! Background worker.
//!
//! Runs on its own thread inside a current-thread tokio runtime, takes
//! [`WorkerCommand`]s from the screen and reports [`AppEvent`]s back. Each
//! command starts one chain (permissions, capture + extraction, viewfinder
//! preview, submission, pairing). A chain that is already in flight rejects
//! a second trigger of the same kind instead of overlapping it, and the
//! rejection is reported back so the screen can undo what it committed.

use crate::domain::hid;
use crate::domain::models::{
    AppEvent, Chain, Failure, MessageSeverity, PeripheralEvent, PermissionOutcome,
    SerialNumber, StatusMessage, WorkerCommand,
};
use crate::domain::serial::SerialExtractor;
use crate::domain::settings::{PayloadSource, Settings};
use crate::infrastructure::bluetooth::connection::ConnectionConfig;
use crate::infrastructure::bluetooth::{protocol, BluetoothService, CredentialLink};
use crate::infrastructure::camera::{Camera, CaptureOptions, CommandCamera};
use crate::infrastructure::ocr::{CommandRecognizer, TextRecognizer};
use crate::infrastructure::permissions::{DesktopPermissions, PermissionGateway};
use crate::infrastructure::webhook::{Submitter, WebhookClient};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The external services a chain may call
#[derive(Clone)]
pub struct Services {
    pub camera: Arc<dyn Camera>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub submitter: Arc<dyn Submitter>,
    pub permissions: Arc<dyn PermissionGateway>,
    /// `None` when pairing is disabled
    pub link: Option<Arc<dyn CredentialLink>>,
}

impl Services {
    /// The real services, configured from settings
    pub fn from_settings(settings: &Settings, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let camera = CommandCamera::with_temp_dir(settings.capture_command.clone())
            .with_preview_command(settings.preview_command.clone());
        let capture_program = camera.program().map(str::to_string);

        let link = if settings.pairing_enabled {
            let config = ConnectionConfig {
                name_fragment: settings.peripheral_name_fragment.clone(),
                scan_timeout_secs: settings.scan_timeout_secs,
                service_uuid: settings.ble_service_uuid.clone(),
                credential_char_uuid: settings.ble_credential_char_uuid.clone(),
            };
            Some(Arc::new(BluetoothService::new(config, events)) as Arc<dyn CredentialLink>)
        } else {
            None
        };

        Self {
            camera: Arc::new(camera),
            recognizer: Arc::new(CommandRecognizer::new(settings.ocr_command.clone())),
            submitter: Arc::new(WebhookClient::new(
                settings.webhook_url.clone(),
                Duration::from_millis(settings.webhook_timeout_ms),
                settings.access_token.clone(),
            )),
            permissions: Arc::new(DesktopPermissions::new(
                capture_program,
                settings.require_bluetooth_permissions,
            )),
            link,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    pub extractor: SerialExtractor,
    pub payload_source: PayloadSource,
    pub capture_options: CaptureOptions,
}

impl WorkerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            extractor: SerialExtractor::new(settings.serial_normalization),
            payload_source: settings.payload_source.clone(),
            capture_options: CaptureOptions::still(),
        }
    }
}

/// Start the worker on its own thread with a current-thread runtime
pub fn spawn(
    settings: Settings,
    events: mpsc::UnboundedSender<AppEvent>,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("serial-capture-worker".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to create worker runtime: {}", e);
                    report_startup_failure(&events);
                    return;
                }
            };

            runtime.block_on(async move {
                let services = Services::from_settings(&settings, events.clone());
                let config = WorkerConfig::from_settings(&settings);
                Worker::new(services, config, events).run(commands).await;
            });
            info!("Worker stopped");
        })
}

/// Without a worker nothing can be captured. Resolve the pending permission
/// request as denied so the screen leaves its spinner.
fn report_startup_failure(events: &mpsc::UnboundedSender<AppEvent>) {
    let _ = events.send(AppEvent::LogMessage(StatusMessage::new(
        "Background worker failed to start",
        MessageSeverity::Error,
    )));
    let _ = events.send(AppEvent::Permissions(PermissionOutcome {
        camera: false,
        bluetooth: None,
    }));
}

/// Set of chains currently running
#[derive(Debug, Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<Chain>>>);

impl InFlight {
    fn try_begin(&self, chain: Chain) -> Option<ChainToken> {
        let mut running = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if running.insert(chain) {
            Some(ChainToken {
                chain,
                in_flight: self.clone(),
            })
        } else {
            None
        }
    }

    fn is_running(&self, chain: Chain) -> bool {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&chain)
    }
}

/// Marks a chain as running until dropped
struct ChainToken {
    chain: Chain,
    in_flight: InFlight,
}

impl Drop for ChainToken {
    fn drop(&mut self) {
        self.in_flight
            .0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.chain);
    }
}

/// Sends events back to the screen. A closed channel means the screen is
/// gone, so send errors are ignored.
#[derive(Clone)]
struct Reporter(mpsc::UnboundedSender<AppEvent>);

impl Reporter {
    fn send(&self, event: AppEvent) {
        let _ = self.0.send(event);
    }

    fn fail(&self, failure: Failure) {
        self.send(AppEvent::Failed(failure));
    }
}

pub struct Worker {
    services: Services,
    config: Arc<WorkerConfig>,
    reporter: Reporter,
    in_flight: InFlight,
    /// Held while the camera is in use; previews never queue behind a still
    sensor: Arc<tokio::sync::Mutex<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Worker {
    pub fn new(
        services: Services,
        config: WorkerConfig,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            services,
            config: Arc::new(config),
            reporter: Reporter(events),
            in_flight: InFlight::default(),
            sensor: Arc::default(),
            tasks: Vec::new(),
        }
    }

    /// Process commands until `Shutdown` or until the screen drops its sender
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<WorkerCommand>) {
        info!("Worker started");
        while let Some(command) = commands.recv().await {
            if !self.handle(command).await {
                return;
            }
        }
        self.shutdown().await;
    }

    /// Handle one command. Returns false once the worker has shut down.
    pub async fn handle(&mut self, command: WorkerCommand) -> bool {
        debug!("Worker command: {:?}", command);
        self.tasks.retain(|task| !task.is_finished());

        match command {
            WorkerCommand::RequestPermissions => {
                let services = self.services.clone();
                let reporter = self.reporter.clone();
                self.start(Chain::Permissions, async move {
                    let outcome = services.permissions.request().await;
                    reporter.send(AppEvent::Permissions(outcome));
                });
            }
            WorkerCommand::Capture => {
                let services = self.services.clone();
                let config = self.config.clone();
                let sensor = self.sensor.clone();
                let reporter = self.reporter.clone();
                self.start(Chain::Capture, async move {
                    capture_chain(&services, &config, &sensor, &reporter).await;
                });
            }
            WorkerCommand::Preview => {
                let services = self.services.clone();
                let sensor = self.sensor.clone();
                let reporter = self.reporter.clone();
                self.start(Chain::Preview, async move {
                    preview_chain(&services, &sensor, &reporter).await;
                });
            }
            WorkerCommand::Submit { serial, customer } => {
                let services = self.services.clone();
                let config = self.config.clone();
                let reporter = self.reporter.clone();
                self.start(Chain::Submit, async move {
                    submit_chain(&services, &config, &reporter, serial, customer).await;
                });
            }
            WorkerCommand::StartPairing => {
                let Some(link) = self.services.link.clone() else {
                    debug!("Pairing disabled; ignoring StartPairing");
                    return true;
                };
                let reporter = self.reporter.clone();
                self.start(Chain::Pairing, async move {
                    pairing_chain(link.as_ref(), &reporter).await;
                });
            }
            WorkerCommand::Disconnect => {
                if let Some(link) = self.services.link.clone() {
                    let reporter = self.reporter.clone();
                    self.tasks.push(tokio::spawn(async move {
                        link.disconnect().await;
                        reporter.send(AppEvent::Peripheral(PeripheralEvent::Disconnected));
                    }));
                }
            }
            WorkerCommand::Shutdown => {
                self.shutdown().await;
                return false;
            }
        }
        true
    }

    /// True while a chain of this kind is running
    pub fn is_running(&self, chain: Chain) -> bool {
        self.in_flight.is_running(chain)
    }

    fn start<F>(&mut self, chain: Chain, work: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let Some(token) = self.in_flight.try_begin(chain) else {
            if chain == Chain::Preview {
                debug!("Preview frame still pending");
            } else {
                warn!("{:?} already in flight; rejecting", chain);
            }
            self.reporter.send(AppEvent::Rejected(chain));
            return;
        };
        self.tasks.push(tokio::spawn(async move {
            let _token = token;
            work.await;
        }));
    }

    /// Abort outstanding chains (this also stops a running scan) and
    /// release the peripheral
    async fn shutdown(&mut self) {
        info!("Worker shutting down");
        for task in self.tasks.drain(..) {
            task.abort();
            // wait for the task to be dropped so its guards run
            let _ = task.await;
        }
        if let Some(link) = &self.services.link {
            link.disconnect().await;
        }
    }
}

async fn capture_chain(
    services: &Services,
    config: &WorkerConfig,
    sensor: &tokio::sync::Mutex<()>,
    reporter: &Reporter,
) {
    let captured = {
        let _sensor = sensor.lock().await;
        services.camera.capture(config.capture_options).await
    };
    let image = match captured {
        Ok(image) => image,
        Err(e) => {
            reporter.fail(Failure::CaptureFailed(e.to_string()));
            return;
        }
    };
    reporter.send(AppEvent::Captured(image.clone()));

    let text = match services.recognizer.recognize(&image).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Text recognition failed: {}", e);
            reporter.fail(Failure::ExtractionFailed);
            return;
        }
    };

    match config.extractor.extract(&text) {
        Ok(serial) => {
            info!("Extracted serial {}", serial);
            reporter.send(AppEvent::SerialExtracted(serial));
        }
        Err(e) => {
            debug!("No serial in {:?}: {}", text.lines, e);
            reporter.fail(Failure::ExtractionFailed);
        }
    }
}

async fn preview_chain(
    services: &Services,
    sensor: &tokio::sync::Mutex<()>,
    reporter: &Reporter,
) {
    let Ok(_sensor) = sensor.try_lock() else {
        debug!("Sensor busy; skipping preview frame");
        return;
    };
    match services.camera.capture(CaptureOptions::preview()).await {
        Ok(frame) => reporter.send(AppEvent::PreviewFrame(frame)),
        Err(e) => debug!("Preview frame failed: {}", e),
    }
}

async fn submit_chain(
    services: &Services,
    config: &WorkerConfig,
    reporter: &Reporter,
    serial: SerialNumber,
    customer: String,
) {
    let receipt = match services.submitter.submit(&serial, &customer).await {
        Ok(receipt) => receipt,
        Err(e) => {
            reporter.fail(Failure::SubmissionFailed(e.to_string()));
            return;
        }
    };
    reporter.send(AppEvent::Submitted(receipt.clone()));

    // the credential only ever follows a resolved response
    let Some(link) = &services.link else {
        return;
    };
    if !link.is_connected().await {
        debug!("No peripheral connected; skipping credential write");
        return;
    }

    let payload = match protocol::credential_payload(&config.payload_source, &receipt) {
        Ok(payload) => payload,
        Err(e) => {
            reporter.fail(Failure::CredentialWriteFailed(e.to_string()));
            return;
        }
    };

    let text = String::from_utf8_lossy(&payload);
    let (_, skipped) = hid::keystrokes(&text);
    if !skipped.is_empty() {
        reporter.fail(Failure::UntypeableCredential(skipped));
    }
    debug!("Credential types as {} keyboard reports", hid::reports(&text).len());

    match link.write_credential(&payload).await {
        Ok(()) => reporter.send(AppEvent::CredentialSent),
        Err(e) => reporter.fail(Failure::CredentialWriteFailed(e.to_string())),
    }
}

async fn pairing_chain(link: &dyn CredentialLink, reporter: &Reporter) {
    if link.is_connected().await {
        debug!("Peripheral already connected");
        return;
    }

    reporter.send(AppEvent::Peripheral(PeripheralEvent::ScanStarted));
    let device = match link.scan().await {
        Ok(device) => device,
        Err(e) => {
            reporter.send(AppEvent::Peripheral(PeripheralEvent::ScanStopped));
            reporter.fail(Failure::ScanFailed(e.to_string()));
            return;
        }
    };
    reporter.send(AppEvent::DeviceFound(device.clone()));
    reporter.send(AppEvent::Peripheral(PeripheralEvent::ScanStopped));

    reporter.send(AppEvent::Peripheral(PeripheralEvent::Connecting));
    match link.connect(&device).await {
        Ok(()) => {
            reporter.send(AppEvent::Peripheral(PeripheralEvent::Connected));
            reporter.send(AppEvent::LogMessage(StatusMessage::new(
                format!("Connected to {}", device.name),
                MessageSeverity::Info,
            )));
        }
        Err(e) => {
            reporter.fail(Failure::ConnectFailed(e.to_string()));
            reporter.send(AppEvent::Peripheral(PeripheralEvent::Disconnected));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        CapturedImage, PermissionOutcome, RecognizedText, ScannedDevice, SubmissionReceipt,
    };
    use crate::domain::serial::SerialNormalization;
    use crate::infrastructure::bluetooth::BleError;
    use crate::infrastructure::camera::CaptureError;
    use crate::infrastructure::ocr::OcrError;
    use crate::infrastructure::process::ProcessError;
    use crate::infrastructure::webhook::WebhookError;
    use crate::presentation::controller::ScreenController;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    type Journal = Arc<Mutex<Vec<String>>>;

    fn note(journal: &Journal, entry: impl Into<String>) {
        journal.lock().unwrap().push(entry.into());
    }

    struct FakeCamera {
        fail: bool,
        calls: AtomicUsize,
        previews: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl Camera for FakeCamera {
        async fn capture(&self, options: CaptureOptions) -> Result<CapturedImage, CaptureError> {
            if options.preview {
                self.previews.fetch_add(1, Ordering::SeqCst);
                return Ok(CapturedImage::new("/tmp/serial-capture-preview.jpg"));
            }
            assert_eq!(options, CaptureOptions::still());
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                Err(CaptureError::Process(ProcessError::EmptyCommand))
            } else {
                Ok(CapturedImage::new("/tmp/serial-capture-test.jpg"))
            }
        }
    }

    struct FakeRecognizer {
        lines: Vec<&'static str>,
    }

    #[async_trait]
    impl TextRecognizer for FakeRecognizer {
        async fn recognize(&self, _image: &CapturedImage) -> Result<RecognizedText, OcrError> {
            Ok(RecognizedText::new(self.lines.iter().copied()))
        }
    }

    struct FakeSubmitter {
        response: Option<SubmissionReceipt>,
        calls: Mutex<Vec<(String, String)>>,
        journal: Journal,
    }

    #[async_trait]
    impl Submitter for FakeSubmitter {
        async fn submit(
            &self,
            serial: &SerialNumber,
            customer: &str,
        ) -> Result<SubmissionReceipt, WebhookError> {
            self.calls
                .lock()
                .unwrap()
                .push((serial.to_string(), customer.to_string()));
            tokio::time::sleep(Duration::from_millis(10)).await;
            note(&self.journal, "responded");
            self.response.clone().ok_or(WebhookError::Timeout)
        }
    }

    struct FakePermissions(PermissionOutcome);

    #[async_trait]
    impl PermissionGateway for FakePermissions {
        async fn request(&self) -> PermissionOutcome {
            self.0
        }
    }

    struct FakeLink {
        connected: AtomicBool,
        finds_device: bool,
        writes: Mutex<Vec<Vec<u8>>>,
        write_gate: Option<Arc<Notify>>,
        journal: Journal,
    }

    fn device() -> ScannedDevice {
        ScannedDevice {
            name: "ESP32 Keyboard".to_string(),
            id: "AA:BB".to_string(),
            signal_strength: Some(-55),
        }
    }

    #[async_trait]
    impl CredentialLink for FakeLink {
        async fn scan(&self) -> Result<ScannedDevice, BleError> {
            if self.finds_device {
                Ok(device())
            } else {
                Err(BleError::NotFound("ESP32".to_string()))
            }
        }

        async fn connect(&self, _device: &ScannedDevice) -> Result<(), BleError> {
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn write_credential(&self, payload: &[u8]) -> Result<(), BleError> {
            if let Some(gate) = &self.write_gate {
                gate.notified().await;
            }
            note(&self.journal, "write");
            self.writes.lock().unwrap().push(payload.to_vec());
            Ok(())
        }

        async fn disconnect(&self) {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    struct Harness {
        worker: Worker,
        events: mpsc::UnboundedReceiver<AppEvent>,
        camera: Arc<FakeCamera>,
        submitter: Arc<FakeSubmitter>,
        link: Arc<FakeLink>,
        journal: Journal,
    }

    struct Setup {
        camera_fails: bool,
        camera_gate: Option<Arc<Notify>>,
        lines: Vec<&'static str>,
        response: Option<SubmissionReceipt>,
        connected: bool,
        finds_device: bool,
        write_gate: Option<Arc<Notify>>,
        normalization: SerialNormalization,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                camera_fails: false,
                camera_gate: None,
                lines: vec!["Model X200", "SN: 5CG1234567", "Other"],
                response: Some(SubmissionReceipt {
                    password: Some("hunter2".to_string()),
                }),
                connected: false,
                finds_device: true,
                write_gate: None,
                normalization: SerialNormalization::Preserve,
            }
        }
    }

    fn harness(setup: Setup) -> Harness {
        let journal: Journal = Arc::default();
        let camera = Arc::new(FakeCamera {
            fail: setup.camera_fails,
            calls: AtomicUsize::new(0),
            previews: AtomicUsize::new(0),
            gate: setup.camera_gate,
        });
        let submitter = Arc::new(FakeSubmitter {
            response: setup.response,
            calls: Mutex::new(Vec::new()),
            journal: journal.clone(),
        });
        let link = Arc::new(FakeLink {
            connected: AtomicBool::new(setup.connected),
            finds_device: setup.finds_device,
            writes: Mutex::new(Vec::new()),
            write_gate: setup.write_gate,
            journal: journal.clone(),
        });
        let services = Services {
            camera: camera.clone(),
            recognizer: Arc::new(FakeRecognizer { lines: setup.lines }),
            submitter: submitter.clone(),
            permissions: Arc::new(FakePermissions(PermissionOutcome {
                camera: true,
                bluetooth: None,
            })),
            link: Some(link.clone()),
        };
        let config = WorkerConfig {
            extractor: SerialExtractor::new(setup.normalization),
            ..WorkerConfig::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        Harness {
            worker: Worker::new(services, config, tx),
            events: rx,
            camera,
            submitter,
            link,
            journal,
        }
    }

    /// Collect events until `last` matches or a second passes
    async fn collect_until(
        events: &mut mpsc::UnboundedReceiver<AppEvent>,
        last: impl Fn(&AppEvent) -> bool,
    ) -> Vec<AppEvent> {
        let mut seen = Vec::new();
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(1), events.recv()).await
        {
            let done = last(&event);
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    }

    fn serial(value: &str) -> SerialNumber {
        SerialExtractor::default()
            .extract(&RecognizedText::new([format!("SN: {}", value)]))
            .unwrap()
    }

    #[tokio::test]
    async fn test_capture_extracts_serial() {
        let mut h = harness(Setup::default());
        h.worker.handle(WorkerCommand::Capture).await;

        let events = collect_until(&mut h.events, |e| {
            matches!(e, AppEvent::SerialExtracted(_) | AppEvent::Failed(_))
        })
        .await;
        assert!(matches!(events[0], AppEvent::Captured(_)));
        assert_eq!(events[1], AppEvent::SerialExtracted(serial("5CG1234567")));
    }

    #[tokio::test]
    async fn test_capture_without_marker_fails_extraction() {
        let mut h = harness(Setup {
            lines: vec!["No serial here"],
            ..Setup::default()
        });
        h.worker.handle(WorkerCommand::Capture).await;

        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::Failed(_))).await;
        assert_eq!(
            events.last(),
            Some(&AppEvent::Failed(Failure::ExtractionFailed))
        );
    }

    #[tokio::test]
    async fn test_capture_normalizes_when_enabled() {
        let mut h = harness(Setup {
            lines: vec!["SN: SCG1234567"],
            normalization: SerialNormalization::LeadingSToFive,
            ..Setup::default()
        });
        h.worker.handle(WorkerCommand::Capture).await;

        let events =
            collect_until(&mut h.events, |e| matches!(e, AppEvent::SerialExtracted(_))).await;
        assert_eq!(
            events.last(),
            Some(&AppEvent::SerialExtracted(serial("5CG1234567")))
        );
    }

    #[tokio::test]
    async fn test_camera_failure_is_reported() {
        let mut h = harness(Setup {
            camera_fails: true,
            ..Setup::default()
        });
        h.worker.handle(WorkerCommand::Capture).await;

        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::Failed(_))).await;
        assert!(matches!(
            events.last(),
            Some(AppEvent::Failed(Failure::CaptureFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_second_capture_while_in_flight_is_rejected() {
        let gate = Arc::new(Notify::new());
        let mut h = harness(Setup {
            camera_gate: Some(gate.clone()),
            ..Setup::default()
        });

        h.worker.handle(WorkerCommand::Capture).await;
        tokio::task::yield_now().await;
        assert!(h.worker.is_running(Chain::Capture));
        h.worker.handle(WorkerCommand::Capture).await;
        assert_eq!(
            h.events.try_recv().ok(),
            Some(AppEvent::Rejected(Chain::Capture))
        );

        gate.notify_one();
        collect_until(&mut h.events, |e| matches!(e, AppEvent::SerialExtracted(_))).await;
        assert_eq!(h.camera.calls.load(Ordering::SeqCst), 1);

        // the token is released once the chain finishes
        tokio::task::yield_now().await;
        assert!(!h.worker.is_running(Chain::Capture));
    }

    #[tokio::test]
    async fn test_preview_frame_is_reported() {
        let mut h = harness(Setup::default());
        h.worker.handle(WorkerCommand::Preview).await;

        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::PreviewFrame(_))).await;
        assert!(matches!(events.last(), Some(AppEvent::PreviewFrame(_))));
        assert_eq!(h.camera.previews.load(Ordering::SeqCst), 1);
        assert_eq!(h.camera.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preview_skipped_while_still_is_taken() {
        let gate = Arc::new(Notify::new());
        let mut h = harness(Setup {
            camera_gate: Some(gate.clone()),
            ..Setup::default()
        });

        h.worker.handle(WorkerCommand::Capture).await;
        tokio::task::yield_now().await;
        h.worker.handle(WorkerCommand::Preview).await;
        tokio::task::yield_now().await;
        assert!(!h.worker.is_running(Chain::Preview));
        assert_eq!(h.camera.previews.load(Ordering::SeqCst), 0);

        gate.notify_one();
        let events =
            collect_until(&mut h.events, |e| matches!(e, AppEvent::SerialExtracted(_))).await;
        assert!(!events.iter().any(|e| matches!(e, AppEvent::PreviewFrame(_))));
    }

    #[test]
    fn test_startup_failure_resolves_permissions() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        report_startup_failure(&tx);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(
            events.first(),
            Some(AppEvent::LogMessage(message)) if message.severity == MessageSeverity::Error
        ));
        assert_eq!(
            events.last(),
            Some(&AppEvent::Permissions(PermissionOutcome {
                camera: false,
                bluetooth: None,
            }))
        );
    }

    #[tokio::test]
    async fn test_submit_sends_one_call_without_peripheral() {
        let mut h = harness(Setup::default());
        h.worker
            .handle(WorkerCommand::Submit {
                serial: serial("5CG1234567"),
                customer: "ACME42".to_string(),
            })
            .await;

        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::Submitted(_))).await;
        assert!(matches!(events.last(), Some(AppEvent::Submitted(_))));
        assert_eq!(
            *h.submitter.calls.lock().unwrap(),
            vec![("5CG1234567".to_string(), "ACME42".to_string())]
        );
        assert!(h.link.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_credential_written_after_response() {
        let mut h = harness(Setup {
            connected: true,
            ..Setup::default()
        });
        h.worker
            .handle(WorkerCommand::Submit {
                serial: serial("5CG1234567"),
                customer: "ACME42".to_string(),
            })
            .await;

        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::CredentialSent)).await;
        assert!(matches!(events[0], AppEvent::Submitted(_)));
        assert_eq!(events.last(), Some(&AppEvent::CredentialSent));
        assert_eq!(*h.journal.lock().unwrap(), vec!["responded", "write"]);
        assert_eq!(*h.link.writes.lock().unwrap(), vec![b"hunter2".to_vec()]);
    }

    #[tokio::test]
    async fn test_no_write_when_submission_fails() {
        let mut h = harness(Setup {
            connected: true,
            response: None,
            ..Setup::default()
        });
        h.worker
            .handle(WorkerCommand::Submit {
                serial: serial("5CG1234567"),
                customer: "ACME42".to_string(),
            })
            .await;

        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::Failed(_))).await;
        assert!(matches!(
            events.last(),
            Some(AppEvent::Failed(Failure::SubmissionFailed(_)))
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.link.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resubmit_during_credential_write_is_resolved() {
        let now = std::time::Instant::now();
        let gate = Arc::new(Notify::new());
        let mut h = harness(Setup {
            connected: true,
            write_gate: Some(gate.clone()),
            ..Setup::default()
        });
        let (commands_tx, mut commands) = mpsc::unbounded_channel();
        let mut screen =
            ScreenController::new(commands_tx, Duration::from_secs(3), Duration::ZERO, true);

        screen.handle_event(
            AppEvent::Permissions(PermissionOutcome {
                camera: true,
                bluetooth: None,
            }),
            now,
        );
        screen.capture();
        screen.handle_event(
            AppEvent::Captured(CapturedImage::new("/tmp/no-such-capture.jpg")),
            now,
        );
        screen.handle_event(AppEvent::SerialExtracted(serial("5CG1234567")), now);
        if let Some(customer) = screen.customer_mut() {
            customer.push_str("ACME42");
        }
        while commands.try_recv().is_ok() {}

        // first submission: response arrives, credential write is held open
        screen.submit(now);
        let command = commands.try_recv().unwrap();
        h.worker.handle(command).await;
        for event in collect_until(&mut h.events, |e| matches!(e, AppEvent::Submitted(_))).await {
            screen.handle_event(event, now);
        }
        assert_eq!(screen.screen().state().name(), "submitted");
        assert!(h.worker.is_running(Chain::Submit));

        // second press while the write is still pending
        screen.submit(now);
        assert_eq!(screen.screen().state().name(), "submitting");
        let command = commands.try_recv().unwrap();
        h.worker.handle(command).await;
        for event in collect_until(&mut h.events, |e| matches!(e, AppEvent::Rejected(_))).await {
            screen.handle_event(event, now);
        }
        assert_eq!(screen.screen().state().name(), "captured");
        assert_eq!(
            screen.notices().current().map(|m| m.message.as_str()),
            Some(crate::domain::notice::SUBMIT_BUSY)
        );

        gate.notify_one();
        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::CredentialSent)).await;
        assert_eq!(events.last(), Some(&AppEvent::CredentialSent));
        assert_eq!(h.submitter.calls.lock().unwrap().len(), 1);

        // once the chain is done a new submission goes through
        tokio::task::yield_now().await;
        screen.submit(now);
        let command = commands.try_recv().unwrap();
        h.worker.handle(command).await;
        collect_until(&mut h.events, |e| matches!(e, AppEvent::Submitted(_))).await;
        assert_eq!(h.submitter.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_untypeable_credential_is_reported_and_still_written() {
        let mut h = harness(Setup {
            connected: true,
            response: Some(SubmissionReceipt {
                password: Some("pä55".to_string()),
            }),
            ..Setup::default()
        });
        h.worker
            .handle(WorkerCommand::Submit {
                serial: serial("5CG1234567"),
                customer: "ACME42".to_string(),
            })
            .await;

        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::CredentialSent)).await;
        assert!(events.contains(&AppEvent::Failed(Failure::UntypeableCredential(vec!['ä']))));
        assert_eq!(events.last(), Some(&AppEvent::CredentialSent));
    }

    #[tokio::test]
    async fn test_pairing_lifecycle() {
        let mut h = harness(Setup::default());
        h.worker.handle(WorkerCommand::StartPairing).await;

        let events = collect_until(&mut h.events, |e| {
            matches!(e, AppEvent::Peripheral(PeripheralEvent::Connected))
        })
        .await;
        assert_eq!(
            events,
            vec![
                AppEvent::Peripheral(PeripheralEvent::ScanStarted),
                AppEvent::DeviceFound(device()),
                AppEvent::Peripheral(PeripheralEvent::ScanStopped),
                AppEvent::Peripheral(PeripheralEvent::Connecting),
                AppEvent::Peripheral(PeripheralEvent::Connected),
            ]
        );
        assert!(h.link.is_connected().await);
    }

    #[tokio::test]
    async fn test_scan_failure_is_silent_failure() {
        let mut h = harness(Setup {
            finds_device: false,
            ..Setup::default()
        });
        h.worker.handle(WorkerCommand::StartPairing).await;

        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::Failed(_))).await;
        assert!(events.contains(&AppEvent::Peripheral(PeripheralEvent::ScanStopped)));
        assert!(matches!(
            events.last(),
            Some(AppEvent::Failed(Failure::ScanFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_permissions_are_reported() {
        let mut h = harness(Setup::default());
        h.worker.handle(WorkerCommand::RequestPermissions).await;

        let events = collect_until(&mut h.events, |e| matches!(e, AppEvent::Permissions(_))).await;
        assert_eq!(
            events.last(),
            Some(&AppEvent::Permissions(PermissionOutcome {
                camera: true,
                bluetooth: None,
            }))
        );
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings {
            serial_normalization: SerialNormalization::LeadingSToFive,
            ..Settings::default()
        };
        let config = WorkerConfig::from_settings(&settings);
        let serial = config
            .extractor
            .extract(&RecognizedText::new(["SN: SCG1234567"]))
            .unwrap();
        assert_eq!(serial.as_str(), "5CG1234567");
        assert_eq!(config.payload_source, PayloadSource::ResponsePassword);
    }

    #[tokio::test]
    async fn test_pairing_disabled_has_no_link() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let services = Services::from_settings(&Settings::default(), tx);
        assert!(services.link.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_aborts_chains_and_disconnects() {
        let gate = Arc::new(Notify::new());
        let mut h = harness(Setup {
            camera_gate: Some(gate),
            connected: true,
            ..Setup::default()
        });
        h.worker.handle(WorkerCommand::Capture).await;
        tokio::task::yield_now().await;

        assert!(!h.worker.handle(WorkerCommand::Shutdown).await);
        assert!(!h.link.is_connected().await);
        assert!(!h.worker.is_running(Chain::Capture));
    }
}
