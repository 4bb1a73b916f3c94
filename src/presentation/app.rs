use crate::domain::models::{AppEvent, WorkerCommand};
use crate::domain::settings::SettingsService;
use crate::infrastructure::logging::LoggingGuard;
use crate::infrastructure::worker;
use crate::presentation::controller::ScreenController;
use crate::presentation::views;
use eframe::egui;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info};

/// How often the UI checks for worker events while idle
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct SerialCaptureApp {
    // Services
    pub(crate) settings: SettingsService,

    // Worker
    pub(crate) controller: ScreenController,
    pub(crate) events_rx: mpsc::UnboundedReceiver<AppEvent>,
    worker_thread: Option<std::thread::JoinHandle<()>>,

    // UI State
    pub(crate) show_settings: bool,

    // Logging guard
    _logging_guard: Option<LoggingGuard>,
}

impl SerialCaptureApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: SettingsService,
        logging_guard: Option<LoggingGuard>,
    ) -> anyhow::Result<Self> {
        crate::presentation::theme::configure(&cc.egui_ctx);
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel::<WorkerCommand>();

        let current = settings.get().clone();
        let worker_thread = worker::spawn(current.clone(), events_tx, commands_rx)?;

        let mut controller = ScreenController::new(
            commands_tx,
            Duration::from_millis(current.notice_duration_ms),
            Duration::from_millis(current.preview_interval_ms),
            current.pairing_enabled,
        );
        controller.mount();

        Ok(Self {
            settings,
            controller,
            events_rx,
            worker_thread: Some(worker_thread),
            show_settings: false,
            _logging_guard: logging_guard,
        })
    }
}

impl eframe::App for SerialCaptureApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        while let Ok(event) = self.events_rx.try_recv() {
            self.controller.handle_event(event, now);
        }
        let notice_remaining = self.controller.tick(now);
        self.controller.refresh_preview(now);
        for uri in self.controller.take_stale_images() {
            ctx.forget_image(&uri);
        }

        views::render(self, ctx, now);

        let next = notice_remaining.map_or(POLL_INTERVAL, |left| left.min(POLL_INTERVAL));
        ctx.request_repaint_after(next);
    }
}

impl Drop for SerialCaptureApp {
    fn drop(&mut self) {
        info!("Closing screen");
        self.controller.shutdown();
        if let Some(handle) = self.worker_thread.take() {
            if handle.join().is_err() {
                error!("Worker thread panicked");
            }
        }
    }
}
