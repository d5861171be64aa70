//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};

use printlayers::export::{ExportArtifact, ExportSink};
use printlayers::notify::{Notification, NotificationLevel, Notifier};
use printlayers::processing::ProgressObserver;
use printlayers::remote::{ProcessRequest, ProcessingService, ServiceResponse};
use printlayers::session::UploadedFile;
use printlayers::{ClientConfig, Result, SessionController};

pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 6;

/// PNG bytes of an opaque colored band on a transparent background
pub fn band_png(band: u32, color: [u8; 3]) -> Vec<u8> {
    let mut img = RgbaImage::new(WIDTH, HEIGHT);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if x / 2 == band % (WIDTH / 2) {
                img.put_pixel(x, y, Rgba([color[0], color[1], color[2], 255]));
            }
        }
    }
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn source_png() -> Vec<u8> {
    band_png(0, [128, 128, 128])
}

pub fn image_file() -> UploadedFile {
    UploadedFile::new("poster.png", "image/png", source_png())
}

/// Wire layer JSON for the given server layer numbers
pub fn wire_layers(numbers: &[u32]) -> Value {
    let colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 0]];
    Value::Array(
        numbers
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let color = colors[i % colors.len()];
                json!({
                    "layer_number": n,
                    "color_hex": format!("{:02x}{:02x}{:02x}", color[0], color[1], color[2]),
                    "image_base64": STANDARD.encode(band_png(i as u32, color)),
                })
            })
            .collect(),
    )
}

pub fn success_body(numbers: &[u32], bundle: bool) -> String {
    let mut body = json!({
        "status": "success",
        "file_id": "f-42",
        "results": [ { "layers": wire_layers(numbers) } ],
    });
    if bundle {
        body["download_url"] = json!("/api/image/download/f-42");
    }
    body.to_string()
}

/// Processing service returning queued responses and recording requests
#[derive(Default)]
pub struct FakeService {
    responses: Mutex<Vec<ServiceResponse>>,
    pub requests: Mutex<Vec<ProcessRequest>>,
    pub delay: Duration,
    pub healthy: bool,
}

impl FakeService {
    pub fn with_responses(responses: Vec<ServiceResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            healthy: true,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessingService for FakeService {
    async fn process(&self, request: &ProcessRequest) -> Result<ServiceResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut responses = self.responses.lock().unwrap();
        Ok(if responses.is_empty() {
            ServiceResponse::new(503, r#"{"detail":"no canned response"}"#)
        } else {
            responses.remove(0)
        })
    }

    async fn health(&self) -> bool {
        self.healthy
    }
}

/// Sink that keeps every delivered artifact with its delivery time
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<(Instant, ExportArtifact)>>,
}

impl RecordingSink {
    pub fn names(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, a)| a.file_name().to_string())
            .collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.delivered.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl ExportSink for RecordingSink {
    async fn deliver(&self, artifact: ExportArtifact) -> Result<()> {
        self.delivered.lock().unwrap().push((Instant::now(), artifact));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.level == NotificationLevel::Error)
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub updates: Mutex<Vec<u8>>,
    pub hidden: Mutex<usize>,
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&self, percent: u8) {
        self.updates.lock().unwrap().push(percent);
    }

    fn on_hidden(&self) {
        *self.hidden.lock().unwrap() += 1;
    }
}

pub struct Harness {
    pub controller: SessionController,
    pub service: Arc<FakeService>,
    pub sink: Arc<RecordingSink>,
    pub notifier: Arc<RecordingNotifier>,
    pub progress: Arc<RecordingProgress>,
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        progress_tick_ms: 10,
        progress_hide_delay_ms: 50,
        export_stagger_ms: 40,
        ..ClientConfig::default()
    }
}

pub fn harness(service: FakeService) -> Harness {
    harness_with_config(service, &test_config())
}

pub fn harness_with_config(service: FakeService, config: &ClientConfig) -> Harness {
    let service = Arc::new(service);
    let sink = Arc::new(RecordingSink::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let progress = Arc::new(RecordingProgress::default());
    let controller = SessionController::new(service.clone(), sink.clone(), config)
        .with_notifier(notifier.clone())
        .with_progress_observer(progress.clone());
    Harness {
        controller,
        service,
        sink,
        notifier,
        progress,
    }
}
