//! Shared test utilities
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use image::{DynamicImage, RgbImage};
use tokio::sync::oneshot;
use url::Url;

use visionspeak::{CapturedImage, Error, NormalizedImage, Orientation, Recognizer, SpeechEngine};

/// One multipart part as the mock server saw it
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: String,
    delay: Duration,
    uploads: Arc<Mutex<Vec<Upload>>>,
}

/// Running mock OCR endpoint
pub struct OcrMock {
    pub addr: SocketAddr,
    pub uploads: Arc<Mutex<Vec<Upload>>>,
}

impl OcrMock {
    pub fn endpoint(&self) -> Url {
        Url::parse(&format!("http://{}/ocr", self.addr)).unwrap()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

async fn ocr_handler(State(state): State<MockState>, mut multipart: Multipart) -> (StatusCode, String) {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let upload = Upload {
            field: field.name().map(str::to_string),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            bytes: field.bytes().await.unwrap().to_vec(),
        };
        state.uploads.lock().unwrap().push(upload);
    }

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, state.body)
}

/// Spawn a mock OCR endpoint answering every upload with `status` and `body`
pub async fn spawn_ocr_mock_with(status: StatusCode, body: &str, delay: Duration) -> OcrMock {
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        status,
        body: body.to_string(),
        delay,
        uploads: Arc::clone(&uploads),
    };

    let router = Router::new()
        .route("/ocr", post(ocr_handler))
        .layer(DefaultBodyLimit::disable())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    OcrMock { addr, uploads }
}

/// Spawn a mock OCR endpoint replying 200 with `body`
pub async fn spawn_ocr_mock(body: &str) -> OcrMock {
    spawn_ocr_mock_with(StatusCode::OK, body, Duration::ZERO).await
}

/// A local address nothing is listening on
pub fn refused_endpoint() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/ocr")).unwrap()
}

/// Solid-color capture
pub fn capture(width: u32, height: u32, orientation: Orientation) -> CapturedImage {
    CapturedImage::new(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 180, 40]))),
        orientation,
    )
}

/// JPEG-encoded capture carrying an EXIF orientation tag (0x0112)
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let mut encoded = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([90, 90, 90])))
        .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Jpeg)
        .unwrap();

    // Big-endian TIFF header, one IFD with a single SHORT entry, no next IFD
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2a");
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0112u16.to_be_bytes());
    tiff.extend_from_slice(&3u16.to_be_bytes());
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes());

    let mut app1 = b"Exif\x00\x00".to_vec();
    app1.extend_from_slice(&tiff);
    let segment_len = u16::try_from(app1.len() + 2).unwrap();

    // Insert APP1 right after SOI
    let mut bytes = encoded[..2].to_vec();
    bytes.extend_from_slice(&[0xFF, 0xE1]);
    bytes.extend_from_slice(&segment_len.to_be_bytes());
    bytes.extend_from_slice(&app1);
    bytes.extend_from_slice(&encoded[2..]);
    bytes
}

/// Speech engine that records what it was asked to do
#[derive(Clone, Default)]
pub struct RecordingSpeech {
    spoken: Arc<Mutex<Vec<String>>>,
    stops: Arc<Mutex<usize>>,
    busy: Arc<Mutex<bool>>,
}

impl RecordingSpeech {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        *self.stops.lock().unwrap()
    }

    /// Simulate the utterance running to completion
    pub fn finish(&self) {
        *self.busy.lock().unwrap() = false;
    }
}

impl SpeechEngine for RecordingSpeech {
    fn speak(&mut self, text: &str, flush_queue_first: bool) {
        assert!(flush_queue_first, "narration must flush before speaking");
        self.spoken.lock().unwrap().push(text.to_string());
        *self.busy.lock().unwrap() = true;
    }

    fn stop(&mut self) {
        *self.stops.lock().unwrap() += 1;
        *self.busy.lock().unwrap() = false;
    }

    fn is_speaking(&self) -> bool {
        *self.busy.lock().unwrap()
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

type Reply = visionspeak::Result<String>;

/// Recognizer whose replies are released by the test
///
/// Replies are keyed by normalized width so task scheduling order does not matter.
#[derive(Default)]
pub struct ScriptedRecognizer {
    replies: Mutex<HashMap<u32, oneshot::Receiver<Reply>>>,
}

impl ScriptedRecognizer {
    /// Register a reply for images normalized to `width`; send on the returned handle to release it
    pub fn script(&self, width: u32) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().insert(width, rx);
        tx
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(&self, image: NormalizedImage) -> Reply {
        let reply = self.replies.lock().unwrap().remove(&image.width());
        match reply {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(Error::NetworkError("reply dropped".to_string()))),
            None => Err(Error::NetworkError(format!(
                "no reply scripted for width {}",
                image.width()
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
