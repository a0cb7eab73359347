//! Everything that talks to the analysis backend: payload assembly,
//! response validation, and the landing slots the UI polls.
//!
//! All calls go through `ehttp`, so nothing here ever blocks the UI
//! thread. Responses are validated against an explicit schema at this
//! boundary; a malformed body is reported as a backend error instead of
//! leaking undefined fields into the pages.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::geometry::{ImagePoint, SelectionRect};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The server was unreachable or the transfer failed.
    #[error("request failed: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The body did not match the expected schema.
    #[error("malformed response: {0}")]
    Schema(String),
}

/// Base URLs of the four backend services, persisted with the app state.
/// The defaults match the development setup of the original services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub detect_base: String,
    pub live_base: String,
    pub palette_base: String,
    pub simulate_base: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            detect_base: "http://localhost:5000".to_owned(),
            live_base: "http://127.0.0.1:5000".to_owned(),
            palette_base: "http://localhost:5003".to_owned(),
            simulate_base: "http://localhost:5000".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response shapes

/// Point-sample result for an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColorReport {
    pub color_name: String,
    // u8 enforces the 0..=255 range during deserialization
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub hex: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Point-sample result against the live camera session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LiveColorReport {
    pub name: String,
    pub hex: String,
    pub rgb: Rgb,
}

/// One entry of an extracted palette; `proportion` is a fraction of the
/// selected region in `[0, 1]`. Display order is whatever the server sent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaletteEntry {
    pub color: String,
    pub proportion: f64,
}

/// Colorblindness simulation result. The image fields are paths relative
/// to the simulation service base URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub original_image: String,
    pub simulations: BTreeMap<String, String>,
    pub dominant_colors: Vec<String>,
    pub suggested_colors: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    image_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Parses a `#rrggbb` color string.
pub fn parse_hex_rgb(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(digits.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(digits.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(digits.get(4..6)?, 16).ok()?;
    Some([r, g, b])
}

fn require_hex(hex: &str) -> Result<(), BackendError> {
    if parse_hex_rgb(hex).is_some() {
        Ok(())
    } else {
        Err(BackendError::Schema(format!("not a #rrggbb color: {hex:?}")))
    }
}

impl ColorReport {
    fn validated(self) -> Result<Self, BackendError> {
        require_hex(&self.hex)?;
        Ok(self)
    }
}

impl LiveColorReport {
    fn validated(self) -> Result<Self, BackendError> {
        require_hex(&self.hex)?;
        Ok(self)
    }
}

impl PaletteEntry {
    fn validated(self) -> Result<Self, BackendError> {
        require_hex(&self.color)?;
        if !(0.0..=1.0).contains(&self.proportion) {
            return Err(BackendError::Schema(format!(
                "proportion {} outside [0, 1]",
                self.proportion
            )));
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Response slots

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug)]
struct SlotInner<T> {
    latest: u64,
    pending: bool,
    ready: Option<Result<T, BackendError>>,
}

/// Landing slot for one logical request stream, polled by the UI each
/// frame. Every `begin` hands out a ticket with a fresh sequence number
/// and only the latest ticket may fulfill the slot, so a slow response
/// from a superseded request is dropped instead of clobbering newer data.
#[derive(Debug)]
pub struct ResponseSlot<T> {
    inner: Arc<Mutex<SlotInner<T>>>,
}

impl<T> Default for ResponseSlot<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotInner {
                latest: 0,
                pending: false,
                ready: None,
            })),
        }
    }
}

impl<T> ResponseSlot<T> {
    pub fn begin(&self) -> SlotTicket<T> {
        let mut inner = lock_or_recover(&self.inner);
        inner.latest += 1;
        inner.pending = true;
        SlotTicket {
            inner: Arc::clone(&self.inner),
            seq: inner.latest,
        }
    }

    /// Takes the result of the most recent request, if it has arrived.
    pub fn take(&self) -> Option<Result<T, BackendError>> {
        lock_or_recover(&self.inner).ready.take()
    }

    pub fn pending(&self) -> bool {
        lock_or_recover(&self.inner).pending
    }
}

pub struct SlotTicket<T> {
    inner: Arc<Mutex<SlotInner<T>>>,
    seq: u64,
}

impl<T> SlotTicket<T> {
    pub fn fulfill(self, result: Result<T, BackendError>) {
        let mut inner = lock_or_recover(&self.inner);
        if inner.latest == self.seq {
            inner.ready = Some(result);
            inner.pending = false;
        } else {
            log::debug!(
                "dropping response for superseded request (seq {} < {})",
                self.seq,
                inner.latest
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Multipart bodies

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Minimal `multipart/form-data` encoder; `ehttp` carries raw bodies.
pub struct Multipart {
    boundary: String,
    buf: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let n = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::with_boundary(format!("chroma-lens-{nanos:x}-{n}"))
    }

    pub fn with_boundary(boundary: String) -> Self {
        Self {
            boundary,
            buf: Vec::new(),
        }
    }

    pub fn text(&mut self, name: &str, value: &str) {
        self.buf.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.buf.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }

    pub fn file(&mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) {
        self.buf.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.buf.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        self.buf
            .extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        self.buf.extend_from_slice(bytes);
        self.buf.extend_from_slice(b"\r\n");
    }

    /// Returns the `Content-Type` header value and the finished body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.buf.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.buf,
        )
    }
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

/// Content type for an upload, by file extension.
fn content_type_for(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Requests

fn dispatch<T, F>(request: ehttp::Request, ticket: SlotTicket<T>, ctx: &egui::Context, parse: F)
where
    T: Send + 'static,
    F: FnOnce(&ehttp::Response) -> Result<T, BackendError> + Send + 'static,
{
    let ctx = ctx.clone();
    ehttp::fetch(request, move |result| {
        let outcome = result
            .map_err(BackendError::Transport)
            .and_then(|response| parse(&response));
        if let Err(err) = &outcome {
            log::warn!("backend call failed: {err}");
        }
        ticket.fulfill(outcome);
        ctx.request_repaint();
    });
}

/// Checks the status line, then deserializes the body. Error bodies carry
/// `{"error": "..."}`; fall back to the status text when they don't.
fn parse_json<T: DeserializeOwned>(response: &ehttp::Response) -> Result<T, BackendError> {
    if !response.ok {
        let message = serde_json::from_slice::<ErrorBody>(&response.bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| response.status_text.clone());
        return Err(BackendError::Status {
            status: response.status,
            message,
        });
    }
    serde_json::from_slice(&response.bytes).map_err(|err| BackendError::Schema(err.to_string()))
}

fn post_json(url: String, body: Vec<u8>) -> ehttp::Request {
    let mut request = ehttp::Request::post(url, body);
    request.headers =
        ehttp::Headers::new(&[("Accept", "*/*"), ("Content-Type", "application/json")]);
    request
}

fn post_multipart(url: String, parts: Multipart) -> ehttp::Request {
    let (content_type, body) = parts.finish();
    let mut request = ehttp::Request::post(url, body);
    request.headers =
        ehttp::Headers::new(&[("Accept", "*/*"), ("Content-Type", content_type.as_str())]);
    request
}

/// `POST /upload`: one binary field, returns the id used for point queries.
pub fn upload_media(
    config: &BackendConfig,
    bytes: Vec<u8>,
    filename: &str,
    slot: &ResponseSlot<String>,
    ctx: &egui::Context,
) {
    let mut parts = Multipart::new();
    parts.file("media", filename, content_type_for(filename), &bytes);
    let request = post_multipart(format!("{}/upload", config.detect_base), parts);
    dispatch(request, slot.begin(), ctx, |response| {
        parse_json::<UploadResponse>(response).map(|body| body.image_id)
    });
}

/// `GET /detect/{id}/{x}/{y}`: samples one pixel of an uploaded image.
pub fn detect_at(
    config: &BackendConfig,
    image_id: &str,
    point: ImagePoint,
    slot: &ResponseSlot<ColorReport>,
    ctx: &egui::Context,
) {
    let url = format!(
        "{}/detect/{}/{}/{}",
        config.detect_base, image_id, point.x, point.y
    );
    dispatch(ehttp::Request::get(url), slot.begin(), ctx, |response| {
        parse_json::<ColorReport>(response).and_then(ColorReport::validated)
    });
}

/// `GET /health`: availability probe for the live service.
pub fn probe_health(config: &BackendConfig, slot: &ResponseSlot<()>, ctx: &egui::Context) {
    let url = format!("{}/health", config.live_base);
    dispatch(ehttp::Request::get(url), slot.begin(), ctx, |response| {
        if response.ok {
            Ok(())
        } else {
            Err(BackendError::Status {
                status: response.status,
                message: response.status_text.clone(),
            })
        }
    });
}

/// `POST /setup`: acquires the server-side camera session.
pub fn start_session(config: &BackendConfig, slot: &ResponseSlot<String>, ctx: &egui::Context) {
    let request = post_json(format!("{}/setup", config.live_base), Vec::new());
    dispatch(request, slot.begin(), ctx, |response| {
        parse_json::<StatusResponse>(response).map(|body| body.status)
    });
}

/// `POST /teardown`: releases the server-side camera session. Must be
/// called on page stop and on application exit.
pub fn stop_session(config: &BackendConfig, slot: &ResponseSlot<String>, ctx: &egui::Context) {
    let request = post_json(format!("{}/teardown", config.live_base), Vec::new());
    dispatch(request, slot.begin(), ctx, |response| {
        parse_json::<StatusResponse>(response).map(|body| body.status)
    });
}

#[derive(Debug, Serialize)]
struct LivePointBody {
    x: i32,
    y: i32,
}

/// `POST /live_color_data`: samples a pixel of the current camera frame.
pub fn live_sample(
    config: &BackendConfig,
    point: ImagePoint,
    slot: &ResponseSlot<LiveColorReport>,
    ctx: &egui::Context,
) {
    let body = serde_json::to_vec(&LivePointBody {
        x: point.x,
        y: point.y,
    })
    .unwrap_or_default();
    let request = post_json(format!("{}/live_color_data", config.live_base), body);
    dispatch(request, slot.begin(), ctx, |response| {
        parse_json::<LiveColorReport>(response).and_then(LiveColorReport::validated)
    });
}

/// `POST /extract_palette`: the image bytes plus the normalized selection
/// rectangle as integer form fields.
pub fn extract_palette(
    config: &BackendConfig,
    bytes: Vec<u8>,
    filename: &str,
    region: SelectionRect,
    slot: &ResponseSlot<Vec<PaletteEntry>>,
    ctx: &egui::Context,
) {
    let region = region.normalized();
    let mut parts = Multipart::new();
    parts.file("image", filename, content_type_for(filename), &bytes);
    parts.text("x", &region.x.to_string());
    parts.text("y", &region.y.to_string());
    parts.text("width", &region.width.to_string());
    parts.text("height", &region.height.to_string());
    let request = post_multipart(format!("{}/extract_palette", config.palette_base), parts);
    dispatch(request, slot.begin(), ctx, |response| {
        parse_json::<Vec<PaletteEntry>>(response)?
            .into_iter()
            .map(PaletteEntry::validated)
            .collect()
    });
}

/// `POST /api/upload`: runs the colorblindness simulations on an image.
pub fn simulate(
    config: &BackendConfig,
    bytes: Vec<u8>,
    filename: &str,
    slot: &ResponseSlot<SimulationReport>,
    ctx: &egui::Context,
) {
    let mut parts = Multipart::new();
    parts.file("image", filename, content_type_for(filename), &bytes);
    let request = post_multipart(format!("{}/api/upload", config.simulate_base), parts);
    dispatch(request, slot.begin(), ctx, |response| {
        parse_json::<SimulationReport>(response)
    });
}

/// Fetches one result image (simulation output) by its server path.
pub fn fetch_image(
    config: &BackendConfig,
    path: &str,
    slot: &ResponseSlot<Vec<u8>>,
    ctx: &egui::Context,
) {
    let url = if path.starts_with("http") {
        path.to_owned()
    } else {
        format!("{}{}", config.simulate_base, path)
    };
    dispatch(ehttp::Request::get(url), slot.begin(), ctx, |response| {
        if response.ok {
            Ok(response.bytes.clone())
        } else {
            Err(BackendError::Status {
                status: response.status,
                message: response.status_text.clone(),
            })
        }
    });
}

// ---------------------------------------------------------------------------
// Live video feed

/// Latest decoded camera frame, shared between the stream worker and the UI.
pub type SharedFrame = Arc<Mutex<Option<egui::ColorImage>>>;

/// Streams `GET /video_feed` (MJPEG) until `running` goes false or the
/// connection drops, keeping only the most recent frame. Undecodable
/// frames are skipped; the feed keeps going.
pub fn stream_video_feed(
    config: &BackendConfig,
    frame: SharedFrame,
    running: Arc<AtomicBool>,
    ctx: &egui::Context,
) {
    let url = format!("{}/video_feed", config.live_base);
    let ctx = ctx.clone();
    let splitter = Mutex::new(crate::mjpeg::FrameSplitter::new());
    ehttp::streaming::fetch(ehttp::Request::get(url), move |part| {
        if !running.load(Ordering::Relaxed) {
            return ControlFlow::Break(());
        }
        match part {
            Ok(ehttp::streaming::Part::Response(response)) => {
                if response.ok {
                    ControlFlow::Continue(())
                } else {
                    log::warn!("video feed rejected: {}", response.status);
                    ControlFlow::Break(())
                }
            }
            Ok(ehttp::streaming::Part::Chunk(chunk)) => {
                if chunk.is_empty() {
                    return ControlFlow::Break(()); // end of stream
                }
                let jpegs = match splitter.lock() {
                    Ok(mut splitter) => splitter.push(&chunk),
                    Err(mut poisoned) => poisoned.get_mut().push(&chunk),
                };
                for jpeg in jpegs {
                    match crate::media::decode_color_image(&jpeg) {
                        Ok(pixels) => {
                            *lock_or_recover(&frame) = Some(pixels);
                            ctx.request_repaint();
                        }
                        Err(err) => log::warn!("skipping bad camera frame: {err}"),
                    }
                }
                ControlFlow::Continue(())
            }
            Err(err) => {
                log::warn!("video feed closed: {err}");
                ControlFlow::Break(())
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_region_payload_layout() {
        let mut parts = Multipart::with_boundary("B".to_owned());
        parts.file("image", "photo.png", "image/png", b"\x89PNG");
        parts.text("x", "2");
        parts.text("y", "3");
        parts.text("width", "8");
        parts.text("height", "9");
        let (content_type, body) = parts.finish();
        assert_eq!(content_type, "multipart/form-data; boundary=B");
        let expected = b"--B\r\n\
            Content-Disposition: form-data; name=\"image\"; filename=\"photo.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            \x89PNG\r\n\
            --B\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\n2\r\n\
            --B\r\nContent-Disposition: form-data; name=\"y\"\r\n\r\n3\r\n\
            --B\r\nContent-Disposition: form-data; name=\"width\"\r\n\r\n8\r\n\
            --B\r\nContent-Disposition: form-data; name=\"height\"\r\n\r\n9\r\n\
            --B--\r\n";
        assert_eq!(body, expected.to_vec());
    }

    #[test]
    fn generated_boundaries_are_unique() {
        assert_ne!(Multipart::new().boundary, Multipart::new().boundary);
    }

    #[test]
    fn hex_validation() {
        assert_eq!(parse_hex_rgb("#0a141e"), Some([10, 20, 30]));
        assert_eq!(parse_hex_rgb("0a141e"), None, "missing #");
        assert_eq!(parse_hex_rgb("#0a141"), None, "too short");
        assert_eq!(parse_hex_rgb("#0a141g"), None, "not hex");
    }

    #[test]
    fn color_report_requires_valid_hex() {
        let report: ColorReport = serde_json::from_str(
            r##"{"color_name":"teal","r":0,"g":128,"b":128,"hex":"#008080"}"##,
        )
        .unwrap();
        assert!(report.validated().is_ok());

        let bad: ColorReport = serde_json::from_str(
            r##"{"color_name":"teal","r":0,"g":128,"b":128,"hex":"008080"}"##,
        )
        .unwrap();
        assert!(matches!(bad.validated(), Err(BackendError::Schema(_))));
    }

    #[test]
    fn rgb_range_is_enforced_by_schema() {
        let out_of_range = serde_json::from_str::<ColorReport>(
            r##"{"color_name":"x","r":300,"g":0,"b":0,"hex":"#000000"}"##,
        );
        assert!(out_of_range.is_err());
    }

    #[test]
    fn palette_entry_rejects_bad_proportion() {
        let entry = PaletteEntry {
            color: "#336699".to_owned(),
            proportion: 1.5,
        };
        assert!(matches!(entry.validated(), Err(BackendError::Schema(_))));
        let ok = PaletteEntry {
            color: "#336699".to_owned(),
            proportion: 0.25,
        };
        assert!(ok.validated().is_ok());
    }

    #[test]
    fn simulation_report_uses_camel_case_keys() {
        let report: SimulationReport = serde_json::from_str(
            r##"{
                "originalImage": "/uploads/a.png",
                "simulations": {"deuteranopia": "/uploads/a_deut.png"},
                "dominantColors": ["#102030"],
                "suggestedColors": {"#102030": "#405060"}
            }"##,
        )
        .unwrap();
        assert_eq!(report.original_image, "/uploads/a.png");
        assert_eq!(
            report.simulations.get("deuteranopia").map(String::as_str),
            Some("/uploads/a_deut.png")
        );
    }

    #[test]
    fn stale_responses_are_dropped() {
        let slot: ResponseSlot<u32> = ResponseSlot::default();
        let first = slot.begin();
        let second = slot.begin();
        // the superseded request resolves after the newer one
        second.fulfill(Ok(2));
        first.fulfill(Ok(1));
        assert_eq!(slot.take(), Some(Ok(2)));
        assert_eq!(slot.take(), None, "take drains the slot");
    }

    #[test]
    fn pending_tracks_latest_request_only() {
        let slot: ResponseSlot<u32> = ResponseSlot::default();
        assert!(!slot.pending());
        let ticket = slot.begin();
        assert!(slot.pending());
        ticket.fulfill(Err(BackendError::Transport("down".to_owned())));
        assert!(!slot.pending());
        // a failed request leaves nothing but the error: prior data in the
        // page is untouched because the page only overwrites on Ok
        assert_eq!(
            slot.take(),
            Some(Err(BackendError::Transport("down".to_owned())))
        );
    }

    #[test]
    fn error_bodies_surface_the_server_message() {
        let response = ehttp::Response {
            url: "http://localhost:5000/detect/a/1/2".to_owned(),
            ok: false,
            status: 400,
            status_text: "Bad Request".to_owned(),
            headers: ehttp::Headers::new(&[]),
            bytes: br##"{"error": "Coordinates (9000, 2) are out of bounds"}"##.to_vec(),
        };
        let parsed = parse_json::<ColorReport>(&response);
        assert_eq!(
            parsed,
            Err(BackendError::Status {
                status: 400,
                message: "Coordinates (9000, 2) are out of bounds".to_owned()
            })
        );
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a.PNG"), "image/png");
        assert_eq!(content_type_for("clip.mp4"), "video/mp4");
        assert_eq!(content_type_for("mystery"), "application/octet-stream");
    }
}
