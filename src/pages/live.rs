//! Live camera detection: a server-side camera session, its MJPEG feed,
//! and click-to-sample against the current frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use egui::{Color32, TextureOptions};

use crate::backend::{self, BackendConfig, LiveColorReport, ResponseSlot, SharedFrame};
use crate::geometry::DisplayTransform;
use crate::notify::{LogNotifier, Notifier};

pub struct LivePage {
    probed: bool,
    health: ResponseSlot<()>,
    availability_error: Option<String>,

    running: bool,
    run_flag: Arc<AtomicBool>,
    setup: ResponseSlot<String>,
    teardown: ResponseSlot<String>,

    frame: SharedFrame,
    frame_tex: Option<egui::TextureHandle>,
    frame_size: [usize; 2],

    sample: ResponseSlot<LiveColorReport>,
    report: Option<LiveColorReport>,
    error: Option<String>,
    notifier: Box<dyn Notifier>,
}

impl Default for LivePage {
    fn default() -> Self {
        Self {
            probed: false,
            health: ResponseSlot::default(),
            availability_error: None,
            running: false,
            run_flag: Arc::new(AtomicBool::new(false)),
            setup: ResponseSlot::default(),
            teardown: ResponseSlot::default(),
            frame: SharedFrame::default(),
            frame_tex: None,
            frame_size: [0, 0],
            sample: ResponseSlot::default(),
            report: None,
            error: None,
            notifier: Box::new(LogNotifier),
        }
    }
}

impl LivePage {
    fn drain(&mut self, config: &BackendConfig, ctx: &egui::Context) {
        if let Some(result) = self.health.take() {
            self.availability_error = result
                .err()
                .map(|err| format!("Camera service is not available: {err}"));
        }
        if let Some(result) = self.setup.take() {
            match result {
                Ok(status) => {
                    log::info!("camera session: {status}");
                    self.running = true;
                    self.error = None;
                    // fresh cancel flag per stream
                    self.run_flag = Arc::new(AtomicBool::new(true));
                    backend::stream_video_feed(
                        config,
                        Arc::clone(&self.frame),
                        Arc::clone(&self.run_flag),
                        ctx,
                    );
                }
                Err(err) => self.error = Some(err.to_string()),
            }
        }
        if let Some(result) = self.teardown.take() {
            match result {
                Ok(status) => log::info!("camera session: {status}"),
                Err(err) => log::warn!("teardown failed: {err}"),
            }
        }
        if let Some(result) = self.sample.take() {
            match result {
                Ok(report) => {
                    self.notifier.announce(&format!(
                        "The color is {}. RGB values are ({}, {}, {}).",
                        report.name, report.rgb.r, report.rgb.g, report.rgb.b
                    ));
                    self.report = Some(report);
                    self.error = None;
                }
                // keep the previous card on a failed sample
                Err(err) => self.error = Some(err.to_string()),
            }
        }
    }

    fn stop(&mut self, config: &BackendConfig, ctx: &egui::Context) {
        self.run_flag.store(false, Ordering::Relaxed);
        self.running = false;
        self.report = None;
        self.frame_tex = None;
        if let Ok(mut frame) = self.frame.lock() {
            *frame = None;
        }
        self.notifier.hush();
        backend::stop_session(config, &self.teardown, ctx);
    }

    /// Releases the server-side camera on application exit.
    pub fn shutdown(&mut self, config: &BackendConfig, ctx: &egui::Context) {
        if self.running {
            self.stop(config, ctx);
        }
    }

    /// Schedules a fresh health probe on the next frame. Called when the
    /// user enters the page, so a service that has come up since the last
    /// visit is no longer reported as unavailable.
    pub fn reprobe(&mut self) {
        self.probed = false;
    }

    /// Uploads the most recent decoded frame to a texture, if one arrived.
    fn refresh_frame(&mut self, ctx: &egui::Context) {
        let latest = self.frame.lock().ok().and_then(|mut f| f.take());
        if let Some(pixels) = latest {
            // native resolution of the feed can change between frames
            self.frame_size = pixels.size;
            match &mut self.frame_tex {
                Some(tex) => tex.set(pixels, TextureOptions::LINEAR),
                None => {
                    self.frame_tex =
                        Some(ctx.load_texture("live_frame", pixels, TextureOptions::LINEAR));
                }
            }
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, config: &BackendConfig) {
        if !self.probed {
            self.probed = true;
            backend::probe_health(config, &self.health, ui.ctx());
        }
        let ctx = ui.ctx().clone();
        self.drain(config, &ctx);
        self.refresh_frame(&ctx);

        ui.heading("Live Color Detection");
        ui.separator();

        ui.horizontal(|ui| {
            if self.running {
                if ui.button("Stop detection").clicked() {
                    self.stop(config, &ctx);
                }
            } else {
                let idle = !self.setup.pending();
                if ui.add_enabled(idle, egui::Button::new("Start detection")).clicked() {
                    backend::start_session(config, &self.setup, &ctx);
                }
            }
            if self.setup.pending() || self.sample.pending() {
                ui.spinner();
            }
        });

        if let Some(err) = &self.availability_error {
            ui.colored_label(Color32::RED, err);
        }
        if let Some(err) = &self.error {
            ui.colored_label(Color32::RED, err);
        }

        if self.running {
            match &self.frame_tex {
                Some(tex) => {
                    ui.label("Click on the video to detect colors");
                    let mut size = egui::vec2(self.frame_size[0] as f32, self.frame_size[1] as f32);
                    let max_w = ui.available_width();
                    if size.x > max_w && size.x > 0.0 {
                        size *= max_w / size.x;
                    }
                    let response = ui.add(
                        egui::Image::new((tex.id(), size)).sense(egui::Sense::click()),
                    );
                    if response.clicked() {
                        if let Some(pos) = response.interact_pointer_pos() {
                            // frame size is sampled now, not at stream start
                            match DisplayTransform::new(response.rect, self.frame_size) {
                                Ok(transform) => backend::live_sample(
                                    config,
                                    transform.to_image(pos),
                                    &self.sample,
                                    &ctx,
                                ),
                                Err(err) => log::warn!("ignoring click: {err}"),
                            }
                        }
                    }
                }
                None => {
                    ui.spinner();
                    ui.label("Waiting for the first camera frame…");
                }
            }
        }

        if let Some(report) = &self.report {
            ui.separator();
            ui.horizontal(|ui| {
                super::hex_swatch(ui, egui::vec2(48.0, 48.0), &report.hex);
                ui.vertical(|ui| {
                    ui.strong(&report.name);
                    ui.label(format!(
                        "RGB ({}, {}, {})",
                        report.rgb.r, report.rgb.g, report.rgb.b
                    ));
                    ui.label(&report.hex);
                });
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;

    #[test]
    fn reprobe_clears_stale_unavailability() {
        let config = BackendConfig::default();
        let ctx = egui::Context::default();
        let mut page = LivePage::default();
        page.probed = true;

        page.health
            .begin()
            .fulfill(Err(BackendError::Transport("connection refused".to_owned())));
        page.drain(&config, &ctx);
        assert!(page.availability_error.is_some());

        // user re-enters the page, the service is up this time
        page.reprobe();
        assert!(!page.probed, "next frame must issue a fresh probe");
        page.health.begin().fulfill(Ok(()));
        page.drain(&config, &ctx);
        assert_eq!(page.availability_error, None);
    }
}
