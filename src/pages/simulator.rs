//! Colorblindness simulation: upload an image, display the simulated
//! variants the service renders, plus dominant colors and suggested
//! alternatives.

use std::collections::BTreeMap;

use egui::Color32;

use crate::backend::{self, BackendConfig, ResponseSlot, SimulationReport};
use crate::media::{self, SourceMedia};

enum ResultImage {
    Pending(ResponseSlot<Vec<u8>>),
    Ready(egui::TextureHandle),
    Failed(String),
}

#[derive(Default)]
pub struct SimulatorPage {
    media: Option<SourceMedia>,
    media_error: Option<String>,
    request: ResponseSlot<SimulationReport>,
    report: Option<SimulationReport>,
    images: BTreeMap<String, ResultImage>,
    error: Option<String>,
}

fn simulation_label(kind: &str) -> &str {
    match kind {
        "deuteranopia" => "Deuteranopia (red-green, most common)",
        "protanopia" => "Protanopia (red-green)",
        "tritanopia" => "Tritanopia (blue-yellow)",
        other => other,
    }
}

impl SimulatorPage {
    fn set_media(&mut self, bytes: Vec<u8>, name: String) {
        self.report = None;
        self.images.clear();
        self.error = None;
        match SourceMedia::decode(bytes, name) {
            Ok(media) => {
                self.media = Some(media);
                self.media_error = None;
            }
            Err(err) => {
                self.media = None;
                self.media_error = Some(err.to_string());
            }
        }
    }

    fn clear(&mut self) {
        self.media = None;
        self.media_error = None;
        self.report = None;
        self.images.clear();
        self.error = None;
    }

    fn drain(&mut self, config: &BackendConfig, ctx: &egui::Context) {
        if let Some(result) = self.request.take() {
            match result {
                Ok(report) => {
                    // start fetching every result image
                    self.images.clear();
                    let mut paths = vec![report.original_image.clone()];
                    paths.extend(report.simulations.values().cloned());
                    for path in paths {
                        let slot = ResponseSlot::default();
                        backend::fetch_image(config, &path, &slot, ctx);
                        self.images.insert(path, ResultImage::Pending(slot));
                    }
                    self.report = Some(report);
                    self.error = None;
                }
                // a failed run leaves any previous report on screen
                Err(err) => self.error = Some(err.to_string()),
            }
        }

        for (path, entry) in &mut self.images {
            if let ResultImage::Pending(slot) = entry {
                if let Some(result) = slot.take() {
                    *entry = match result.and_then(|bytes| {
                        media::decode_color_image(&bytes)
                            .map_err(|err| backend::BackendError::Schema(err.to_string()))
                    }) {
                        Ok(pixels) => ResultImage::Ready(ctx.load_texture(
                            path.clone(),
                            pixels,
                            egui::TextureOptions::LINEAR,
                        )),
                        Err(err) => ResultImage::Failed(err.to_string()),
                    };
                }
            }
        }
    }

    fn result_image_ui(&self, ui: &mut egui::Ui, title: &str, path: &str) {
        ui.vertical(|ui| {
            ui.strong(title);
            match self.images.get(path) {
                Some(ResultImage::Ready(tex)) => {
                    let size = tex.size_vec2();
                    let scale = (280.0 / size.x).min(280.0 / size.y).min(1.0);
                    ui.add(egui::Image::new((tex.id(), size * scale)));
                }
                Some(ResultImage::Pending(_)) | None => {
                    ui.spinner();
                }
                Some(ResultImage::Failed(err)) => {
                    ui.colored_label(Color32::RED, format!("image failed to load: {err}"));
                }
            }
        });
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, config: &BackendConfig) {
        if let Some((bytes, name)) = super::poll_picked() {
            self.set_media(bytes, name);
        }
        let ctx = ui.ctx().clone();
        self.drain(config, &ctx);

        ui.heading("Colorblind Simulation");
        ui.separator();
        ui.label("Upload an image to see how it appears to colorblind users.");

        ui.horizontal(|ui| {
            if ui.button("Select image…").clicked() {
                if let Some((bytes, name)) = super::pick_media() {
                    self.set_media(bytes, name);
                }
            }
            if self.media.is_some() && ui.button("Remove").clicked() {
                self.clear();
            }
            let ready = self.media.is_some() && !self.request.pending();
            if ui
                .add_enabled(ready, egui::Button::new("Generate simulations"))
                .clicked()
            {
                if let Some(media) = &self.media {
                    backend::simulate(
                        config,
                        media.bytes().to_vec(),
                        media.name(),
                        &self.request,
                        &ctx,
                    );
                }
            }
            if self.request.pending() {
                ui.spinner();
                ui.label("Processing…");
            }
        });

        if let Some(err) = &self.media_error {
            ui.colored_label(Color32::RED, format!("Media error: {err}"));
        }
        if let Some(err) = &self.error {
            ui.colored_label(Color32::RED, err);
            ui.label("Please check the server connection and try again.");
        }

        if self.report.is_none() {
            if let Some(media) = &mut self.media {
                let desired = media.fit_size(ui.available_size());
                let tex_id = media.texture(&ctx).id();
                ui.add(egui::Image::new((tex_id, desired)));
            }
            return;
        }

        let Some(report) = self.report.clone() else {
            return;
        };
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.separator();
            ui.strong("Simulation results");
            ui.horizontal_wrapped(|ui| {
                self.result_image_ui(ui, "Original", &report.original_image);
                for (kind, path) in &report.simulations {
                    self.result_image_ui(ui, simulation_label(kind), path);
                }
            });

            ui.separator();
            ui.strong("Dominant colors");
            ui.horizontal_wrapped(|ui| {
                for color in &report.dominant_colors {
                    ui.vertical(|ui| {
                        super::hex_swatch(ui, egui::vec2(40.0, 40.0), color);
                        ui.small(color);
                    });
                }
            });

            ui.separator();
            ui.strong("Suggested alternatives");
            for (original, suggested) in &report.suggested_colors {
                ui.horizontal(|ui| {
                    super::hex_swatch(ui, egui::vec2(28.0, 28.0), original);
                    ui.label("→");
                    super::hex_swatch(ui, egui::vec2(28.0, 28.0), suggested);
                    ui.small(format!("{original} → {suggested}"));
                });
            }
        });
    }
}
