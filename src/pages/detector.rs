//! Color detection on an uploaded image: upload once, then click the
//! preview to sample pixels by image id.

use egui::Color32;

use crate::backend::{self, BackendConfig, ColorReport, ResponseSlot};
use crate::geometry::DisplayTransform;
use crate::media::SourceMedia;

#[derive(Default)]
pub struct DetectorPage {
    /// Raw picked bytes; uploadable even when no local preview exists
    /// (the upload service extracts a frame from videos itself).
    picked: Option<(Vec<u8>, String)>,
    media: Option<SourceMedia>,
    media_error: Option<String>,
    image_id: Option<String>,
    upload: ResponseSlot<String>,
    sample: ResponseSlot<ColorReport>,
    report: Option<ColorReport>,
    error: Option<String>,
}

impl DetectorPage {
    fn set_media(&mut self, bytes: Vec<u8>, name: String) {
        // new media invalidates the old id, result and selection state
        self.image_id = None;
        self.report = None;
        self.error = None;
        match SourceMedia::decode(bytes.clone(), name.clone()) {
            Ok(media) => {
                self.media = Some(media);
                self.media_error = None;
            }
            Err(err) => {
                self.media = None;
                self.media_error = Some(format!("{err} (no preview; uploading still works)"));
            }
        }
        self.picked = Some((bytes, name));
    }

    fn drain(&mut self) {
        if let Some(result) = self.upload.take() {
            match result {
                Ok(id) => {
                    log::info!("media uploaded, id {id}");
                    self.image_id = Some(id);
                    self.error = None;
                }
                Err(err) => self.error = Some(err.to_string()),
            }
        }
        if let Some(result) = self.sample.take() {
            match result {
                Ok(report) => {
                    self.report = Some(report);
                    self.error = None;
                }
                // failed sample: show the error, keep the previous report
                Err(err) => self.error = Some(err.to_string()),
            }
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, config: &BackendConfig) {
        if let Some((bytes, name)) = super::poll_picked() {
            self.set_media(bytes, name);
        }
        self.drain();

        ui.heading("Color Detector");
        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Open…").clicked() {
                if let Some((bytes, name)) = super::pick_media() {
                    self.set_media(bytes, name);
                }
            }
            let can_upload = self.picked.is_some() && !self.upload.pending();
            if ui.add_enabled(can_upload, egui::Button::new("Upload")).clicked() {
                if let Some((bytes, name)) = &self.picked {
                    backend::upload_media(config, bytes.clone(), name, &self.upload, ui.ctx());
                }
            }
            if self.upload.pending() || self.sample.pending() {
                ui.spinner();
            }
            match &self.image_id {
                Some(id) => {
                    ui.label(format!("id: {id} — click the image to sample a color"));
                }
                None if self.media.is_some() => {
                    ui.label("upload to enable sampling");
                }
                None => {}
            }
        });

        if let Some(err) = &self.media_error {
            ui.colored_label(Color32::RED, format!("Media error: {err}"));
        }
        if let Some(err) = &self.error {
            ui.colored_label(Color32::RED, err);
        }

        if let Some(media) = &mut self.media {
            let natural = media.natural_size();
            let desired = media.fit_size(ui.available_size() - egui::vec2(0.0, 140.0));
            let tex_id = media.texture(ui.ctx()).id();
            let response = ui.add(
                egui::Image::new((tex_id, desired)).sense(egui::Sense::click()),
            );
            if self.image_id.is_some() && response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    match DisplayTransform::new(response.rect, natural) {
                        Ok(transform) => {
                            if let Some(id) = &self.image_id {
                                backend::detect_at(
                                    config,
                                    id,
                                    transform.to_image(pos),
                                    &self.sample,
                                    ui.ctx(),
                                );
                            }
                        }
                        Err(err) => log::warn!("ignoring click: {err}"),
                    }
                }
            }
        }

        if let Some(report) = &self.report {
            ui.separator();
            ui.horizontal(|ui| {
                super::hex_swatch(ui, egui::vec2(48.0, 48.0), &report.hex);
                ui.vertical(|ui| {
                    ui.strong(&report.color_name);
                    ui.label(format!("RGB ({}, {}, {})", report.r, report.g, report.b));
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

    fn teal() -> ColorReport {
        ColorReport {
            color_name: "teal".to_owned(),
            r: 0,
            g: 128,
            b: 128,
            hex: "#008080".to_owned(),
        }
    }

    #[test]
    fn failed_sample_keeps_previous_report() {
        let mut page = DetectorPage::default();
        page.report = Some(teal());

        page.sample
            .begin()
            .fulfill(Err(BackendError::Transport("connection refused".to_owned())));
        page.drain();

        assert_eq!(page.report, Some(teal()), "the last good sample stays visible");
        assert!(page.error.is_some());
    }

    #[test]
    fn failed_upload_keeps_existing_image_id() {
        let mut page = DetectorPage::default();
        page.image_id = Some("abc123".to_owned());

        page.upload.begin().fulfill(Err(BackendError::Status {
            status: 500,
            message: "boom".to_owned(),
        }));
        page.drain();

        assert_eq!(page.image_id.as_deref(), Some("abc123"));
        assert!(page.error.is_some());
    }
}
