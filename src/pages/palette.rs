//! Palette extraction from a dragged region of an image.
//!
//! The preview is immediate-mode: each frame clears and redraws the image
//! and, when a selection exists, strokes its normalized outline, so the
//! picture is always a pure function of the current media and selection.

use egui::{Color32, CornerRadius, Stroke, StrokeKind};

use crate::backend::{self, BackendConfig, PaletteEntry, ResponseSlot};
use crate::geometry::DisplayTransform;
use crate::media::SourceMedia;
use crate::selection::{SelectionState, SelectionTracker, MIN_SELECTION_PX};

#[derive(Default)]
pub struct PalettePage {
    media: Option<SourceMedia>,
    media_error: Option<String>,
    tracker: SelectionTracker,
    notice: Option<String>,
    request: ResponseSlot<Vec<PaletteEntry>>,
    palette: Vec<PaletteEntry>,
    error: Option<String>,
}

impl PalettePage {
    fn set_media(&mut self, bytes: Vec<u8>, name: String) {
        self.tracker.reset();
        self.palette.clear();
        self.notice = None;
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

    fn drain(&mut self) {
        if let Some(result) = self.request.take() {
            match result {
                Ok(entries) => {
                    self.palette = entries;
                    self.error = None;
                }
                // extraction failed: the previously shown palette stays
                Err(err) => self.error = Some(err.to_string()),
            }
        }
    }

    fn handle_gesture(
        &mut self,
        response: &egui::Response,
        transform: DisplayTransform,
        config: &BackendConfig,
        ctx: &egui::Context,
    ) {
        let pointer = response.interact_pointer_pos();
        if response.drag_started() {
            if let Some(pos) = pointer {
                self.notice = None;
                self.tracker.begin(transform.to_image(pos));
            }
        } else if response.dragged() {
            if let Some(pos) = pointer {
                self.tracker.update(transform.to_image(pos));
            }
        } else if response.drag_stopped() {
            if let Some(pos) = pointer {
                self.tracker.update(transform.to_image(pos));
            }
            match self.tracker.finish() {
                Some(region) => {
                    if let Some(media) = &self.media {
                        backend::extract_palette(
                            config,
                            media.bytes().to_vec(),
                            media.name(),
                            region,
                            &self.request,
                            ctx,
                        );
                    }
                }
                None => {
                    if self.tracker.state() == SelectionState::Discarded {
                        self.notice = Some(format!(
                            "Selection too small — drag at least {MIN_SELECTION_PX}×{MIN_SELECTION_PX} pixels."
                        ));
                    }
                }
            }
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, config: &BackendConfig) {
        if let Some((bytes, name)) = super::poll_picked() {
            self.set_media(bytes, name);
        }
        self.drain();

        ui.heading("Palette Extractor");
        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Open…").clicked() {
                if let Some((bytes, name)) = super::pick_media() {
                    self.set_media(bytes, name);
                }
            }
            if self.media.is_some() {
                ui.label("drag a rectangle over the image to extract its palette");
            }
            if self.request.pending() {
                ui.spinner();
            }
        });

        if let Some(err) = &self.media_error {
            ui.colored_label(Color32::RED, format!("Media error: {err}"));
        }
        if let Some(err) = &self.error {
            ui.colored_label(Color32::RED, err);
        }
        if let Some(notice) = &self.notice {
            ui.colored_label(Color32::YELLOW, notice);
        }

        let mut surface = None;
        if let Some(media) = &mut self.media {
            let natural = media.natural_size();
            let desired = media.fit_size(ui.available_size() - egui::vec2(0.0, 160.0));
            let tex_id = media.texture(ui.ctx()).id();
            let response = ui.add(
                egui::Image::new((tex_id, desired)).sense(egui::Sense::click_and_drag()),
            );
            surface = Some((response, natural));
        }
        if let Some((response, natural)) = surface {
            match DisplayTransform::new(response.rect, natural) {
                Ok(transform) => {
                    let ctx = ui.ctx().clone();
                    self.handle_gesture(&response, transform, config, &ctx);
                    if let Some(region) = self.tracker.visible_rect() {
                        ui.painter_at(response.rect).rect_stroke(
                            transform.to_screen_rect(region),
                            CornerRadius::ZERO,
                            Stroke::new(2.0, Color32::LIGHT_BLUE),
                            StrokeKind::Middle,
                        );
                    }
                }
                Err(err) => log::warn!("surface not ready: {err}"),
            }
        }

        if !self.palette.is_empty() {
            ui.separator();
            ui.strong("Extracted palette");
            for entry in &self.palette {
                ui.horizontal(|ui| {
                    super::hex_swatch(ui, egui::vec2(32.0, 20.0), &entry.color);
                    ui.monospace(&entry.color);
                    ui.label(format!("{:.2}%", entry.proportion * 100.0));
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;

    fn entry(color: &str, proportion: f64) -> PaletteEntry {
        PaletteEntry {
            color: color.to_owned(),
            proportion,
        }
    }

    #[test]
    fn failed_extraction_keeps_previous_palette() {
        let mut page = PalettePage::default();
        page.palette = vec![entry("#336699", 0.6), entry("#993366", 0.4)];

        page.request
            .begin()
            .fulfill(Err(BackendError::Transport("connection refused".to_owned())));
        page.drain();

        assert_eq!(
            page.palette,
            vec![entry("#336699", 0.6), entry("#993366", 0.4)],
            "a failed extraction must not clear what is on screen"
        );
        assert!(page.error.is_some());
    }

    #[test]
    fn successful_extraction_replaces_palette_and_clears_error() {
        let mut page = PalettePage::default();
        page.palette = vec![entry("#000000", 1.0)];
        page.error = Some("old error".to_owned());

        page.request.begin().fulfill(Ok(vec![entry("#102030", 1.0)]));
        page.drain();

        assert_eq!(page.palette, vec![entry("#102030", 1.0)]);
        assert_eq!(page.error, None);
    }
}
