//! One module per page of the client.

pub mod detector;
pub mod live;
pub mod palette;
pub mod simulator;

/// Opens the platform file picker. Native returns the bytes synchronously
/// through rfd; on wasm this opens the DOM picker and the bytes arrive on
/// a later frame through [`poll_picked`].
pub(crate) fn pick_media() -> Option<(Vec<u8>, String)> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let path = rfd::FileDialog::new()
            .add_filter("Media", &["png", "jpg", "jpeg", "bmp", "webp", "mp4"])
            .pick_file()?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        match std::fs::read(&path) {
            Ok(bytes) => Some((bytes, name)),
            Err(err) => {
                log::error!("failed to read {}: {err}", path.display());
                None
            }
        }
    }
    #[cfg(target_arch = "wasm32")]
    {
        crate::file_picker::open_media_picker();
        None
    }
}

/// Picks up a file chosen through the wasm picker, if one arrived.
pub(crate) fn poll_picked() -> Option<(Vec<u8>, String)> {
    crate::file_picker::take_selected_media()
}

/// Filled color swatch with a fixed size.
pub(crate) fn swatch(ui: &mut egui::Ui, size: egui::Vec2, color: egui::Color32) {
    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
    ui.painter().rect_filled(rect, 2, color);
}

/// Swatch for a `#rrggbb` string; falls back to a label when unparsable.
pub(crate) fn hex_swatch(ui: &mut egui::Ui, size: egui::Vec2, hex: &str) {
    match crate::backend::parse_hex_rgb(hex) {
        Some([r, g, b]) => swatch(ui, size, egui::Color32::from_rgb(r, g, b)),
        None => {
            ui.label(format!("({hex})"));
        }
    }
}
