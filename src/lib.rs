//! egui client for the color-analysis services: upload detection, live
//! camera detection, colorblindness simulation and palette extraction.

#![warn(clippy::all, rust_2018_idioms)]

pub mod backend;
pub mod file_picker;
pub mod geometry;
pub mod media;
pub mod mjpeg;
pub mod notify;
pub mod pages;
pub mod selection;

mod app;
pub use app::ChromaLensApp;

use eframe::NativeOptions;

impl ChromaLensApp {
    /// Run the app with provided NativeOptions.
    pub fn run(options: NativeOptions) -> Result<(), eframe::Error> {
        eframe::run_native(
            "chroma_lens",
            options,
            Box::new(|cc| Ok(Box::new(ChromaLensApp::new(cc)))),
        )
    }
}
