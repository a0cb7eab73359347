use crate::backend::BackendConfig;
use crate::pages::detector::DetectorPage;
use crate::pages::live::LivePage;
use crate::pages::palette::PalettePage;
use crate::pages::simulator::SimulatorPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Page {
    Detector,
    Live,
    Simulator,
    Palette,
}

impl Page {
    const ALL: [Self; 4] = [Self::Detector, Self::Live, Self::Simulator, Self::Palette];

    fn title(self) -> &'static str {
        match self {
            Self::Detector => "Color Detector",
            Self::Live => "Live Detection",
            Self::Simulator => "Colorblind Simulation",
            Self::Palette => "Palette Extractor",
        }
    }
}

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct ChromaLensApp {
    page: Page,
    backends: BackendConfig,
    show_settings: bool,

    #[serde(skip)]
    detector: DetectorPage,
    #[serde(skip)]
    live: LivePage,
    #[serde(skip)]
    simulator: SimulatorPage,
    #[serde(skip)]
    palette: PalettePage,

    // kept so on_exit can still issue the live teardown call
    #[serde(skip)]
    runtime_ctx: egui::Context,
}

impl Default for ChromaLensApp {
    fn default() -> Self {
        Self {
            page: Page::Detector,
            backends: BackendConfig::default(),
            show_settings: false,
            detector: DetectorPage::default(),
            live: LivePage::default(),
            simulator: SimulatorPage::default(),
            palette: PalettePage::default(),
            runtime_ctx: egui::Context::default(),
        }
    }
}

impl ChromaLensApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Load previous app state (if any).
        // Note that you must enable the `persistence` feature for this to work.
        let mut this: Self = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };

        this.runtime_ctx = cc.egui_ctx.clone();

        // Set visuals to dark by default
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        this
    }

    fn settings_ui(&mut self, ui: &mut egui::Ui) {
        let rows = [
            ("Detection service", &mut self.backends.detect_base),
            ("Live service", &mut self.backends.live_base),
            ("Palette service", &mut self.backends.palette_base),
            ("Simulation service", &mut self.backends.simulate_base),
        ];
        for (label, value) in rows {
            ui.horizontal(|ui| {
                ui.label(label);
                ui.text_edit_singleline(value);
            });
        }
    }
}

impl eframe::App for ChromaLensApp {
    /// Called by the framework to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // release the server-side camera if a session is still open
        let ctx = self.runtime_ctx.clone();
        self.live.shutdown(&self.backends, &ctx);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                // NOTE: no File->Quit on web pages!
                let is_web = cfg!(target_arch = "wasm32");
                if !is_web {
                    ui.menu_button("File", |ui| {
                        if ui.button("Quit").clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                    ui.add_space(16.0);
                }

                for page in Page::ALL {
                    if ui.selectable_label(self.page == page, page.title()).clicked() {
                        if page == Page::Live && self.page != Page::Live {
                            // re-check service availability on every entry
                            self.live.reprobe();
                        }
                        self.page = page;
                    }
                }
                ui.add_space(16.0);
                ui.toggle_value(&mut self.show_settings, "Settings");

                egui::widgets::global_theme_preference_buttons(ui);
            });
        });

        if self.show_settings {
            egui::TopBottomPanel::top("settings_panel").show(ctx, |ui| {
                self.settings_ui(ui);
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            match self.page {
                Page::Detector => self.detector.ui(ui, &self.backends),
                Page::Live => self.live.ui(ui, &self.backends),
                Page::Simulator => self.simulator.ui(ui, &self.backends),
                Page::Palette => self.palette.ui(ui, &self.backends),
            }

            ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                egui::warn_if_debug_build(ui);
            });
        });
    }
}
