//! English Helper companion window (egui/eframe).
//!
//! # Architecture
//!
//! [`EnglishHelperApp`] is the top-level [`eframe::App`].  It never talks to
//! the pipeline directly:
//!
//! * results arrive through [`SharedDisplay`], which the pipeline writes and
//!   this window reads every frame (the display requests a repaint on every
//!   update, so the window stays idle between words);
//! * user adjustments go into [`LiveSettings`], which the pipeline reads;
//! * clicks that need the pipeline (US/UK pronunciation, a synonym lookup)
//!   and, on close, [`InputEvent::Shutdown`] are sent down the input channel.
//!
//! # Layout
//!
//! | Area | Content |
//! |------|---------|
//! | Header | word, phonetic, US/UK buttons, translation |
//! | Body | picture, meanings with examples and clickable synonyms |
//! | Footer | `Tr: … • Img: …`, vocab level, auto-pronounce, cache |
//! | Bottom panel | live sentence and its translation |

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::{AppConfig, AppPaths, LiveSettings};
use crate::display::{SharedDisplay, TranslationView, WordView, SOURCE_NONE};
use crate::input::InputEvent;
use crate::services::{cache_size_mb, clear_cache, DictionaryEntry, Voice};

/// Definitions shown per part of speech.
const MAX_DEFINITIONS: usize = 3;
/// Synonyms shown per part of speech.
const MAX_SYNONYMS: usize = 5;
/// Largest size the picture is drawn at.
const MAX_IMAGE_SIZE: egui::Vec2 = egui::vec2(300.0, 200.0);

const ACCENT: egui::Color32 = egui::Color32::from_rgb(68, 136, 255);
const DIM: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);
const TEXT: egui::Color32 = egui::Color32::from_rgb(220, 220, 220);

/// Snapshot of the display state taken once per frame, so the lock is never
/// held while widgets are laid out.
struct Snapshot {
    view: WordView,
    live_sentence: String,
    sentence_translation: String,
}

pub struct EnglishHelperApp {
    display: SharedDisplay,
    settings: LiveSettings,
    config: AppConfig,
    paths: AppPaths,
    input_tx: mpsc::Sender<InputEvent>,
    /// Size of the on-disk caches, refreshed after clearing.
    cache_mb: f64,
    /// Last known outer position, saved on exit.
    window_position: Option<egui::Pos2>,
}

impl EnglishHelperApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        display: SharedDisplay,
        settings: LiveSettings,
        config: AppConfig,
        paths: AppPaths,
        input_tx: mpsc::Sender<InputEvent>,
    ) -> Self {
        display.attach_repaint(cc.egui_ctx.clone());
        egui_extras::install_image_loaders(&cc.egui_ctx);
        let cache_mb = cache_size_mb(&paths);
        Self {
            display,
            settings,
            config,
            paths,
            input_tx,
            cache_mb,
            window_position: None,
        }
    }

    fn snapshot(&self) -> Snapshot {
        let st = self.display.lock();
        Snapshot {
            view: st.view.clone(),
            live_sentence: st.live_sentence.clone(),
            sentence_translation: st.sentence_translation.clone(),
        }
    }

    fn request(&self, event: InputEvent) {
        if let Err(e) = self.input_tx.try_send(event) {
            log::warn!("app: pipeline did not accept a request: {e}");
        }
    }

    // ── Word panel ───────────────────────────────────────────────────────

    fn draw_header(&self, ui: &mut egui::Ui, view: &WordView) {
        if view.word.is_empty() {
            ui.add_space(12.0);
            ui.label(egui::RichText::new("Type an English word…").color(DIM).size(14.0));
            return;
        }

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(&view.word).color(TEXT).strong().size(22.0));
            if let Some(phonetic) = view.dictionary.as_ref().and_then(|d| d.phonetic_text()) {
                ui.label(egui::RichText::new(phonetic).color(DIM).size(14.0));
            }
            for (label, voice) in [("US", Voice::Us), ("UK", Voice::Uk)] {
                let button = ui
                    .small_button(egui::RichText::new(format!("🔊 {label}")).size(11.0))
                    .on_hover_text(format!("Pronounce ({label})"));
                if button.clicked() {
                    self.request(InputEvent::Pronounce(voice));
                }
            }
        });

        let translation = match &view.translation {
            TranslationView::Loading => egui::RichText::new("...").color(DIM),
            TranslationView::Found(text) => egui::RichText::new(text).color(ACCENT),
            TranslationView::Missing => egui::RichText::new(&view.word).color(DIM).italics(),
        };
        ui.label(translation.size(16.0));
    }

    fn draw_meanings(&self, ui: &mut egui::Ui, view: &WordView) {
        if !view.word.is_empty() {
            self.draw_image(ui, view);
            ui.add_space(6.0);
        }

        let clicked = match &view.dictionary {
            Some(entry) => draw_entry(ui, entry),
            None if view.dictionary_loaded => {
                ui.label(egui::RichText::new("No dictionary entry").color(DIM).size(11.0));
                None
            }
            None if !view.word.is_empty() => {
                ui.label(egui::RichText::new("Loading meanings…").color(DIM).size(11.0));
                None
            }
            None => None,
        };
        if let Some(word) = clicked {
            self.request(InputEvent::Lookup { word, force: true });
        }
    }

    fn draw_image(&self, ui: &mut egui::Ui, view: &WordView) {
        match &view.image {
            Some(hit) => {
                ui.add(egui::Image::new(hit.uri()).max_size(MAX_IMAGE_SIZE))
                    .on_hover_text(format!("{} ({})", hit.path.display(), hit.source));
            }
            None => {
                let text = if view.image_source == SOURCE_NONE {
                    "No image"
                } else {
                    "Loading image…"
                };
                ui.label(egui::RichText::new(text).color(DIM).size(11.0));
            }
        }
    }

    // ── Footer ───────────────────────────────────────────────────────────

    fn draw_footer(&mut self, ui: &mut egui::Ui, view: &WordView) {
        ui.label(egui::RichText::new(view.status_line()).color(DIM).size(11.0));

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Level").color(DIM).size(11.0));
            if ui.small_button("-").clicked() {
                self.settings.adjust_vocab_level(-1);
            }
            ui.label(
                egui::RichText::new(self.settings.vocab_level().to_string())
                    .color(TEXT)
                    .size(12.0),
            );
            if ui.small_button("+").clicked() {
                self.settings.adjust_vocab_level(1);
            }

            ui.separator();
            let mut auto = self.settings.auto_pronounce();
            if ui.checkbox(&mut auto, "Auto-pronounce").changed() {
                self.settings.set_auto_pronounce(auto);
            }

            ui.separator();
            let mut sentence = self.settings.show_sentence_window();
            if ui.checkbox(&mut sentence, "Sentence").changed() {
                self.settings.set_show_sentence_window(sentence);
            }
        });

        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!("Cache: {:.1} MB", self.cache_mb))
                    .color(DIM)
                    .size(11.0),
            );
            if ui.small_button("Clear").clicked() {
                let removed = clear_cache(&self.paths);
                log::info!("app: cleared {removed} cached file(s)");
                self.cache_mb = cache_size_mb(&self.paths);
            }
        });
    }

    // ── Sentence panel ───────────────────────────────────────────────────

    fn draw_sentence(&self, ui: &mut egui::Ui, snapshot: &Snapshot) {
        ui.add_space(4.0);
        ui.label(
            egui::RichText::new(&snapshot.live_sentence)
                .color(TEXT)
                .monospace()
                .size(12.0),
        );
        ui.label(
            egui::RichText::new(&snapshot.sentence_translation)
                .color(ACCENT)
                .size(12.0),
        );
        ui.add_space(4.0);
    }
}

/// Returns the synonym that was clicked, if any.
fn draw_entry(ui: &mut egui::Ui, entry: &DictionaryEntry) -> Option<String> {
    let mut clicked = None;
    for meaning in &entry.meanings {
        ui.add_space(4.0);
        ui.label(
            egui::RichText::new(&meaning.part_of_speech)
                .color(ACCENT)
                .italics()
                .size(12.0),
        );
        for (i, def) in meaning.definitions.iter().take(MAX_DEFINITIONS).enumerate() {
            ui.label(
                egui::RichText::new(format!("{}. {}", i + 1, def.definition))
                    .color(TEXT)
                    .size(12.0),
            );
            if let Some(example) = def.example.as_deref().filter(|e| !e.is_empty()) {
                ui.label(
                    egui::RichText::new(format!("   “{example}”"))
                        .color(DIM)
                        .italics()
                        .size(11.0),
                );
            }
        }
        if !meaning.synonyms.is_empty() {
            ui.horizontal_wrapped(|ui| {
                ui.label(egui::RichText::new("≈").color(DIM).size(11.0));
                for synonym in meaning.synonyms.iter().take(MAX_SYNONYMS) {
                    let link = ui.link(egui::RichText::new(synonym).size(11.0));
                    if link.clicked() {
                        clicked = Some(synonym.clone());
                    }
                }
            });
        }
    }
    clicked
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for EnglishHelperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(rect) = ctx.input(|i| i.viewport().outer_rect) {
            self.window_position = Some(rect.min);
        }

        let snapshot = self.snapshot();
        let background = egui::Frame::new()
            .fill(egui::Color32::from_rgb(30, 30, 30))
            .inner_margin(egui::Margin::same(10));

        egui::TopBottomPanel::bottom("footer")
            .frame(background)
            .show(ctx, |ui| self.draw_footer(ui, &snapshot.view));

        if self.settings.show_sentence_window() {
            egui::TopBottomPanel::bottom("sentence")
                .frame(background.fill(egui::Color32::from_rgb(38, 38, 38)))
                .show(ctx, |ui| self.draw_sentence(ui, &snapshot));
        }

        egui::CentralPanel::default().frame(background).show(ctx, |ui| {
            self.draw_header(ui, &snapshot.view);
            ui.separator();
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| self.draw_meanings(ui, &snapshot.view));
        });
    }

    /// Persist live settings and window position, then stop the pipeline.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.write_back(&mut self.config.user);
        if let Some(pos) = self.window_position {
            self.config.ui.window_position = Some((pos.x, pos.y));
        }
        if let Err(e) = self.config.save() {
            log::warn!("app: failed to save settings: {e:#}");
        }
        if self.input_tx.try_send(InputEvent::Shutdown).is_err() {
            log::warn!("app: pipeline did not accept the shutdown request");
        }
        log::info!("app: companion window closing");
    }
}
