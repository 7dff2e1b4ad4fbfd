//! Application entry point for English Helper.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run) and create
//!    the cache directories.
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Load the vocabulary list (downloaded on first run).
//! 5. Build the lookup services from config.
//! 6. Spawn the [`PipelineRunner`] on the runtime.
//! 7. Start the global keyboard listener thread.
//! 8. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed, then wait a bounded time for the pipeline to stop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use eframe::egui;
use english_helper::{
    app::EnglishHelperApp,
    config::{AppConfig, AppPaths, LayoutConfig, LiveSettings},
    display::SharedDisplay,
    input::{InputEvent, KeyboardListener, LayoutSource, SystemClipboard},
    pipeline::PipelineRunner,
    services::{
        CommandPlayer, DictionaryApi, FallbackTranslator, GoogleTranslator, HttpClient,
        JsonTranslationCache, Services, Translator, TtsAudioCache, Vocabulary, Voice, WebImages,
        YandexTranslator,
    },
};
use tokio::sync::mpsc;

/// Capacity of the input event channel.
const INPUT_CHANNEL: usize = 256;

// ---------------------------------------------------------------------------
// Service wiring
// ---------------------------------------------------------------------------

fn build_services(config: &AppConfig, paths: &AppPaths, vocab: Vocabulary, voice: Voice) -> Services {
    let tr = &config.translation;
    let http = HttpClient::new(Duration::from_secs(tr.timeout_secs));

    let google = Arc::new(GoogleTranslator::new(http.clone(), &tr.source_lang, &tr.target_lang));
    let mut chain: Vec<Arc<dyn Translator>> = Vec::new();
    match config.api.yandex_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => chain.push(Arc::new(YandexTranslator::new(
            http.clone(),
            key,
            &tr.source_lang,
            &tr.target_lang,
        ))),
        None => log::info!("No Yandex key configured; using Google only"),
    }
    chain.push(google.clone());

    let audio_cache = Arc::new(TtsAudioCache::new(http.clone(), &paths.audio_dir));
    let dictionary = DictionaryApi::new(http.clone(), &paths.dicts_dir, Arc::clone(&audio_cache), voice);

    Services {
        vocab: Arc::new(vocab),
        translation_cache: Arc::new(JsonTranslationCache::new(&paths.dicts_dir)),
        translator: Arc::new(FallbackTranslator::new(chain)),
        sentence_translator: google,
        images: Arc::new(WebImages::new(
            http.clone(),
            &paths.images_dir,
            config.api.pexels_key.clone(),
        )),
        dictionary: Arc::new(dictionary),
        audio_store: audio_cache,
        audio_player: Arc::new(CommandPlayer::new(http, config.audio.player.as_deref())),
    }
}

#[cfg(windows)]
fn layout_source(_config: &LayoutConfig) -> Box<dyn LayoutSource> {
    Box::new(english_helper::input::ForegroundWindowLayout)
}

#[cfg(not(windows))]
fn layout_source(config: &LayoutConfig) -> Box<dyn LayoutSource> {
    use english_helper::input::{CommandLayout, FixedLayout};

    let command = config.command.as_deref().unwrap_or_default();
    match CommandLayout::new(command, &config.target_layout) {
        Some(source) => Box::new(source),
        None => {
            log::warn!(
                "No layout command configured; every layout is treated as English, \
                 so text typed in another layout is looked up as English words"
            );
            Box::new(FixedLayout(true))
        }
    }
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (w, h) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("English Helper")
        .with_inner_size([w, h])
        .with_min_inner_size([320.0, 360.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("English Helper starting up");

    // 2. Configuration and cache directories
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let paths = AppPaths::new();
    paths
        .ensure_dirs()
        .with_context(|| format!("failed to create {}", paths.data_dir.display()))?;

    // 3. Tokio runtime (2 worker threads, lookups are I/O bound)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Vocabulary
    let vocab = rt
        .block_on(Vocabulary::load_or_download(&paths.vocab_file))
        .unwrap_or_else(|e| {
            log::warn!("Vocabulary unavailable ({e:#}); using the built-in list");
            Vocabulary::fallback()
        });

    // 5. Services
    let voice: Voice = config.user.voice.parse().unwrap_or_else(|e| {
        log::warn!("{e}; using the US voice");
        Voice::default()
    });
    let services = build_services(&config, &paths, vocab, voice);
    let settings = LiveSettings::new(&config.user);
    let display = SharedDisplay::new();

    // 6. Pipeline runner
    let (input_tx, input_rx) = mpsc::channel::<InputEvent>(INPUT_CHANNEL);
    let layout = layout_source(&config.layout);
    let runner = PipelineRunner::new(
        &config.pipeline,
        services,
        Arc::new(display.clone()),
        settings.clone(),
        layout,
        Arc::new(SystemClipboard::new(config.pipeline.max_clipboard_word_len)),
        voice,
    );
    let runner_handle = rt.spawn(runner.run(input_rx));

    // 7. Keyboard listener thread
    let _listener = match KeyboardListener::start(input_tx.clone()) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::error!("Failed to start keyboard listener: {e}");
            None
        }
    };

    // 8. Companion window (blocks until closed)
    let options = native_options(&config);
    let grace = config.pipeline.shutdown_grace();
    let app_tx = input_tx.clone();
    let result = eframe::run_native(
        "English Helper",
        options,
        Box::new(move |cc| {
            Ok(Box::new(EnglishHelperApp::new(
                cc, display, settings, config, paths, app_tx,
            )))
        }),
    );

    // The window may close without on_exit running (e.g. a failed start).
    let _ = input_tx.try_send(InputEvent::Shutdown);
    let joined = rt.block_on(async {
        tokio::time::timeout(grace + Duration::from_millis(500), runner_handle).await
    });
    if joined.is_err() {
        log::warn!("Pipeline did not stop in time; exiting anyway");
    }
    rt.shutdown_timeout(Duration::from_millis(200));

    result.map_err(|e| anyhow::anyhow!("companion window failed: {e}"))
}
