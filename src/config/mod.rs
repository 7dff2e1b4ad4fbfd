//! Configuration module for English Helper.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform data directories, `LiveSettings` for values
//! the companion window changes at runtime, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod live;
pub mod paths;
pub mod settings;

pub use live::LiveSettings;
pub use paths::AppPaths;
pub use settings::{
    ApiConfig, AppConfig, AudioConfig, LayoutConfig, PipelineConfig, TranslationConfig, UiConfig,
    UserConfig,
};
