//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per subsystem,
//! `AppPaths` for the platform config directory, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, ChatModel, HotkeyConfig, SegmenterConfig, SpeechConfig, SpeechModel,
    TranslationConfig, Voice, API_KEY_ENV,
};
