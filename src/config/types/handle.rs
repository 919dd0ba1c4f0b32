//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads. The CLI publishes the loaded config
//! once at startup; core components still receive what they need explicitly
//! and never read this handle themselves.

use crate::config::EditorConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<EditorConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(EditorConfig::default()));

#[inline]
pub fn cfg() -> Arc<EditorConfig> {
    CONFIG.load_full()
}

#[inline]
pub fn init_config(config: EditorConfig) -> Arc<EditorConfig> {
    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}
