use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::warn;

use crate::shared::config::model::{Settings, load_settings};

pub static CONFIG: Lazy<Arc<Settings>> = Lazy::new(|| {
    Arc::new(load_settings().unwrap_or_else(|e| {
        warn!("Falling back to default settings: {}", e);
        Settings::default()
    }))
});
