use std::sync::Arc;

use anyhow::Result;

use crate::config;
use crate::feed::Feed;
use crate::settings;
use crate::ui;

/// Fixed demo seed: the same wall of videos every launch.
const FEED_SEED: u64 = 0x5EED;

pub fn run() -> Result<()> {
    let loaded = config::load(config::LoadOptions::default());
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let store = Arc::new(settings::Store::new(loaded, config_path));
    let feed = Feed::new(FEED_SEED);

    let options = ui::Options {
        settings: store,
        feed,
        config_path: display_path,
    };

    let mut model = ui::Model::new(options);
    model.run()
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/vidnav/config.yaml".to_string()
    }
}
