// File: azuria-core/src/test_utils/helpers.rs

use std::path::Path;
use std::time::Duration;

use azuria_common::models::BotIdentity;

use crate::settings::Settings;
use crate::Error;

/// Writes a unit file at `root/rel`, creating parent directories.
pub fn write_unit(root: &Path, rel: &str, contents: &str) -> Result<(), Error> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Settings rooted at `base_dir` with short timeouts.
pub fn test_settings(base_dir: &Path) -> Settings {
    let mut settings = Settings::new("http://127.0.0.1:9", "test-token").with_base_dir(base_dir);
    settings.http_timeout = Duration::from_secs(2);
    settings.startup_timeout = Duration::from_secs(5);
    settings.push_reconnect_delay = Duration::from_millis(50);
    settings
}

pub fn sample_identity() -> BotIdentity {
    BotIdentity::new("100000000000000001", "200000000000000002")
}
