use std::{env, path::PathBuf};

pub const BOT_PREFIX: &str = "!";

/// Accent colour of every reply embed.
pub const EMBED_COLOUR: u32 = 0xf5a623;

/// Seconds-resolution cron line: top of every hour.
pub const CHIME_CRON: &str = "0 0 * * * *";

pub const DEFAULT_SETTINGS_PATH: &str = "guilds.json";
pub const DEFAULT_CHIME_PATH: &str = "chime.mp3";

pub fn settings_path() -> PathBuf {
    if let Ok(path) = env::var("CARILLON_BOT_SETTINGS") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_SETTINGS_PATH)
}

pub fn chime_path() -> PathBuf {
    if let Ok(path) = env::var("CARILLON_BOT_CHIME") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CHIME_PATH)
}
