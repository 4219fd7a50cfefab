//! Environment configuration for the appliance.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Everything the daemon needs from the environment. Defaults match the
/// deployed device; only the API credentials are mandatory.
#[derive(Debug, Clone)]
pub struct Config {
    pub deepseek_api_key: String,
    pub replicate_api_token: String,
    pub serial_port: String,
    pub baud_rate: u32,
    pub gpio_chip: String,
    pub button_line: u32,
    pub uploads_dir: PathBuf,
    pub images_dir: PathBuf,
    pub capture_command: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            deepseek_api_key: require("DEEPSEEK_API_KEY")?,
            replicate_api_token: require("REPLICATE_API_TOKEN")?,
            serial_port: env_or("VERSECAM_SERIAL_PORT", "/dev/serial0"),
            baud_rate: env_u32("VERSECAM_BAUD_RATE", 9600),
            gpio_chip: env_or("VERSECAM_GPIO_CHIP", "/dev/gpiochip0"),
            button_line: env_u32("VERSECAM_BUTTON_LINE", 21),
            uploads_dir: env_or("VERSECAM_UPLOADS_DIR", "uploads").into(),
            images_dir: env_or("VERSECAM_IMAGES_DIR", "images").into(),
            capture_command: env_or("VERSECAM_CAPTURE_COMMAND", "rpicam-still"),
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} is not set"))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}
