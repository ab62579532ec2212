use serde::Deserialize;
use sliding_piano::ScheduleMode;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_output_rate")]
    pub output_rate: u32,
    #[serde(default = "default_window")]
    pub amplitude_window: usize,
    #[serde(default = "default_window")]
    pub sample_window: usize,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub mode: ScheduleMode,
    #[serde(default = "default_decay")]
    pub decay: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_rising_threshold")]
    pub rising_threshold: f64,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_reference_amplitude")]
    pub reference_amplitude: f64,
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            output_rate: default_output_rate(),
            amplitude_window: default_window(),
            sample_window: default_window(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::default(),
            decay: default_decay(),
            threshold: default_threshold(),
            rising_threshold: default_rising_threshold(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            reference_amplitude: default_reference_amplitude(),
            dir: default_dir(),
        }
    }
}

fn default_output_rate() -> u32 { sliding_piano::DEFAULT_OUTPUT_RATE }
fn default_window() -> usize { sliding_piano::sdft::moving_average::DEFAULT_WINDOW }
fn default_decay() -> f64 { sliding_piano::ScheduleConfig::default().decay }
fn default_threshold() -> f64 { sliding_piano::ScheduleConfig::default().threshold }
fn default_rising_threshold() -> f64 { sliding_piano::schedule::rising::DEFAULT_RISING_THRESHOLD }
fn default_reference_amplitude() -> f64 { sliding_piano::levels::DEFAULT_REFERENCE_AMPLITUDE }
fn default_dir() -> PathBuf { "out".into() }

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// `--config`, then `./sliding-piano.toml`, then the user config directories.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from("sliding-piano.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("sliding-piano").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("sliding-piano").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
