//! Turn a recorded waveform into piano key presses.
//!
//! A bank of sliding DFT bins, one per key, follows each key's frequency through the
//! recording. Their smoothed amplitudes are sampled at a fixed output rate and handed
//! to a scheduler that decides, frame by frame, which keys to press and release.

use indicatif::ProgressBar;
use serde::Deserialize;

pub mod audio;
pub mod error;
pub mod keys;
pub mod levels;
pub mod schedule;
pub mod sdft;
pub mod tsv;

pub use error::{Error, Result};
pub use schedule::{KeyEvent, NoteEventScheduler, ScheduleConfig};
pub use sdft::{Analysis, Key, KeyBank, SmoothingWindows};

/// Frame-major table: `matrix[frame][key]`.
pub type Matrix<T> = Vec<Vec<T>>;

/// Key updates per second the player piano can keep up with.
pub const DEFAULT_OUTPUT_RATE: u32 = 15;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// onset volumes with an exponential decay projection
    #[default]
    Decay,
    /// press whenever a key gets louder
    Rising,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub frequencies: Vec<f64>,
    pub output_rate: u32,
    pub windows: SmoothingWindows,
    /// amplitude that maps to 100%
    pub reference_amplitude: f64,
    pub mode: ScheduleMode,
    pub schedule: ScheduleConfig,
    pub rising_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frequencies: keys::piano_key_frequencies(),
            output_rate: DEFAULT_OUTPUT_RATE,
            windows: SmoothingWindows::default(),
            reference_amplitude: levels::DEFAULT_REFERENCE_AMPLITUDE,
            mode: ScheduleMode::default(),
            schedule: ScheduleConfig::default(),
            rising_threshold: schedule::rising::DEFAULT_RISING_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Transcription {
    pub analysis: Analysis,
    /// amplitudes as percentages of the reference amplitude
    pub percent: Matrix<f64>,
    pub events: Matrix<KeyEvent>,
}

/// Events for a table of percentages, using the scheduler `settings` selects.
pub fn schedule_events(percent: &Matrix<f64>, settings: &Settings) -> Matrix<KeyEvent> {
    match settings.mode {
        ScheduleMode::Decay => NoteEventScheduler::new(settings.schedule).schedule_percent(percent),
        ScheduleMode::Rising => {
            schedule::rising::rising_note_matrix(percent, settings.rising_threshold)
        }
    }
}

pub fn transcribe(samples: &[f64], sample_rate: u32, settings: &Settings) -> Result<Transcription> {
    transcribe_with_progress(samples, sample_rate, settings, ProgressBar::hidden())
}

/// [`transcribe`], reporting each analyzed key on `progress`.
pub fn transcribe_with_progress(
    samples: &[f64],
    sample_rate: u32,
    settings: &Settings,
    progress: ProgressBar,
) -> Result<Transcription> {
    let bank = KeyBank::new(
        &settings.frequencies,
        sample_rate,
        settings.output_rate,
        settings.windows,
    )?
    .with_progress(progress);

    let analysis = bank.analyze(samples);

    let percent = levels::percent_matrix(&analysis.amplitudes, settings.reference_amplitude);
    let events = schedule_events(&percent, settings);

    Ok(Transcription {
        analysis,
        percent,
        events,
    })
}
