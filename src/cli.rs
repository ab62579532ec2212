use clap::Parser;
use sliding_piano::ScheduleMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sliding-piano", about = "Turn a recording into piano key presses")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Directory for the amplitude table, event table and bin plans
    #[arg(short, long, default_value = "out")]
    pub output_dir: PathBuf,

    /// Config file (defaults to ./sliding-piano.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output frames per second
    #[arg(long, default_value_t = 15)]
    pub rate: u32,

    /// Samples in the amplitude moving average
    #[arg(long, default_value_t = 3200)]
    pub amplitude_window: usize,

    /// Samples in the reconstructed-sample moving average
    #[arg(long, default_value_t = 3200)]
    pub sample_window: usize,

    /// Amplitude that counts as 100% in the amplitude table
    #[arg(long, default_value_t = 32767.0)]
    pub reference_amplitude: f64,

    /// How key events are chosen
    #[arg(long, value_enum, default_value_t = ScheduleMode::Decay)]
    pub mode: ScheduleMode,

    /// Decay constant for the onset projection (negative)
    #[arg(long, default_value_t = -0.2, allow_hyphen_values = true)]
    pub decay: f64,

    /// Levels below this fraction of the reference amplitude count as silence
    #[arg(long, default_value_t = 0.08)]
    pub threshold: f64,

    /// Minimum strength for a press in rising mode
    #[arg(long, default_value_t = 0.05)]
    pub rising_threshold: f64,

    /// Schedule events from an existing amplitude table instead of decoding audio
    #[arg(long, conflicts_with = "input")]
    pub from_tsv: Option<PathBuf>,

    /// Log how far each key's sliding DFT drifted from an exact DFT
    #[arg(long)]
    pub check_drift: bool,
}
