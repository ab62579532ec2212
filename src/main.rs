mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use cli::Cli;
use sliding_piano::audio::decode::decode_audio;
use sliding_piano::keys::key_label;
use sliding_piano::sdft::BinPlan;
use sliding_piano::{tsv, KeyEvent, ScheduleConfig, Settings, SmoothingWindows};

#[derive(Serialize)]
struct PlanEntry<'a> {
    key: usize,
    label: String,
    #[serde(flatten)]
    plan: &'a BinPlan,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    if let Some(ref path) = config::find_config(cli.config.as_deref()) {
        match config::load_config(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                // Merge: config values apply only when CLI is at its default
                if cli.rate == 15 { cli.rate = cfg.analysis.output_rate; }
                if cli.amplitude_window == 3200 { cli.amplitude_window = cfg.analysis.amplitude_window; }
                if cli.sample_window == 3200 { cli.sample_window = cfg.analysis.sample_window; }
                if cli.mode == Default::default() { cli.mode = cfg.schedule.mode; }
                if cli.decay == -0.2 { cli.decay = cfg.schedule.decay; }
                if cli.threshold == 0.08 { cli.threshold = cfg.schedule.threshold; }
                if cli.rising_threshold == 0.05 { cli.rising_threshold = cfg.schedule.rising_threshold; }
                if cli.reference_amplitude == 32767.0 { cli.reference_amplitude = cfg.output.reference_amplitude; }
                if cli.output_dir == Path::new("out") { cli.output_dir = cfg.output.dir; }
            }
            Err(err) => log::warn!("Failed to load config from {}: {:#}", path.display(), err),
        }
    }

    let settings = Settings {
        output_rate: cli.rate,
        windows: SmoothingWindows {
            amplitude: cli.amplitude_window,
            sample: cli.sample_window,
        },
        reference_amplitude: cli.reference_amplitude,
        mode: cli.mode,
        schedule: ScheduleConfig {
            decay: cli.decay,
            threshold: cli.threshold,
        },
        rising_threshold: cli.rising_threshold,
        ..Settings::default()
    };

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("Failed to create {}", cli.output_dir.display()))?;

    if let Some(ref table) = cli.from_tsv {
        return schedule_table(table, &cli.output_dir, &settings);
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("sliding-piano");
    log::info!("Input: {}", input.display());
    log::info!("Output: {}", cli.output_dir.display());
    log::info!("Rate: {} frames/s, mode: {:?}", settings.output_rate, settings.mode);

    // 1. Decode audio
    log::info!("Decoding audio...");
    let audio = decode_audio(input)?;

    // 2. Key bank + scheduler
    log::info!("Analyzing {} keys...", settings.frequencies.len());
    let pb = ProgressBar::new(settings.frequencies.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} keys ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let transcription =
        sliding_piano::transcribe_with_progress(&audio.samples, audio.sample_rate, &settings, pb)?;
    let analysis = &transcription.analysis;

    if cli.check_drift {
        let worst = analysis
            .drift
            .iter()
            .zip(&analysis.keys)
            .max_by(|a, b| a.0.total_cmp(b.0));
        if let Some((drift, key)) = worst {
            log::info!(
                "Worst drift: {:e} on {}",
                drift,
                key_label(key.index, key.frequency)
            );
        }
    }

    // 3. Write tables
    let stem = file_stem(input);

    let amplitude_path = cli.output_dir.join(format!("{stem}.tsv"));
    tsv::write_amplitude_table(
        BufWriter::new(create(&amplitude_path)?),
        &analysis.keys,
        &analysis.amplitudes,
        settings.output_rate,
        settings.reference_amplitude,
    )?;
    log::info!("Wrote {}", amplitude_path.display());

    let events_path = cli.output_dir.join(format!("{stem}.events.tsv"));
    write_events(&events_path, &transcription.events, |w| {
        tsv::write_event_table(w, &analysis.keys, &transcription.events, settings.output_rate)
    })?;

    let plans_path = cli.output_dir.join(format!("{stem}.plans.json"));
    let plans: Vec<PlanEntry> = analysis
        .keys
        .iter()
        .zip(&analysis.plans)
        .map(|(key, plan)| PlanEntry {
            key: key.index,
            label: key_label(key.index, key.frequency),
            plan,
        })
        .collect();
    serde_json::to_writer_pretty(BufWriter::new(create(&plans_path)?), &plans)
        .with_context(|| format!("Failed to write {}", plans_path.display()))?;
    log::info!("Wrote {}", plans_path.display());

    log::info!("Done: {} frames, {:.1}s of audio", analysis.amplitudes.len(), audio.duration());

    Ok(())
}

/// Schedule events from a previously written amplitude table.
fn schedule_table(path: &Path, output_dir: &Path, settings: &Settings) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let table = tsv::read_table(BufReader::new(file))
        .with_context(|| format!("Failed to read {}", path.display()))?;

    log::info!(
        "Read {} frames x {} keys from {}",
        table.rows.len(),
        table.keys.len(),
        path.display()
    );

    let events = sliding_piano::schedule_events(&table.rows, settings);

    let events_path = output_dir.join(format!("{}.events.tsv", file_stem(path)));
    // the table's own time stamps, whatever rate it was written at
    write_events(&events_path, &events, |w| {
        tsv::write_event_table_at(w, &table.keys, &events, &table.time_stamps)
    })
}

fn write_events<F>(path: &Path, events: &sliding_piano::Matrix<KeyEvent>, write: F) -> Result<()>
where
    F: FnOnce(BufWriter<File>) -> sliding_piano::Result<()>,
{
    let presses = events
        .iter()
        .flatten()
        .filter(|e| matches!(e, KeyEvent::Press(_)))
        .count();

    write(BufWriter::new(create(path)?))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {} ({} presses)", path.display(), presses);

    Ok(())
}

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".into())
}
