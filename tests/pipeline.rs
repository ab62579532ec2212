use sliding_piano::keys::piano_key_frequencies;
use sliding_piano::{tsv, transcribe, KeyEvent, ScheduleMode, Settings, SmoothingWindows};

const SAMPLE_RATE: u32 = 8_000;

/// half a second of silence, then 440Hz until the end
fn late_tone(len: usize) -> Vec<f64> {
    let start = SAMPLE_RATE as usize / 2;

    (0..len)
        .map(|n| {
            if n < start {
                0.0
            } else {
                let t = (n - start) as f64 / SAMPLE_RATE as f64;
                10_000.0 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()
            }
        })
        .collect()
}

fn settings(mode: ScheduleMode) -> Settings {
    Settings {
        output_rate: 10,
        windows: SmoothingWindows {
            amplitude: 32,
            sample: 32,
        },
        mode,
        ..Settings::default()
    }
}

fn column_of(frequency: f64, keys: &[sliding_piano::Key]) -> usize {
    keys.iter().position(|k| k.frequency == frequency).unwrap()
}

#[test_log::test]
fn matrices_share_shape() {
    let samples = late_tone(16_000);

    let result = transcribe(&samples, SAMPLE_RATE, &settings(ScheduleMode::Decay)).unwrap();
    let analysis = &result.analysis;

    let keys = analysis.keys.len();
    assert_eq!(keys, piano_key_frequencies().len());

    let frames = analysis.amplitudes.len();
    assert_eq!(frames, 20);

    for matrix_width in [
        analysis.amplitudes.iter().map(Vec::len).collect::<Vec<_>>(),
        analysis.reconstructed.iter().map(Vec::len).collect(),
        result.percent.iter().map(Vec::len).collect(),
        result.events.iter().map(Vec::len).collect(),
    ] {
        assert_eq!(matrix_width, vec![keys; frames]);
    }
}

#[test_log::test]
fn tone_dominates_its_key() {
    let samples = late_tone(16_000);

    let result = transcribe(&samples, SAMPLE_RATE, &settings(ScheduleMode::Decay)).unwrap();
    let a4 = column_of(440.0, &result.analysis.keys);

    for (t, row) in result.percent.iter().enumerate().skip(6) {
        let loudest = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(j, _)| j)
            .unwrap();
        assert_eq!(loudest, a4, "frame {t}");
    }

    // silence before the tone
    for row in &result.percent[..5] {
        assert!(row.iter().all(|&p| p == 0.0));
    }
}

#[test_log::test]
fn rising_mode_presses_at_the_onset() {
    let samples = late_tone(16_000);

    let result = transcribe(&samples, SAMPLE_RATE, &settings(ScheduleMode::Rising)).unwrap();
    let a4 = column_of(440.0, &result.analysis.keys);

    for row in &result.events[..6] {
        assert_eq!(row[a4], KeyEvent::Steady);
    }

    match result.events[6][a4] {
        KeyEvent::Press(strength) => assert!(strength > 0.99, "{strength}"),
        other => panic!("expected a press, got {other:?}"),
    }
}

#[test]
fn empty_and_short_recordings() {
    let settings = settings(ScheduleMode::Decay);

    let empty = transcribe(&[], SAMPLE_RATE, &settings).unwrap();
    assert!(empty.analysis.amplitudes.is_empty());
    assert!(empty.events.is_empty());

    let short = transcribe(&[100.0; 10], SAMPLE_RATE, &settings).unwrap();
    assert_eq!(short.events.len(), 1);
    assert_eq!(short.events[0].len(), short.analysis.keys.len());
}

#[test]
fn amplitude_table_reads_back() {
    let samples = late_tone(8_000);
    let settings = settings(ScheduleMode::Decay);
    let result = transcribe(&samples, SAMPLE_RATE, &settings).unwrap();
    let analysis = &result.analysis;

    let mut buf = Vec::new();
    tsv::write_amplitude_table(
        &mut buf,
        &analysis.keys,
        &analysis.amplitudes,
        settings.output_rate,
        settings.reference_amplitude,
    )
    .unwrap();

    let table = tsv::read_table(buf.as_slice()).unwrap();

    assert_eq!(table.keys, analysis.keys);
    assert_eq!(table.time_stamps, (0..10).map(|i| i * 100).collect::<Vec<u64>>());
    for (read, percent) in table.rows.iter().zip(&result.percent) {
        for (a, b) in read.iter().zip(percent) {
            assert!((a - b).abs() <= 0.005 + 1e-9);
        }
    }

    // rounding to two decimals can move velocities, so only the layout is compared
    let events = sliding_piano::schedule_events(&table.rows, &settings);
    assert_eq!(
        events.iter().map(Vec::len).collect::<Vec<_>>(),
        result.events.iter().map(Vec::len).collect::<Vec<_>>()
    );
}
