use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Mono waveform on a signed 16-bit scale.
pub struct AudioData {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// The first decodable track of a probed file.
struct Source {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    channels: usize,
    sample_rate: u32,
}

impl Source {
    fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let format = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .context("Failed to probe audio format")?
            .format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio tracks found")?;

        let track_id = track.id;
        let params = track.codec_params.clone();
        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .context("Failed to create audio decoder")?;

        Ok(Self {
            track_id,
            channels: params.channels.map_or(1, |c| c.count()),
            sample_rate: params.sample_rate.context("Unknown sample rate")?,
            format,
            decoder,
        })
    }
}

/// Average each interleaved frame into one sample. A trailing partial frame is dropped.
pub fn downmix(interleaved: &[i16], channels: usize) -> impl Iterator<Item = f64> + '_ {
    let channels = channels.max(1);

    interleaved
        .chunks_exact(channels)
        .map(move |frame| frame.iter().map(|&s| s as f64).sum::<f64>() / channels as f64)
}

/// Decode the first audio track of `path` and downmix every channel into one.
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let Source {
        mut format,
        mut decoder,
        track_id,
        channels,
        sample_rate,
    } = Source::open(path)?;

    let mut samples: Vec<f64> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(err)) => {
                log::debug!("skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        // the key bank expects integer PCM levels, not [-1, 1]
        let mut pcm = SampleBuffer::<i16>::new(decoded.frames() as u64, *decoded.spec());
        pcm.copy_interleaved_ref(decoded);

        samples.extend(downmix(pcm.samples(), channels));
    }

    let audio = AudioData {
        samples,
        sample_rate,
    };

    log::info!(
        "Decoded audio: {} samples, {}Hz, {} channel(s), {:.1}s",
        audio.samples.len(),
        audio.sample_rate,
        channels,
        audio.duration()
    );

    Ok(audio)
}
