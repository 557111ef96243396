//! # Audio Decoding
//!
//! Turns the opaque byte buffer received from the transport layer into a
//! validated waveform. Decoding goes through symphonia, reading the payload
//! from an in-memory cursor.
//!
//! ## Contract:
//! - The declared container format is checked before a single byte is parsed;
//!   anything other than the accepted set fails with `UnsupportedFormat`.
//! - Corrupt, truncated, empty, or non-audio payloads fail with a decode
//!   error carrying the underlying cause.
//! - The source sample rate is preserved as-is (no resampling), so downstream
//!   spectral analysis operates at the clip's native time resolution.
//! - Multi-channel audio is mixed down to mono by averaging; spectral
//!   analysis works on a single channel.

use crate::error::{AppError, AppResult};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded audio: mono amplitude samples at the clip's native sample rate.
///
/// ## Invariants:
/// - `sample_rate` is always greater than zero.
/// - `samples` is non-empty for any successfully decoded input.
///
/// The waveform is produced once per request, read by feature extraction,
/// and dropped afterwards; nothing retains it across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Mono amplitude samples in the [-1.0, 1.0] range.
    pub samples: Vec<f32>,

    /// Native sample rate of the source in Hz.
    pub sample_rate: u32,
}

impl Waveform {
    /// Clip duration in seconds, derived from sample count and rate.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an encoded audio payload into a mono waveform.
///
/// ## Failure modes:
/// - `UnsupportedFormat` when the normalized `declared_format` is not in
///   `accepted_formats` (checked before any decoding is attempted).
/// - `Decode` when the payload cannot be probed or decoded as audio of the
///   claimed container, or when the stream reports no usable track or
///   sample rate.
pub fn decode(bytes: &[u8], declared_format: &str, accepted_formats: &[String]) -> AppResult<Waveform> {
    let format = declared_format.trim().to_ascii_lowercase();
    if !accepted_formats.iter().any(|f| f.eq_ignore_ascii_case(&format)) {
        return Err(AppError::UnsupportedFormat(format!(
            "'{}' is not an accepted audio format (expected one of: {})",
            declared_format,
            accepted_formats.join(", ")
        )));
    }

    debug!(payload_bytes = bytes.len(), format = %format, "Decoding audio payload");

    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(&format);

    let probed = symphonia::default::get_probe()
        .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AppError::Decode(format!("unable to read {} payload: {}", format, e)))?;

    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AppError::Decode("no audio track found in payload".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| AppError::Decode("sample rate missing from audio stream".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AppError::Decode(format!("unsupported codec in payload: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(symphonia::core::errors::Error::ResetRequired) => break,
            Err(e) => {
                // A read failure after some frames decoded is a truncated
                // tail; with nothing decoded yet the payload is unusable.
                if samples.is_empty() {
                    return Err(AppError::Decode(format!("failed to read audio packet: {}", e)));
                }
                warn!("Stopping decode on packet read error: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let capacity = decoded.capacity() as u64;
                let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(capacity, spec));
                buf.copy_interleaved_ref(decoded);

                let channels = spec.channels.count().max(1);
                for frame in buf.samples().chunks_exact(channels) {
                    samples.push(frame.iter().sum::<f32>() / channels as f32);
                }
            }
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => {
                return Err(AppError::Decode(format!("audio decode failure: {}", e)));
            }
        }
    }

    if samples.is_empty() {
        return Err(AppError::Decode("no decodable audio frames in payload".to_string()));
    }

    debug!(
        sample_count = samples.len(),
        sample_rate, "Decoded payload to mono waveform"
    );

    Ok(Waveform { samples, sample_rate })
}
