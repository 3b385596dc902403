//! Microphone capture and stream playback contracts.
//!
//! Both devices are external collaborators. The recorder pushes captured
//! PCM16 chunks into an [`AudioSink`]; the player queues PCM16 per track and
//! reports where playback stopped when interrupted.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::realtime::TrackSampleOffset;

/// Errors reported by the audio devices.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Microphone or output device could not be acquired
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Permission to use the device was denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation not valid in the current recorder state
    #[error("Invalid recorder state: expected {expected}, found {found}")]
    InvalidState {
        expected: RecorderStatus,
        found: RecorderStatus,
    },

    /// WAV encoding failed
    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub type AudioResult<T> = Result<T, AudioError>;

/// Channel end the recorder writes captured chunks into.
pub type AudioSink = mpsc::UnboundedSender<Bytes>;

/// Recorder lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderStatus {
    /// No microphone session
    #[default]
    Ended,
    /// Microphone acquired, not capturing
    Paused,
    /// Capturing into a sink
    Recording,
}

impl std::fmt::Display for RecorderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderStatus::Ended => write!(f, "ended"),
            RecorderStatus::Paused => write!(f, "paused"),
            RecorderStatus::Recording => write!(f, "recording"),
        }
    }
}

/// Microphone capture.
#[async_trait]
pub trait AudioRecorder: Send {
    /// Acquire the microphone.
    async fn begin(&mut self) -> AudioResult<()>;

    /// Start capturing; every chunk is sent to `sink`.
    async fn record(&mut self, sink: AudioSink) -> AudioResult<()>;

    /// Stop capturing but keep the microphone.
    async fn pause(&mut self) -> AudioResult<()>;

    /// Release the microphone.
    async fn end(&mut self) -> AudioResult<()>;

    fn status(&self) -> RecorderStatus;
}

/// Streaming PCM playback.
#[async_trait]
pub trait StreamPlayer: Send {
    /// Acquire the audio output.
    async fn connect(&mut self) -> AudioResult<()>;

    /// Queue a PCM16 chunk on a track.
    fn add_16bit_pcm(&mut self, pcm: Bytes, track_id: &str) -> AudioResult<()>;

    /// Stop playback; returns where the current track was cut, if any played.
    async fn interrupt(&mut self) -> AudioResult<Option<TrackSampleOffset>>;
}

/// Wrap little-endian PCM16 into a WAV container.
pub fn encode_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> AudioResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AudioError::Encoding(e.to_string()))?;
        for frame in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([frame[0], frame[1]]))
                .map_err(|e| AudioError::Encoding(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::Encoding(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Read a WAV file's samples back into little-endian PCM16.
pub fn decode_wav(wav: &[u8]) -> AudioResult<(Vec<u8>, u32)> {
    let mut reader =
        hound::WavReader::new(Cursor::new(wav)).map_err(|e| AudioError::Encoding(e.to_string()))?;
    let sample_rate = reader.spec().sample_rate;
    let mut pcm = Vec::with_capacity(reader.len() as usize * 2);
    for sample in reader.samples::<i16>() {
        let sample = sample.map_err(|e| AudioError::Encoding(e.to_string()))?;
        pcm.extend_from_slice(&sample.to_le_bytes());
    }
    Ok((pcm, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wav_header_and_length() {
        let pcm: Vec<u8> = [0i16, 1000, -1000, i16::MAX]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let wav = encode_wav(&pcm, 24_000, 1).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + pcm.len());
    }

    #[test]
    fn test_decode_wav_restores_samples() {
        let pcm: Vec<u8> = [5i16, -5, 300].iter().flat_map(|s| s.to_le_bytes()).collect();
        let wav = encode_wav(&pcm, 16_000, 1).unwrap();
        let (decoded, rate) = decode_wav(&wav).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(decoded, pcm);
    }

    #[test]
    fn test_encode_wav_ignores_trailing_odd_byte() {
        let wav = encode_wav(&[1, 0, 7], 24_000, 1).unwrap();
        assert_eq!(wav.len(), 46);
    }

    #[test]
    fn test_recorder_status_display() {
        assert_eq!(RecorderStatus::Recording.to_string(), "recording");
        assert_eq!(RecorderStatus::default(), RecorderStatus::Ended);
    }
}
