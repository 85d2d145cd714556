//! Decoding downloaded previews into impulse buffers.

use lewton::inside_ogg::OggStreamReader;
use std::io::Cursor;

use crate::audio::ImpulseBuffer;
use crate::error::DecodeError;
use crate::params::audio_constants::DEFAULT_MAX_IMPULSE_S;

/// Turns encoded audio into a buffer at the graph's sample rate
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], sample_rate: u32) -> Result<ImpulseBuffer, DecodeError>;
}

/// Ogg Vorbis and WAV decoder, resampling to the requested rate
#[derive(Debug, Clone, Copy)]
pub struct SampleDecoder {
    /// Decoded audio beyond this is dropped before resampling (seconds)
    max_duration_s: Option<f32>,
}

impl SampleDecoder {
    /// Decoder keeping at most `max_duration_s` seconds; `None` keeps everything
    pub fn new(max_duration_s: Option<f32>) -> Self {
        Self { max_duration_s }
    }
}

impl Default for SampleDecoder {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_IMPULSE_S))
    }
}

impl AudioDecoder for SampleDecoder {
    fn decode(&self, bytes: &[u8], sample_rate: u32) -> Result<ImpulseBuffer, DecodeError> {
        let decoded = if bytes.starts_with(b"OggS") {
            decode_vorbis(bytes)?
        } else if bytes.starts_with(b"RIFF") {
            decode_wav(bytes)?
        } else {
            return Err(DecodeError::UnsupportedFormat);
        };

        if decoded.is_empty() {
            return Err(DecodeError::Empty);
        }
        let decoded = match self.max_duration_s {
            Some(max_s) => decoded.truncated(max_s),
            None => decoded,
        };
        Ok(decoded.resampled(sample_rate))
    }
}

fn decode_vorbis(bytes: &[u8]) -> Result<ImpulseBuffer, DecodeError> {
    let mut reader = OggStreamReader::new(Cursor::new(bytes))?;
    let channel_count = reader.ident_hdr.audio_channels as usize;
    let sample_rate = reader.ident_hdr.audio_sample_rate;

    let mut channels = vec![Vec::new(); channel_count];
    while let Some(packet) = reader.read_dec_packet_generic::<Vec<Vec<f32>>>()? {
        for (channel, samples) in channels.iter_mut().zip(packet) {
            channel.extend(samples);
        }
    }
    Ok(ImpulseBuffer::new(sample_rate, channels))
}

fn decode_wav(bytes: &[u8]) -> Result<ImpulseBuffer, DecodeError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channel_count = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect::<Result<_, _>>()?
        }
    };

    let mut channels = vec![Vec::with_capacity(interleaved.len() / channel_count); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    Ok(ImpulseBuffer::new(spec.sample_rate, channels))
}
