//! WAV header inspection for synthesized audio.

use super::SynthesizedSpeech;

/// Duration of a PCM WAV payload derived from its RIFF header: data chunk
/// length over the fmt chunk's byte rate. Returns `None` for anything that
/// does not parse as WAV.
pub fn wav_duration_seconds(bytes: &[u8]) -> Option<f64> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }

    let mut offset = 12;
    let mut byte_rate: Option<u32> = None;

    while offset + 8 <= bytes.len() {
        let chunk_id = &bytes[offset..offset + 4];
        let chunk_size =
            u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().ok()?) as usize;
        let body = offset + 8;

        match chunk_id {
            b"fmt " => {
                if body + 12 > bytes.len() {
                    return None;
                }
                byte_rate = Some(u32::from_le_bytes(bytes[body + 8..body + 12].try_into().ok()?));
            }
            b"data" => {
                let rate = byte_rate?;
                if rate == 0 {
                    return None;
                }
                return Some(chunk_size as f64 / rate as f64);
            }
            _ => {}
        }

        // Chunks are word-aligned.
        offset = body + chunk_size + (chunk_size % 2);
    }

    None
}

/// The duration to record for a synthesis result: the synthesizer's own
/// measurement when present, the WAV header otherwise, zero when neither
/// yields one.
pub fn resolve_duration(speech: &SynthesizedSpeech) -> f64 {
    speech
        .duration_seconds
        .or_else(|| wav_duration_seconds(&speech.wav_bytes))
        .unwrap_or(0.0)
}
