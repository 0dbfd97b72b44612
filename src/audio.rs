use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Theme clips arrive as raw 16-bit little-endian PCM at a fixed rate.
pub const THEME_SAMPLE_RATE: u32 = 24_000;

/// Decodes a base64 PCM16 payload into normalized f32 samples in [-1, 1).
pub fn decode_pcm16(b64: &str) -> Result<Vec<f32>> {
    let bytes = BASE64
        .decode(b64.trim())
        .map_err(|e| anyhow!("invalid audio payload: {}", e))?;
    if bytes.len() % 2 != 0 {
        return Err(anyhow!("truncated PCM16 stream ({} bytes)", bytes.len()));
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    Ok(samples)
}

pub fn duration_secs(samples: &[f32]) -> f32 {
    samples.len() as f32 / THEME_SAMPLE_RATE as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[i16]) -> String {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        BASE64.encode(bytes)
    }

    #[test]
    fn test_decode_scales_into_unit_range() {
        let b64 = encode(&[0, i16::MAX, i16::MIN, 16384]);
        let samples = decode_pcm16(&b64).unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 0.99997).abs() < 1e-4);
        assert_eq!(samples[2], -1.0);
        assert!((samples[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode_pcm16("@@@").is_err());
        // Odd byte count cannot be PCM16.
        let odd = BASE64.encode([1u8, 2, 3]);
        assert!(decode_pcm16(&odd).is_err());
    }

    #[test]
    fn test_duration() {
        let samples = vec![0.0f32; THEME_SAMPLE_RATE as usize * 2];
        assert_eq!(duration_secs(&samples), 2.0);
    }
}
