//! Audio codec byte accounting
//!
//! Playback pacing and silence padding both need to know how many bytes
//! one second of audio occupies for a given encoding.

use serde::{Deserialize, Serialize};

/// Wire encodings spoken by the supported carriers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    /// 16-bit little-endian PCM
    Linear16,
    /// 8-bit μ-law companded PCM
    Mulaw,
}

impl AudioEncoding {
    /// Bytes occupied by a single sample
    pub fn bytes_per_sample(&self) -> u32 {
        match self {
            AudioEncoding::Linear16 => 2,
            AudioEncoding::Mulaw => 1,
        }
    }

    /// The byte value that decodes to silence in this encoding
    pub fn silence_byte(&self) -> u8 {
        match self {
            AudioEncoding::Linear16 => 0x00,
            AudioEncoding::Mulaw => 0xFF,
        }
    }
}

/// Bytes per second of real-time playback for a mono stream
pub fn bytes_per_second(encoding: AudioEncoding, sampling_rate: u32) -> u32 {
    sampling_rate * encoding.bytes_per_sample()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_second() {
        assert_eq!(bytes_per_second(AudioEncoding::Mulaw, 8000), 8000);
        assert_eq!(bytes_per_second(AudioEncoding::Linear16, 8000), 16000);
        assert_eq!(bytes_per_second(AudioEncoding::Linear16, 16000), 32000);
    }

    #[test]
    fn test_silence_bytes() {
        assert_eq!(AudioEncoding::Mulaw.silence_byte(), 0xFF);
        assert_eq!(AudioEncoding::Linear16.silence_byte(), 0x00);
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&AudioEncoding::Mulaw).unwrap();
        assert_eq!(json, r#""mulaw""#);
        let back: AudioEncoding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AudioEncoding::Mulaw);
    }
}
