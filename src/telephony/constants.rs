//! Per-carrier media constants
//!
//! Each carrier negotiates a fixed codec and outbound frame size;
//! everything downstream (pacing, padding, transcriber config) derives
//! from these.

use crate::audio::encoding::AudioEncoding;

pub const TWILIO_SAMPLING_RATE: u32 = 8000;
pub const TWILIO_AUDIO_ENCODING: AudioEncoding = AudioEncoding::Mulaw;
/// 20 ms frames of 8 kHz μ-law
pub const TWILIO_CHUNK_SIZE: usize = 20 * 160;

pub const VONAGE_SAMPLING_RATE: u32 = 16000;
pub const VONAGE_AUDIO_ENCODING: AudioEncoding = AudioEncoding::Linear16;
pub const VONAGE_CHUNK_SIZE: usize = 640;

pub const ALTUR_SAMPLING_RATE: u32 = 8000;
pub const ALTUR_AUDIO_ENCODING: AudioEncoding = AudioEncoding::Mulaw;
pub const ALTUR_CHUNK_SIZE: usize = 20 * 160;
