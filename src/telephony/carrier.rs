//! Per-carrier call configuration
//!
//! Closed sums over the supported carriers. Each variant knows the
//! default transcriber shape for its negotiated codec.

use serde::{Deserialize, Serialize};

use crate::asr::{EndpointingConfig, TranscriberConfig};
use crate::telephony::constants::{
    ALTUR_AUDIO_ENCODING, ALTUR_CHUNK_SIZE, ALTUR_SAMPLING_RATE, TWILIO_AUDIO_ENCODING,
    TWILIO_CHUNK_SIZE, TWILIO_SAMPLING_RATE, VONAGE_AUDIO_ENCODING, VONAGE_CHUNK_SIZE,
    VONAGE_SAMPLING_RATE,
};

/// Credentials and endpoints per carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum TelephonyConfig {
    Twilio {
        account_sid: String,
        auth_token: String,
        #[serde(default)]
        record: bool,
    },
    Vonage {
        api_key: String,
        api_secret: String,
        application_id: String,
        #[serde(default)]
        record: bool,
    },
    Altur {
        /// Base URL of the carrier's call-control API
        telephony_url: String,
        #[serde(default)]
        record: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

/// Everything a call session needs to come up for one carrier call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallConfig {
    Twilio {
        from_phone: String,
        to_phone: String,
        direction: CallDirection,
        twilio_sid: String,
        config: TelephonyConfig,
    },
    Vonage {
        from_phone: String,
        to_phone: String,
        direction: CallDirection,
        vonage_uuid: String,
        config: TelephonyConfig,
    },
    Altur {
        from_phone: String,
        to_phone: String,
        direction: CallDirection,
        altur_call_id: String,
        config: TelephonyConfig,
    },
}

impl CallConfig {
    /// The carrier's call identifier, used in outbound media frames.
    pub fn call_id(&self) -> &str {
        match self {
            CallConfig::Twilio { twilio_sid, .. } => twilio_sid,
            CallConfig::Vonage { vonage_uuid, .. } => vonage_uuid,
            CallConfig::Altur { altur_call_id, .. } => altur_call_id,
        }
    }

    /// Transcriber defaults matching the carrier's negotiated codec.
    pub fn default_transcriber_config(&self) -> TranscriberConfig {
        let (sampling_rate, audio_encoding, chunk_size) = match self {
            CallConfig::Twilio { .. } => {
                (TWILIO_SAMPLING_RATE, TWILIO_AUDIO_ENCODING, TWILIO_CHUNK_SIZE)
            }
            CallConfig::Vonage { .. } => {
                (VONAGE_SAMPLING_RATE, VONAGE_AUDIO_ENCODING, VONAGE_CHUNK_SIZE)
            }
            CallConfig::Altur { .. } => {
                (ALTUR_SAMPLING_RATE, ALTUR_AUDIO_ENCODING, ALTUR_CHUNK_SIZE)
            }
        };
        TranscriberConfig {
            sampling_rate,
            audio_encoding,
            chunk_size,
            endpointing_config: Some(EndpointingConfig::PunctuationBased {
                time_cutoff_seconds: 0.4,
            }),
            downsampling: None,
            mute_during_speech: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encoding::AudioEncoding;

    fn altur_call() -> CallConfig {
        CallConfig::Altur {
            from_phone: "+525500000001".into(),
            to_phone: "+525500000002".into(),
            direction: CallDirection::Inbound,
            altur_call_id: "call-42".into(),
            config: TelephonyConfig::Altur {
                telephony_url: "https://telephony.example.com".into(),
                record: false,
            },
        }
    }

    #[test]
    fn test_call_id_per_variant() {
        assert_eq!(altur_call().call_id(), "call-42");
    }

    #[test]
    fn test_default_transcriber_matches_codec() {
        let config = altur_call().default_transcriber_config();
        assert_eq!(config.sampling_rate, 8000);
        assert_eq!(config.audio_encoding, AudioEncoding::Mulaw);
        assert!(matches!(
            config.endpointing_config,
            Some(EndpointingConfig::PunctuationBased { .. })
        ));
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&altur_call()).unwrap();
        assert!(json.contains(r#""type":"altur""#));
        assert!(json.contains(r#""provider":"altur""#));
        let back: CallConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, altur_call());
    }
}
