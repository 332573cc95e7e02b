//! Telephony integration
//!
//! Carrier constants, per-carrier call configuration, the media frame
//! codec for the per-call WebSocket, and the call session that owns a
//! call's tasks from first frame to hangup.

pub mod constants;
pub mod carrier;
pub mod media;
pub mod call;

pub use carrier::{CallConfig, CallDirection, TelephonyConfig};
pub use call::{CallSession, CallSessionConfig, HangupClient};
pub use media::{MediaFrame, WsMediaSink};
