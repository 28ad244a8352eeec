//! Device recognition and the single-device-login gate.

pub mod fingerprint;
pub mod gate;
pub mod policy;
pub mod user_agent;

pub use fingerprint::{client_ip, RequestFingerprint};
pub use gate::{DeviceGate, LoginDecision};
pub use policy::{DeviceMatchPolicy, IpScope, MatchStrategy};
