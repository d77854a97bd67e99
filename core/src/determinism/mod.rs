pub mod fingerprint;
pub mod json_canonical;
pub mod shuffle;
