pub mod assignment;
pub mod catalog;
pub mod determinism;
pub mod feedback;
pub mod phase;
pub mod progress;
pub mod quiz;
pub mod session;
pub mod validator;

pub mod error;
