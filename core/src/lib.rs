pub mod probe;
pub mod signaling;
pub mod transport;
