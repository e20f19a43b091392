//! # gkprobe common
//!
//! Domain types shared by the probe engine and the command line front end.
//!
//! * **[`request`]**: the immutable [`request::ProbeRequest`] built once from the command line.
//! * **[`outcome`]**: terminal outcomes of an attempt and the [`outcome::Verdict`] derived
//!   from them.
//! * **[`network`]**: target parsing and local interface selection.
//! * **[`config`]**: defaults and trace settings.

pub mod config;
pub mod error;
pub mod network;
pub mod outcome;
pub mod request;
