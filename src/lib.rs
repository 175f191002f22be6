//! qrscan library crate.
//!
//! Samples frames from a live video source, runs them through an ordered
//! pipeline of QR decode strategies and reports the first decode, with
//! zoom adjustable while the scan runs.

pub mod camera;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod scan;
