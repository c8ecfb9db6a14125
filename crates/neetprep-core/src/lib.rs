//! neetprep-core — Timed test engine, session state and scoring.
//!
//! This crate defines the question model, the boundary traits for question
//! catalogs and result sinks, the attempt state machine with its countdown,
//! and the scoring that the rest of neetprep builds on.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod ids;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod session;
pub mod timer;
pub mod traits;
