//! Adapters layer: Concrete implementations of ports.
//!
//! - `sklearn`: fitted ordinal encoder and standard scaler
//! - `linear`: logistic regression with exact linear attribution
//! - `trees`: boosted and bagged tree ensembles with decision-path attribution
//! - `json_store`: model directory loader with an optional SHA-256 manifest
//! - `redact`: survey-answer filtering for logs

pub mod json_store;
pub mod linear;
pub mod redact;
pub mod sklearn;
pub mod trees;
