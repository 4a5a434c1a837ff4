//! Calibrated servo control.
//!
//! Maps a user-facing command angle onto a physically corrected actuation
//! angle through one of three fixed calibration modes, and exposes the result
//! over a small web control surface.
//!
//! - [`calibration`] - the fixed three-mode calibration table
//! - [`engine`] - actuation, motion compensation, and mode switching
//! - [`server`] - axum routes and the slider page

pub mod calibration;
pub mod engine;
pub mod server;
