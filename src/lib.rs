//! Thermosense library - thermal camera sonification
//!
//! Turns low-resolution thermal frames into a false-color picture and a
//! stereo soundscape in which hot and cold regions can be located by ear.

pub mod audio;
pub mod cli;
pub mod controller;
pub mod detect;
pub mod error;
pub mod frame;
pub mod logging;
pub mod params;
pub mod persistence;
pub mod render;
pub mod sensor;
pub mod signal;

pub use controller::{CycleCounters, FrameCycleController, FrameReport, Worker};
pub use error::{Result, ThermalError};
