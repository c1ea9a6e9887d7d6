//! Shared types for the LED ring clock and its HTTP control server.
//!
//! This module provides what every other module leans on:
//! - The `Color` type and the named colors the patterns draw with
//! - The crate error type
//! - Signal handling for clean shutdown
//!
//! The display is three 60-pixel strips folded into a ring of 60 angles
//! by 3 radii. `geometry` maps ring coordinates onto strip pixels,
//! `frame` holds the pixels, `pattern` animates them, `mode` tracks which
//! animation is selected, and `render` ties them together on a dedicated
//! thread. `server` and `network` are the outside collaborators that
//! change the mode.

pub mod frame;
pub mod geometry;
pub mod mode;
pub mod network;
pub mod pattern;
pub mod render;
pub mod server;

use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

// ── Errors ─────────────────────────────────────────────────────────

/// Errors raised by the display pipeline and its collaborators.
///
/// Control requests that name an unknown pattern are not errors: the
/// server answers them with a status code and the mode stays put.
#[derive(Error, Debug)]
pub enum Error {
    /// A pixel write named a radius outside the ring
    #[error("radius {0} out of range (0..3)")]
    RadiusOutOfRange(u8),

    /// The hardware sink refused a frame
    #[error("failed to commit frame to {strip} strip: {reason}")]
    Sink { strip: &'static str, reason: String },

    /// The connectivity probe target could not be resolved or reached
    #[error("connectivity probe failed: {0}")]
    Probe(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ── Color ──────────────────────────────────────────────────────────

/// One 24-bit pixel color.
///
/// Kept independent of any LED driver crate so the pattern logic can be
/// tested anywhere. At the hardware boundary it converts into
/// `smart_leds::RGB8`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const BLACK: Color = Color::new(0, 0, 0);
pub const RED: Color = Color::new(255, 0, 0);
pub const GREEN: Color = Color::new(0, 255, 0);
pub const BLUE: Color = Color::new(0, 0, 255);
pub const YELLOW: Color = Color::new(255, 255, 0);

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Subtract `step` from every channel, stopping at zero.
    ///
    /// This is a linear decay, not a multiplicative one: a channel at 10
    /// fades to black in one step of 10 or more.
    pub fn fade(self, step: u8) -> Self {
        Self {
            r: self.r.saturating_sub(step),
            g: self.g.saturating_sub(step),
            b: self.b.saturating_sub(step),
        }
    }

    pub fn is_black(self) -> bool {
        self == BLACK
    }
}

impl From<Color> for smart_leds::RGB8 {
    fn from(c: Color) -> Self {
        smart_leds::RGB8 {
            r: c.r,
            g: c.g,
            b: c.b,
        }
    }
}

/// Pick a color with every channel uniform over 0..=255.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Color {
    Color::new(rng.r#gen(), rng.r#gen(), rng.r#gen())
}

// ── Shutdown ───────────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets `running` to false.
///
/// The render thread polls the flag between ticks and the HTTP server
/// watches it for graceful shutdown.
pub fn setup_signal_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    Ok(running)
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
