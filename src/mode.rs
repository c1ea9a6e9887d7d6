//! Display modes and the controller that switches between them.
//!
//! The mode is the only state shared between the render thread and the
//! control side (HTTP handlers, connectivity task). Writes are serialized
//! by a mutex so two requests never interleave. The render thread reads
//! without taking the lock and may see a change one tick late; that
//! staleness is bounded and accepted.

use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Keyword that selects a random animation other than the current one.
pub const ANY: &str = "any";

/// Reported name while the "connecting" indicator is showing. Not
/// selectable by request.
pub const WIFI_NAME: &str = "wifi";

/// Everything the display can be doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    /// Network not up yet: a dim green dot chasing around the ring
    Wifi = 0,
    Off = 1,
    Clock = 2,
    Random = 3,
    Sweep = 4,
    Radial = 5,
    Bounce = 6,
    SimpleBounce = 7,
    Flower = 8,
}

impl Mode {
    /// Modes selectable by name, in registry order.
    pub const REGISTRY: [Mode; 8] = [
        Mode::Off,
        Mode::Clock,
        Mode::Random,
        Mode::Sweep,
        Mode::Radial,
        Mode::Bounce,
        Mode::SimpleBounce,
        Mode::Flower,
    ];

    /// Candidates for `any`: the registry from RANDOM onward. OFF, WIFI
    /// and CLOCK are never picked.
    pub const ANIMATED: [Mode; 6] = [
        Mode::Random,
        Mode::Sweep,
        Mode::Radial,
        Mode::Bounce,
        Mode::SimpleBounce,
        Mode::Flower,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Wifi => WIFI_NAME,
            Mode::Off => "off",
            Mode::Clock => "clock",
            Mode::Random => "random",
            Mode::Sweep => "sweep",
            Mode::Radial => "radial",
            Mode::Bounce => "bounce",
            Mode::SimpleBounce => "simple_bounce",
            Mode::Flower => "flower",
        }
    }

    /// Exact, case-sensitive registry lookup. `any` and `wifi` are not
    /// registry entries.
    pub fn from_name(name: &str) -> Option<Mode> {
        Self::REGISTRY.into_iter().find(|m| m.name() == name)
    }

    /// Delay between ticks of this mode's renderer.
    pub fn cadence(self) -> Duration {
        match self {
            Mode::Wifi => Duration::from_millis(100),
            Mode::Off | Mode::Clock => Duration::from_secs(1),
            Mode::Random | Mode::Sweep | Mode::Bounce | Mode::SimpleBounce => {
                Duration::from_millis(10)
            }
            Mode::Radial => Duration::from_millis(50),
            Mode::Flower => Duration::from_millis(200),
        }
    }

    fn from_raw(value: u8) -> Option<Mode> {
        Some(match value {
            0 => Mode::Wifi,
            1 => Mode::Off,
            2 => Mode::Clock,
            3 => Mode::Random,
            4 => Mode::Sweep,
            5 => Mode::Radial,
            6 => Mode::Bounce,
            7 => Mode::SimpleBounce,
            8 => Mode::Flower,
            _ => return None,
        })
    }
}

/// Owner of the process-wide current mode.
///
/// Every write goes through the internal mutex. `current` is a relaxed
/// atomic load with no lock, so the render loop never waits on a control
/// request.
#[derive(Debug)]
pub struct ModeController {
    current: AtomicU8,
    write_lock: Mutex<()>,
}

impl Default for ModeController {
    /// Starts on the connecting indicator until the network comes up.
    fn default() -> Self {
        Self::new(Mode::Wifi)
    }
}

impl ModeController {
    pub fn new(initial: Mode) -> Self {
        Self {
            current: AtomicU8::new(initial as u8),
            write_lock: Mutex::new(()),
        }
    }

    /// The active mode, read without synchronization.
    pub fn current(&self) -> Mode {
        // Only discriminants written by `store` ever reach the cell.
        Mode::from_raw(self.current.load(Ordering::Relaxed)).unwrap_or(Mode::Off)
    }

    /// Apply a named pattern request. Returns false, leaving the mode
    /// alone, when the name is not in the registry.
    pub fn request_change(&self, name: &str) -> bool {
        self.request_change_with(name, &mut rand::thread_rng())
    }

    /// `request_change` with a caller-supplied random source.
    ///
    /// `off` always wins. `any` picks uniformly among `Mode::ANIMATED`
    /// other than the current one. Anything else must match a registry
    /// name exactly.
    pub fn request_change_with<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> bool {
        let _guard = self.lock();
        let previous = self.current();

        let next = if name == Mode::Off.name() {
            Some(Mode::Off)
        } else if name == ANY {
            let candidates: Vec<Mode> = Mode::ANIMATED
                .into_iter()
                .filter(|&m| m != previous)
                .collect();
            candidates.choose(rng).copied()
        } else {
            Mode::from_name(name)
        };

        match next {
            Some(mode) => {
                self.store(mode);
                tracing::info!(
                    "Pattern {} -> {} (requested {:?})",
                    previous.name(),
                    mode.name(),
                    name
                );
                true
            }
            None => {
                tracing::debug!(
                    "Unknown pattern {:?}, staying on {}",
                    name,
                    previous.name()
                );
                false
            }
        }
    }

    /// Force a mode directly, bypassing the name registry.
    pub fn set(&self, mode: Mode) {
        let _guard = self.lock();
        let previous = self.current();
        if previous != mode {
            self.store(mode);
            tracing::info!("Pattern {} -> {}", previous.name(), mode.name());
        }
    }

    /// Leave the connecting indicator for OFF, unless someone already
    /// picked another mode. Returns true if the mode changed.
    pub fn release_wifi(&self) -> bool {
        let _guard = self.lock();
        if self.current() == Mode::Wifi {
            self.store(Mode::Off);
            tracing::info!("Pattern {} -> {}", Mode::Wifi.name(), Mode::Off.name());
            true
        } else {
            false
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock holds nothing stale.
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, mode: Mode) {
        self.current.store(mode as u8, Ordering::Relaxed);
    }
}
