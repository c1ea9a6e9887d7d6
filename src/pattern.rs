//! Animation patterns, one renderer per display mode.
//!
//! A `Pattern` is the active mode together with the state its renderer
//! carries between ticks (angles, colors, directions). Entering a mode
//! builds a fresh `Pattern`; leaving it just drops the old one. Each
//! `step` draws one frame into the buffer and says how long to wait
//! before the next.

use crate::frame::FrameBuffer;
use crate::geometry::{ANGLES, RADII};
use crate::mode::Mode;
use crate::{BLUE, Color, RED, Result, YELLOW, random_color};
use chrono::Timelike;
use rand::Rng;
use std::time::Duration;

// ── Wall time ────────────────────────────────────────────────────────

/// Hour, minute and second of the local wall clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl WallTime {
    pub fn new(hour: u32, minute: u32, second: u32) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }
}

/// Source of wall time for the clock face.
pub trait WallClock: Send {
    fn now(&self) -> WallTime;
}

/// The host's local time zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl WallClock for LocalClock {
    fn now(&self) -> WallTime {
        let now = chrono::Local::now();
        WallTime::new(now.hour(), now.minute(), now.second())
    }
}

// ── Tick result ──────────────────────────────────────────────────────

/// What a renderer asks of the loop after drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Whether the buffer changed and should be flushed
    pub commit: bool,
    /// How long to sleep before the next step
    pub delay: Duration,
}

impl Tick {
    fn commit_after(delay: Duration) -> Self {
        Self {
            commit: true,
            delay,
        }
    }

    fn idle_for(delay: Duration) -> Self {
        Self {
            commit: false,
            delay,
        }
    }
}

// ── Pattern ──────────────────────────────────────────────────────────

/// The active mode and its renderer state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    Wifi(Wifi),
    Off(Off),
    Clock,
    Random,
    Sweep(Sweep),
    Radial(Radial),
    Bounce(Bounce),
    SimpleBounce(Bounce),
    Flower(Flower),
}

impl Pattern {
    /// Fresh state for `mode`, with new random colors where it has any.
    pub fn enter<R: Rng + ?Sized>(mode: Mode, rng: &mut R) -> Self {
        match mode {
            Mode::Wifi => Pattern::Wifi(Wifi::default()),
            Mode::Off => Pattern::Off(Off::default()),
            Mode::Clock => Pattern::Clock,
            Mode::Random => Pattern::Random,
            Mode::Sweep => Pattern::Sweep(Sweep::new(rng)),
            Mode::Radial => Pattern::Radial(Radial::new(rng)),
            Mode::Bounce => Pattern::Bounce(Bounce::full(rng)),
            Mode::SimpleBounce => Pattern::SimpleBounce(Bounce::simple(rng)),
            Mode::Flower => Pattern::Flower(Flower::new(rng)),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Pattern::Wifi(_) => Mode::Wifi,
            Pattern::Off(_) => Mode::Off,
            Pattern::Clock => Mode::Clock,
            Pattern::Random => Mode::Random,
            Pattern::Sweep(_) => Mode::Sweep,
            Pattern::Radial(_) => Mode::Radial,
            Pattern::Bounce(_) => Mode::Bounce,
            Pattern::SimpleBounce(_) => Mode::SimpleBounce,
            Pattern::Flower(_) => Mode::Flower,
        }
    }

    /// Draw one frame. Only the clock face consults `clock`.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        frame: &mut FrameBuffer,
        rng: &mut R,
        clock: &dyn WallClock,
    ) -> Result<Tick> {
        let cadence = self.mode().cadence();
        match self {
            Pattern::Wifi(wifi) => {
                wifi.step(frame)?;
                Ok(Tick::commit_after(cadence))
            }
            Pattern::Off(off) => {
                let commit = off.step(frame);
                if commit {
                    Ok(Tick::commit_after(cadence))
                } else {
                    Ok(Tick::idle_for(cadence))
                }
            }
            Pattern::Clock => {
                draw_clock(frame, clock.now())?;
                Ok(Tick::commit_after(cadence))
            }
            Pattern::Random => {
                random_pixel(frame, rng)?;
                Ok(Tick::commit_after(cadence))
            }
            Pattern::Sweep(sweep) => {
                sweep.step(frame, rng)?;
                Ok(Tick::commit_after(cadence))
            }
            Pattern::Radial(radial) => {
                let delay = radial.step(frame, rng)?;
                Ok(Tick::commit_after(delay))
            }
            Pattern::Bounce(bounce) | Pattern::SimpleBounce(bounce) => {
                bounce.step(frame, rng)?;
                Ok(Tick::commit_after(cadence))
            }
            Pattern::Flower(flower) => {
                flower.step(frame)?;
                Ok(Tick::commit_after(cadence))
            }
        }
    }
}

// ── WIFI ─────────────────────────────────────────────────────────────

const WIFI_DOT: Color = Color::new(0, 20, 0);

/// Connecting indicator: a dim dot stepping two angles per tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Wifi {
    angle: i32,
}

impl Wifi {
    fn step(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        frame.fade_all(5);
        frame.set(self.angle, 0, WIFI_DOT)?;
        self.angle += 2;
        if self.angle > ANGLES - 1 {
            self.angle = 0;
        }
        Ok(())
    }
}

// ── OFF ──────────────────────────────────────────────────────────────

/// Blank the strips once, then do nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Off {
    cleared: bool,
}

impl Off {
    fn step(&mut self, frame: &mut FrameBuffer) -> bool {
        if self.cleared {
            return false;
        }
        frame.clear();
        self.cleared = true;
        true
    }
}

// ── CLOCK ────────────────────────────────────────────────────────────

/// Hour hand position. Ignores the minutes, so the hand jumps on the hour.
pub fn hour_to_angle(hour: u32) -> i32 {
    // hour % 12 is at most 11
    ((hour % 12) * 5) as i32
}

/// Redraw the clock face from scratch.
///
/// Hour is a 3-wide blue band on the inner ring. Minute is yellow on
/// rings 0-1, widened on ring 1 for odd minutes. Second is red on rings
/// 0-2, widened on ring 2 for odd seconds. Later hands paint over earlier
/// ones.
pub fn draw_clock(frame: &mut FrameBuffer, time: WallTime) -> Result<()> {
    let hour = hour_to_angle(time.hour);
    // minute and second from a clock are below 60
    let minute = time.minute as i32;
    let second = time.second as i32;

    frame.clear();

    for angle in [hour, hour - 1, hour + 1] {
        frame.set(angle, 0, BLUE)?;
    }

    frame.set(minute, 0, YELLOW)?;
    frame.set(minute, 1, YELLOW)?;
    frame.set(minute - 1, 0, YELLOW)?;
    frame.set(minute + 1, 0, YELLOW)?;
    if minute % 2 == 1 {
        frame.set(minute - 1, 1, YELLOW)?;
        frame.set(minute + 1, 1, YELLOW)?;
    }

    for radius in 0..RADII {
        frame.set(second, radius, RED)?;
    }
    frame.set(second + 1, 0, RED)?;
    frame.set(second + 1, 1, RED)?;
    frame.set(second - 1, 0, RED)?;
    frame.set(second - 1, 1, RED)?;
    if second % 2 == 1 {
        frame.set(second + 1, 2, RED)?;
        frame.set(second - 1, 2, RED)?;
    }

    Ok(())
}

// ── RANDOM ───────────────────────────────────────────────────────────

/// Light one random pixel in a random color over a slow fade.
pub fn random_pixel<R: Rng + ?Sized>(frame: &mut FrameBuffer, rng: &mut R) -> Result<()> {
    frame.fade_all(1);
    let angle = rng.gen_range(0..ANGLES);
    let radius = rng.gen_range(0..RADII);
    frame.set(angle, radius, random_color(rng))
}

// ── SWEEP ────────────────────────────────────────────────────────────

/// A full-depth spoke walking around the ring, new color each lap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sweep {
    angle: i32,
    color: Color,
}

impl Sweep {
    fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            angle: 0,
            color: random_color(rng),
        }
    }

    fn step<R: Rng + ?Sized>(&mut self, frame: &mut FrameBuffer, rng: &mut R) -> Result<()> {
        frame.fade_all(3);
        for radius in 0..RADII {
            frame.set(self.angle, radius, self.color)?;
        }
        self.angle += 1;
        if self.angle > ANGLES - 1 {
            self.angle = 0;
            self.color = random_color(rng);
        }
        Ok(())
    }
}

// ── RADIAL ───────────────────────────────────────────────────────────

/// Gap between the two half-rings of one radial frame.
const RADIAL_HALF_GAP: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Half {
    Even,
    Odd,
}

/// Rings expanding outward, drawn half a ring at a time: even angles
/// first, odd angles a moment later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Radial {
    color: Color,
    radius: u8,
    half: Half,
}

impl Radial {
    fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            color: random_color(rng),
            radius: 0,
            half: Half::Even,
        }
    }

    fn step<R: Rng + ?Sized>(&mut self, frame: &mut FrameBuffer, rng: &mut R) -> Result<Duration> {
        frame.fade_all(40);
        match self.half {
            Half::Even => {
                for angle in (0..ANGLES).step_by(2) {
                    frame.set(angle, self.radius, self.color)?;
                }
                self.half = Half::Odd;
                Ok(RADIAL_HALF_GAP)
            }
            Half::Odd => {
                for angle in (1..ANGLES).step_by(2) {
                    frame.set(angle, self.radius, self.color)?;
                }
                self.half = Half::Even;
                self.radius += 1;
                if self.radius > RADII - 1 {
                    self.radius = 0;
                    self.color = random_color(rng);
                }
                Ok(Mode::Radial.cadence())
            }
        }
    }
}

#[cfg(test)]
impl Radial {
    /// State as if the ring had already grown to `radius`.
    pub(crate) fn at_radius(color: Color, radius: u8) -> Self {
        Self {
            color,
            radius,
            half: Half::Even,
        }
    }
}

// ── BOUNCE / SIMPLE_BOUNCE ───────────────────────────────────────────

/// One dot wandering around its ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tracker {
    pub color: Color,
    pub angle: i32,
    pub direction: i32,
}

/// Dots that drift around the ring and randomly reverse.
///
/// Tracker `i` is drawn on radius `i % 3`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bounce {
    trackers: Vec<Tracker>,
    /// Chance of reversing, out of a roll over 0..=100
    flip_percent: u32,
    fade: u8,
}

impl Bounce {
    /// Six dots moving two angles per tick.
    pub fn full<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::with_trackers(rng, &[0, 0, 0, 1, 1, 1], 2, 10, 15)
    }

    /// Three dots moving one angle per tick.
    pub fn simple<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::with_trackers(rng, &[0, 0, 0], 1, 5, 5)
    }

    fn with_trackers<R: Rng + ?Sized>(
        rng: &mut R,
        start_angles: &[i32],
        speed: i32,
        flip_percent: u32,
        fade: u8,
    ) -> Self {
        let trackers = start_angles
            .iter()
            .map(|&angle| Tracker {
                color: random_color(rng),
                angle,
                direction: if rng.gen_bool(0.5) { speed } else { -speed },
            })
            .collect();
        Self {
            trackers,
            flip_percent,
            fade,
        }
    }

    pub fn trackers(&self) -> &[Tracker] {
        &self.trackers
    }

    fn step<R: Rng + ?Sized>(&mut self, frame: &mut FrameBuffer, rng: &mut R) -> Result<()> {
        frame.fade_all(self.fade);
        for (radius, tracker) in (0..RADII).cycle().zip(&self.trackers) {
            frame.set(tracker.angle, radius, tracker.color)?;
        }
        for tracker in &mut self.trackers {
            if rng.gen_range(0..=100) < self.flip_percent {
                tracker.direction = -tracker.direction;
            }
            tracker.angle = wrap_bounce(tracker.angle + tracker.direction);
        }
        Ok(())
    }
}

/// Bring a tracker's moved angle back onto the ring.
///
/// Past the top, exactly 60 becomes 0 and anything further becomes 1.
/// Below zero, exactly -1 becomes 59 and anything further becomes 58.
/// With steps of at most two this matches wrapping mod 60.
pub fn wrap_bounce(next: i32) -> i32 {
    if next > ANGLES - 1 {
        if next == ANGLES { 0 } else { 1 }
    } else if next < 0 {
        if next == -1 { ANGLES - 1 } else { ANGLES - 2 }
    } else {
        next
    }
}

// ── FLOWER ───────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Shade {
    Outer,
    Inner,
}

/// Pixels of one petal relative to its center angle, in draw order.
const PETAL: [(i32, u8, Shade); 15] = [
    (0, 2, Shade::Outer),
    (-1, 2, Shade::Outer),
    (1, 2, Shade::Outer),
    (-2, 1, Shade::Outer),
    (2, 1, Shade::Outer),
    (-3, 1, Shade::Outer),
    (3, 1, Shade::Outer),
    (-2, 0, Shade::Outer),
    (2, 0, Shade::Outer),
    (-1, 0, Shade::Outer),
    (1, 0, Shade::Outer),
    (0, 1, Shade::Inner),
    (-1, 1, Shade::Inner),
    (1, 1, Shade::Inner),
    (0, 0, Shade::Inner),
];

const PETALS: i32 = 10;
const PETAL_SPACING: i32 = 6;

/// Ten two-tone petals rotating two angles per tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flower {
    idx: i32,
    outer: Color,
    inner: Color,
}

impl Flower {
    fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            idx: ANGLES - 1,
            outer: random_color(rng),
            inner: random_color(rng),
        }
    }

    fn step(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        frame.clear();
        for petal in 0..PETALS {
            let center = self.idx + petal * PETAL_SPACING;
            for (offset, radius, shade) in PETAL {
                let color = match shade {
                    Shade::Outer => self.outer,
                    Shade::Inner => self.inner,
                };
                frame.set(center + offset, radius, color)?;
            }
        }
        self.idx = (self.idx + 2) % ANGLES;
        Ok(())
    }
}
