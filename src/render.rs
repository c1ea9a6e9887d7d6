//! Render thread: owns the frame buffer and drives the active pattern.
//!
//! Nothing else touches the pixels. Each tick the loop reads the current
//! mode from the `ModeController` without locking, swaps in fresh pattern
//! state if the mode moved, steps the pattern, commits the frame, and
//! sleeps for whatever delay the pattern asked for.
//!
//! A mode change is picked up on the tick after it lands, so at worst one
//! extra frame of the old pattern is shown.

use crate::frame::{FrameBuffer, FrameSink};
use crate::mode::ModeController;
use crate::pattern::{LocalClock, Pattern, WallClock};
use crate::{GREEN, Result, is_running};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

/// Pixel lit at power-on, before any pattern runs.
const SPLASH: (i32, u8) = (29, 2);

/// The render loop's state: buffer, active pattern, and its collaborators.
pub struct RenderLoop<S, C, R> {
    modes: Arc<ModeController>,
    frame: FrameBuffer,
    pattern: Pattern,
    sink: S,
    clock: C,
    rng: R,
}

impl<S, C, R> RenderLoop<S, C, R>
where
    S: FrameSink,
    C: WallClock,
    R: Rng,
{
    /// Start in whatever mode the controller holds right now.
    pub fn new(modes: Arc<ModeController>, sink: S, clock: C, mut rng: R) -> Self {
        let pattern = Pattern::enter(modes.current(), &mut rng);
        Self {
            modes,
            frame: FrameBuffer::new(),
            pattern,
            sink,
            clock,
            rng,
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Show a single green pixel so there is visible life before the
    /// first pattern tick.
    pub fn splash(&mut self) -> Result<()> {
        self.frame.clear();
        self.frame.set(SPLASH.0, SPLASH.1, GREEN)?;
        self.frame.commit(&mut self.sink)
    }

    /// Run one tick and return how long to wait before the next.
    ///
    /// A pattern or sink failure costs one frame; it is logged and the
    /// loop carries on.
    pub fn tick(&mut self) -> Duration {
        let mode = self.modes.current();
        if mode != self.pattern.mode() {
            tracing::debug!(
                "Render: {} -> {}",
                self.pattern.mode().name(),
                mode.name()
            );
            self.frame.clear();
            self.pattern = Pattern::enter(mode, &mut self.rng);
        }

        match self
            .pattern
            .step(&mut self.frame, &mut self.rng, &self.clock)
        {
            Ok(tick) => {
                if tick.commit {
                    if let Err(e) = self.frame.commit(&mut self.sink) {
                        tracing::error!("Dropped {} frame: {}", mode.name(), e);
                    }
                }
                tick.delay
            }
            Err(e) => {
                tracing::error!("Skipped {} frame: {}", mode.name(), e);
                mode.cadence()
            }
        }
    }

    /// Tick until `running` goes false, then blank the strips. Hands the
    /// sink back to the caller.
    pub fn run(mut self, running: &AtomicBool) -> S {
        tracing::info!(
            "Render thread started in {} mode",
            self.pattern.mode().name()
        );

        if let Err(e) = self.splash() {
            tracing::warn!("Splash frame failed: {}", e);
        }

        while is_running(running) {
            let delay = self.tick();
            thread::sleep(delay);
        }

        self.frame.clear();
        if let Err(e) = self.frame.commit(&mut self.sink) {
            tracing::warn!("Could not blank strips on shutdown: {}", e);
        }
        tracing::info!("Render thread stopped");
        self.sink
    }
}

/// Main render loop with the local wall clock and an entropy-seeded RNG.
///
/// Runs on a dedicated thread and returns once `running` is cleared.
pub fn render_loop<S: FrameSink>(modes: Arc<ModeController>, sink: S, running: Arc<AtomicBool>) {
    RenderLoop::new(modes, sink, LocalClock, StdRng::from_entropy()).run(&running);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::frame::tests::RecordingSink;
    use crate::geometry::RADII;
    use crate::mode::Mode;
    use crate::pattern::{Radial, WallTime};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    struct FixedClock;

    impl WallClock for FixedClock {
        fn now(&self) -> WallTime {
            WallTime::new(10, 20, 30)
        }
    }

    /// Refuses every frame.
    struct BrokenSink;

    impl FrameSink for BrokenSink {
        fn commit(&mut self, _frame: &FrameBuffer) -> Result<()> {
            Err(Error::Sink {
                strip: "top",
                reason: "unplugged".to_string(),
            })
        }
    }

    type TestLoop = RenderLoop<RecordingSink, FixedClock, StdRng>;

    fn render_loop_in(mode: Mode) -> (Arc<ModeController>, TestLoop) {
        let modes = Arc::new(ModeController::new(mode));
        let render = RenderLoop::new(
            modes.clone(),
            RecordingSink::default(),
            FixedClock,
            StdRng::seed_from_u64(9),
        );
        (modes, render)
    }

    #[test]
    fn splash_lights_one_green_pixel() {
        let (_, mut render) = render_loop_in(Mode::Wifi);
        render.splash().unwrap();
        assert_eq!(render.sink().frames.len(), 1);
        assert_eq!(render.frame().get(29, 2).unwrap(), GREEN);
        assert_eq!(render.frame().lit_count(), 1);
    }

    #[test]
    fn starts_in_controller_mode() {
        let (_, mut render) = render_loop_in(Mode::Wifi);
        assert_eq!(render.pattern().mode(), Mode::Wifi);
        let delay = render.tick();
        assert_eq!(delay, Duration::from_millis(100));
        assert_eq!(render.sink().frames.len(), 1);
    }

    #[test]
    fn picks_up_mode_change_on_next_tick() {
        let (modes, mut render) = render_loop_in(Mode::Wifi);
        render.tick();
        assert!(render.frame().lit_count() > 0);

        assert!(modes.request_change("sweep"));
        assert_eq!(render.pattern().mode(), Mode::Wifi);

        let delay = render.tick();
        assert_eq!(render.pattern().mode(), Mode::Sweep);
        assert_eq!(delay, Duration::from_millis(10));
        // old dot cleared, one full spoke at angle 0
        assert_eq!(render.frame().lit_count(), 3);
        assert_eq!(render.frame().get(0, 0).unwrap(), render.frame().get(0, 2).unwrap());
    }

    #[test]
    fn same_mode_keeps_pattern_state() {
        let (_, mut render) = render_loop_in(Mode::Flower);
        render.tick();
        let mut expected = render.pattern().clone();
        expected
            .step(&mut FrameBuffer::new(), &mut StdRng::seed_from_u64(0), &FixedClock)
            .unwrap();
        render.tick();
        assert_eq!(render.pattern(), &expected);
    }

    #[test]
    fn off_blanks_once_then_stops_committing() {
        let (modes, mut render) = render_loop_in(Mode::Clock);
        render.tick();
        assert!(render.frame().lit_count() > 0);

        modes.set(Mode::Off);
        let delay = render.tick();
        assert_eq!(delay, Duration::from_secs(1));
        assert_eq!(render.sink().frames.len(), 2);
        assert_eq!(render.frame().lit_count(), 0);

        render.tick();
        assert_eq!(render.sink().frames.len(), 2);
    }

    #[test]
    fn clock_mode_uses_injected_time() {
        let (_, mut render) = render_loop_in(Mode::Clock);
        render.tick();
        // 10 o'clock sits at angle 50
        assert_eq!(render.frame().get(50, 0).unwrap(), crate::BLUE);
    }

    #[test]
    fn failed_step_skips_the_frame_and_keeps_the_pattern() {
        let (_, mut render) = render_loop_in(Mode::Radial);
        render.pattern = Pattern::Radial(Radial::at_radius(crate::RED, RADII));

        let delay = render.tick();
        assert_eq!(delay, Mode::Radial.cadence());
        assert!(render.sink().frames.is_empty());
        assert_eq!(render.pattern().mode(), Mode::Radial);
    }

    #[test]
    fn sink_failure_does_not_stop_the_loop() {
        let modes = Arc::new(ModeController::new(Mode::Random));
        let mut render = RenderLoop::new(modes, BrokenSink, FixedClock, StdRng::seed_from_u64(3));
        for _ in 0..5 {
            assert_eq!(render.tick(), Duration::from_millis(10));
        }
        assert!(render.frame().lit_count() > 0);
    }

    #[test]
    fn run_returns_when_stopped_and_blanks_strips() {
        let (_, render) = render_loop_in(Mode::Sweep);
        let running = AtomicBool::new(false);
        let sink = render.run(&running);
        // splash, then the blank shutdown frame
        assert_eq!(sink.frames.len(), 2);
        assert_eq!(sink.frames[0].lit_count(), 1);
        assert_eq!(sink.frames[1], FrameBuffer::new());
    }

    #[test]
    fn run_on_thread_exits_after_flag_clears() {
        let modes = Arc::new(ModeController::new(Mode::Random));
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = thread::spawn(move || render_loop(modes, RecordingSink::default(), flag));
        thread::sleep(Duration::from_millis(50));
        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();
    }
}
