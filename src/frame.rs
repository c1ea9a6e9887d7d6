//! Frame buffer for the three strips, and the sinks that flush it.
//!
//! The render thread owns the only `FrameBuffer`. Patterns draw into it by
//! ring coordinate; `commit` hands the whole buffer to a `FrameSink`,
//! which is the boundary to real hardware.

use crate::geometry::{self, PhysicalAddress, RADII, STRIP_LEN, Strip};
use crate::{BLACK, Color, Error, Result};
use smart_leds::{RGB8, SmartLedsWrite};
use std::fmt::Debug;

/// Current color of every pixel on every strip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    strips: [[Color; STRIP_LEN]; 3],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            strips: [[BLACK; STRIP_LEN]; 3],
        }
    }

    /// Turn every pixel off.
    pub fn clear(&mut self) {
        for strip in &mut self.strips {
            strip.fill(BLACK);
        }
    }

    /// Dim every pixel by `step` per channel, floored at zero.
    pub fn fade_all(&mut self, step: u8) {
        for pixel in self.strips.iter_mut().flatten() {
            *pixel = pixel.fade(step);
        }
    }

    /// Write one pixel by ring coordinate. Any angle is accepted and
    /// wrapped; the radius must be 0..=2.
    pub fn set(&mut self, angle: i32, radius: u8, color: Color) -> Result<()> {
        if radius >= RADII {
            return Err(Error::RadiusOutOfRange(radius));
        }
        let addr = geometry::map(angle, radius);
        self.strips[addr.strip.slot()][addr.index] = color;
        Ok(())
    }

    /// Read one pixel by ring coordinate.
    pub fn get(&self, angle: i32, radius: u8) -> Result<Color> {
        if radius >= RADII {
            return Err(Error::RadiusOutOfRange(radius));
        }
        Ok(self.pixel(geometry::map(angle, radius)))
    }

    pub fn pixel(&self, addr: PhysicalAddress) -> Color {
        self.strips[addr.strip.slot()][addr.index]
    }

    pub fn strip(&self, strip: Strip) -> &[Color; STRIP_LEN] {
        &self.strips[strip.slot()]
    }

    /// Number of pixels that are not black.
    pub fn lit_count(&self) -> usize {
        self.strips
            .iter()
            .flatten()
            .filter(|c| !c.is_black())
            .count()
    }

    /// Flush the buffer to `sink`.
    pub fn commit<S: FrameSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.commit(self)
    }
}

// ── Sinks ──────────────────────────────────────────────────────────

/// Where committed frames go.
pub trait FrameSink: Send {
    fn commit(&mut self, frame: &FrameBuffer) -> Result<()>;
}

/// Logs each committed frame instead of driving LEDs.
///
/// Used when the server runs on a machine without strips attached.
#[derive(Debug, Default)]
pub struct TracingSink {
    frames: u64,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for TracingSink {
    fn commit(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.frames += 1;
        tracing::trace!(
            frame = self.frames,
            lit = frame.lit_count(),
            "Committed frame"
        );
        Ok(())
    }
}

/// Drives three WS2812-style strips through `smart-leds` writers.
///
/// Strips are written in the order TOP, LEFT, RIGHT, each as a full
/// 60-pixel run. This is where a board's strip driver plugs in: wrap its
/// three writers and pass the sink to `render::render_loop` in place of
/// `TracingSink`.
pub struct StripSink<W> {
    top: W,
    left: W,
    right: W,
}

impl<W> StripSink<W>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: Debug,
{
    pub fn new(top: W, left: W, right: W) -> Self {
        Self { top, left, right }
    }

    fn writer(&mut self, strip: Strip) -> &mut W {
        match strip {
            Strip::Top => &mut self.top,
            Strip::Left => &mut self.left,
            Strip::Right => &mut self.right,
        }
    }
}

impl<W> FrameSink for StripSink<W>
where
    W: SmartLedsWrite<Color = RGB8> + Send,
    W::Error: Debug,
{
    fn commit(&mut self, frame: &FrameBuffer) -> Result<()> {
        for strip in Strip::ALL {
            let pixels = frame.strip(strip).iter().copied();
            self.writer(strip)
                .write(pixels)
                .map_err(|e| Error::Sink {
                    strip: strip.name(),
                    reason: format!("{e:?}"),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{GREEN, RED};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Keeps a copy of every committed frame.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pub(crate) frames: Vec<FrameBuffer>,
    }

    impl FrameSink for RecordingSink {
        fn commit(&mut self, frame: &FrameBuffer) -> Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    /// Stand-in for a strip driver, recording what it was asked to show.
    #[derive(Debug, Default)]
    struct FakeWriter {
        written: Vec<RGB8>,
        fail: bool,
    }

    impl SmartLedsWrite for FakeWriter {
        type Error = &'static str;
        type Color = RGB8;

        fn write<T, I>(&mut self, iterator: T) -> std::result::Result<(), Self::Error>
        where
            T: IntoIterator<Item = I>,
            I: Into<Self::Color>,
        {
            if self.fail {
                return Err("bus error");
            }
            self.written = iterator.into_iter().map(Into::into).collect();
            Ok(())
        }
    }

    #[test]
    fn new_buffer_is_dark() {
        assert_eq!(FrameBuffer::new().lit_count(), 0);
    }

    #[test]
    fn set_then_get_by_coordinate() {
        let mut frame = FrameBuffer::new();
        frame.set(0, 0, RED).unwrap();
        assert_eq!(frame.get(0, 0).unwrap(), RED);
        assert_eq!(frame.strip(Strip::Top)[27], RED);
        assert_eq!(frame.lit_count(), 1);
    }

    #[test]
    fn set_wraps_negative_angles() {
        let mut frame = FrameBuffer::new();
        frame.set(-1, 2, GREEN).unwrap();
        assert_eq!(frame.get(59, 2).unwrap(), GREEN);
    }

    #[rstest]
    #[case(3)]
    #[case(200)]
    fn set_rejects_radius_outside_ring(#[case] radius: u8) {
        let mut frame = FrameBuffer::new();
        let err = frame.set(0, radius, RED).unwrap_err();
        assert!(matches!(err, Error::RadiusOutOfRange(r) if r == radius));
        assert_eq!(frame.lit_count(), 0);
    }

    #[test]
    fn clear_turns_everything_off() {
        let mut frame = FrameBuffer::new();
        for angle in 0..60 {
            frame.set(angle, 1, RED).unwrap();
        }
        assert_eq!(frame.lit_count(), 60);
        frame.clear();
        assert_eq!(frame, FrameBuffer::new());
    }

    #[test]
    fn fade_all_floors_every_channel() {
        let mut frame = FrameBuffer::new();
        frame.set(5, 0, Color::new(10, 3, 200)).unwrap();
        frame.fade_all(5);
        assert_eq!(frame.get(5, 0).unwrap(), Color::new(5, 0, 195));
        frame.fade_all(255);
        assert_eq!(frame.lit_count(), 0);
    }

    #[test]
    fn commit_hands_current_state_to_sink() {
        let mut frame = FrameBuffer::new();
        let mut sink = RecordingSink::default();
        frame.set(12, 1, RED).unwrap();
        frame.commit(&mut sink).unwrap();
        assert_eq!(sink.frames, vec![frame]);
    }

    #[test]
    fn strip_sink_writes_each_strip() {
        let mut frame = FrameBuffer::new();
        frame.set(0, 0, RED).unwrap();
        frame.set(30, 0, GREEN).unwrap();

        let mut sink = StripSink::new(
            FakeWriter::default(),
            FakeWriter::default(),
            FakeWriter::default(),
        );
        sink.commit(&frame).unwrap();

        assert_eq!(sink.top.written.len(), STRIP_LEN);
        assert_eq!(sink.top.written[27], RGB8::new(255, 0, 0));
        assert_eq!(sink.left.written[2], RGB8::new(0, 255, 0));
        assert!(sink.right.written.iter().all(|c| *c == RGB8::default()));
    }

    #[test]
    fn strip_sink_reports_failing_strip() {
        let mut sink = StripSink::new(
            FakeWriter::default(),
            FakeWriter {
                fail: true,
                ..Default::default()
            },
            FakeWriter::default(),
        );
        let err = sink.commit(&FrameBuffer::new()).unwrap_err();
        assert!(matches!(err, Error::Sink { strip: "left", .. }));
    }
}
