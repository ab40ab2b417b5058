use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Snapshot of the clock handed to a frame tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds elapsed since the source was created.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where frame time originates from.
///
/// Sources start counting when constructed and are never rewound for the
/// lifetime of the pipeline that owns them.
pub trait TimeSource {
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source whose reading is set from outside, for deterministic frames.
///
/// Clones share the same reading, so one copy can be boxed into a driver
/// while another steers it.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    seconds: Rc<Cell<f32>>,
    frame: u64,
}

impl ManualTimeSource {
    pub fn new(seconds: f32) -> Self {
        Self {
            seconds: Rc::new(Cell::new(seconds)),
            frame: 0,
        }
    }

    /// Moves the clock forward to `seconds`; earlier readings are ignored.
    pub fn advance_to(&self, seconds: f32) {
        if seconds >= self.seconds.get() {
            self.seconds.set(seconds);
        }
    }

    pub fn seconds(&self) -> f32 {
        self.seconds.get()
    }
}

impl TimeSource for ManualTimeSource {
    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.seconds.get(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Hook into the display's refresh signal.
///
/// `schedule` arms one callback for the next refresh; `cancel` disarms it
/// synchronously so no further tick is delivered. `fired` marks the armed
/// callback as delivered.
pub trait RefreshSignal {
    fn schedule(&mut self);
    fn cancel(&mut self);
    fn fired(&mut self);
    fn is_scheduled(&self) -> bool;
}

/// Rolling frames-per-second counter reported once per second.
#[derive(Debug, Clone)]
pub struct FrameStats {
    last_update: Instant,
    frames_since_update: u32,
    frames_per_second: f32,
}

impl FrameStats {
    pub fn new(now: Instant) -> Self {
        Self {
            last_update: now,
            frames_since_update: 0,
            frames_per_second: 0.0,
        }
    }

    /// Counts a frame; returns the fresh rate when a full second has passed.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        self.frames_since_update += 1;
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        self.frames_per_second = self.frames_since_update as f32 / elapsed.as_secs_f32();
        self.frames_since_update = 0;
        self.last_update = now;
        Some(self.frames_per_second)
    }

    pub fn frames_per_second(&self) -> f32 {
        self.frames_per_second
    }
}
