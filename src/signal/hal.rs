//! Hardware seams: the microsecond clock and the transmit pin.
//!
//! The controller core never touches peripherals directly; it sees a
//! monotonic microsecond counter (wrapping at 32 bits — all interval math in
//! the signal layer uses wrapping subtraction) and a single digital output.
//! Host builds get a spin-timed clock and a tracing pin; tests get a virtual
//! clock and a recording pin so encoder output can be replayed into the
//! receiver edge by edge.

use std::time::{Duration, Instant};

/// Monotonic microsecond counter plus a busy-wait delay.
///
/// `delay_us` is a hard real-time leaf: the transmit pulse timing needs
/// sub-millisecond precision, so implementations must not yield to a
/// scheduler mid-delay.
pub trait MicrosClock {
    fn now_us(&self) -> u32;
    fn delay_us(&self, us: u32);
}

/// Single digital output level.
pub trait OutputPin {
    fn set(&mut self, level: bool);
}

/// Wall-clock implementation backed by [Instant], spinning for delays.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrosClock for SystemClock {
    fn now_us(&self) -> u32 {
        self.start.elapsed().as_micros() as u32
    }

    fn delay_us(&self, us: u32) {
        let deadline = self.start.elapsed() + Duration::from_micros(us as u64);
        while self.start.elapsed() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Output pin that logs level changes at trace level. Stands in for the
/// transmit GPIO on hosts without one.
#[derive(Default)]
pub struct TracePin {
    level: bool,
}

impl TracePin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputPin for TracePin {
    fn set(&mut self, level: bool) {
        if level != self.level {
            self.level = level;
            tracing::trace!(level, "tx pin");
        }
    }
}

pub mod sim {
    //! Virtual-time clock and recording pin. Used by the signal-layer tests
    //! and by offline encoding (rendering a transmission to a file without
    //! waiting out the real pulse timing).

    use super::{MicrosClock, OutputPin};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Virtual microsecond clock; `delay_us` advances time instantly.
    #[derive(Clone)]
    pub struct SimClock {
        now: Rc<Cell<u32>>,
    }

    impl SimClock {
        pub fn starting_at(us: u32) -> Self {
            Self {
                now: Rc::new(Cell::new(us)),
            }
        }

        pub fn advance(&self, us: u32) {
            self.now.set(self.now.get().wrapping_add(us));
        }
    }

    impl MicrosClock for SimClock {
        fn now_us(&self) -> u32 {
            self.now.get()
        }

        fn delay_us(&self, us: u32) {
            self.advance(us);
        }
    }

    /// Records every level change with its virtual timestamp.
    pub struct RecordingPin {
        clock: SimClock,
        level: bool,
        edges: Rc<std::cell::RefCell<Vec<(bool, u32)>>>,
    }

    impl RecordingPin {
        pub fn new(clock: SimClock) -> Self {
            Self {
                clock,
                level: false,
                edges: Rc::new(std::cell::RefCell::new(Vec::new())),
            }
        }

        /// Shared handle to the recorded (level, timestamp) edge list.
        pub fn edges(&self) -> Rc<std::cell::RefCell<Vec<(bool, u32)>>> {
            Rc::clone(&self.edges)
        }
    }

    impl OutputPin for RecordingPin {
        fn set(&mut self, level: bool) {
            if level != self.level {
                self.level = level;
                self.edges.borrow_mut().push((level, self.clock.now_us()));
            }
        }
    }
}
