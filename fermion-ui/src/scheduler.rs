//! Time source and repeating timers for the polling loop.

use futures::channel::mpsc::{self, UnboundedSender};
use futures::stream::{LocalBoxStream, StreamExt};
use log::{debug, warn};
use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

const MIN_PERIOD: Duration = Duration::from_millis(1);

pub trait Scheduler {
    /// Milliseconds since the scheduler was created.
    fn now_ms(&self) -> f64;

    /// Ticks every `period`, first one after one full period.
    ///
    /// Dropping the stream cancels the timer.
    fn interval(&self, period: Duration) -> LocalBoxStream<'static, ()>;
}

/// Wall-clock scheduler backed by one ticker thread per interval.
pub struct SystemScheduler {
    origin: Instant,
}

impl SystemScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for SystemScheduler {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn interval(&self, period: Duration) -> LocalBoxStream<'static, ()> {
        let period = period.max(MIN_PERIOD);
        let (tx, rx) = mpsc::unbounded();

        let spawned = thread::Builder::new()
            .name("fermion-ticker".to_string())
            .spawn(move || {
                let mut next = Instant::now() + period;
                loop {
                    thread::sleep(next.saturating_duration_since(Instant::now()));
                    if tx.unbounded_send(()).is_err() {
                        break;
                    }
                    next += period;
                }
                debug!("Ticker stopped");
            });

        if let Err(e) = spawned {
            // The stream just never ticks; completion still ends the session.
            warn!("Failed to spawn ticker thread: {}", e);
        }

        rx.boxed_local()
    }
}

struct ManualTimer {
    period: Duration,
    next_due: Duration,
    tick: UnboundedSender<()>,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    timers: Vec<ManualTimer>,
}

/// Simulated time, advanced explicitly. Clones share the same clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward, firing every timer that comes due.
    pub fn advance(&self, by: Duration) {
        let mut clock = self.clock.borrow_mut();
        clock.now += by;
        let now = clock.now;

        clock.timers.retain_mut(|timer| {
            while timer.next_due <= now {
                if timer.tick.unbounded_send(()).is_err() {
                    return false;
                }
                timer.next_due += timer.period;
            }
            !timer.tick.is_closed()
        });
    }

    /// Timers whose stream is still alive.
    pub fn active_timers(&self) -> usize {
        self.clock
            .borrow()
            .timers
            .iter()
            .filter(|t| !t.tick.is_closed())
            .count()
    }
}

impl Scheduler for ManualScheduler {
    fn now_ms(&self) -> f64 {
        self.clock.borrow().now.as_secs_f64() * 1000.0
    }

    fn interval(&self, period: Duration) -> LocalBoxStream<'static, ()> {
        let period = period.max(MIN_PERIOD);
        let (tick, rx) = mpsc::unbounded();

        let mut clock = self.clock.borrow_mut();
        let next_due = clock.now + period;
        clock.timers.push(ManualTimer {
            period,
            next_due,
            tick,
        });

        rx.boxed_local()
    }
}
