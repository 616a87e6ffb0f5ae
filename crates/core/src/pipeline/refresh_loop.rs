use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Cloneable handle that stops a [`RefreshLoop`] from any thread.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Repeating task paced at a fixed refresh rate, like a display's
/// animation-frame callback.
///
/// Ticks run on the calling thread. A tick that overruns its slot is
/// followed immediately by the next one; missed slots are not replayed.
pub struct RefreshLoop {
    interval: Duration,
    stop: StopHandle,
}

impl RefreshLoop {
    pub fn new(refresh_hz: f64) -> Self {
        let hz = if refresh_hz.is_finite() && refresh_hz > 0.0 {
            refresh_hz
        } else {
            crate::shared::constants::DEFAULT_REFRESH_HZ
        };
        Self {
            interval: Duration::from_secs_f64(1.0 / hz),
            stop: StopHandle::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Calls `tick` once per interval until it breaks or the loop is
    /// stopped. Returns the number of ticks run.
    pub fn run<F>(&self, mut tick: F) -> usize
    where
        F: FnMut() -> ControlFlow<()>,
    {
        let mut ticks = 0;
        let mut next = Instant::now();
        while !self.stop.is_stopped() {
            ticks += 1;
            if tick().is_break() {
                break;
            }

            next += self.interval;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                next = now;
            }
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_until_break() {
        let refresh = RefreshLoop::new(1000.0);
        let mut calls = 0;
        let ticks = refresh.run(|| {
            calls += 1;
            if calls == 5 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(ticks, 5);
        assert_eq!(calls, 5);
    }

    #[test]
    fn test_stop_handle_stops_from_inside_tick() {
        let refresh = RefreshLoop::new(1000.0);
        let stop = refresh.stop_handle();
        let mut calls = 0;
        refresh.run(|| {
            calls += 1;
            if calls == 3 {
                stop.stop();
            }
            ControlFlow::Continue(())
        });
        assert_eq!(calls, 3);
        assert!(refresh.stop_handle().is_stopped());
    }

    #[test]
    fn test_stop_handle_stops_from_other_thread() {
        let refresh = RefreshLoop::new(500.0);
        let stop = refresh.stop_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            stop.stop();
        });
        let ticks = refresh.run(|| ControlFlow::Continue(()));
        stopper.join().unwrap();
        assert!(ticks > 0);
    }

    #[test]
    fn test_stopped_loop_runs_no_ticks() {
        let refresh = RefreshLoop::new(60.0);
        refresh.stop_handle().stop();
        assert_eq!(refresh.run(|| ControlFlow::Continue(())), 0);
    }

    #[test]
    fn test_invalid_rate_falls_back_to_default() {
        let refresh = RefreshLoop::new(0.0);
        assert_eq!(refresh.interval(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn test_ticks_are_paced() {
        let refresh = RefreshLoop::new(100.0);
        let start = Instant::now();
        let mut calls = 0;
        refresh.run(|| {
            calls += 1;
            if calls == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        // three full intervals elapse before the fourth tick
        assert!(start.elapsed() >= Duration::from_millis(29));
    }
}
