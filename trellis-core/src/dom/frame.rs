//! Frame and timer hosts.
//!
//! The scheduler never runs effects synchronously; it asks a [`FrameHost`]
//! for a callback on the next frame. Two hosts are provided:
//!
//! - [`ManualFrames`]: frames and timers advance only when told to. Tests
//!   drive it with `tick()` and `advance()`.
//! - [`TokioFrames`]: frames are `spawn_local` tasks that sleep for one frame
//!   interval. Must be used inside a `tokio::task::LocalSet`.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::config::RuntimeConfig;

pub type FrameCallback = Box<dyn FnOnce()>;

/// Source of frame and timeout callbacks.
pub trait FrameHost {
    /// Run `callback` on the next frame.
    fn request_frame(&self, callback: FrameCallback);

    /// Run `callback` once `delay` has elapsed.
    fn set_timeout(&self, delay: Duration, callback: FrameCallback);
}

struct Timer {
    due: Duration,
    seq: u64,
    callback: FrameCallback,
}

/// Deterministic frame host driven by the caller.
#[derive(Default)]
pub struct ManualFrames {
    frames: RefCell<VecDeque<FrameCallback>>,
    timers: RefCell<Vec<Timer>>,
    now: Cell<Duration>,
    seq: Cell<u64>,
}

impl ManualFrames {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Run the frame callbacks queued before this call. Callbacks queued
    /// while ticking wait for the next tick. Returns how many ran.
    pub fn tick(&self) -> usize {
        let batch: Vec<FrameCallback> = self.frames.borrow_mut().drain(..).collect();
        let count = batch.len();
        for callback in batch {
            callback();
        }
        count
    }

    /// Tick until no frame is pending, at most `limit` times.
    pub fn run_until_idle(&self, limit: usize) -> usize {
        let mut ticks = 0;
        while self.pending_frames() > 0 && ticks < limit {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    /// Move the clock forward and run every timer that came due, earliest
    /// first. Returns how many ran.
    pub fn advance(&self, by: Duration) -> usize {
        self.now.set(self.now.get() + by);
        let mut ran = 0;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let now = self.now.get();
                let due = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= now)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(i, _)| i);
                due.map(|i| timers.remove(i))
            };
            let Some(timer) = next else {
                break;
            };
            (timer.callback)();
            ran += 1;
        }
        ran
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl FrameHost for ManualFrames {
    fn request_frame(&self, callback: FrameCallback) {
        self.frames.borrow_mut().push_back(callback);
    }

    fn set_timeout(&self, delay: Duration, callback: FrameCallback) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.timers.borrow_mut().push(Timer {
            due: self.now.get() + delay,
            seq,
            callback,
        });
    }
}

/// Frame host backed by the tokio current-thread runtime.
#[derive(Debug, Clone)]
pub struct TokioFrames {
    interval: Duration,
}

impl TokioFrames {
    pub fn new(interval: Duration) -> Rc<Self> {
        Rc::new(Self { interval })
    }

    pub fn from_config(config: &RuntimeConfig) -> Rc<Self> {
        Self::new(config.frame_interval())
    }
}

impl FrameHost for TokioFrames {
    fn request_frame(&self, callback: FrameCallback) {
        self.set_timeout(self.interval, callback);
    }

    fn set_timeout(&self, delay: Duration, callback: FrameCallback) {
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_runs_only_frames_queued_before_it() {
        let frames = ManualFrames::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner = frames.clone();
        let l = log.clone();
        frames.request_frame(Box::new(move || {
            l.borrow_mut().push("first");
            let l = l.clone();
            inner.request_frame(Box::new(move || l.borrow_mut().push("second")));
        }));

        assert_eq!(frames.tick(), 1);
        assert_eq!(*log.borrow(), vec!["first"]);
        assert_eq!(frames.tick(), 1);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn timers_fire_in_due_order() {
        let frames = ManualFrames::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (name, ms) in [("slow", 30), ("fast", 10), ("mid", 20)] {
            let l = log.clone();
            frames.set_timeout(
                Duration::from_millis(ms),
                Box::new(move || l.borrow_mut().push(name)),
            );
        }

        assert_eq!(frames.advance(Duration::from_millis(15)), 1);
        assert_eq!(frames.advance(Duration::from_millis(100)), 2);
        assert_eq!(*log.borrow(), vec!["fast", "mid", "slow"]);
        assert_eq!(frames.pending_timers(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn tokio_frames_run_inside_a_local_set() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let frames = TokioFrames::new(Duration::from_millis(1));
                let hit = Rc::new(Cell::new(false));
                let h = hit.clone();
                frames.request_frame(Box::new(move || h.set(true)));
                assert!(!hit.get());

                for _ in 0..50 {
                    if hit.get() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                assert!(hit.get());
            })
            .await;
    }
}
