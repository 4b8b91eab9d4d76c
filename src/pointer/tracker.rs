use crate::geometry::Point;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const MAX_SAMPLE_INTERVAL: Duration = Duration::from_millis(16);
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

pub trait CursorSource: Send + Sync {
    fn cursor_position(&self) -> Option<Point>;
}

#[derive(Debug, Default)]
pub struct SystemCursorSource;

impl CursorSource for SystemCursorSource {
    #[cfg(windows)]
    fn cursor_position(&self) -> Option<Point> {
        use windows::Win32::Foundation::POINT;
        use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

        let mut point = POINT { x: 0, y: 0 };
        if unsafe { GetCursorPos(&mut point).is_ok() } {
            Some(Point::new(point.x as f32, point.y as f32))
        } else {
            None
        }
    }

    #[cfg(not(windows))]
    fn cursor_position(&self) -> Option<Point> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorSample {
    pub position: Point,
    pub timestamp: Instant,
}

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

/// Samples the global cursor position on a background thread at a fixed period.
pub struct PointerTracker {
    source: Arc<dyn CursorSource>,
    latest: Arc<RwLock<Option<CursorSample>>>,
    worker: Option<WorkerHandle>,
}

impl PointerTracker {
    pub fn new(source: Arc<dyn CursorSource>) -> Self {
        Self {
            source,
            latest: Arc::new(RwLock::new(None)),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts sampling every `interval` (clamped to 1..=16 ms). A running tracker is left alone.
    pub fn start(&mut self, interval: Duration) {
        if self.worker.is_some() {
            debug!("pointer tracker already running");
            return;
        }
        let interval = interval.clamp(MIN_SAMPLE_INTERVAL, MAX_SAMPLE_INTERVAL);
        if let Ok(mut latest) = self.latest.write() {
            *latest = None;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let source = Arc::clone(&self.source);
        let latest = Arc::clone(&self.latest);
        let join = std::thread::spawn(move || loop {
            if let Some(position) = source.cursor_position() {
                match latest.write() {
                    Ok(mut slot) => {
                        *slot = Some(CursorSample {
                            position,
                            timestamp: Instant::now(),
                        })
                    }
                    Err(_) => {
                        warn!("pointer sample slot poisoned");
                        break;
                    }
                }
            }
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                _ => break,
            }
        });
        self.worker = Some(WorkerHandle { stop_tx, join });
        debug!(?interval, "pointer tracker started");
    }

    /// Stops sampling. No sample is written after this returns. Idempotent.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.join();
            debug!("pointer tracker stopped");
        }
    }

    pub fn latest_sample(&self) -> Option<CursorSample> {
        self.latest.read().ok().and_then(|slot| *slot)
    }

    pub fn current_position(&self) -> Option<Point> {
        self.latest_sample().map(|sample| sample.position)
    }
}

impl Drop for PointerTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cursor source driven by tests; counts every read.
#[derive(Debug, Default)]
pub struct MockCursorSource {
    position: Mutex<Option<Point>>,
    reads: AtomicUsize,
}

impl MockCursorSource {
    pub fn new(position: Option<Point>) -> Arc<Self> {
        Arc::new(Self {
            position: Mutex::new(position),
            reads: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, position: Point) {
        if let Ok(mut slot) = self.position.lock() {
            *slot = Some(position);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.position.lock() {
            *slot = None;
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl CursorSource for MockCursorSource {
    fn cursor_position(&self) -> Option<Point> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.position.lock().ok().and_then(|slot| *slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn wait_for(tracker: &PointerTracker, expected: Point) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if tracker.current_position() == Some(expected) {
                return true;
            }
            sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn publishes_latest_position() {
        let source = MockCursorSource::new(Some(Point::new(5.0, 5.0)));
        let mut tracker = PointerTracker::new(source.clone());
        tracker.start(Duration::from_millis(2));
        assert!(wait_for(&tracker, Point::new(5.0, 5.0)));
        source.set(Point::new(40.0, 12.0));
        assert!(wait_for(&tracker, Point::new(40.0, 12.0)));
        tracker.stop();
    }

    #[test]
    fn no_sampling_after_stop() {
        let source = MockCursorSource::new(Some(Point::ZERO));
        let mut tracker = PointerTracker::new(source.clone());
        tracker.start(Duration::from_millis(1));
        sleep(Duration::from_millis(10));
        tracker.stop();
        tracker.stop();
        let reads = source.reads();
        sleep(Duration::from_millis(20));
        assert_eq!(source.reads(), reads);
        assert!(!tracker.is_running());
    }

    #[test]
    fn restart_begins_from_empty_sample() {
        let source = MockCursorSource::new(Some(Point::new(1.0, 1.0)));
        let mut tracker = PointerTracker::new(source.clone());
        tracker.start(Duration::from_millis(1));
        assert!(wait_for(&tracker, Point::new(1.0, 1.0)));
        tracker.stop();
        assert!(tracker.current_position().is_some());

        source.clear();
        tracker.start(Duration::from_millis(1));
        sleep(Duration::from_millis(5));
        assert_eq!(tracker.current_position(), None);
        tracker.stop();
    }
}
