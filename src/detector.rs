//! Language change detector.
//!
//! Turns the noisy gesture signal from the keyboard hook into one
//! deduplicated [`LanguageChange`] per real layout switch:
//! - each gesture (re)arms a single-slot deadline on a worker thread
//! - when the deadline passes, the foreground layout is queried once
//! - the result is compared with the last known language

use crate::language::LanguageId;
use crate::layout::LayoutSource;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default delay between the gesture and the layout query. Windows commits
/// the new layout to the foreground thread asynchronously.
pub const DEFAULT_CHECK_DELAY: Duration = Duration::from_millis(250);

/// A confirmed change of the active input language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChange {
    pub language: LanguageId,
    pub name: String,
}

/// Callback type for language changes.
pub type ChangeCallback = Arc<dyn Fn(LanguageChange) + Send + Sync>;

/// Whether a deferred check is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    CheckScheduled,
}

struct Schedule {
    deadline: Option<Instant>,
    /// A fired check is querying the OS.
    checking: bool,
    shutdown: bool,
}

struct Shared {
    source: Box<dyn LayoutSource>,
    on_change: ChangeCallback,
    delay: Duration,
    last_known: Mutex<LanguageId>,
    schedule: Mutex<Schedule>,
    wakeup: Condvar,
}

impl Shared {
    fn check(&self) {
        let language = match self.source.current_language() {
            Ok(language) => language,
            Err(e) => {
                log::debug!("Layout check skipped: {}", e);
                return;
            }
        };

        // Update under the lock, notify outside of it
        let change = {
            let mut last = self.last_known.lock();
            if *last == language {
                log::trace!("Layout unchanged: {} ({})", language.name(), language);
                None
            } else {
                log::debug!(
                    "Layout: {} ({}) -> {} ({})",
                    last.name(),
                    *last,
                    language.name(),
                    language
                );
                *last = language;
                Some(LanguageChange {
                    language,
                    name: language.name().to_string(),
                })
            }
        };

        if let Some(change) = change {
            (self.on_change)(change);
        }
    }

    fn run(&self) {
        let mut schedule = self.schedule.lock();
        while !schedule.shutdown {
            let deadline = schedule.deadline;
            match deadline {
                None => self.wakeup.wait(&mut schedule),
                Some(deadline) if Instant::now() >= deadline => {
                    schedule.deadline = None;
                    schedule.checking = true;
                    drop(schedule);
                    self.check();
                    schedule = self.schedule.lock();
                    schedule.checking = false;
                }
                Some(deadline) => {
                    // Wakes early on reschedule or shutdown, the loop re-reads the slot
                    let _ = self.wakeup.wait_until(&mut schedule, deadline);
                }
            }
        }
    }
}

/// Debounced, state-tracking language change detector.
pub struct LanguageChangeDetector {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LanguageChangeDetector {
    /// Creates the detector and starts its worker thread.
    ///
    /// The last known language is read from `source` right away so the
    /// first gesture is compared against the real starting layout.
    pub fn new(
        source: Box<dyn LayoutSource>,
        delay: Duration,
        on_change: ChangeCallback,
    ) -> std::io::Result<Self> {
        let initial = source.current_language().unwrap_or_else(|e| {
            log::warn!("Initial layout query failed: {}", e);
            LanguageId::UNKNOWN
        });
        log::debug!("Initial language: {} ({})", initial.name(), initial);

        let shared = Arc::new(Shared {
            source,
            on_change,
            delay,
            last_known: Mutex::new(initial),
            schedule: Mutex::new(Schedule {
                deadline: None,
                checking: false,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("language-check".to_string())
            .spawn(move || worker_shared.run())?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Requests a check after the debounce delay, replacing any pending one.
    ///
    /// Safe to call from the keyboard hook: it only takes a short lock.
    pub fn schedule(&self) {
        let mut schedule = self.shared.schedule.lock();
        if schedule.shutdown {
            return;
        }
        schedule.deadline = Some(Instant::now() + self.shared.delay);
        self.shared.wakeup.notify_one();
    }

    /// Runs a check immediately on the calling thread.
    pub fn check_now(&self) {
        self.shared.check();
    }

    pub fn last_known(&self) -> LanguageId {
        *self.shared.last_known.lock()
    }

    /// True while a check is waiting for its deadline or running.
    pub fn is_check_pending(&self) -> bool {
        let schedule = self.shared.schedule.lock();
        schedule.deadline.is_some() || schedule.checking
    }

    pub fn state(&self) -> DetectorState {
        if self.is_check_pending() {
            DetectorState::CheckScheduled
        } else {
            DetectorState::Idle
        }
    }

    /// Cancels any pending check and stops the worker.
    ///
    /// Idempotent. Once this returns no check will run.
    pub fn shutdown(&self) {
        {
            let mut schedule = self.shared.schedule.lock();
            schedule.deadline = None;
            schedule.shutdown = true;
            self.shared.wakeup.notify_one();
        }

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                log::error!("Language check worker panicked");
            }
        }
    }
}

impl Drop for LanguageChangeDetector {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    const BULGARIAN: LanguageId = LanguageId(0x0402);
    const ENGLISH: LanguageId = LanguageId(0x0409);

    /// Generous upper bound for anything the worker is expected to do.
    const PATIENCE: Duration = Duration::from_secs(5);

    /// Layout source driven by the test. Records when each query happened.
    #[derive(Clone)]
    struct FakeSource {
        current: Arc<Mutex<Result<LanguageId, QueryError>>>,
        latency: Arc<Mutex<Duration>>,
        queries: Arc<Mutex<Vec<Instant>>>,
    }

    impl FakeSource {
        fn new(language: LanguageId) -> Self {
            Self {
                current: Arc::new(Mutex::new(Ok(language))),
                latency: Arc::new(Mutex::new(Duration::ZERO)),
                queries: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn set(&self, value: Result<LanguageId, QueryError>) {
            *self.current.lock() = value;
        }

        fn set_latency(&self, latency: Duration) {
            *self.latency.lock() = latency;
        }

        fn queries(&self) -> usize {
            self.queries.lock().len()
        }

        fn last_query_at(&self) -> Option<Instant> {
            self.queries.lock().last().copied()
        }
    }

    impl LayoutSource for FakeSource {
        fn current_language(&self) -> Result<LanguageId, QueryError> {
            self.queries.lock().push(Instant::now());
            let latency = *self.latency.lock();
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            self.current.lock().clone()
        }
    }

    /// Polls `condition` until it holds or `PATIENCE` runs out.
    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + PATIENCE;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn create_detector(
        source: &FakeSource,
        delay: Duration,
    ) -> (LanguageChangeDetector, Arc<Mutex<Vec<LanguageChange>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let detector = LanguageChangeDetector::new(
            Box::new(source.clone()),
            delay,
            Arc::new(move |change| sink.lock().push(change)),
        )
        .unwrap();
        (detector, events)
    }

    #[test]
    fn test_initial_language_read_at_construction() {
        let source = FakeSource::new(BULGARIAN);
        let (detector, events) = create_detector(&source, DEFAULT_CHECK_DELAY);
        assert_eq!(detector.last_known(), BULGARIAN);
        assert_eq!(detector.state(), DetectorState::Idle);
        assert_eq!(source.queries(), 1);
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_initial_query_failure_starts_unknown() {
        let source = FakeSource::new(ENGLISH);
        source.set(Err(QueryError::NoForegroundWindow));
        let (detector, _) = create_detector(&source, DEFAULT_CHECK_DELAY);
        assert_eq!(detector.last_known(), LanguageId::UNKNOWN);
    }

    #[test]
    fn test_unchanged_layout_emits_nothing() {
        let source = FakeSource::new(ENGLISH);
        let (detector, events) = create_detector(&source, DEFAULT_CHECK_DELAY);

        detector.check_now();
        assert!(events.lock().is_empty());
        assert_eq!(detector.last_known(), ENGLISH);
    }

    #[test]
    fn test_change_emits_once() {
        let source = FakeSource::new(ENGLISH);
        let (detector, events) = create_detector(&source, DEFAULT_CHECK_DELAY);

        source.set(Ok(BULGARIAN));
        detector.check_now();
        detector.check_now();

        assert_eq!(
            *events.lock(),
            vec![LanguageChange {
                language: BULGARIAN,
                name: "Bulgarian".to_string()
            }]
        );
        assert_eq!(detector.last_known(), BULGARIAN);
    }

    #[test]
    fn test_change_back_emits_again() {
        let source = FakeSource::new(ENGLISH);
        let (detector, events) = create_detector(&source, DEFAULT_CHECK_DELAY);

        source.set(Ok(BULGARIAN));
        detector.check_now();
        source.set(Ok(ENGLISH));
        detector.check_now();

        let names: Vec<String> = events.lock().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["Bulgarian", "English"]);
    }

    #[test]
    fn test_unknown_language_updates_state() {
        let source = FakeSource::new(ENGLISH);
        let (detector, events) = create_detector(&source, DEFAULT_CHECK_DELAY);

        source.set(Ok(LanguageId(0x0411)));
        detector.check_now();

        assert_eq!(events.lock()[0].name, "Unknown");
        assert_eq!(detector.last_known(), LanguageId(0x0411));
    }

    #[test]
    fn test_query_failure_is_skipped() {
        let source = FakeSource::new(ENGLISH);
        let (detector, events) = create_detector(&source, DEFAULT_CHECK_DELAY);

        source.set(Err(QueryError::NoOwningThread));
        detector.check_now();
        assert!(events.lock().is_empty());
        assert_eq!(detector.last_known(), ENGLISH);

        // The next check recovers
        source.set(Ok(BULGARIAN));
        detector.check_now();
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn test_scheduled_check_fires_after_delay() {
        let delay = Duration::from_millis(50);
        let source = FakeSource::new(ENGLISH);
        let (detector, events) = create_detector(&source, delay);

        source.set(Ok(BULGARIAN));
        let scheduled_at = Instant::now();
        detector.schedule();
        assert_eq!(detector.state(), DetectorState::CheckScheduled);

        assert!(wait_for(|| events.lock().len() == 1));
        assert!(wait_for(|| detector.state() == DetectorState::Idle));
        assert_eq!(source.queries(), 2);
        assert!(source.last_query_at().unwrap() >= scheduled_at + delay);
    }

    #[test]
    fn test_burst_coalesces_into_one_query() {
        let delay = Duration::from_millis(100);
        let source = FakeSource::new(ENGLISH);
        let (detector, events) = create_detector(&source, delay);

        source.set(Ok(BULGARIAN));
        let mut last_scheduled_at = Instant::now();
        for _ in 0..5 {
            last_scheduled_at = Instant::now();
            detector.schedule();
            thread::sleep(Duration::from_millis(10));
        }

        assert!(wait_for(|| source.queries() == 2));
        // Timed from the last gesture of the burst, not the first
        assert!(source.last_query_at().unwrap() >= last_scheduled_at + delay);

        assert!(wait_for(|| detector.state() == DetectorState::Idle));
        thread::sleep(delay * 3);
        assert_eq!(source.queries(), 2);
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn test_reschedule_restarts_delay() {
        let delay = Duration::from_millis(200);
        let source = FakeSource::new(ENGLISH);
        let (detector, _) = create_detector(&source, delay);

        detector.schedule();
        thread::sleep(Duration::from_millis(100));
        let rescheduled_at = Instant::now();
        detector.schedule();

        assert!(wait_for(|| source.queries() == 2));
        assert!(source.last_query_at().unwrap() >= rescheduled_at + delay);

        assert!(wait_for(|| detector.state() == DetectorState::Idle));
        thread::sleep(delay * 2);
        assert_eq!(source.queries(), 2);
    }

    #[test]
    fn test_state_stays_scheduled_during_query() {
        let source = FakeSource::new(ENGLISH);
        let (detector, events) = create_detector(&source, Duration::from_millis(10));

        source.set(Ok(BULGARIAN));
        source.set_latency(Duration::from_millis(500));
        detector.schedule();

        // The query has started but has not returned yet
        assert!(wait_for(|| source.queries() == 2));
        assert!(events.lock().is_empty());
        assert_eq!(detector.state(), DetectorState::CheckScheduled);

        assert!(wait_for(|| events.lock().len() == 1));
        assert!(wait_for(|| detector.state() == DetectorState::Idle));
    }

    #[test]
    fn test_shutdown_is_idempotent_and_cancels() {
        let delay = Duration::from_millis(300);
        let source = FakeSource::new(ENGLISH);
        let (detector, events) = create_detector(&source, delay);

        source.set(Ok(BULGARIAN));
        detector.schedule();
        detector.shutdown();
        detector.shutdown();
        assert!(!detector.is_check_pending());

        thread::sleep(delay * 2);
        assert_eq!(source.queries(), 1);
        assert!(events.lock().is_empty());

        // Scheduling after shutdown is ignored
        detector.schedule();
        assert_eq!(detector.state(), DetectorState::Idle);
    }
}
