//! Incremental update controller.
//!
//! A [`Session`] receives change events together with the editor's current
//! snapshot, decides whether the electrical solution may have changed, and
//! publishes complete [`SolveResult`]s.
//!
//! ```text
//!   Idle --change--> Dirty --cycle--> Solving --done--> Published
//!                      ^                 |                  |
//!                      +----change-------+------change------+
//! ```
//!
//! Every solution-affecting change bumps the session revision. A cycle
//! solves the newest snapshot it sees; if another change arrives while it is
//! solving, its result is dropped at publication and the session stays dirty.
//! Readers never observe a partial result.

mod event;

pub use event::ChangeEvent;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, trace};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::circuit::{CircuitSnapshot, ElementId, Graph};
use crate::error::Result;
use crate::solver::{self, ElementState, SolveResult, SolverConfig};

/// Where a session is in its update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has been solved yet and nothing is pending.
    Idle,
    /// A change is waiting to be solved.
    Dirty,
    /// A solve is in flight and no newer change has arrived.
    Solving,
    /// The published result matches the latest change.
    Published,
}

struct Inner {
    phase: Phase,
    /// Revision of the latest solution-affecting change.
    revision: u64,
    /// Revision of the currently published result.
    published_revision: u64,
    /// Snapshot of the latest change, taken by the next cycle.
    pending: Option<CircuitSnapshot>,
}

struct Shared {
    config: SolverConfig,
    inner: Mutex<Inner>,
    /// Signalled on every change and every publication.
    changed: Condvar,
    published: RwLock<Arc<SolveResult>>,
}

/// Handle to one editor's solver state. Clones share the session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("Session")
            .field("phase", &inner.phase)
            .field("revision", &inner.revision)
            .field("published_revision", &inner.published_revision)
            .finish()
    }
}

impl Session {
    /// Create a session. Fails only on an invalid configuration.
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(Inner {
                    phase: Phase::Idle,
                    revision: 0,
                    published_revision: 0,
                    pending: None,
                }),
                changed: Condvar::new(),
                published: RwLock::new(Arc::new(SolveResult::empty())),
            }),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.shared.config
    }

    /// Report an editor change.
    ///
    /// Returns the new revision when the change needs a re-solve, `None`
    /// for presentational changes, which are ignored.
    pub fn notify(&self, event: &ChangeEvent, snapshot: CircuitSnapshot) -> Option<u64> {
        if !event.affects_solution() {
            trace!("Ignoring presentational change {event:?}");
            return None;
        }
        let mut inner = self.shared.inner.lock();
        inner.revision += 1;
        inner.pending = Some(snapshot);
        trace!("{:?} -> Dirty at revision {} ({event:?})", inner.phase, inner.revision);
        inner.phase = Phase::Dirty;
        let revision = inner.revision;
        drop(inner);
        self.shared.changed.notify_all();
        Some(revision)
    }

    /// Run one build-and-solve cycle if the session is dirty.
    ///
    /// Returns `false` when there was nothing to do.
    pub fn run_cycle(&self) -> bool {
        match self.begin_cycle() {
            Some(cycle) => {
                self.finish_cycle(cycle);
                true
            }
            None => false,
        }
    }

    /// Take the pending snapshot and move `Dirty -> Solving`.
    pub fn begin_cycle(&self) -> Option<Cycle> {
        let mut inner = self.shared.inner.lock();
        if inner.phase != Phase::Dirty {
            return None;
        }
        let snapshot = inner.pending.take()?;
        inner.phase = Phase::Solving;
        trace!("Dirty -> Solving at revision {}", inner.revision);
        Some(Cycle {
            revision: inner.revision,
            snapshot,
        })
    }

    /// Solve a cycle's snapshot and publish the result.
    ///
    /// Returns `false` when a newer change arrived in the meantime; the
    /// result is then dropped and the session stays dirty.
    pub fn finish_cycle(&self, cycle: Cycle) -> bool {
        let Cycle { revision, snapshot } = cycle;
        let graph = Graph::build(&snapshot);
        let mut result = solver::solve(&graph, &self.shared.config);
        result.revision = revision;

        let mut inner = self.shared.inner.lock();
        if inner.revision != revision {
            debug!(
                "Discarding result for revision {revision}; revision {} is pending",
                inner.revision
            );
            return false;
        }
        *self.shared.published.write() = Arc::new(result);
        inner.published_revision = revision;
        inner.phase = Phase::Published;
        trace!("Solving -> Published at revision {revision}");
        drop(inner);
        self.shared.changed.notify_all();
        true
    }

    /// Run cycles on the calling thread until the session is clean.
    pub fn solve_pending(&self) -> Arc<SolveResult> {
        while self.run_cycle() {}
        self.published()
    }

    /// The latest complete result.
    pub fn published(&self) -> Arc<SolveResult> {
        Arc::clone(&self.shared.published.read())
    }

    /// State of one element in the latest published result.
    pub fn element_state(&self, id: &ElementId) -> Result<ElementState> {
        self.published().element_state(id).cloned()
    }

    pub fn phase(&self) -> Phase {
        self.shared.inner.lock().phase
    }

    /// Revision of the latest solution-affecting change.
    pub fn revision(&self) -> u64 {
        self.shared.inner.lock().revision
    }

    /// Block until a result at or after `revision` is published.
    ///
    /// Returns `false` on timeout.
    pub fn wait_for_revision(&self, revision: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.inner.lock();
        while inner.published_revision < revision {
            if self.shared.changed.wait_until(&mut inner, deadline).timed_out() {
                return inner.published_revision >= revision;
            }
        }
        true
    }

    /// Start a background thread that solves whenever the session is dirty.
    ///
    /// The thread stops when the returned handle is dropped. Other workers
    /// of the same session keep running.
    pub fn spawn_worker(&self) -> WorkerHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let session = self.clone();
        let thread = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || loop {
                {
                    let mut inner = session.shared.inner.lock();
                    while inner.phase != Phase::Dirty && !stop.load(Ordering::Acquire) {
                        session.shared.changed.wait(&mut inner);
                    }
                    if stop.load(Ordering::Acquire) {
                        trace!("Solver worker stopping");
                        return;
                    }
                }
                session.run_cycle();
            })
        };
        WorkerHandle {
            shared: Arc::clone(&self.shared),
            stop,
            thread: Some(thread),
        }
    }
}

/// A snapshot taken for solving, tagged with the revision it belongs to.
#[derive(Debug)]
pub struct Cycle {
    revision: u64,
    snapshot: CircuitSnapshot,
}

impl Cycle {
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Owns a session's background solver thread.
pub struct WorkerHandle {
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Stop the worker and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            // Set under the lock so the worker cannot miss the wakeup.
            {
                let _inner = self.shared.inner.lock();
                self.stop.store(true, Ordering::Release);
            }
            self.shared.changed.notify_all();
            if thread.join().is_err() {
                log::error!("Solver worker panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{ElementConfig, ElementKind};
    use approx::assert_relative_eq;

    fn divider(top: f64) -> CircuitSnapshot {
        let mut snapshot = CircuitSnapshot::new();
        snapshot
            .add("b1", ElementKind::Battery, ElementConfig::new().with_voltage(9.0))
            .add("r1", ElementKind::Resistor, ElementConfig::new().with_resistance(top))
            .connect("b1", 0, "r1", 0)
            .connect("b1", 1, "r1", 1);
        snapshot
    }

    fn reconfigured() -> ChangeEvent {
        ChangeEvent::ElementReconfigured { id: "r1".into() }
    }

    #[test]
    fn test_phases() {
        let session = Session::new(SolverConfig::default()).unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.run_cycle());

        assert_eq!(session.notify(&reconfigured(), divider(5.0)), Some(1));
        assert_eq!(session.phase(), Phase::Dirty);

        let result = session.solve_pending();
        assert_eq!(session.phase(), Phase::Published);
        assert_eq!(result.revision, 1);
        assert_relative_eq!(
            session.element_state(&"r1".into()).unwrap().current,
            1.8,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_presentational_change_keeps_result() {
        let session = Session::new(SolverConfig::default()).unwrap();
        session.notify(&reconfigured(), divider(5.0));
        let before = session.solve_pending();

        let moved = ChangeEvent::ElementMoved { id: "r1".into() };
        assert_eq!(session.notify(&moved, divider(1.0)), None);
        assert_eq!(session.phase(), Phase::Published);
        assert!(!session.run_cycle());
        assert!(Arc::ptr_eq(&before, &session.published()));
    }

    #[test]
    fn test_last_write_wins() {
        let session = Session::new(SolverConfig::default()).unwrap();
        session.notify(&reconfigured(), divider(5.0));
        session.notify(&reconfigured(), divider(9.0));
        let result = session.solve_pending();
        assert_eq!(result.revision, 2);
        assert_relative_eq!(
            session.element_state(&"r1".into()).unwrap().current,
            1.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_change_during_solve_discards_result() {
        let session = Session::new(SolverConfig::default()).unwrap();
        session.notify(&reconfigured(), divider(5.0));
        let cycle = session.begin_cycle().unwrap();
        assert_eq!(cycle.revision(), 1);
        assert_eq!(session.phase(), Phase::Solving);
        assert!(session.begin_cycle().is_none());

        let latest = session.notify(&reconfigured(), divider(9.0)).unwrap();
        assert!(!session.finish_cycle(cycle));
        assert_eq!(session.phase(), Phase::Dirty);
        assert_eq!(session.published().revision, 0);
        assert!(session.published().elements.is_empty());

        assert!(session.run_cycle());
        assert_eq!(session.phase(), Phase::Published);
        assert_eq!(session.published().revision, latest);
        assert_relative_eq!(
            session.element_state(&"r1".into()).unwrap().current,
            1.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_missing_element_is_an_error() {
        let session = Session::new(SolverConfig::default()).unwrap();
        assert!(session.element_state(&"nope".into()).is_err());
    }

    #[test]
    fn test_worker_publishes() {
        let session = Session::new(SolverConfig::default()).unwrap();
        let worker = session.spawn_worker();
        let revision = session.notify(&reconfigured(), divider(5.0)).unwrap();
        assert!(session.wait_for_revision(revision, Duration::from_secs(10)));
        assert_eq!(session.published().revision, revision);
        worker.stop();
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(Session::new(SolverConfig::new().with_max_iterations(0)).is_err());
    }
}
