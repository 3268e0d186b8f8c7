//! Run-once state for the fixture image build.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use imagefixture_common::error::FixtureError;
use imagefixture_image::engine::BuildSummary;
use tokio::task::JoinHandle;

/// Recorded result of the one fixture build attempt.
pub(crate) type Outcome = std::result::Result<BuildSummary, Arc<FixtureError>>;

type SharedRun = Shared<BoxFuture<'static, Outcome>>;

/// One-shot latch holding the outcome of the fixture sequence.
///
/// The first caller spawns the sequence as a runtime task and every caller,
/// that one included, awaits the same task. Dropping a caller (timeout,
/// `select!`, aborted test) stops only its wait: the task keeps running and
/// later callers pick up its outcome. The outcome is permanent, failures
/// included.
#[derive(Default)]
pub(crate) struct FixtureLatch {
    run: OnceLock<SharedRun>,
    attempts: AtomicUsize,
}

impl std::fmt::Debug for FixtureLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureLatch")
            .field("started", &self.run.get().is_some())
            .field("outcome", &self.outcome())
            .field("attempts", &self.attempts())
            .finish()
    }
}

impl FixtureLatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the outcome of the sequence, spawning it through `start` if
    /// no caller has yet.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) async fn get_or_run<F>(&self, start: F) -> Outcome
    where
        F: FnOnce() -> JoinHandle<Outcome>,
    {
        let run = self
            .run
            .get_or_init(|| {
                let _ = self.attempts.fetch_add(1, Ordering::SeqCst);
                let handle = start();
                async move {
                    handle.await.unwrap_or_else(|e| {
                        Err(Arc::new(FixtureError::Task {
                            message: e.to_string(),
                        }))
                    })
                }
                .boxed()
                .shared()
            })
            .clone();
        run.await
    }

    /// Stored outcome, if the sequence has completed and a caller has
    /// observed it.
    pub(crate) fn outcome(&self) -> Option<&Outcome> {
        self.run.get().and_then(Shared::peek)
    }

    /// How many times the sequence has been started.
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}
