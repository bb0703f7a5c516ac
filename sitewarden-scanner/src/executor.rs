// Sequential async executor: one unit of work in flight at a time

use std::future::Future;
use tracing::debug;

/// Outcome of one item handed to [`run_sequential`]
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T, E> {
    Completed(T),
    Failed(E),
    /// The worker had nothing to do for this item
    Skipped,
}

impl<T, E> Settled<T, E> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Settled::Completed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Settled::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Settled::Skipped)
    }
}

/// Completed, failed and skipped counts of a settled list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tally {
    pub fn of<T, E>(settled: &[Settled<T, E>]) -> Self {
        settled.iter().fold(Tally::default(), |mut tally, outcome| {
            match outcome {
                Settled::Completed(_) => tally.completed += 1,
                Settled::Failed(_) => tally.failed += 1,
                Settled::Skipped => tally.skipped += 1,
            }
            tally
        })
    }
}

/// Run `worker` over `items` strictly one after another.
///
/// Each item's future is started only after the previous one settled, so
/// input order is also initiation order. A failing item never stops the
/// remaining ones; its error is kept in the returned list instead. When the
/// worker returns `None` the item is recorded as [`Settled::Skipped`].
///
/// The output is positional: entry `i` belongs to input item `i`. Workers may
/// themselves await `run_sequential` over a derived list; the outer run only
/// advances once that nested run has finished.
pub async fn run_sequential<I, F, Fut, T, E>(items: I, mut worker: F) -> Vec<Settled<T, E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Option<Fut>,
    Fut: Future<Output = Result<T, E>>,
{
    let mut settled = Vec::new();

    for (idx, item) in items.into_iter().enumerate() {
        let outcome = match worker(item) {
            Some(work) => match work.await {
                Ok(value) => Settled::Completed(value),
                Err(e) => {
                    debug!("Item {} failed, continuing with the next one", idx);
                    Settled::Failed(e)
                }
            },
            None => Settled::Skipped,
        };
        settled.push(outcome);
    }

    settled
}
