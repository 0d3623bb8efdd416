//! Thread pools and cancellation shared by a training run

use super::TrainError;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Execution resources for training.
///
/// Three independent pools are kept: `cv` runs folds and ensemble members,
/// `saga` accumulates the Gram matrix of the coordinate estimator and `lr`
/// evaluates losses and gradients. A thread count of `0` selects rayon's
/// default (one per logical CPU).
#[derive(Clone)]
pub struct TrainingContext {
    pool_cv: Arc<ThreadPool>,
    pool_saga: Arc<ThreadPool>,
    pool_lr: Arc<ThreadPool>,
    cancelled: Arc<AtomicBool>,
}

fn build_pool(threads: usize, name: &'static str) -> Result<Arc<ThreadPool>, TrainError> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("kmerlr-{}-{}", name, i))
        .build()
        .map(Arc::new)
        .map_err(|e| TrainError::ThreadPool(e.to_string()))
}

impl TrainingContext {
    pub fn new(threads_cv: usize, threads_saga: usize, threads_lr: usize) -> Result<Self, TrainError> {
        log::debug!(
            "thread pools: cv={} saga={} lr={}",
            threads_cv,
            threads_saga,
            threads_lr
        );
        Ok(Self {
            pool_cv: build_pool(threads_cv, "cv")?,
            pool_saga: build_pool(threads_saga, "saga")?,
            pool_lr: build_pool(threads_lr, "lr")?,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// One thread per pool; results are reproducible bit for bit.
    pub fn single_threaded() -> Result<Self, TrainError> {
        Self::new(1, 1, 1)
    }

    pub fn pool_cv(&self) -> &ThreadPool {
        &self.pool_cv
    }

    pub fn pool_saga(&self) -> &ThreadPool {
        &self.pool_saga
    }

    pub fn pool_lr(&self) -> &ThreadPool {
        &self.pool_lr
    }

    /// Request cancellation. Outer loops stop before their next iteration
    /// and estimators before their next step.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Shared flag, e.g. for a signal handler.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

impl std::fmt::Debug for TrainingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingContext")
            .field("threads_cv", &self.pool_cv.current_num_threads())
            .field("threads_saga", &self.pool_saga.current_num_threads())
            .field("threads_lr", &self.pool_lr.current_num_threads())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
