//! Admission control for in-flight requests.
//!
//! A Tokio semaphore bounds how many requests may be attempting or backing
//! off at once. Admission returns an RAII permit; dropping it on any exit
//! path (success, failure, panic or cancellation) returns the capacity.

use colloquy_core::{ConcurrencyTiers, PayloadWeight};
use colloquy_error::{DispatchError, DispatchErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

/// How a batch chooses its in-flight limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyLimit {
    /// Look the limit up from the configured weight tiers
    Weight(PayloadWeight),
    /// Use an explicit limit
    Fixed(usize),
}

impl ConcurrencyLimit {
    /// Concrete limit under the given tiers.
    pub fn resolve(&self, tiers: &ConcurrencyTiers) -> usize {
        match self {
            ConcurrencyLimit::Weight(weight) => tiers.limit_for(*weight),
            ConcurrencyLimit::Fixed(limit) => *limit,
        }
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        ConcurrencyLimit::Weight(PayloadWeight::Default)
    }
}

impl From<PayloadWeight> for ConcurrencyLimit {
    fn from(weight: PayloadWeight) -> Self {
        ConcurrencyLimit::Weight(weight)
    }
}

impl From<usize> for ConcurrencyLimit {
    fn from(limit: usize) -> Self {
        ConcurrencyLimit::Fixed(limit)
    }
}

/// Bounded admission gate.
///
/// Cloning shares the same capacity.
///
/// # Example
///
/// ```
/// use colloquy_dispatch::ConcurrencyGate;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let gate = ConcurrencyGate::new(2)?;
/// let first = gate.admit().await?;
/// let _second = gate.admit().await?;
/// assert!(gate.try_admit().is_none());
///
/// drop(first);
/// assert!(gate.try_admit().is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `limit` holders at once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConcurrency` if `limit` is zero or exceeds what the
    /// semaphore can represent.
    pub fn new(limit: usize) -> Result<Self, DispatchError> {
        if limit == 0 || limit > Semaphore::MAX_PERMITS {
            return Err(DispatchError::new(DispatchErrorKind::InvalidConcurrency(
                limit,
            )));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Create a gate sized for a payload weight class.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConcurrency` if the tier's limit is zero.
    pub fn for_weight(tiers: &ConcurrencyTiers, weight: PayloadWeight) -> Result<Self, DispatchError> {
        Self::new(tiers.limit_for(weight))
    }

    /// Wait until a slot is free, then take it.
    ///
    /// Waiting blocks only the caller.
    ///
    /// # Errors
    ///
    /// Returns `GateClosed` if the gate was closed while waiting.
    pub async fn admit(&self) -> Result<GatePermit, DispatchError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::new(DispatchErrorKind::GateClosed))?;
        Ok(self.track(permit))
    }

    /// Take a slot only if one is free right now.
    pub fn try_admit(&self) -> Option<GatePermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| self.track(permit))
    }

    fn track(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        trace!(active = now, limit = self.limit, "Admitted");
        GatePermit {
            _permit: permit,
            active: Arc::clone(&self.active),
        }
    }

    /// Stop admitting; current waiters receive `GateClosed`.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Configured limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits currently held.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of permits ever held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Scoped admission. Releases its slot on drop.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
