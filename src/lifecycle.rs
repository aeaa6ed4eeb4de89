use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generation counter of a view (or of one kind of request inside a view). \
/// Every request is stamped with a [`Ticket`]; [`Lifecycle::advance()`] invalidates all tickets handed out so far,
/// so responses that arrive after an unmount or a re-trigger are dropped instead of applied.
#[derive(Debug, Default)]
pub struct Lifecycle {
    generation: Arc<AtomicU64>,
}

/// Proof that a request was started in a specific generation of a [`Lifecycle`]
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl Lifecycle {

    pub fn new() -> Self {
        Self::default()
    }

    /// A ticket for the current generation
    pub fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation.load(Ordering::Acquire),
            current: self.generation.clone(),
        }
    }

    /// Starts a new generation, making every outstanding ticket stale
    pub fn advance(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Advances, then returns a ticket for the new generation
    pub fn restart(&self) -> Ticket {
        self.advance();
        self.ticket()
    }

}

impl Ticket {

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }

    /// Checks whether `self` was issued by `lifecycle`
    pub fn belongs_to(&self, lifecycle: &Lifecycle) -> bool {
        Arc::ptr_eq(&self.current, &lifecycle.generation)
    }

}
