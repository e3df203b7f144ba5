use crate::runtime::ReactiveRuntime;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// A memoized computed value that automatically tracks dependencies.
///
/// Memos only recompute when their dependencies change. Clones share one
/// cache; when the last clone is dropped the memo is disposed and the
/// teardowns its computation registered run.
#[derive(Clone)]
pub struct Memo<T> {
    inner: Arc<MemoInner<T>>,
}

struct MemoInner<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,
    cached: RwLock<Option<T>>,
    id: usize,
    runtime: Weak<ReactiveRuntime>,
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_observer(self.id);
        }
    }
}

impl<T: Clone + 'static> Memo<T> {
    /// Create a new memo with the given computation function.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        // Register this as a memo with the runtime
        runtime.register_memo(id);

        Self {
            inner: Arc::new(MemoInner {
                compute: Box::new(compute),
                cached: RwLock::new(None),
                id,
                runtime: runtime.downgrade(),
            }),
        }
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Read the memoized value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        ReactiveRuntime::current().track_read(self.inner.id);

        let Some(runtime) = self.inner.runtime.upgrade() else {
            // Runtime is gone: nothing can invalidate the cache any more
            return f(&(self.inner.compute)());
        };

        if runtime.is_memo_dirty(self.inner.id) {
            let value = self.recompute(&runtime);
            return f(&value);
        }

        let cached = self.inner.cached.read().unwrap_or_else(PoisonError::into_inner);
        match cached.as_ref() {
            Some(value) => f(value),
            None => {
                drop(cached);
                let value = self.recompute(&runtime);
                f(&value)
            }
        }
    }

    /// The memo's unique ID.
    pub fn id(&self) -> usize {
        self.inner.id
    }

    fn recompute(&self, runtime: &ReactiveRuntime) -> T {
        let inner = &self.inner;
        // Teardowns from the previous run go before the new one starts
        runtime.reset_observer(inner.id);
        let value = runtime.with_observer(inner.id, || (inner.compute)());
        *inner.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(value.clone());
        runtime.mark_memo_clean(inner.id);
        value
    }
}

/// Create a new memoized computation.
///
/// # Example
///
/// ```
/// use stashed::{create_memo, Signal};
///
/// let count = Signal::new(5);
/// let doubled = create_memo({
///     let count = count.clone();
///     move || count.get() * 2
/// });
/// assert_eq!(doubled.get(), 10);
/// ```
pub fn create_memo<T, F>(compute: F) -> Memo<T>
where
    T: Clone + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Memo::new(compute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Signal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn memo_basic() {
        ReactiveRuntime::scope(|| {
            let count = Signal::new(5);
            let doubled = create_memo({
                let count = count.clone();
                move || count.get() * 2
            });

            assert_eq!(doubled.get(), 10);

            count.set(10);
            assert_eq!(doubled.get(), 20);
        });
    }

    #[test]
    fn memo_caches_between_changes() {
        ReactiveRuntime::scope(|| {
            let count = Signal::new(1);
            let computed = Arc::new(AtomicUsize::new(0));
            let memo = create_memo({
                let count = count.clone();
                let computed = computed.clone();
                move || {
                    computed.fetch_add(1, Ordering::SeqCst);
                    count.get() + 1
                }
            });

            assert_eq!(memo.get(), 2);
            assert_eq!(memo.get(), 2);
            assert_eq!(computed.load(Ordering::SeqCst), 1);

            count.set(4);
            assert_eq!(memo.get(), 5);
            assert_eq!(computed.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn dropping_last_clone_runs_teardown() {
        ReactiveRuntime::scope(|| {
            let count = Signal::new(1);
            let torn_down = Arc::new(AtomicUsize::new(0));

            let memo = create_memo({
                let count = count.clone();
                let torn_down = torn_down.clone();
                move || {
                    let torn_down = torn_down.clone();
                    ReactiveRuntime::current().on_cleanup(move || {
                        torn_down.fetch_add(1, Ordering::SeqCst);
                    });
                    count.get()
                }
            });
            let copy = memo.clone();
            assert_eq!(memo.get(), 1);

            drop(memo);
            assert_eq!(torn_down.load(Ordering::SeqCst), 0);
            assert_eq!(copy.get(), 1);

            drop(copy);
            assert_eq!(torn_down.load(Ordering::SeqCst), 1);

            count.set(2);
            assert_eq!(torn_down.load(Ordering::SeqCst), 1);
        });
    }
}
