use crate::runtime::ReactiveRuntime;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// A reactive signal that holds a value and notifies subscribers when changed.
///
/// A signal belongs to the runtime it was created in: writes notify that
/// runtime's observers whichever thread or scope they come from.
#[derive(Clone)]
pub struct Signal<T> {
    value: Arc<RwLock<T>>,
    id: usize,
    runtime: Weak<ReactiveRuntime>,
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(initial: T) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        Self {
            value: Arc::new(RwLock::new(initial)),
            id,
            runtime: runtime.downgrade(),
        }
    }

    /// Get the current value of the signal.
    pub fn get(&self) -> T {
        let runtime = ReactiveRuntime::current();
        runtime.track_read(self.id);
        self.get_untracked()
    }

    /// Get the current value without registering a dependency.
    pub fn get_untracked(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set a new value for the signal.
    pub fn set(&self, new_value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = new_value;
        self.notify();
    }

    /// Update the value using a function.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.value.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *value);
        drop(value); // Release the write lock before notifying
        self.notify();
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let runtime = ReactiveRuntime::current();
        runtime.track_read(self.id);
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&*value)
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Call `callback` with the current value now and after every change.
    ///
    /// The callback stops being called once the returned guard is dropped.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let observer_id = runtime.next_id();
        let signal = self.clone();

        runtime.create_observer(observer_id, move || callback(signal.get()));
        runtime.run_observer(observer_id);

        WatchGuard {
            observer_id,
            runtime: runtime.downgrade(),
        }
    }

    fn notify(&self) {
        // A signal whose runtime is gone has nobody left to tell
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.notify_observers(self.id);
        }
    }
}

/// Keeps a [`Signal::watch`] callback registered; dropping it unregisters.
pub struct WatchGuard {
    observer_id: usize,
    runtime: Weak<ReactiveRuntime>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_observer(self.observer_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::create_effect;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn untracked_read_does_not_subscribe() {
        ReactiveRuntime::scope(|| {
            let signal = Signal::new(1);
            let runs = Arc::new(AtomicUsize::new(0));

            let _effect = create_effect({
                let signal = signal.clone();
                let runs = runs.clone();
                move || {
                    let _ = signal.get_untracked();
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            });

            signal.set(2);
            assert_eq!(runs.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn update_notifies_once() {
        ReactiveRuntime::scope(|| {
            let signal = Signal::new(0u64);
            let runs = Arc::new(AtomicUsize::new(0));

            let _effect = create_effect({
                let signal = signal.clone();
                let runs = runs.clone();
                move || {
                    signal.with(|_| ());
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            });

            signal.update(|n| *n += 1);
            assert_eq!(signal.get(), 1);
            assert_eq!(runs.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn watch_sees_every_value_until_dropped() {
        ReactiveRuntime::scope(|| {
            let signal = Signal::new(1);
            let seen = Arc::new(Mutex::new(Vec::new()));

            let guard = signal.watch({
                let seen = seen.clone();
                move |value| seen.lock().unwrap().push(value)
            });
            signal.set(2);
            signal.update(|n| *n += 1);
            assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);

            drop(guard);
            signal.set(4);
            assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
        });
    }

    #[test]
    fn write_from_another_thread_reaches_home_runtime() {
        ReactiveRuntime::scope(|| {
            let signal = Signal::new(0);
            let runs = Arc::new(AtomicUsize::new(0));

            let _effect = create_effect({
                let signal = signal.clone();
                let runs = runs.clone();
                move || {
                    signal.get();
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            });

            let writer = signal.clone();
            std::thread::spawn(move || writer.set(1)).join().unwrap();
            assert_eq!(runs.load(Ordering::SeqCst), 2);

            // Still subscribed after a re-run triggered off-thread
            ReactiveRuntime::scope(|| signal.set(2));
            assert_eq!(runs.load(Ordering::SeqCst), 3);
        });
    }
}
