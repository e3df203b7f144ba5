use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Cleanup = Box<dyn FnOnce() + Send>;
type Task = Box<dyn FnOnce() + Send>;

/// Reactive context for tracking dependencies.
struct ReactiveContext {
    current_observer: Option<usize>,
    // Map from source ID to set of observer IDs that depend on it
    dependencies: HashMap<usize, HashSet<usize>>,
    // Map from observer ID to set of source IDs it depends on
    observer_deps: HashMap<usize, HashSet<usize>>,
    // Map from observer ID to the effect function
    observers: HashMap<usize, Arc<dyn Fn() + Send + Sync>>,
    // Map from memo ID to dirty state
    memo_dirty: HashMap<usize, bool>,
    // Teardowns registered by an observer during its last run
    cleanups: HashMap<usize, Vec<Cleanup>>,
}

impl ReactiveContext {
    fn new() -> Self {
        Self {
            current_observer: None,
            dependencies: HashMap::new(),
            observer_deps: HashMap::new(),
            observers: HashMap::new(),
            memo_dirty: HashMap::new(),
            cleanups: HashMap::new(),
        }
    }

    fn clear(&mut self) {
        self.current_observer = None;
        self.dependencies.clear();
        self.observer_deps.clear();
        self.observers.clear();
        self.memo_dirty.clear();
        self.cleanups.clear();
    }

    /// Forget what `observer_id` read last time and hand back its teardowns.
    fn detach(&mut self, observer_id: usize) -> Vec<Cleanup> {
        if let Some(old_deps) = self.observer_deps.remove(&observer_id) {
            for source_id in old_deps {
                if let Some(deps) = self.dependencies.get_mut(&source_id) {
                    deps.remove(&observer_id);
                }
            }
        }
        self.cleanups.remove(&observer_id).unwrap_or_default()
    }
}

/// Hybrid reactive runtime for managing reactive primitives.
///
/// Supports both global runtime (default) and scoped runtimes for isolation.
/// The runtime tracks dependencies between signals, effects, and memos,
/// runs observer teardowns, and owns the deferred task queue that is drained
/// on every [`tick`](ReactiveRuntime::tick).
///
/// # Examples
///
/// Using the default global runtime:
///
/// ```
/// use stashed::Signal;
///
/// let signal = Signal::new(42);
/// assert_eq!(signal.get(), 42);
/// ```
///
/// Using scoped runtimes for isolation:
///
/// ```
/// use stashed::runtime::ReactiveRuntime;
/// use stashed::Signal;
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.get(), 0);
/// });
/// // Runtime and all its state is dropped here
/// ```
pub struct ReactiveRuntime {
    this: Weak<ReactiveRuntime>,
    next_id: AtomicUsize,
    context: Mutex<ReactiveContext>,
    pending: Mutex<VecDeque<Task>>,
    notify_depth: AtomicUsize,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
}

impl ReactiveRuntime {
    fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| ReactiveRuntime {
            this: this.clone(),
            next_id: AtomicUsize::new(0),
            context: Mutex::new(ReactiveContext::new()),
            pending: Mutex::new(VecDeque::new()),
            notify_depth: AtomicUsize::new(0),
        })
    }

    fn context(&self) -> MutexGuard<'_, ReactiveContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// Useful for testing or creating isolated reactive contexts.
    /// The runtime and all its state is automatically cleaned up when
    /// the function returns.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let runtime = Self::new();
        Self::with_runtime(runtime, f)
    }

    /// Get or create the global runtime (fallback).
    pub fn global() -> Arc<Self> {
        use std::sync::OnceLock;
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_else(Self::global))
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// This pushes the runtime onto the thread-local stack for the duration
    /// of the function execution.
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Clear all observers, dependencies, deferred tasks and state from this
    /// runtime. Pending teardowns and tasks are dropped without running.
    pub fn clear(&self) {
        self.context().clear();
        self.pending().clear();
        self.next_id.store(0, Ordering::SeqCst);
    }

    /// Generate the next unique ID for a reactive primitive.
    pub fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Whether a memo or effect is currently running and recording reads.
    pub fn is_tracking(&self) -> bool {
        self.context().current_observer.is_some()
    }

    /// Track a read of a source by the current observer.
    pub fn track_read(&self, source_id: usize) {
        let mut ctx = self.context();
        if let Some(current_observer) = ctx.current_observer {
            ctx.dependencies
                .entry(source_id)
                .or_default()
                .insert(current_observer);
            ctx.observer_deps
                .entry(current_observer)
                .or_default()
                .insert(source_id);
        }
    }

    /// Notify all observers that depend on a source.
    ///
    /// When the outermost notification returns, the deferred task queue is
    /// drained, so teardowns deferred by re-running effects settle within the
    /// same change.
    pub fn notify_observers(&self, source_id: usize) {
        self.notify_depth.fetch_add(1, Ordering::SeqCst);

        let observers = {
            let ctx = self.context();
            ctx.dependencies
                .get(&source_id)
                .map(|obs| obs.iter().copied().collect::<Vec<_>>())
        };
        for observer_id in observers.into_iter().flatten() {
            self.mark_observer_dirty(observer_id);
        }

        if self.notify_depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tick();
        }
    }

    /// Mark an observer (memo or effect) as dirty and propagate to dependents.
    fn mark_observer_dirty(&self, observer_id: usize) {
        let mut ctx = self.context();

        if let Some(dirty) = ctx.memo_dirty.get_mut(&observer_id) {
            if *dirty {
                return;
            }
            *dirty = true;

            let dependents = ctx
                .dependencies
                .get(&observer_id)
                .map(|deps| deps.iter().copied().collect::<Vec<_>>());
            drop(ctx);

            for dependent_id in dependents.into_iter().flatten() {
                self.mark_observer_dirty(dependent_id);
            }
            return;
        }

        let is_effect = ctx.observers.contains_key(&observer_id);
        drop(ctx);

        if is_effect {
            self.run_observer(observer_id);
        }
    }

    /// Register the function an observer runs.
    pub fn create_observer<F>(&self, observer_id: usize, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.reset_observer(observer_id);
        self.context().observers.insert(observer_id, Arc::new(f));
    }

    /// Re-run a registered observer, retracking everything it reads.
    pub fn run_observer(&self, observer_id: usize) {
        let run = self.context().observers.get(&observer_id).cloned();
        if let Some(run) = run {
            self.reset_observer(observer_id);
            self.with_observer(observer_id, || run());
        }
    }

    /// Drop an observer's dependencies and run its teardowns.
    pub(crate) fn reset_observer(&self, observer_id: usize) {
        let cleanups = self.context().detach(observer_id);
        for cleanup in cleanups {
            cleanup();
        }
    }

    /// Dispose an observer for good.
    pub fn remove_observer(&self, observer_id: usize) {
        {
            let mut ctx = self.context();
            ctx.observers.remove(&observer_id);
            ctx.memo_dirty.remove(&observer_id);
        }
        self.reset_observer(observer_id);
    }

    /// Run a function with a specific observer as the current context.
    ///
    /// This runtime is made current for the duration, so an observer woken
    /// from another thread or scope still tracks its reads here.
    pub fn with_observer<F, R>(&self, observer_id: usize, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let prev = self.context().current_observer.replace(observer_id);
        let result = match self.this.upgrade() {
            Some(runtime) => Self::with_runtime(runtime, f),
            None => f(),
        };
        self.context().current_observer = prev;
        result
    }

    /// A weak handle to this runtime, for primitives that must notify the
    /// runtime they were created in.
    pub fn downgrade(&self) -> Weak<ReactiveRuntime> {
        self.this.clone()
    }

    /// Attach a teardown to the observer that is currently running.
    ///
    /// The teardown runs right before that observer runs again, or when it is
    /// disposed. Returns `false` (and drops `f`) when nothing is tracking.
    pub fn on_cleanup<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut ctx = self.context();
        match ctx.current_observer {
            Some(observer_id) => {
                ctx.cleanups.entry(observer_id).or_default().push(Box::new(f));
                true
            }
            None => false,
        }
    }

    /// Queue a task for the next [`tick`](ReactiveRuntime::tick).
    pub fn defer<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending().push_back(Box::new(f));
    }

    /// Drain the deferred task queue, including tasks queued while draining.
    ///
    /// Returns how many tasks ran.
    pub fn tick(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.pending().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Number of tasks waiting for the next tick.
    pub fn pending_tasks(&self) -> usize {
        self.pending().len()
    }

    /// Register a memo and mark it as dirty initially.
    pub fn register_memo(&self, memo_id: usize) {
        self.context().memo_dirty.insert(memo_id, true);
    }

    /// Check if a memo is dirty (needs recomputation).
    pub fn is_memo_dirty(&self, memo_id: usize) -> bool {
        self.context().memo_dirty.get(&memo_id).copied().unwrap_or(true)
    }

    /// Mark a memo as clean (after recomputation).
    pub fn mark_memo_clean(&self, memo_id: usize) {
        self.context().memo_dirty.insert(memo_id, false);
    }
}
