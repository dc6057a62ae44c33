use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_task::ArcWake;
use log::trace;

use crate::deferred::Deferred;
use crate::error::RenderError;
use crate::platform::RuntimeScheduler;
use crate::render::RenderContext;
use crate::value::Value;

/// Deferred document update, run by [`Runtime::flush`].
pub type Command = Box<dyn FnOnce(&mut RenderContext<'_>) -> Result<(), RenderError>>;

/// Builds the command to run once a deferred value resolves.
pub type OnReady = Box<dyn FnOnce(Value) -> Command>;

struct WakeFlag {
    woken: AtomicBool,
    scheduler: Arc<dyn RuntimeScheduler>,
}

impl ArcWake for WakeFlag {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.woken.store(true, Ordering::Release);
        arc_self.scheduler.schedule_frame();
    }
}

struct PendingPoll {
    deferred: Deferred,
    on_ready: OnReady,
    wake: Arc<WakeFlag>,
}

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    updates: RefCell<VecDeque<Command>>,
    pending: RefCell<Vec<PendingPoll>>,
    applied: Cell<usize>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            updates: RefCell::new(VecDeque::new()),
            pending: RefCell::new(Vec::new()),
            applied: Cell::new(0),
        }
    }

    fn schedule(&self) {
        self.scheduler.schedule_frame();
    }

    fn enqueue_update(&self, command: Command) {
        self.updates.borrow_mut().push_back(command);
        self.schedule();
    }

    fn pop_update(&self) -> Option<Command> {
        self.updates.borrow_mut().pop_front()
    }

    fn has_updates(&self) -> bool {
        !self.updates.borrow().is_empty()
    }

    fn await_deferred(&self, deferred: Deferred, on_ready: OnReady) {
        let wake = Arc::new(WakeFlag {
            woken: AtomicBool::new(true),
            scheduler: self.scheduler.clone(),
        });
        self.pending.borrow_mut().push(PendingPoll {
            deferred,
            on_ready,
            wake,
        });
        self.schedule();
    }

    /// Polls every woken deferred once and queues the commands of those that
    /// resolved. Returns how many resolved.
    fn poll_pending(&self) -> usize {
        let polls = std::mem::take(&mut *self.pending.borrow_mut());
        let mut still_pending = Vec::with_capacity(polls.len());
        let mut resolved = 0;
        for mut poll in polls {
            if !poll.wake.woken.swap(false, Ordering::AcqRel) {
                still_pending.push(poll);
                continue;
            }
            let waker = futures_task::waker(poll.wake.clone());
            let mut cx = Context::from_waker(&waker);
            match Pin::new(&mut poll.deferred).poll(&mut cx) {
                Poll::Ready(value) => {
                    resolved += 1;
                    self.updates.borrow_mut().push_back((poll.on_ready)(value));
                }
                Poll::Pending => still_pending.push(poll),
            }
        }
        self.pending.borrow_mut().extend(still_pending);
        resolved
    }

    fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }
}

#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn has_updates(&self) -> bool {
        self.inner.has_updates()
    }

    /// Whether any deferred value is still unresolved.
    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    /// Total commands applied by this runtime so far.
    pub fn applied(&self) -> usize {
        self.inner.applied.get()
    }

    /// Polls woken deferred values and runs queued commands until neither
    /// produces more work. Stops at the first failing command; the rest stay
    /// queued. Returns how many commands ran.
    pub fn flush(
        &self,
        mut apply: impl FnMut(Command) -> Result<(), RenderError>,
    ) -> Result<usize, RenderError> {
        let mut ran = 0;
        loop {
            let resolved = self.inner.poll_pending();
            let mut progressed = resolved > 0;
            while let Some(command) = self.inner.pop_update() {
                apply(command)?;
                ran += 1;
                self.inner.applied.set(self.inner.applied.get() + 1);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
        if ran > 0 {
            trace!("flushed {ran} deferred updates");
        }
        Ok(ran)
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn schedule(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.schedule();
        }
    }

    pub fn enqueue_update(&self, command: Command) {
        if let Some(inner) = self.0.upgrade() {
            inner.enqueue_update(command);
        }
    }

    /// Queues `on_ready`'s command once `deferred` resolves.
    pub fn await_deferred(&self, deferred: Deferred, on_ready: OnReady) {
        if let Some(inner) = self.0.upgrade() {
            inner.await_deferred(deferred, on_ready);
        }
    }

    pub fn has_updates(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_updates())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingScheduler(AtomicUsize);

    impl RuntimeScheduler for CountingScheduler {
        fn schedule_frame(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn resolution_wakes_scheduler_and_queues_command() {
        let scheduler = Arc::new(CountingScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        let (deferred, resolver) = Deferred::channel();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        runtime.handle().await_deferred(
            deferred,
            Box::new(move |value| {
                *sink.borrow_mut() = value.as_text();
                let command: Command = Box::new(|_| Ok(()));
                command
            }),
        );
        assert!(runtime.has_pending());
        assert_eq!(runtime.flush(|_| Ok(())).expect("flush"), 0);

        let before = scheduler.0.load(Ordering::SeqCst);
        resolver.resolve("ready");
        assert!(scheduler.0.load(Ordering::SeqCst) > before);

        assert_eq!(runtime.flush(|_| Ok(())).expect("flush"), 1);
        assert_eq!(seen.borrow().as_deref(), Some("ready"));
        assert!(!runtime.has_pending());
    }

    #[test]
    fn failing_command_leaves_the_rest_queued() {
        let runtime = Runtime::new(Arc::new(DefaultScheduler));
        let handle = runtime.handle();
        handle.enqueue_update(Box::new(|_| Err(RenderError::unsupported("object", "node"))));
        handle.enqueue_update(Box::new(|_| Ok(())));
        let mut calls = 0;
        let result = runtime.flush(|_| {
            calls += 1;
            if calls == 1 {
                Err(RenderError::unsupported("object", "node"))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert!(runtime.has_updates());
    }
}
