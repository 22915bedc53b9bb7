//! Work deferred until the outermost instrumented handler returns.
//!
//! Every handler installed through [`super::InterceptorChain`] or
//! [`super::install`] runs inside a scope. Interceptors that must observe a
//! finished operation without being observed themselves (EXPLAIN re-issue)
//! hand their work to [`defer`]; it runs once the outermost scope on the
//! current thread has returned, after every timing layer has stopped its
//! clock, whatever order the layers were installed in.

use super::types::{Handler, handler};
use std::cell::{Cell, RefCell};

type Task = Box<dyn FnOnce()>;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static QUEUE: RefCell<Vec<Task>> = const { RefCell::new(Vec::new()) };
}

/// Run `task` after the outermost instrumented handler on this thread
/// returns. Outside any instrumented handler it runs immediately.
pub fn defer<F: FnOnce() + 'static>(task: F) {
    if DEPTH.with(Cell::get) == 0 {
        task();
        return;
    }
    QUEUE.with(|queue| queue.borrow_mut().push(Box::new(task)));
}

/// Leaves the scope on drop, so a panicking handler does not leave the
/// thread marked as inside one.
struct ScopeGuard;

impl ScopeGuard {
    fn enter() -> Self {
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        ScopeGuard
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let outermost = DEPTH.with(|depth| {
            let left = depth.get().saturating_sub(1);
            depth.set(left);
            left == 0
        });
        if outermost && std::thread::panicking() {
            QUEUE.with(|queue| queue.borrow_mut().clear());
        }
    }
}

fn drain() {
    loop {
        let tasks = QUEUE.with(|queue| std::mem::take(&mut *queue.borrow_mut()));
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task();
        }
    }
}

/// Wrap `inner` in a scope that flushes deferred work when it is the
/// outermost one.
pub(crate) fn scoped<C: 'static>(inner: Handler<C>) -> Handler<C> {
    handler(move |ctx: &mut C| {
        let guard = ScopeGuard::enter();
        inner(ctx);
        drop(guard);
        if DEPTH.with(Cell::get) == 0 {
            drain();
        }
    })
}
