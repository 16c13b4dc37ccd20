//! Page-unload tracking.
//!
//! Navigation aborts in-flight `fetch` calls, which then surface as network
//! errors. The guard records that the page is going away so callers can
//! drop those errors silently, and it owns the abort handle of the single
//! outstanding long-running request.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{AbortController, AbortSignal};

#[derive(Clone, Default)]
pub struct UnloadGuard {
    unloading: Rc<Cell<bool>>,
    active: Rc<RefCell<Option<AbortController>>>,
}

impl UnloadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the `beforeunload` listener on the window.
    pub fn install(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let guard = self.clone();
        let on_unload = Closure::wrap(Box::new(move |_: web_sys::Event| {
            guard.mark_unloading();
        }) as Box<dyn FnMut(web_sys::Event)>);
        let _ = window
            .add_event_listener_with_callback("beforeunload", on_unload.as_ref().unchecked_ref());
        // lives as long as the page
        on_unload.forget();
    }

    pub fn is_unloading(&self) -> bool {
        self.unloading.get()
    }

    /// Set the unload flag and abort the tracked request, if any.
    pub fn mark_unloading(&self) {
        self.unloading.set(true);
        if let Some(controller) = self.active.borrow_mut().take() {
            log::debug!("page unloading: aborting outstanding request");
            controller.abort();
        }
    }

    /// Start tracking a new request. A previously tracked one is aborted.
    pub fn track(&self) -> Option<AbortSignal> {
        let controller = AbortController::new().ok()?;
        let signal = controller.signal();
        if let Some(previous) = self.active.borrow_mut().replace(controller) {
            previous.abort();
        }
        Some(signal)
    }

    /// Forget the tracked request once it has completed.
    pub fn release(&self) {
        self.active.borrow_mut().take();
    }

    /// Whether an error should be shown to the user right now.
    pub fn should_surface(&self) -> bool {
        !self.is_unloading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let guard = UnloadGuard::new();
        let handler_copy = guard.clone();
        assert!(!guard.is_unloading());
        assert!(guard.should_surface());

        handler_copy.mark_unloading();

        assert!(guard.is_unloading());
        assert!(!guard.should_surface());
    }

    #[test]
    fn test_release_without_tracked_request() {
        let guard = UnloadGuard::new();
        guard.release();
        guard.mark_unloading();
        assert!(guard.is_unloading());
    }
}
