//! Dispatch lifecycle hooks.
//!
//! Listeners run in registration order for each phase. Calling
//! `stop_propagation` on an event skips the remaining listeners of that
//! phase and the work that depends on it:
//!
//! ```text
//! pre_match stopped     → no matching, no handler; post_dispatch still runs
//! pre_dispatch stopped  → no handler; post_dispatch still runs
//! post_dispatch stopped → remaining post_dispatch listeners skipped
//! ```

use std::sync::Arc;

use crate::http::{ServerRequest, ServerResponse};
use crate::routing::Route;

/// Observer of the dispatch lifecycle. Every method defaults to a no-op.
pub trait DispatchListener: Send + Sync + 'static {
    fn pre_match(&self, _event: &mut PreMatchEvent) {}

    fn pre_dispatch(&self, _event: &mut PreDispatchEvent) {}

    fn post_dispatch(&self, _event: &mut PostDispatchEvent) {}
}

/// Fired before route matching.
#[derive(Debug)]
pub struct PreMatchEvent {
    pub request: ServerRequest,
    pub response: ServerResponse,
    stopped: bool,
}

impl PreMatchEvent {
    pub(crate) fn new(request: ServerRequest, response: ServerResponse) -> Self {
        Self {
            request,
            response,
            stopped: false,
        }
    }
}

/// Fired after a route matched, before its handler runs.
///
/// `route` is the request's own copy; replacing it changes only this request.
#[derive(Debug)]
pub struct PreDispatchEvent {
    pub request: ServerRequest,
    pub response: ServerResponse,
    pub route: Arc<Route>,
    stopped: bool,
}

impl PreDispatchEvent {
    pub(crate) fn new(request: ServerRequest, response: ServerResponse, route: Arc<Route>) -> Self {
        Self {
            request,
            response,
            route,
            stopped: false,
        }
    }
}

/// Fired last; listeners may replace the final response.
#[derive(Debug)]
pub struct PostDispatchEvent {
    pub request: ServerRequest,
    pub response: ServerResponse,
    pub route: Option<Arc<Route>>,
    stopped: bool,
}

impl PostDispatchEvent {
    pub(crate) fn new(request: ServerRequest, response: ServerResponse, route: Option<Arc<Route>>) -> Self {
        Self {
            request,
            response,
            route,
            stopped: false,
        }
    }
}

macro_rules! propagation {
    ($($event:ty),+) => {$(
        impl $event {
            /// Skip the remaining listeners and the work this phase guards.
            pub fn stop_propagation(&mut self) {
                self.stopped = true;
            }

            pub fn is_propagation_stopped(&self) -> bool {
                self.stopped
            }
        }
    )+};
}

propagation!(PreMatchEvent, PreDispatchEvent, PostDispatchEvent);

/// Run `hook` for each listener until one stops the event.
pub(crate) fn emit<E>(
    listeners: &[Arc<dyn DispatchListener>],
    event: &mut E,
    hook: impl Fn(&dyn DispatchListener, &mut E),
    stopped: impl Fn(&E) -> bool,
) {
    for listener in listeners {
        hook(listener.as_ref(), event);
        if stopped(event) {
            break;
        }
    }
}
