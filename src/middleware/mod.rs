//! Request middleware placed in front of the event receiver.
//!
//! Order is fixed: [`healthz`] runs first so probes never reach the body
//! reading done by [`log_request`].

mod healthz;
mod request_log;

pub use healthz::{healthz, HEALTHZ_PATH};
pub use request_log::{log_request, RequestSnapshot};
