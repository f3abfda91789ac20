//! Resilient remote calls.
//!
//! - `retry`: bounded exponential-backoff wrapper around one network attempt

mod retry;

pub use retry::{
    AttemptOutcome, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, RemoteCallAttempt, RetryPolicy,
};
