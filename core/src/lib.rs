//! Root of the `momentum-core` library.
//!
//! Everything needed to run a momentum-map planning session: the Gemini
//! generation client with retry and cancellation, the plan diff engine, and
//! the session state machine that owns the accepted plan, progress, locks,
//! and the replan review flow.

// Clients embed this library; diagnostics go through `tracing`, never stdio.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod client;
mod diff;
mod error;
mod prompts;
mod retry;
mod session;

pub use momentum_protocol as protocol;

pub use client::{GenerationClient, GenerationConfig};
pub use diff::{ChunkDiff, DiffStatus, PlanDiff, SubStepDiff, diff_plans};
pub use error::{GenerationError, SessionError};
pub use retry::RetryConfig;
pub use session::{PlanSession, SessionState, StepKey};
