#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Concurrent task-dispatch protocol for global optimization, with a
//! guess-and-check random-search driver as its reference implementation.
//!
//! A driver ([`GlobalMethod`]) coordinates any number of concurrent
//! evaluation workers over two channels of [`Task`]s. The driver alone owns
//! the incumbent, so no locks are needed, and shutdown runs in two phases so
//! that no in-flight evaluation is lost.
//!
//! # Getting Started
//!
//! ```
//! use globalopt::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> globalopt::Result<()> {
//! let sampler = Uniform::with_seed(vec![(-10.0, 10.0); 2], 7)?;
//! let mut method = GuessAndCheck::new(sampler);
//! let settings = Settings::new().concurrent(4).func_evaluations(500);
//!
//! let solution = minimize_global(
//!     |x: &[f64]| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2),
//!     2,
//!     &settings,
//!     &mut method,
//! )
//! .await?;
//!
//! println!("f = {:.4} at {:?}", solution.location.f, solution.location.x);
//! # Ok(())
//! # }
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Task`] | A unit of work: slot index, [`Operation`] tag and [`Location`]. |
//! | [`GlobalMethod`] | The driver side of the protocol. |
//! | [`GuessAndCheck`] | Reference driver: sample, evaluate, keep the best. |
//! | [`Sampler`](sampler::Sampler) | Draws candidate points ([`Uniform`](sampler::Uniform), [`Normal`](sampler::Normal), [`ReplaySampler`](sampler::ReplaySampler)). |
//! | [`minimize_global`] | The worker-pool side: evaluation workers, statistics and termination. |
//! | [`Settings`] | Termination criteria and concurrency. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on tasks, locations, statuses and solutions | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key protocol points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod error;
mod global;
mod guess_and_check;
pub mod objective;
mod rng_util;
pub mod sampler;
mod settings;
pub mod task;
mod types;

pub use error::{Error, Result};
pub use global::minimize_global;
pub use guess_and_check::GuessAndCheck;
pub use objective::Objective;
pub use settings::{FunctionConverge, Settings};
pub use task::{GlobalMethod, Location, Needs, Operation, Task};
pub use types::{Solution, Stats, Status};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use globalopt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::global::minimize_global;
    pub use crate::guess_and_check::GuessAndCheck;
    pub use crate::objective::Objective;
    pub use crate::sampler::{Normal, ReplaySampler, Sampler, Uniform};
    pub use crate::settings::{FunctionConverge, Settings};
    pub use crate::task::{GlobalMethod, Location, Needs, Operation, Task};
    pub use crate::types::{Solution, Stats, Status};
}
