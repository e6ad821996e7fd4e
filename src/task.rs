//! The task protocol spoken between an optimization driver and its workers.
//!
//! A run is a loop of [`Task`] records travelling over two channels. The
//! driver sends tasks on the *operation* channel and receives them back on
//! the *result* channel; the [`Operation`] tag on each task says what the
//! current holder should do with it. Tasks are moved, never shared, so
//! whoever holds a task may mutate its [`Location`] freely.
//!
//! From the driver's side a run has two phases:
//!
//! | Received            | [`Phase::Active`]             | [`Phase::Draining`] |
//! |---------------------|-------------------------------|---------------------|
//! | `MajorIteration`    | [`Action::Refill`]            | [`Action::Ignore`]  |
//! | `FuncEvaluation`    | [`Action::Absorb`]            | [`Action::Absorb`]  |
//! | `PostIteration`     | [`Action::Finish`]            | violation           |
//! | anything else       | violation                     | violation           |
//!
//! The draining phase lasts until the result channel is closed. Only then
//! does the driver close its operation channel.

use core::fmt;
use core::future::Future;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// What the holder of a task should do with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operation {
    /// Nothing to do; the task is only passed along.
    NoOperation,
    /// The run is starting.
    InitIteration,
    /// The run is ending; no further work will be issued.
    PostIteration,
    /// The task reports the current incumbent.
    MajorIteration,
    /// The driver has converged by its own criteria.
    MethodDone,
    /// Evaluate the objective at the task's point.
    FuncEvaluation,
    /// Evaluate the gradient at the task's point.
    GradEvaluation,
    /// Evaluate the Hessian at the task's point.
    HessEvaluation,
}

impl Operation {
    /// Returns `true` for the operations that ask a worker to evaluate
    /// something at the task's point.
    #[must_use]
    pub const fn is_evaluation(self) -> bool {
        matches!(
            self,
            Self::FuncEvaluation | Self::GradEvaluation | Self::HessEvaluation
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoOperation => "NoOperation",
            Self::InitIteration => "InitIteration",
            Self::PostIteration => "PostIteration",
            Self::MajorIteration => "MajorIteration",
            Self::MethodDone => "MethodDone",
            Self::FuncEvaluation => "FuncEvaluation",
            Self::GradEvaluation => "GradEvaluation",
            Self::HessEvaluation => "HessEvaluation",
        };
        f.write_str(name)
    }
}

/// A point in the search space together with its objective value.
///
/// With the `serde` feature, JSON has no encoding for `±∞` or NaN, so an
/// unevaluated location (`f = +∞`) serializes `f` as `null` and does not
/// deserialize again.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    /// Coordinates of the point.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub f: f64,
}

impl Location {
    /// Creates a location of dimension `dim` at the origin with value `+∞`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            x: vec![0.0; dim],
            f: f64::INFINITY,
        }
    }
}

/// A unit of concurrent work.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Task {
    /// Identity of the slot, unique within a run. Driver slots are numbered
    /// from 1; the `PostIteration` sentinel uses 0.
    pub index: usize,
    /// What the holder should do with this task.
    pub op: Operation,
    /// The point and value carried by the task.
    pub location: Location,
}

impl Task {
    /// Creates an idle task slot of dimension `dim`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            index: 0,
            op: Operation::NoOperation,
            location: Location::new(dim),
        }
    }

    /// Creates the sentinel that tells a driver the run is ending.
    #[must_use]
    pub fn post_iteration() -> Self {
        Self {
            index: 0,
            op: Operation::PostIteration,
            location: Location::new(0),
        }
    }
}

/// Derivative information a driver requires from the objective.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Needs {
    /// The driver needs first derivatives.
    pub gradient: bool,
    /// The driver needs second derivatives.
    pub hessian: bool,
}

/// The phase a driver is in while it reads the result channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// New work is being issued.
    Active,
    /// `PostIteration` was seen; in-flight results are being absorbed.
    Draining,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Draining => f.write_str("draining"),
        }
    }
}

/// What a driver must do with a task it received.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// The worker is free again; give it a new candidate.
    Refill,
    /// A worker evaluated the task; fold the result into the run state.
    Absorb,
    /// Stop issuing work and start draining.
    Finish,
    /// Drop the task.
    Ignore,
}

impl Phase {
    /// Decides what a driver does with a received operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] for any operation the phase does
    /// not accept.
    pub fn classify(self, op: Operation) -> Result<Action> {
        match (self, op) {
            (Self::Active, Operation::MajorIteration) => Ok(Action::Refill),
            (Self::Active, Operation::PostIteration) => Ok(Action::Finish),
            (Self::Draining, Operation::MajorIteration) => Ok(Action::Ignore),
            (_, Operation::FuncEvaluation) => Ok(Action::Absorb),
            (phase, op) => Err(Error::ProtocolViolation { op, phase }),
        }
    }
}

/// Tracks which driver slots are currently held by the worker side, and
/// with which operation.
///
/// Slots are numbered `1..=n`. Each slot must alternate strictly between
/// [`dispatch`](Self::dispatch) and [`receive`](Self::receive), and comes
/// back carrying the operation it was sent with.
#[derive(Clone, Debug)]
pub struct TaskLedger {
    outstanding: Vec<Option<Operation>>,
}

impl TaskLedger {
    /// Creates a ledger for `n` slots, none of them outstanding.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            outstanding: vec![None; n],
        }
    }

    /// Records that slot `index` was sent to the worker side with `op`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTask`] if the index is out of range or the
    /// slot is already outstanding.
    pub fn dispatch(&mut self, index: usize, op: Operation) -> Result<()> {
        match self.slot_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(op);
                Ok(())
            }
            _ => Err(Error::UnknownTask { index, op }),
        }
    }

    /// Records that slot `index` came back from the worker side with `op`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTask`] if the index is out of range, the
    /// slot was not outstanding, or it was sent with another operation.
    pub fn receive(&mut self, index: usize, op: Operation) -> Result<()> {
        match self.slot_mut(index) {
            Some(slot) if *slot == Some(op) => {
                *slot = None;
                Ok(())
            }
            _ => Err(Error::UnknownTask { index, op }),
        }
    }

    /// Number of slots currently held by the worker side.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.outstanding.iter().filter(|slot| slot.is_some()).count()
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut Option<Operation>> {
        index
            .checked_sub(1)
            .and_then(|i| self.outstanding.get_mut(i))
    }
}

/// The driver side of the task protocol.
///
/// A run is prepared with [`init_global`](Self::init_global) and executed
/// with [`run_global`](Self::run_global). The driver never evaluates the
/// objective itself; it only decides what happens next to each task.
pub trait GlobalMethod {
    /// Derivative information this driver requires.
    fn needs(&self) -> Needs;

    /// Prepares per-run state for a problem of dimension `dim`.
    ///
    /// Returns the number of concurrent tasks the driver will use, which is
    /// at most `tasks`.
    fn init_global(&mut self, dim: usize, tasks: usize) -> usize;

    /// Drives a run to completion.
    ///
    /// `tasks` holds one pre-allocated slot per concurrent task. The driver
    /// sends work on `operation`, reads results from `result` until it is
    /// closed after a `PostIteration`, and finally drops `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] or [`Error::UnknownTask`] when
    /// the worker side breaks the protocol, [`Error::DimensionMismatch`]
    /// when a task's point has the wrong length, and propagates sampler
    /// errors.
    fn run_global(
        &mut self,
        operation: mpsc::Sender<Task>,
        result: mpsc::Receiver<Task>,
        tasks: Vec<Task>,
    ) -> impl Future<Output = Result<()>> + Send;
}
