use crate::task::{Operation, Phase};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a task arrives carrying an operation that is not legal
    /// in the current phase of the protocol.
    #[error("protocol violation: unexpected {op} operation during {phase} phase")]
    ProtocolViolation {
        /// The offending operation tag.
        op: Operation,
        /// The phase the receiver was in.
        phase: Phase,
    },

    /// Returned when a task slot is used out of turn: a result for a slot
    /// that was never dispatched, was already returned, or comes back with a
    /// different operation than it was sent with.
    #[error("unknown task: slot {index} has no outstanding {op}")]
    UnknownTask {
        /// The index carried by the offending task.
        index: usize,
        /// The operation carried by the offending task.
        op: Operation,
    },

    /// Returned when the result channel closes before `PostIteration` is seen.
    #[error("result channel closed before the run was terminated")]
    ResultsClosed,

    /// Returned when the operation channel is closed while the driver still
    /// has work to dispatch.
    #[error("operation channel closed")]
    OperationsClosed,

    /// Returned when a point buffer does not match the sampler's dimension.
    #[error("dimension mismatch: expected {expected} coordinates, got {got}")]
    DimensionMismatch {
        /// The expected number of coordinates.
        expected: usize,
        /// The actual buffer length.
        got: usize,
    },

    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds: low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a standard deviation is negative or not finite.
    #[error("invalid standard deviation: {0} must be finite and non-negative")]
    InvalidStdDev(f64),

    /// Returned when a replay sampler is created without any points.
    #[error("replay sampler requires at least one point")]
    EmptySamples,

    /// Returned when the problem dimension is zero.
    #[error("invalid dimension: problem must have at least one coordinate")]
    InvalidDimension,

    /// Returned when a method asks for more tasks than were offered, or none.
    #[error("invalid task count: requested {requested}, method returned {returned}")]
    InvalidTaskCount {
        /// The concurrency offered to the method.
        requested: usize,
        /// The concurrency the method asked for.
        returned: usize,
    },

    /// Returned when a method needs derivative information the objective
    /// cannot provide.
    #[error("method requires derivatives (gradient: {gradient}, hessian: {hessian})")]
    UnsupportedNeeds {
        /// Whether a gradient was requested.
        gradient: bool,
        /// Whether a Hessian was requested.
        hessian: bool,
    },

    /// Returned when a spawned task panics or is cancelled.
    #[error("async task error: {0}")]
    TaskError(String),
}

pub type Result<T> = core::result::Result<T, Error>;
