/// A unit of work in a saga.
///
/// Steps share a context (injected dependencies) and a mutable state that
/// carries ids produced by earlier steps to later ones.
///
/// # Type Parameters
///
/// - `Ctx`: shared dependencies (stores, clocks, hashers)
/// - `S`: saga state threaded through every step
/// - `C`: compensation type pushed on success
/// - `E`: step error type
pub trait SagaStep<Ctx, S, C, E>: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &'static str;

    /// Execute the step.
    ///
    /// Returns the compensation that undoes this step's effects, or `None` for
    /// steps that need no undo (reads, or writes whose parent row's removal
    /// already cleans them up).
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails to complete.
    fn execute(&self, ctx: &Ctx, state: &mut S) -> Result<Option<C>, E>;
}

/// Hooks the runner calls on the saga state at phase boundaries.
pub trait SagaState {
    /// All mandatory steps succeeded; best-effort steps follow.
    fn on_commit(&mut self) {}

    /// A mandatory step failed; compensations are about to run.
    fn on_unwind(&mut self) {}
}

impl SagaState for () {}
