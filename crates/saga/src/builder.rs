use crate::saga::Saga;
use crate::step::SagaStep;

/// Builder for the mandatory phase of a saga.
///
/// Calling [`SagaBuilder::best_effort`] closes the mandatory phase; from then
/// on only best-effort steps can be added, so a best-effort step can never be
/// ordered before a mandatory one.
pub struct SagaBuilder<Ctx, S, C, E> {
    mandatory: Vec<Box<dyn SagaStep<Ctx, S, C, E>>>,
}

/// Builder for the post-commit (best-effort) phase of a saga.
pub struct BestEffortBuilder<Ctx, S, C, E> {
    mandatory: Vec<Box<dyn SagaStep<Ctx, S, C, E>>>,
    best_effort: Vec<Box<dyn SagaStep<Ctx, S, C, E>>>,
}

impl<Ctx, S, C, E> SagaBuilder<Ctx, S, C, E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mandatory: Vec::new(),
        }
    }

    /// Append a mandatory step.
    #[must_use]
    pub fn step<T>(mut self, step: T) -> Self
    where
        T: SagaStep<Ctx, S, C, E> + 'static,
    {
        self.mandatory.push(Box::new(step));
        self
    }

    /// Close the mandatory phase and append the first best-effort step.
    #[must_use]
    pub fn best_effort<T>(self, step: T) -> BestEffortBuilder<Ctx, S, C, E>
    where
        T: SagaStep<Ctx, S, C, E> + 'static,
    {
        BestEffortBuilder {
            mandatory: self.mandatory,
            best_effort: Vec::new(),
        }
        .best_effort(step)
    }

    #[must_use]
    pub fn build(self) -> Saga<Ctx, S, C, E> {
        Saga::from_steps(self.mandatory, Vec::new())
    }
}

impl<Ctx, S, C, E> Default for SagaBuilder<Ctx, S, C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx, S, C, E> BestEffortBuilder<Ctx, S, C, E> {
    /// Append a best-effort step.
    #[must_use]
    pub fn best_effort<T>(mut self, step: T) -> Self
    where
        T: SagaStep<Ctx, S, C, E> + 'static,
    {
        self.best_effort.push(Box::new(step));
        self
    }

    #[must_use]
    pub fn build(self) -> Saga<Ctx, S, C, E> {
        Saga::from_steps(self.mandatory, self.best_effort)
    }
}
