/// An undo action recorded when a mandatory step succeeds.
pub trait Compensation<Ctx, E> {
    /// Human-readable description of what the compensation will do.
    fn description(&self) -> String;

    /// Undo the recorded effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the undo itself fails.
    fn compensate(&self, ctx: &Ctx) -> Result<(), E>;
}

/// A compensation together with the step that registered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCompensation<C> {
    step: &'static str,
    step_index: usize,
    action: C,
}

impl<C> RegisteredCompensation<C> {
    pub fn step(&self) -> &'static str {
        self.step
    }

    pub fn action(&self) -> &C {
        &self.action
    }

    pub(crate) fn step_index(&self) -> usize {
        self.step_index
    }
}

/// Ordered stack of compensations for a single saga run.
///
/// Lives only for the duration of the run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationRegistry<C> {
    entries: Vec<RegisteredCompensation<C>>,
}

impl<C> Default for CompensationRegistry<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> CompensationRegistry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: &'static str, step_index: usize, action: C) {
        self.entries.push(RegisteredCompensation {
            step,
            step_index,
            action,
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCompensation<C>> {
        self.entries.iter()
    }

    /// Consume the registry, yielding entries most-recent-first.
    pub fn drain_lifo(self) -> impl Iterator<Item = RegisteredCompensation<C>> {
        self.entries.into_iter().rev()
    }
}
