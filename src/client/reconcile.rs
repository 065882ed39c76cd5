use crate::domain::order::OrderStatus;

/// What the payment page ends up showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Paid,
    Failed,
}

/// Folds status observations from any number of sources into at most one
/// outcome.
#[derive(Debug, Default)]
pub struct Reconciler {
    resolved: bool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Returns the outcome the first time a deciding status is seen and
    /// `None` for everything after that.
    pub fn observe(&mut self, status: OrderStatus) -> Option<Outcome> {
        if self.resolved {
            return None;
        }
        let outcome = match status {
            OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Completed => Outcome::Paid,
            OrderStatus::Failed => Outcome::Failed,
            OrderStatus::Pending => return None,
        };
        self.resolved = true;
        Some(outcome)
    }
}
