use tracing::debug;

use crate::models::{Expense, ExpenseDraft};

/// Total above which premium features are offered.
pub const PREMIUM_THRESHOLD: f64 = 10_000.0;

/// Prefix of ids given to expenses that the store has not acknowledged yet.
const PROVISIONAL_PREFIX: &str = "pending-";

/// Undo information for a provisional change.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a pending change must be committed or rolled back"]
pub enum PendingChange {
    Added { provisional_id: String },
    Updated { previous: Expense },
    Deleted { index: usize, removed: Expense },
}

/// The signed-in user's expenses, newest first.
///
/// Mutations are two-phase: `begin_*` applies the change locally and returns
/// a [`PendingChange`]; once the store answers, `commit` keeps it or
/// `rollback` restores the previous list.
#[derive(Debug, Default, Clone)]
pub struct ExpenseList {
    items: Vec<Expense>,
    next_provisional: u64,
}

impl ExpenseList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire list (after fetching from the store)
    pub fn replace_all(&mut self, expenses: Vec<Expense>) {
        self.items = expenses;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn begin_add(&mut self, draft: ExpenseDraft) -> PendingChange {
        self.next_provisional += 1;
        let provisional_id = format!("{}{}", PROVISIONAL_PREFIX, self.next_provisional);
        self.items
            .insert(0, Expense::from_draft(provisional_id.clone(), draft));
        PendingChange::Added { provisional_id }
    }

    /// `None` if no expense has that id.
    pub fn begin_update(&mut self, id: &str, draft: ExpenseDraft) -> Option<PendingChange> {
        let slot = self.items.iter_mut().find(|e| e.id == id)?;
        let previous = std::mem::replace(slot, Expense::from_draft(id, draft));
        Some(PendingChange::Updated { previous })
    }

    /// `None` if no expense has that id.
    pub fn begin_delete(&mut self, id: &str) -> Option<PendingChange> {
        let index = self.items.iter().position(|e| e.id == id)?;
        let removed = self.items.remove(index);
        Some(PendingChange::Deleted { index, removed })
    }

    /// Keep a change. For an add, `server_id` replaces the provisional id.
    pub fn commit(&mut self, change: PendingChange, server_id: Option<String>) {
        if let PendingChange::Added { provisional_id } = change {
            match (self.items.iter_mut().find(|e| e.id == provisional_id), server_id) {
                (Some(expense), Some(id)) => expense.id = id,
                (Some(_), None) => debug!(%provisional_id, "Committed add without a store id"),
                (None, _) => debug!(%provisional_id, "Committed add no longer in list"),
            }
        }
    }

    /// Undo a change that the store rejected.
    pub fn rollback(&mut self, change: PendingChange) {
        match change {
            PendingChange::Added { provisional_id } => {
                self.items.retain(|e| e.id != provisional_id);
            }
            PendingChange::Updated { previous } => {
                if let Some(slot) = self.items.iter_mut().find(|e| e.id == previous.id) {
                    *slot = previous;
                }
            }
            PendingChange::Deleted { index, removed } => {
                let index = index.min(self.items.len());
                self.items.insert(index, removed);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Expense> {
        self.items.iter().find(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expense> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Expense] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(|e| e.money).sum()
    }

    pub fn premium_eligible(&self) -> bool {
        self.total() > PREMIUM_THRESHOLD
    }

    pub fn is_provisional(expense: &Expense) -> bool {
        expense.id.starts_with(PROVISIONAL_PREFIX)
    }
}
