use std::collections::HashMap;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::sync::Mutex;

/// Which user journey a shared state belongs to: the standalone budget
/// flow, or the budget sub-flow entered from an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOrigin {
    Budget,
    Expense,
}

/// Amount/description captured from free text, held until the user picks a
/// category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExpense {
    pub amount: i64,
    pub description: String,
}

/// The single per-chat conversation slot. Idle is the absence of a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    /// Waiting for a category button (or "otra categoría").
    AwaitingCategory {
        origin: FlowOrigin,
        pending: Option<PendingExpense>,
    },
    /// Waiting for a typed custom category name.
    AwaitingCustomCategoryName {
        origin: FlowOrigin,
        pending: Option<PendingExpense>,
    },
    /// Waiting for a numeric monthly limit for `category`.
    AwaitingBudgetLimit {
        origin: FlowOrigin,
        category: String,
    },
    /// A budget already exists; waiting for yes/no on replacing it.
    AwaitingOverwriteConfirmation {
        origin: FlowOrigin,
        category: String,
        new_limit: i64,
    },
    /// Budget saved; waiting for "another budget" / "record expense" /
    /// "exit".
    AwaitingPostBudgetAction { origin: FlowOrigin },
    /// Waiting for the category whose budget to inspect.
    AwaitingBudgetQueryCategory,
    /// Waiting for yes/no on deleting the captured expense id. The id is
    /// not re-validated as still most recent (known limitation).
    AwaitingDeleteConfirmation { expense_id: i64 },
}

impl ConversationState {
    /// True when the state resolves through buttons, so plain text should
    /// be rejected with a hint instead of swallowed.
    pub fn expects_buttons(&self) -> bool {
        !matches!(
            self,
            ConversationState::AwaitingCustomCategoryName { .. }
                | ConversationState::AwaitingBudgetLimit { .. }
        )
    }
}

/// In-memory per-chat session store. Conversations do not survive a
/// restart; that is acceptable for transient flows.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<ChatId, ConversationState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, chat: ChatId) -> Option<ConversationState> {
        self.inner.lock().await.get(&chat).cloned()
    }

    pub async fn set(&self, chat: ChatId, state: ConversationState) {
        self.inner.lock().await.insert(chat, state);
    }

    pub async fn clear(&self, chat: ChatId) {
        self.inner.lock().await.remove(&chat);
    }

    pub async fn is_active(&self, chat: ChatId) -> bool {
        self.inner.lock().await.contains_key(&chat)
    }
}
