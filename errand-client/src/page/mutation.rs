use errand_types::{OrderAction, Question, QuestionId};
use serde_json::Value;

/// User intents the sync engine knows how to apply and reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    ToggleLike,
    AddQuestion,
    UpdateQuestion,
    DeleteQuestion,
    AddReply,
    UpdateReply,
    DeleteReply,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::ToggleLike => "toggle_like",
            MutationKind::AddQuestion => "add_question",
            MutationKind::UpdateQuestion => "update_question",
            MutationKind::DeleteQuestion => "delete_question",
            MutationKind::AddReply => "add_reply",
            MutationKind::UpdateReply => "update_reply",
            MutationKind::DeleteReply => "delete_reply",
        }
    }

    /// Alert shown when a Q&A mutation fails to sync
    pub fn failure_message(&self) -> &'static str {
        match self {
            MutationKind::ToggleLike => "Failed to save the like status.",
            MutationKind::AddQuestion | MutationKind::AddReply => "Failed to sync with the server.",
            MutationKind::UpdateQuestion => "Failed to update the question. Please try again.",
            MutationKind::DeleteQuestion => "Failed to delete the question. Please try again.",
            MutationKind::UpdateReply => "Failed to update the reply. Please try again.",
            MutationKind::DeleteReply => "Failed to delete the reply. Please try again.",
        }
    }
}

/// The slice of page state a mutation touches
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Liked(bool),
    Qna(Vec<Question>),
}

/// Lifecycle of one optimistic mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState {
    Idle,
    Pending { optimistic: Snapshot },
    Committed { server: Snapshot },
    RolledBack { previous: Snapshot },
    Errored { optimistic: Snapshot, message: String },
}

impl MutationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending { .. })
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, MutationState::Committed { .. })
    }

    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            MutationState::Committed { .. }
                | MutationState::RolledBack { .. }
                | MutationState::Errored { .. }
        )
    }
}

/// Ticket for a locally applied mutation awaiting its server round trip
#[derive(Debug, Clone)]
pub struct Mutation {
    pub(crate) id: u64,
    pub(crate) kind: MutationKind,
    pub(crate) action: OrderAction,
    pub(crate) previous: Snapshot,
    pub(crate) state: MutationState,
    /// Temporary id of the question an add_question ticket created
    pub(crate) local_question: Option<QuestionId>,
}

impl Mutation {
    pub(crate) fn pending(
        id: u64,
        kind: MutationKind,
        action: OrderAction,
        previous: Snapshot,
        optimistic: Snapshot,
    ) -> Self {
        Self {
            id,
            kind,
            action,
            previous,
            state: MutationState::Pending { optimistic },
            local_question: None,
        }
    }

    pub(crate) fn with_local_question(mut self, question_id: QuestionId) -> Self {
        self.local_question = Some(question_id);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    /// The PATCH body to send
    pub fn action(&self) -> &OrderAction {
        &self.action
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    pub fn state(&self) -> &MutationState {
        &self.state
    }

    pub(crate) fn optimistic(&self) -> Option<&Snapshot> {
        match &self.state {
            MutationState::Pending { optimistic } | MutationState::Errored { optimistic, .. } => {
                Some(optimistic)
            }
            _ => None,
        }
    }
}

/// Look for `key` at the top level of a response body, then under `data`
fn lookup<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key)
        .or_else(|| body.get("data").and_then(|data| data.get(key)))
}

/// The updated Q&A list carried by a PATCH response
pub(crate) fn extract_qna(body: &Value) -> Option<Vec<Question>> {
    let qna = lookup(body, "QnA")?;
    match serde_json::from_value(qna.clone()) {
        Ok(questions) => Some(questions),
        Err(e) => {
            log::warn!("Response QnA could not be parsed: {}", e);
            None
        }
    }
}

/// The like flag carried by a PATCH response, if the server sent one
pub(crate) fn extract_liked(body: &Value) -> Option<bool> {
    lookup(body, "isLiked").and_then(Value::as_bool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_qna_top_level_and_nested() {
        let top = json!({ "QnA": [{ "_id": "1", "content": "hi", "answers": [] }] });
        let nested = json!({ "data": { "QnA": [] } });

        assert_eq!(extract_qna(&top).unwrap().len(), 1);
        assert_eq!(extract_qna(&nested).unwrap().len(), 0);
        assert!(extract_qna(&json!({ "ok": true })).is_none());
        assert!(extract_qna(&Value::Null).is_none());
        assert!(extract_qna(&json!({ "QnA": "broken" })).is_none());
    }

    #[test]
    fn test_extract_liked() {
        assert_eq!(extract_liked(&json!({ "isLiked": true })), Some(true));
        assert_eq!(extract_liked(&json!({ "data": { "isLiked": false } })), Some(false));
        assert_eq!(extract_liked(&json!({ "message": "ok" })), None);
    }

    #[test]
    fn test_state_predicates() {
        let pending = MutationState::Pending {
            optimistic: Snapshot::Liked(true),
        };
        assert!(pending.is_pending());
        assert!(!pending.is_settled());
        assert!(!MutationState::Idle.is_settled());
        assert!(MutationState::RolledBack {
            previous: Snapshot::Liked(false)
        }
        .is_settled());
    }
}
