use serde::{Deserialize, Serialize};

use crate::models::{ContentBody, QuestionId, ReplyId};

/// Body of `PATCH /order/{id}`.
///
/// Serialized as `{ "action": "<name>", ...payload }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum OrderAction {
    AddFavorite,
    RemoveFavorite,
    AddQuestion {
        question: ContentBody,
    },
    #[serde(rename_all = "camelCase")]
    UpdateQuestion {
        question_id: QuestionId,
        question: ContentBody,
    },
    #[serde(rename_all = "camelCase")]
    DeleteQuestion { question_id: QuestionId },
    #[serde(rename_all = "camelCase")]
    AddAnswer {
        question_id: QuestionId,
        answer: ContentBody,
    },
    #[serde(rename_all = "camelCase")]
    UpdateAnswer {
        question_id: QuestionId,
        answer_id: ReplyId,
        answer: ContentBody,
    },
    #[serde(rename_all = "camelCase")]
    DeleteAnswer {
        question_id: QuestionId,
        answer_id: ReplyId,
    },
}

impl OrderAction {
    pub fn favorite(liked: bool) -> Self {
        if liked {
            OrderAction::AddFavorite
        } else {
            OrderAction::RemoveFavorite
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::AddFavorite => "addFavorite",
            OrderAction::RemoveFavorite => "removeFavorite",
            OrderAction::AddQuestion { .. } => "addQuestion",
            OrderAction::UpdateQuestion { .. } => "updateQuestion",
            OrderAction::DeleteQuestion { .. } => "deleteQuestion",
            OrderAction::AddAnswer { .. } => "addAnswer",
            OrderAction::UpdateAnswer { .. } => "updateAnswer",
            OrderAction::DeleteAnswer { .. } => "deleteAnswer",
        }
    }

    /// Whether the server answers this action with the updated Q&A list
    pub fn returns_qna(&self) -> bool {
        !matches!(self, OrderAction::AddFavorite | OrderAction::RemoveFavorite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_favorite_actions_carry_only_the_tag() {
        assert_eq!(
            serde_json::to_value(OrderAction::favorite(true)).unwrap(),
            json!({ "action": "addFavorite" })
        );
        assert_eq!(
            serde_json::to_value(OrderAction::favorite(false)).unwrap(),
            json!({ "action": "removeFavorite" })
        );
    }

    #[test]
    fn test_answer_payload_field_names() {
        let action = OrderAction::UpdateAnswer {
            question_id: QuestionId::from("q1"),
            answer_id: ReplyId::from("a1"),
            answer: ContentBody::new("edited"),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "action": "updateAnswer",
                "questionId": "q1",
                "answerId": "a1",
                "answer": { "content": "edited" }
            })
        );
        assert_eq!(action.as_str(), "updateAnswer");
    }

    #[test]
    fn test_add_question_payload() {
        let action = OrderAction::AddQuestion {
            question: ContentBody::new("hi"),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "action": "addQuestion", "question": { "content": "hi" } })
        );
        assert!(action.returns_qna());
        assert!(!OrderAction::AddFavorite.returns_qna());
    }
}
