use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix carried by identifiers minted on the client before the server
/// has assigned a real one.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Author placeholder used for optimistic entries created by this client.
pub const LOCAL_AUTHOR: &str = "me";

/// Name shown when a post or entry has no author name.
pub const ANONYMOUS: &str = "Anonymous";

fn is_false(value: &bool) -> bool {
    !*value
}

fn temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    /// Mint a client-side identifier for an optimistic question
    pub fn temporary() -> Self {
        Self(temp_id())
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyId(pub String);

impl ReplyId {
    /// Mint a client-side identifier for an optimistic reply
    pub fn temporary() -> Self {
        Self(temp_id())
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReplyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "serviceFee", default)]
    pub service_fee: i64,
}

/// The order/listing shown on a post detail page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payment: Payment,
    #[serde(rename = "isLiked", default)]
    pub is_liked: bool,
    #[serde(rename = "QnA", default)]
    pub qna: Vec<Question>,
}

impl Post {
    /// Snapshot displayed when the post could not be fetched
    pub fn fallback() -> Self {
        Self {
            user_name: Some(ANONYMOUS.to_string()),
            title: "Untitled".to_string(),
            description: "Failed to load data. Showing default data.".to_string(),
            payment: Payment { service_fee: 0 },
            is_liked: false,
            qna: Vec::new(),
        }
    }

    pub fn display_user_name(&self) -> &str {
        match self.user_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => ANONYMOUS,
        }
    }

    pub fn service_fee(&self) -> i64 {
        self.payment.service_fee
    }

    pub fn question(&self, question_id: &QuestionId) -> Option<&Question> {
        self.qna.iter().find(|q| &q.id == question_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: QuestionId,
    #[serde(rename = "user_Id", default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub answers: Vec<Reply>,
    /// Set once the current client has replied to this question
    #[serde(rename = "hasReplied", default, skip_serializing_if = "is_false")]
    pub has_replied: bool,
}

impl Question {
    /// Build an optimistic question authored by the current client
    pub fn local(content: impl Into<String>) -> Self {
        Self {
            id: QuestionId::temporary(),
            author_id: Some(LOCAL_AUTHOR.to_string()),
            content: content.into(),
            answers: Vec::new(),
            has_replied: false,
        }
    }

    pub fn reply(&self, reply_id: &ReplyId) -> Option<&Reply> {
        self.answers.iter().find(|r| &r.id == reply_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(rename = "_id")]
    pub id: ReplyId,
    #[serde(rename = "user_Id", default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub content: String,
}

impl Reply {
    /// Build an optimistic reply authored by the current client
    pub fn local(content: impl Into<String>) -> Self {
        Self {
            id: ReplyId::temporary(),
            author_id: Some(LOCAL_AUTHOR.to_string()),
            content: content.into(),
        }
    }
}

/// Response body of `GET /order/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEnvelope {
    pub data: Post,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBody {
    pub content: String,
}

impl ContentBody {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_deserializes_server_shape() {
        let value = json!({
            "userName": "kim",
            "title": "Walk my dog",
            "description": "Twice a day",
            "payment": { "serviceFee": 5000 },
            "isLiked": true,
            "QnA": [
                {
                    "_id": "q1",
                    "user_Id": "u7",
                    "content": "When?",
                    "answers": [{ "_id": "a1", "user_Id": "u1", "content": "Mornings" }]
                }
            ]
        });

        let post: Post = serde_json::from_value(value).unwrap();
        assert_eq!(post.display_user_name(), "kim");
        assert_eq!(post.service_fee(), 5000);
        assert!(post.is_liked);
        assert_eq!(post.qna.len(), 1);
        assert_eq!(post.qna[0].id, QuestionId::from("q1"));
        assert_eq!(post.qna[0].answers[0].content, "Mornings");
        assert!(!post.qna[0].has_replied);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let post: Post = serde_json::from_value(json!({ "title": "Only a title" })).unwrap();
        assert_eq!(post.display_user_name(), ANONYMOUS);
        assert!(!post.is_liked);
        assert!(post.qna.is_empty());
        assert_eq!(post.service_fee(), 0);
    }

    #[test]
    fn test_has_replied_is_omitted_when_false() {
        let question = Question {
            id: QuestionId::from("1"),
            author_id: None,
            content: "hi".to_string(),
            answers: vec![],
            has_replied: false,
        };
        let value = serde_json::to_value(&question).unwrap();
        assert_eq!(value, json!({ "_id": "1", "content": "hi", "answers": [] }));
    }

    #[test]
    fn test_local_entities_use_temporary_ids() {
        let question = Question::local("hello");
        assert!(question.id.is_temporary());
        assert_eq!(question.author_id.as_deref(), Some(LOCAL_AUTHOR));

        let reply = Reply::local("world");
        assert!(reply.id.is_temporary());
        assert_ne!(Question::local("a").id, Question::local("a").id);
        assert!(!QuestionId::from("64f1c0").is_temporary());
    }

    #[test]
    fn test_fallback_snapshot() {
        let post = Post::fallback();
        assert_eq!(post.display_user_name(), ANONYMOUS);
        assert_eq!(post.title, "Untitled");
        assert!(post.qna.is_empty());
    }
}
