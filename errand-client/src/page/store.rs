use errand_types::{Post, Question, QuestionId};
use std::collections::HashSet;

/// In-memory snapshot of the post shown on the page.
///
/// Outside the sync engine the snapshot can only be read or replaced whole.
#[derive(Debug, Clone)]
pub struct PostStore {
    post: Post,
    loaded: bool,
    loading: bool,
    /// Questions this client has replied to; survives Q&A replacement
    replied: HashSet<QuestionId>,
}

impl PostStore {
    pub fn new() -> Self {
        Self {
            post: Post::fallback(),
            loaded: false,
            loading: true,
            replied: HashSet::new(),
        }
    }

    /// Current snapshot, or the fallback snapshot before any successful fetch
    pub fn get(&self) -> &Post {
        &self.post
    }

    /// Replace the whole snapshot with a freshly fetched post
    pub fn replace(&mut self, post: Post) {
        self.post = post;
        self.loaded = true;
        self.loading = false;
        self.replied.clear();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_liked(&self) -> bool {
        self.post.is_liked
    }

    pub fn questions(&self) -> &[Question] {
        &self.post.qna
    }

    /// Whether a reply may still be submitted for the question
    pub fn can_reply(&self, question_id: &QuestionId) -> bool {
        self.post
            .question(question_id)
            .map(|q| !q.has_replied)
            .unwrap_or(false)
    }

    pub(crate) fn finish_loading(&mut self) {
        self.loading = false;
    }

    pub(crate) fn set_liked(&mut self, liked: bool) {
        self.post.is_liked = liked;
    }

    pub(crate) fn question_mut(&mut self, question_id: &QuestionId) -> Option<&mut Question> {
        self.post.qna.iter_mut().find(|q| &q.id == question_id)
    }

    pub(crate) fn push_question(&mut self, question: Question) {
        self.post.qna.push(question);
    }

    /// Remove a question, returning whether it was present
    pub(crate) fn remove_question(&mut self, question_id: &QuestionId) -> bool {
        let before = self.post.qna.len();
        self.post.qna.retain(|q| &q.id != question_id);
        self.post.qna.len() != before
    }

    pub(crate) fn mark_replied(&mut self, question_id: &QuestionId) {
        self.replied.insert(question_id.clone());
    }

    pub(crate) fn has_marked_replied(&self, question_id: &QuestionId) -> bool {
        self.replied.contains(question_id)
    }

    /// Carry the reply gate over when a temporary question id is superseded
    /// by the one the server assigned
    pub(crate) fn remap_replied(&mut self, from: &QuestionId, to: &QuestionId) {
        if self.replied.remove(from) {
            self.replied.insert(to.clone());
        }
    }

    /// Install the server's Q&A list, re-deriving `has_replied`
    pub(crate) fn replace_qna(&mut self, mut qna: Vec<Question>) {
        for question in qna.iter_mut() {
            if self.replied.contains(&question.id) {
                question.has_replied = true;
            }
        }
        self.post.qna = qna;
    }
}

impl Default for PostStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errand_types::Payment;

    fn sample_post() -> Post {
        Post {
            user_name: Some("lee".to_string()),
            title: "Move a sofa".to_string(),
            description: "Third floor, no elevator".to_string(),
            payment: Payment { service_fee: 20000 },
            is_liked: false,
            qna: vec![Question {
                id: QuestionId::from("q1"),
                author_id: Some("u2".to_string()),
                content: "How heavy?".to_string(),
                answers: vec![],
                has_replied: false,
            }],
        }
    }

    #[test]
    fn test_new_store_shows_fallback_while_loading() {
        let store = PostStore::new();
        assert!(store.is_loading());
        assert!(!store.is_loaded());
        assert_eq!(store.get(), &Post::fallback());
    }

    #[test]
    fn test_replace_installs_snapshot_exactly() {
        let mut store = PostStore::new();
        store.replace(sample_post());

        assert_eq!(store.get(), &sample_post());
        assert!(store.is_loaded());
        assert!(!store.is_loading());
    }

    #[test]
    fn test_replace_qna_keeps_reply_gate() {
        let mut store = PostStore::new();
        store.replace(sample_post());
        let q1 = QuestionId::from("q1");

        assert!(store.can_reply(&q1));
        store.mark_replied(&q1);
        store.replace_qna(sample_post().qna);

        assert!(!store.can_reply(&q1));
        assert!(store.questions()[0].has_replied);
    }

    #[test]
    fn test_fresh_fetch_clears_reply_memory() {
        let mut store = PostStore::new();
        let q1 = QuestionId::from("q1");
        store.mark_replied(&q1);

        store.replace(sample_post());
        store.replace_qna(sample_post().qna);
        assert!(store.can_reply(&q1));
    }

    #[test]
    fn test_remap_replied_moves_gate_to_server_id() {
        let mut store = PostStore::new();
        store.replace(sample_post());
        let local = QuestionId::temporary();
        let q1 = QuestionId::from("q1");

        store.mark_replied(&local);
        store.remap_replied(&local, &q1);
        store.replace_qna(sample_post().qna);

        assert!(!store.can_reply(&q1));
        assert!(!store.has_marked_replied(&local));
    }

    #[test]
    fn test_can_reply_unknown_question() {
        let store = PostStore::new();
        assert!(!store.can_reply(&QuestionId::from("missing")));
    }

    #[test]
    fn test_remove_question_reports_presence() {
        let mut store = PostStore::new();
        store.replace(sample_post());

        assert!(!store.remove_question(&QuestionId::from("nope")));
        assert!(store.remove_question(&QuestionId::from("q1")));
        assert!(store.questions().is_empty());
    }
}
