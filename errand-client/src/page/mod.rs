mod mutation;
mod store;


pub use mutation::{Mutation, MutationKind, MutationState, Snapshot};
pub use store::PostStore;

use errand_types::{ContentBody, OrderAction, Post, Question, QuestionId, Reply, ReplyId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{ApiError, ApiResult, OrderApi};
use crate::logging::LogConfig;

static IDLE: MutationState = MutationState::Idle;

/// Result of fetching the post
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Server data installed in the store
    Loaded,
    /// Fetch failed; the fallback snapshot stays on display
    Fallback(String),
    /// Server answered 401; the caller should send the user to login
    LoginRequired,
    /// Page was already unmounted, result dropped
    Ignored,
}

/// A single post detail page session.
///
/// Every user intent is applied to the store immediately, then sent as a
/// `PATCH /order/{id}`. Successful responses replace local state with the
/// server's; failures revert the like flag, or keep optimistic Q&A content
/// and surface an error.
pub struct PostPage {
    order_id: String,
    api: Arc<dyn OrderApi>,
    store: PostStore,
    mutations: HashMap<MutationKind, MutationState>,
    next_mutation_id: u64,
    error: Option<String>,
    mounted: bool,
    pub log_config: LogConfig,
}

impl PostPage {
    pub fn new(order_id: impl Into<String>, api: Arc<dyn OrderApi>) -> Self {
        Self {
            order_id: order_id.into(),
            api,
            store: PostStore::new(),
            mutations: HashMap::new(),
            next_mutation_id: 1,
            error: None,
            mounted: true,
            log_config: LogConfig::default(),
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Shared handle to the remote API, for callers that run requests
    /// concurrently and feed results back through [`PostPage::complete`]
    pub fn api(&self) -> Arc<dyn OrderApi> {
        Arc::clone(&self.api)
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    pub fn post(&self) -> &Post {
        self.store.get()
    }

    /// User-visible error from the last failed Q&A sync
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Latest state of the most recent mutation of the given kind
    pub fn mutation_state(&self, kind: MutationKind) -> &MutationState {
        self.mutations.get(&kind).unwrap_or(&IDLE)
    }

    pub fn can_reply(&self, question_id: &QuestionId) -> bool {
        self.store.can_reply(question_id)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Detach the page. In-flight requests are not aborted; their results
    /// are ignored when they arrive.
    pub fn unmount(&mut self) {
        log_sync!(self.log_config, "Unmounting page for order {}", self.order_id);
        self.mounted = false;
    }

    // Fetch

    /// Fetch the post and install it in the store
    pub async fn load(&mut self) -> LoadOutcome {
        log_api_call!(self.log_config, "GET /order/{}", self.order_id);
        let result = self.api.fetch_order(&self.order_id).await;
        self.apply_fetch_result(result)
    }

    pub fn apply_fetch_result(&mut self, result: ApiResult<Post>) -> LoadOutcome {
        if !self.mounted {
            log::debug!("Dropping fetch result for unmounted order {}", self.order_id);
            return LoadOutcome::Ignored;
        }

        let outcome = match result {
            Ok(post) => {
                log_store!(self.log_config, "Replacing snapshot: {:?}", post);
                self.store.replace(post);
                LoadOutcome::Loaded
            }
            Err(e) => {
                log::error!("Failed to fetch order {}: {}", self.order_id, e);
                if e.is_unauthorized() {
                    LoadOutcome::LoginRequired
                } else {
                    LoadOutcome::Fallback(categorize_error(&e))
                }
            }
        };

        self.store.finish_loading();
        outcome
    }

    // Local apply

    fn next_id(&mut self) -> u64 {
        let id = self.next_mutation_id;
        self.next_mutation_id += 1;
        id
    }

    fn qna_snapshot(&self) -> Snapshot {
        Snapshot::Qna(self.store.questions().to_vec())
    }

    /// Record a freshly applied Q&A mutation and hand back its ticket
    fn start_qna(&mut self, kind: MutationKind, action: OrderAction, previous: Snapshot) -> Mutation {
        self.error = None;
        let id = self.next_id();
        let mutation = Mutation::pending(id, kind, action, previous, self.qna_snapshot());
        log_sync!(
            self.log_config,
            "Applied {} #{} locally ({})",
            kind.as_str(),
            id,
            mutation.action().as_str()
        );
        self.mutations.insert(kind, mutation.state().clone());
        mutation
    }

    /// Flip the like flag locally
    pub fn begin_toggle_like(&mut self) -> Mutation {
        let previous = self.store.is_liked();
        let liked = !previous;
        self.store.set_liked(liked);

        let id = self.next_id();
        let mutation = Mutation::pending(
            id,
            MutationKind::ToggleLike,
            OrderAction::favorite(liked),
            Snapshot::Liked(previous),
            Snapshot::Liked(liked),
        );
        log_sync!(self.log_config, "Applied toggle_like #{} locally: {} -> {}", id, previous, liked);
        self.mutations.insert(MutationKind::ToggleLike, mutation.state().clone());
        mutation
    }

    /// Append a question with a temporary id. Blank input is a no-op.
    pub fn begin_add_question(&mut self, text: &str) -> Option<Mutation> {
        if text.trim().is_empty() {
            return None;
        }

        let previous = self.qna_snapshot();
        let question = Question::local(text);
        let local_id = question.id.clone();
        self.store.push_question(question);

        let action = OrderAction::AddQuestion {
            question: ContentBody::new(text),
        };
        let mutation = self.start_qna(MutationKind::AddQuestion, action, previous);
        Some(mutation.with_local_question(local_id))
    }

    pub fn begin_update_question(&mut self, question_id: &QuestionId, content: &str) -> Option<Mutation> {
        let previous = self.qna_snapshot();
        let question = self.store.question_mut(question_id)?;
        question.content = content.to_string();

        let action = OrderAction::UpdateQuestion {
            question_id: question_id.clone(),
            question: ContentBody::new(content),
        };
        Some(self.start_qna(MutationKind::UpdateQuestion, action, previous))
    }

    pub fn begin_delete_question(&mut self, question_id: &QuestionId) -> Option<Mutation> {
        let previous = self.qna_snapshot();
        if !self.store.remove_question(question_id) {
            return None;
        }

        let action = OrderAction::DeleteQuestion {
            question_id: question_id.clone(),
        };
        Some(self.start_qna(MutationKind::DeleteQuestion, action, previous))
    }

    /// Append a reply and close the question to further replies from this
    /// client. Blank input, unknown questions and questions already replied
    /// to are no-ops.
    pub fn begin_add_reply(&mut self, question_id: &QuestionId, text: &str) -> Option<Mutation> {
        if text.trim().is_empty() {
            return None;
        }
        if !self.store.can_reply(question_id) {
            log_sync!(self.log_config, "Ignoring reply to {}: already replied or unknown", question_id);
            return None;
        }

        let previous = self.qna_snapshot();
        let question = self.store.question_mut(question_id)?;
        question.answers.push(Reply::local(text));
        question.has_replied = true;
        self.store.mark_replied(question_id);

        let action = OrderAction::AddAnswer {
            question_id: question_id.clone(),
            answer: ContentBody::new(text),
        };
        Some(self.start_qna(MutationKind::AddReply, action, previous))
    }

    pub fn begin_update_reply(
        &mut self,
        question_id: &QuestionId,
        reply_id: &ReplyId,
        content: &str,
    ) -> Option<Mutation> {
        let previous = self.qna_snapshot();
        let reply = self
            .store
            .question_mut(question_id)?
            .answers
            .iter_mut()
            .find(|r| &r.id == reply_id)?;
        reply.content = content.to_string();

        let action = OrderAction::UpdateAnswer {
            question_id: question_id.clone(),
            answer_id: reply_id.clone(),
            answer: ContentBody::new(content),
        };
        Some(self.start_qna(MutationKind::UpdateReply, action, previous))
    }

    pub fn begin_delete_reply(&mut self, question_id: &QuestionId, reply_id: &ReplyId) -> Option<Mutation> {
        self.store.get().question(question_id)?.reply(reply_id)?;

        let previous = self.qna_snapshot();
        let question = self.store.question_mut(question_id)?;
        question.answers.retain(|r| &r.id != reply_id);

        let action = OrderAction::DeleteAnswer {
            question_id: question_id.clone(),
            answer_id: reply_id.clone(),
        };
        Some(self.start_qna(MutationKind::DeleteReply, action, previous))
    }

    // Remote request + reconcile

    /// Send the mutation's PATCH and reconcile with the result
    pub async fn dispatch(&mut self, mutation: Mutation) -> MutationState {
        log_api_call!(
            self.log_config,
            "PATCH /order/{} action={}",
            self.order_id,
            mutation.action().as_str()
        );
        let result = self.api.patch_order(&self.order_id, mutation.action()).await;
        self.complete(mutation, result)
    }

    /// Reconcile a mutation with its server response.
    ///
    /// The server's value replaces local state; nothing is merged. Results
    /// are applied in arrival order, so the last one to complete wins.
    pub fn complete(&mut self, mut mutation: Mutation, result: ApiResult<Value>) -> MutationState {
        if !self.mounted {
            log::debug!(
                "Dropping {} #{} response for unmounted order {}",
                mutation.kind.as_str(),
                mutation.id,
                self.order_id
            );
            return mutation.state;
        }

        let state = if mutation.action.returns_qna() {
            self.reconcile_qna(&mutation, result)
        } else {
            self.reconcile_like(&mutation, result)
        };

        mutation.state = state.clone();
        self.mutations.insert(mutation.kind, state.clone());
        state
    }

    fn reconcile_like(&mut self, mutation: &Mutation, result: ApiResult<Value>) -> MutationState {
        match result {
            Ok(body) => {
                let optimistic = match mutation.optimistic() {
                    Some(Snapshot::Liked(liked)) => *liked,
                    _ => self.store.is_liked(),
                };
                let liked = mutation::extract_liked(&body).unwrap_or(optimistic);
                self.store.set_liked(liked);
                log_sync!(self.log_config, "Committed toggle_like #{}: liked={}", mutation.id, liked);
                MutationState::Committed {
                    server: Snapshot::Liked(liked),
                }
            }
            Err(e) => {
                log::error!("Failed to save like status for order {}: {}", self.order_id, e);
                if let Snapshot::Liked(previous) = mutation.previous {
                    self.store.set_liked(previous);
                }
                MutationState::RolledBack {
                    previous: mutation.previous.clone(),
                }
            }
        }
    }

    fn reconcile_qna(&mut self, mutation: &Mutation, result: ApiResult<Value>) -> MutationState {
        let outcome = result.and_then(|body| {
            mutation::extract_qna(&body).ok_or_else(|| {
                ApiError::MalformedResponse("response did not contain a QnA list".to_string())
            })
        });

        match outcome {
            Ok(qna) => {
                if let Some(local_id) = &mutation.local_question {
                    self.carry_reply_gate(mutation, local_id, &qna);
                }
                self.store.replace_qna(qna);
                log_sync!(
                    self.log_config,
                    "Committed {} #{}: {} questions",
                    mutation.kind.as_str(),
                    mutation.id,
                    self.store.questions().len()
                );
                MutationState::Committed {
                    server: self.qna_snapshot(),
                }
            }
            Err(e) => {
                log::error!(
                    "{} failed for order {}: {}",
                    mutation.action.as_str(),
                    self.order_id,
                    e
                );
                let message = mutation.kind.failure_message().to_string();
                self.error = Some(message.clone());
                MutationState::Errored {
                    optimistic: mutation.optimistic().cloned().unwrap_or_else(|| self.qna_snapshot()),
                    message,
                }
            }
        }
    }

    /// A reply sent while a new question still had its temporary id must
    /// keep the question closed once the server assigns the real id.
    fn carry_reply_gate(&mut self, mutation: &Mutation, local_id: &QuestionId, qna: &[Question]) {
        if !self.store.has_marked_replied(local_id) {
            return;
        }

        let known: Vec<&QuestionId> = match &mutation.previous {
            Snapshot::Qna(questions) => questions.iter().map(|q| &q.id).collect(),
            Snapshot::Liked(_) => Vec::new(),
        };
        let content = match &mutation.action {
            OrderAction::AddQuestion { question } => question.content.as_str(),
            _ => return,
        };

        let added: Vec<&Question> = qna
            .iter()
            .filter(|q| !q.id.is_temporary() && !known.contains(&&q.id))
            .collect();
        let server_question = added
            .iter()
            .rev()
            .find(|q| q.content == content)
            .or_else(|| added.last());

        if let Some(server_question) = server_question {
            log_sync!(
                self.log_config,
                "Question {} is now {}, keeping it closed to replies",
                local_id,
                server_question.id
            );
            self.store.remap_replied(local_id, &server_question.id);
        }
    }

    // One call per user intent

    pub async fn toggle_like(&mut self) -> MutationState {
        let mutation = self.begin_toggle_like();
        self.dispatch(mutation).await
    }

    pub async fn add_question(&mut self, text: &str) -> Option<MutationState> {
        let mutation = self.begin_add_question(text)?;
        Some(self.dispatch(mutation).await)
    }

    pub async fn update_question(&mut self, question_id: &QuestionId, content: &str) -> Option<MutationState> {
        let mutation = self.begin_update_question(question_id, content)?;
        Some(self.dispatch(mutation).await)
    }

    pub async fn delete_question(&mut self, question_id: &QuestionId) -> Option<MutationState> {
        let mutation = self.begin_delete_question(question_id)?;
        Some(self.dispatch(mutation).await)
    }

    pub async fn add_reply(&mut self, question_id: &QuestionId, text: &str) -> Option<MutationState> {
        let mutation = self.begin_add_reply(question_id, text)?;
        Some(self.dispatch(mutation).await)
    }

    pub async fn update_reply(
        &mut self,
        question_id: &QuestionId,
        reply_id: &ReplyId,
        content: &str,
    ) -> Option<MutationState> {
        let mutation = self.begin_update_reply(question_id, reply_id, content)?;
        Some(self.dispatch(mutation).await)
    }

    pub async fn delete_reply(&mut self, question_id: &QuestionId, reply_id: &ReplyId) -> Option<MutationState> {
        let mutation = self.begin_delete_reply(question_id, reply_id)?;
        Some(self.dispatch(mutation).await)
    }
}

/// Turn an API error into a message suitable for the user
pub fn categorize_error(error: &ApiError) -> String {
    match error {
        ApiError::Network(e) if e.is_timeout() || e.is_connect() => {
            "Network Error: Connection failed. Check your network and try again".to_string()
        }
        ApiError::Network(e) => format!("Network Error: {}", e),
        ApiError::Unauthorized(_) => {
            "Authorization Error: Session expired. Please log in again".to_string()
        }
        ApiError::BadRequest(msg) => format!("Validation Error: {}", msg),
        ApiError::NotFound(_) => "Not Found: This post no longer exists".to_string(),
        ApiError::Credentials(msg) => format!("Credential Error: {}", msg),
        ApiError::Serialization(_) | ApiError::MalformedResponse(_) => {
            "Server Error: Unexpected response from the server".to_string()
        }
        ApiError::Api(msg) => format!("Server Error: {}", msg),
    }
}
