//! In-memory registry of agents and chat sessions.
//!
//! [`SessionStore`] is the single owner of the session list for the lifetime
//! of a run. Every session mutation writes the full list through to the
//! [`SessionCache`]; the cache is read back only by
//! [`SessionStore::load_sessions_from_storage`].
//!
//! Mutations addressed at a session or message that no longer exists are
//! silently ignored, which tolerates late updates from a reply stream whose
//! session was deleted meanwhile.

use tracing::{debug, warn};

use crate::api::Agent;
use crate::core::cache::SessionCache;
use crate::core::constants::default_session_title;
use crate::core::message::{ChatMessage, ChatSession, MessagePatch};
use crate::utils::ids::{now_rfc3339, unique_id};

pub struct SessionStore {
    agents: Vec<Agent>,
    current_agent: Option<Agent>,
    sessions: Vec<ChatSession>,
    current_session_id: Option<String>,
    is_loading: bool,
    error: Option<String>,
    cache: Box<dyn SessionCache>,
}

impl SessionStore {
    pub fn new(cache: impl SessionCache + 'static) -> Self {
        Self {
            agents: Vec::new(),
            current_agent: None,
            sessions: Vec::new(),
            current_session_id: None,
            is_loading: false,
            error: None,
            cache: Box::new(cache),
        }
    }

    /// Build a store and hydrate it from `cache`.
    pub fn open(cache: impl SessionCache + 'static) -> Self {
        let mut store = Self::new(cache);
        store.load_sessions_from_storage();
        store
    }

    // ---------------------------------------------------------------------
    // Agents
    // ---------------------------------------------------------------------

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn set_agents(&mut self, agents: Vec<Agent>) {
        self.agents = agents;
    }

    pub fn current_agent(&self) -> Option<&Agent> {
        self.current_agent.as_ref()
    }

    pub fn set_current_agent(&mut self, agent: Option<Agent>) {
        self.current_agent = agent;
    }

    pub fn agent(&self, agent_id: i64) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == agent_id)
    }

    // ---------------------------------------------------------------------
    // Sessions
    // ---------------------------------------------------------------------

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn session(&self, session_id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|session| session.id == session_id)
    }

    fn session_mut(&mut self, session_id: &str) -> Option<&mut ChatSession> {
        self.sessions
            .iter_mut()
            .find(|session| session.id == session_id)
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        self.current_session_id
            .as_deref()
            .and_then(|id| self.session(id))
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    /// Select a session by id; an unknown id clears the selection.
    pub fn set_current_session(&mut self, session_id: Option<&str>) {
        self.current_session_id = session_id
            .filter(|id| self.session(id).is_some())
            .map(str::to_owned);
    }

    /// Replace the whole session list.
    pub fn set_sessions(&mut self, sessions: Vec<ChatSession>) {
        self.sessions = sessions;
        if let Some(current) = self.current_session_id.clone() {
            if self.session(&current).is_none() {
                self.current_session_id = None;
            }
        }
        self.persist();
    }

    /// Start a new session with `agent`, put it first, and make it current.
    pub fn create_session(&mut self, agent: &Agent, title: Option<&str>) -> ChatSession {
        let now = now_rfc3339();
        let session = ChatSession {
            id: unique_id(),
            agent_id: agent.id,
            agent_name: agent.name.clone(),
            title: title
                .filter(|title| !title.trim().is_empty())
                .map(str::to_owned)
                .unwrap_or_else(|| default_session_title(&agent.name)),
            created_at: now.clone(),
            updated_at: now,
            messages: Vec::new(),
        };

        self.sessions.insert(0, session.clone());
        self.current_session_id = Some(session.id.clone());
        self.persist();
        debug!(session_id = %session.id, agent_id = agent.id, "session created");
        session
    }

    pub fn update_session_title(&mut self, session_id: &str, title: &str) {
        let Some(session) = self.session_mut(session_id) else {
            return;
        };
        session.title = title.to_string();
        session.touch();
        self.persist();
    }

    pub fn delete_session(&mut self, session_id: &str) {
        let before = self.sessions.len();
        self.sessions.retain(|session| session.id != session_id);
        if self.sessions.len() == before {
            return;
        }
        if self.current_session_id.as_deref() == Some(session_id) {
            self.current_session_id = None;
        }
        self.persist();
    }

    // ---------------------------------------------------------------------
    // Messages
    // ---------------------------------------------------------------------

    pub fn add_message(&mut self, session_id: &str, message: ChatMessage) {
        let Some(session) = self.session_mut(session_id) else {
            debug!(session_id, "dropping message for unknown session");
            return;
        };
        session.messages.push(message);
        session.touch();
        self.persist();
    }

    pub fn update_message(&mut self, session_id: &str, message_id: &str, patch: MessagePatch) {
        let Some(session) = self.session_mut(session_id) else {
            return;
        };
        let Some(message) = session.message_mut(message_id) else {
            return;
        };
        patch.apply(message);
        session.touch();
        self.persist();
    }

    /// Append `fragment` to a message's content; the streaming accumulation
    /// primitive.
    pub fn append_to_message(&mut self, session_id: &str, message_id: &str, fragment: &str) {
        let Some(session) = self.session_mut(session_id) else {
            return;
        };
        let Some(message) = session.message_mut(message_id) else {
            return;
        };
        message.content.push_str(fragment);
        session.touch();
        self.persist();
    }

    pub fn message(&self, session_id: &str, message_id: &str) -> Option<&ChatMessage> {
        self.session(session_id)
            .and_then(|session| session.message(message_id))
    }

    // ---------------------------------------------------------------------
    // Transient status
    // ---------------------------------------------------------------------

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Replace the in-memory session list with the cached snapshot.
    ///
    /// A missing, unreadable, or malformed snapshot leaves an empty list.
    pub fn load_sessions_from_storage(&mut self) {
        let contents = match self.cache.read() {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                self.sessions.clear();
                return;
            }
            Err(err) => {
                warn!(error = %err, "session cache unreadable; starting empty");
                self.sessions.clear();
                return;
            }
        };

        self.sessions = match serde_json::from_str::<Vec<ChatSession>>(&contents) {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!(error = %err, "session cache malformed; starting empty");
                Vec::new()
            }
        };
        self.current_session_id = None;
        debug!(count = self.sessions.len(), "sessions loaded from cache");
    }

    /// Write the full session list to the cache.
    pub fn save_sessions_to_storage(&mut self) {
        self.persist();
    }

    fn persist(&mut self) {
        let snapshot = match serde_json::to_string(&self.sessions) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "failed to serialize sessions");
                return;
            }
        };
        if let Err(err) = self.cache.write(&snapshot) {
            warn!(error = %err, "failed to write session cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::MemorySessionCache;
    use crate::core::message::Role;

    fn agent(id: i64, name: &str) -> Agent {
        Agent {
            id,
            name: name.to_string(),
            description: String::new(),
            prompt: "prompt".to_string(),
            mcp_tools: Vec::new(),
            openai_config: Default::default(),
            created_at: None,
            updated_at: None,
        }
    }

    fn store_with_cache() -> (SessionStore, MemorySessionCache) {
        let cache = MemorySessionCache::new();
        (SessionStore::new(cache.clone()), cache)
    }

    /// Rehydrate a second store from the cache and compare session lists.
    fn assert_cache_mirrors(store: &SessionStore, cache: &MemorySessionCache) {
        let reloaded = SessionStore::open(cache.clone());
        assert_eq!(reloaded.sessions(), store.sessions());
    }

    #[test]
    fn create_session_prepends_and_selects() {
        let (mut store, cache) = store_with_cache();
        let first = store.create_session(&agent(1, "Bot"), None);
        let second = store.create_session(&agent(2, "Helper"), Some("Plans"));

        assert_eq!(first.title, "与 Bot 的对话");
        assert_eq!(second.title, "Plans");
        assert_eq!(store.sessions()[0].id, second.id);
        assert_eq!(store.sessions()[1].id, first.id);
        assert_eq!(store.current_session().map(|s| s.id.as_str()), Some(second.id.as_str()));
        assert_cache_mirrors(&store, &cache);
    }

    #[test]
    fn session_keeps_agent_name_snapshot() {
        let (mut store, _cache) = store_with_cache();
        let session = store.create_session(&agent(1, "Bot"), None);
        store.set_agents(vec![agent(1, "Renamed")]);
        assert_eq!(store.session(&session.id).unwrap().agent_name, "Bot");
    }

    #[test]
    fn messages_append_in_order_and_persist() {
        let (mut store, cache) = store_with_cache();
        let session = store.create_session(&agent(1, "Bot"), None);

        store.add_message(&session.id, ChatMessage::user("hi"));
        store.add_message(&session.id, ChatMessage::assistant("hello"));

        let current = store.current_session().expect("current session");
        let contents: Vec<&str> = current.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hi", "hello"]);
        assert_cache_mirrors(&store, &cache);
    }

    #[test]
    fn append_and_update_target_one_message() {
        let (mut store, cache) = store_with_cache();
        let session = store.create_session(&agent(1, "Bot"), None);
        let placeholder = ChatMessage::reply_placeholder();
        let id = placeholder.id.clone();
        store.add_message(&session.id, ChatMessage::user("hi"));
        store.add_message(&session.id, placeholder);

        store.update_message(&session.id, &id, MessagePatch::content(""));
        store.append_to_message(&session.id, &id, "Hel");
        store.append_to_message(&session.id, &id, "lo");

        let message = store.message(&session.id, &id).expect("placeholder exists");
        assert_eq!(message.content, "Hello");
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(store.session(&session.id).unwrap().messages[0].content, "hi");
        assert_cache_mirrors(&store, &cache);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let (mut store, cache) = store_with_cache();
        let session = store.create_session(&agent(1, "Bot"), None);
        let snapshot = cache.contents();

        store.add_message("missing", ChatMessage::user("lost"));
        store.append_to_message(&session.id, "missing", "x");
        store.update_message("missing", "missing", MessagePatch::content("x"));
        store.update_session_title("missing", "x");
        store.delete_session("abc");

        assert_eq!(store.sessions().len(), 1);
        assert!(store.sessions()[0].messages.is_empty());
        assert_eq!(cache.contents(), snapshot);
    }

    #[test]
    fn deleting_current_session_clears_selection() {
        let (mut store, cache) = store_with_cache();
        let keep = store.create_session(&agent(1, "Bot"), None);
        let active = store.create_session(&agent(1, "Bot"), None);

        store.delete_session(&keep.id);
        assert_eq!(store.current_session_id(), Some(active.id.as_str()));

        store.delete_session(&active.id);
        assert!(store.current_session().is_none());
        assert!(store.sessions().is_empty());
        assert_eq!(cache.contents().as_deref(), Some("[]"));
    }

    #[test]
    fn deleting_one_of_several_sessions_persists_the_rest() {
        let (mut store, cache) = store_with_cache();
        let oldest = store.create_session(&agent(1, "Bot"), None);
        let middle = store.create_session(&agent(2, "Helper"), Some("Middle"));
        let newest = store.create_session(&agent(1, "Bot"), Some("Newest"));
        store.add_message(&middle.id, ChatMessage::user("keep me"));

        store.delete_session(&oldest.id);

        let ids: Vec<&str> = store.sessions().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, [newest.id.as_str(), middle.id.as_str()]);
        assert_eq!(store.current_session_id(), Some(newest.id.as_str()));
        assert_cache_mirrors(&store, &cache);
    }

    #[test]
    fn set_sessions_writes_through_and_drops_stale_selection() {
        let (mut store, cache) = store_with_cache();
        let kept = store.create_session(&agent(1, "Bot"), Some("Kept"));
        let dropped = store.create_session(&agent(2, "Helper"), Some("Dropped"));
        assert_eq!(store.current_session_id(), Some(dropped.id.as_str()));

        let kept_session = store.session(&kept.id).cloned().expect("kept session");
        store.set_sessions(vec![kept_session]);

        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.current_session_id(), None);
        assert_cache_mirrors(&store, &cache);

        store.set_current_session(Some(&kept.id));
        let replacement = store.session(&kept.id).cloned().expect("kept session");
        store.set_sessions(vec![replacement]);
        assert_eq!(store.current_session_id(), Some(kept.id.as_str()));
        assert_cache_mirrors(&store, &cache);
    }

    #[test]
    fn save_sessions_to_storage_rewrites_the_snapshot() {
        let (mut store, cache) = store_with_cache();
        let session = store.create_session(&agent(1, "Bot"), None);
        store.add_message(&session.id, ChatMessage::user("hello"));

        let mut clobbered = cache.clone();
        clobbered.write("{not json").expect("memory write");
        assert!(SessionStore::open(cache.clone()).sessions().is_empty());

        store.save_sessions_to_storage();
        assert_cache_mirrors(&store, &cache);
    }

    #[test]
    fn title_updates_persist() {
        let (mut store, cache) = store_with_cache();
        let session = store.create_session(&agent(1, "Bot"), None);
        store.update_session_title(&session.id, "Renamed");
        assert_eq!(store.current_session().unwrap().title, "Renamed");
        assert_cache_mirrors(&store, &cache);
    }

    #[test]
    fn malformed_cache_loads_as_empty() {
        let store = SessionStore::open(MemorySessionCache::with_contents("{not json"));
        assert!(store.sessions().is_empty());

        let store = SessionStore::open(MemorySessionCache::new());
        assert!(store.sessions().is_empty());
    }

    #[test]
    fn selecting_unknown_session_clears_selection() {
        let (mut store, _cache) = store_with_cache();
        let session = store.create_session(&agent(1, "Bot"), None);
        store.set_current_session(Some("nope"));
        assert!(store.current_session().is_none());
        store.set_current_session(Some(&session.id));
        assert_eq!(store.current_session_id(), Some(session.id.as_str()));
    }

    #[test]
    fn transient_error_state_round_trips() {
        let (mut store, _cache) = store_with_cache();
        store.set_loading(true);
        store.set_error(Some("failed to load agents".to_string()));
        assert!(store.is_loading());
        assert_eq!(store.error(), Some("failed to load agents"));
        store.clear_error();
        assert_eq!(store.error(), None);
    }
}
