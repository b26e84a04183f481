//! C2 — State Store. Purely in-memory; never fails (§4.2 failure
//! semantics). A single writer mutex covers `chats/messages/users/cursors`
//! per §5's shared-resource policy — ingest and the cache-fill path are
//! the only mutators and both run on the same logical scheduler.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use relay_core::types::{ChatId, MessageId, UserId};
use tracing::warn;

use crate::types::{Chat, Message, UpdateCursor, User};

/// Coarse description of what changed, passed to subscribers. Kept
/// intentionally small — subscribers (C4, C13) re-read `get_state()` for
/// details rather than receiving a full diff.
#[derive(Debug, Clone)]
pub enum StateChange {
    ChatsChanged,
    MessagesChanged { chat_id: ChatId },
    UsersChanged,
    ConnectionChanged,
    Reset,
}

/// Mirrors `relay_protocol::lifecycle::ConnectionStatus` but lives here
/// too so `relay-store` has no dependency on `relay-protocol`; callers
/// at the RPC boundary (`relay-runtime`) convert between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// A point-in-time snapshot of the whole in-memory record, returned by
/// `get_state()`. Cloned out from under the lock so callers never hold
/// it while the store is mutated.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub connection_status: ConnectionStatus,
    pub is_authenticated: bool,
    pub current_user: Option<User>,
    pub chats_order: Vec<ChatId>,
    pub chat_count: usize,
    pub is_initialized: bool,
    pub is_syncing: bool,
    pub initial_sync_complete: bool,
    pub last_sync: Option<chrono::DateTime<chrono::Utc>>,
}

struct Inner {
    connection_status: ConnectionStatus,
    is_authenticated: bool,
    current_user: Option<User>,
    chats: HashMap<ChatId, Chat>,
    chats_order: Vec<ChatId>,
    users: HashMap<UserId, User>,
    messages: HashMap<ChatId, VecDeque<Message>>,
    cursor: Option<UpdateCursor>,
    is_initialized: bool,
    is_syncing: bool,
    initial_sync_complete: bool,
    last_sync: Option<chrono::DateTime<chrono::Utc>>,
}

type Listener = Box<dyn Fn(&StateChange) + Send + Sync>;

/// The in-memory authoritative view (§4.2). `message_buffer_size` is the
/// per-chat cap `N` — defaults to 200 (`relay_core::config::DEFAULT_MESSAGE_BUFFER_SIZE`)
/// but is a configuration value per §9's open-question resolution.
pub struct StateStore {
    inner: Mutex<Inner>,
    listeners: Mutex<Vec<Listener>>,
    message_buffer_size: usize,
}

impl StateStore {
    pub fn new(message_buffer_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                connection_status: ConnectionStatus::Disconnected,
                is_authenticated: false,
                current_user: None,
                chats: HashMap::new(),
                chats_order: Vec::new(),
                users: HashMap::new(),
                messages: HashMap::new(),
                cursor: None,
                is_initialized: false,
                is_syncing: false,
                initial_sync_complete: false,
                last_sync: None,
            }),
            listeners: Mutex::new(Vec::new()),
            message_buffer_size,
        }
    }

    /// Register a listener invoked synchronously, inline with the
    /// mutating call, for every `StateChange`. Per §4.2: "a listener
    /// exception is logged and does not abort notification of others" —
    /// translated to Rust as "a panicking listener is caught and logged,
    /// the rest still run".
    pub fn subscribe(&self, listener: Listener) {
        self.listeners.lock().expect("listeners mutex poisoned").push(listener);
    }

    fn notify(&self, change: StateChange) {
        let listeners = self.listeners.lock().expect("listeners mutex poisoned");
        for listener in listeners.iter() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener(&change)));
            if result.is_err() {
                warn!("state store listener panicked, continuing notification of others");
            }
        }
    }

    pub fn get_state(&self) -> StateSnapshot {
        let inner = self.inner.lock().expect("state mutex poisoned");
        StateSnapshot {
            connection_status: inner.connection_status,
            is_authenticated: inner.is_authenticated,
            current_user: inner.current_user.clone(),
            chats_order: inner.chats_order.clone(),
            chat_count: inner.chats.len(),
            is_initialized: inner.is_initialized,
            is_syncing: inner.is_syncing,
            initial_sync_complete: inner.initial_sync_complete,
            last_sync: inner.last_sync,
        }
    }

    pub fn set_connection_status(&self, status: ConnectionStatus) {
        {
            let mut inner = self.inner.lock().expect("state mutex poisoned");
            inner.connection_status = status;
        }
        self.notify(StateChange::ConnectionChanged);
    }

    pub fn set_authenticated(&self, authenticated: bool, current_user: Option<User>) {
        {
            let mut inner = self.inner.lock().expect("state mutex poisoned");
            inner.is_authenticated = authenticated;
            inner.current_user = current_user;
        }
        self.notify(StateChange::ConnectionChanged);
    }

    pub fn set_initialized(&self, initialized: bool) {
        let mut inner = self.inner.lock().expect("state mutex poisoned");
        inner.is_initialized = initialized;
    }

    pub fn set_syncing(&self, syncing: bool) {
        let mut inner = self.inner.lock().expect("state mutex poisoned");
        inner.is_syncing = syncing;
    }

    pub fn set_initial_sync_complete(&self) {
        let mut inner = self.inner.lock().expect("state mutex poisoned");
        inner.initial_sync_complete = true;
        inner.last_sync = Some(chrono::Utc::now());
    }

    pub fn set_last_sync_now(&self) {
        let mut inner = self.inner.lock().expect("state mutex poisoned");
        inner.last_sync = Some(chrono::Utc::now());
    }

    pub fn cursor(&self) -> Option<UpdateCursor> {
        self.inner.lock().expect("state mutex poisoned").cursor
    }

    pub fn set_cursor(&self, cursor: UpdateCursor) {
        self.inner.lock().expect("state mutex poisoned").cursor = Some(cursor);
    }

    /// Invariant 1: `chats_order` stays exactly the keys of `chats`, no
    /// duplicates — enforced here by only appending ids not already
    /// present.
    pub fn add_chats(&self, chats: Vec<Chat>) {
        {
            let mut inner = self.inner.lock().expect("state mutex poisoned");
            for chat in chats {
                if !inner.chats.contains_key(&chat.id) {
                    inner.chats_order.push(chat.id.clone());
                }
                inner.chats.insert(chat.id.clone(), chat);
            }
        }
        self.notify(StateChange::ChatsChanged);
    }

    pub fn update_chat(&self, id: &ChatId, f: impl FnOnce(&mut Chat)) {
        {
            let mut inner = self.inner.lock().expect("state mutex poisoned");
            if let Some(chat) = inner.chats.get_mut(id) {
                f(chat);
            }
        }
        self.notify(StateChange::ChatsChanged);
    }

    pub fn get_chat(&self, id: &ChatId) -> Option<Chat> {
        self.inner.lock().expect("state mutex poisoned").chats.get(id).cloned()
    }

    pub fn chats_order(&self) -> Vec<ChatId> {
        self.inner.lock().expect("state mutex poisoned").chats_order.clone()
    }

    /// Invariant 2 is maintained by ingest: messages are only added for
    /// chats already present in `chats` (the caller, `relay-telegram::ingest`,
    /// upserts the chat first).
    ///
    /// Message buffer policy (§4.2): retain the most recent `N` messages
    /// per chat; overflow evicts the oldest from memory only, never from
    /// C3.
    ///
    /// Idempotent by `id` (invariant 6/I3): re-applying a message already
    /// in the buffer replaces it in place instead of appending a second
    /// copy. Returns, per input message in order, whether it was newly
    /// inserted (`true`) or replaced an existing entry (`false`), so
    /// callers can gate id-keyed side effects like an unread-count bump.
    pub fn add_messages(&self, chat_id: &ChatId, messages: Vec<Message>) -> Vec<bool> {
        let mut is_new = Vec::with_capacity(messages.len());
        {
            let mut inner = self.inner.lock().expect("state mutex poisoned");
            let buffer_size = self.message_buffer_size;
            let buf = inner.messages.entry(chat_id.clone()).or_default();
            for msg in messages {
                if let Some(existing) = buf.iter_mut().find(|m| m.id == msg.id) {
                    *existing = msg;
                    is_new.push(false);
                } else {
                    buf.push_back(msg);
                    is_new.push(true);
                }
            }
            while buf.len() > buffer_size {
                buf.pop_front();
            }
        }
        self.notify(StateChange::MessagesChanged {
            chat_id: chat_id.clone(),
        });
        is_new
    }

    pub fn update_message(&self, chat_id: &ChatId, id: MessageId, f: impl FnOnce(&mut Message)) {
        {
            let mut inner = self.inner.lock().expect("state mutex poisoned");
            if let Some(buf) = inner.messages.get_mut(chat_id) {
                if let Some(msg) = buf.iter_mut().find(|m| m.id == id) {
                    f(msg);
                }
            }
        }
        self.notify(StateChange::MessagesChanged {
            chat_id: chat_id.clone(),
        });
    }

    pub fn delete_messages(&self, chat_id: &ChatId, ids: &[MessageId]) {
        {
            let mut inner = self.inner.lock().expect("state mutex poisoned");
            if let Some(buf) = inner.messages.get_mut(chat_id) {
                buf.retain(|m| !ids.contains(&m.id));
            }
        }
        self.notify(StateChange::MessagesChanged {
            chat_id: chat_id.clone(),
        });
    }

    pub fn messages(&self, chat_id: &ChatId) -> Vec<Message> {
        self.inner
            .lock()
            .expect("state mutex poisoned")
            .messages
            .get(chat_id)
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn add_users(&self, users: Vec<User>) {
        {
            let mut inner = self.inner.lock().expect("state mutex poisoned");
            for user in users {
                inner.users.insert(user.id.clone(), user);
            }
        }
        self.notify(StateChange::UsersChanged);
    }

    pub fn get_user(&self, id: &UserId) -> Option<User> {
        self.inner.lock().expect("state mutex poisoned").users.get(id).cloned()
    }

    /// State (all tiers) is fully reset on skill unload (§4.2 note).
    pub fn reset(&self) {
        {
            let mut inner = self.inner.lock().expect("state mutex poisoned");
            inner.connection_status = ConnectionStatus::Disconnected;
            inner.is_authenticated = false;
            inner.current_user = None;
            inner.chats.clear();
            inner.chats_order.clear();
            inner.users.clear();
            inner.messages.clear();
            inner.cursor = None;
            inner.is_initialized = false;
            inner.is_syncing = false;
            inner.initial_sync_complete = false;
            inner.last_sync = None;
        }
        self.notify(StateChange::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_chat(id: &str) -> Chat {
        Chat {
            id: ChatId::from(id),
            kind: ChatKind::Dm,
            title: "Alice".to_string(),
            unread_count: 0,
            participants_count: None,
            is_pinned: false,
            is_muted: false,
            is_archived: false,
            draft: None,
            last_message_id: None,
            last_message_date: None,
            sort_order: 0,
            updated_at: chrono::Utc::now(),
        }
    }

    fn sample_message(chat_id: &str, id: u64) -> Message {
        Message {
            id: MessageId(id),
            chat_id: ChatId::from(chat_id),
            from_id: None,
            date: chrono::Utc::now(),
            text: format!("msg {id}"),
            is_outgoing: false,
            is_edited: false,
            reply_to_id: None,
            media_kind: None,
            reactions: Vec::new(),
        }
    }

    #[test]
    fn chats_order_has_no_duplicates_on_repeated_add() {
        let store = StateStore::new(200);
        store.add_chats(vec![sample_chat("1")]);
        store.add_chats(vec![sample_chat("1")]);
        assert_eq!(store.chats_order(), vec![ChatId::from("1")]);
    }

    #[test]
    fn message_buffer_evicts_oldest_past_cap() {
        let store = StateStore::new(3);
        let chat_id = ChatId::from("1");
        store.add_chats(vec![sample_chat("1")]);
        for i in 0..5 {
            store.add_messages(&chat_id, vec![sample_message("1", i)]);
        }
        let remaining = store.messages(&chat_id);
        assert_eq!(remaining.len(), 3);
        assert_eq!(remaining[0].id, MessageId(2));
        assert_eq!(remaining[2].id, MessageId(4));
    }

    #[test]
    fn exactly_at_cap_does_not_evict() {
        let store = StateStore::new(200);
        let chat_id = ChatId::from("1");
        store.add_chats(vec![sample_chat("1")]);
        let batch: Vec<Message> = (0..200).map(|i| sample_message("1", i)).collect();
        store.add_messages(&chat_id, batch);
        assert_eq!(store.messages(&chat_id).len(), 200);
        store.add_messages(&chat_id, vec![sample_message("1", 200)]);
        let remaining = store.messages(&chat_id);
        assert_eq!(remaining.len(), 200);
        assert_eq!(remaining[0].id, MessageId(1));
    }

    #[test]
    fn add_messages_is_idempotent_by_id() {
        let store = StateStore::new(200);
        let chat_id = ChatId::from("1");
        store.add_chats(vec![sample_chat("1")]);
        let is_new = store.add_messages(&chat_id, vec![sample_message("1", 1)]);
        assert_eq!(is_new, vec![true]);

        let mut replayed = sample_message("1", 1);
        replayed.text = "edited on replay".to_string();
        let is_new = store.add_messages(&chat_id, vec![replayed]);
        assert_eq!(is_new, vec![false]);

        let remaining = store.messages(&chat_id);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "edited on replay");
    }

    #[test]
    fn subscribers_are_notified_synchronously() {
        let store = StateStore::new(200);
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        store.subscribe(Box::new(move |_change| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));
        store.add_chats(vec![sample_chat("1")]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let store = StateStore::new(200);
        let count = Arc::new(AtomicUsize::new(0));
        store.subscribe(Box::new(|_| panic!("boom")));
        let count_clone = count.clone();
        store.subscribe(Box::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));
        store.add_chats(vec![sample_chat("1")]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reset_clears_all_tiers() {
        let store = StateStore::new(200);
        store.add_chats(vec![sample_chat("1")]);
        store.add_messages(&ChatId::from("1"), vec![sample_message("1", 0)]);
        store.reset();
        assert!(store.chats_order().is_empty());
        assert!(store.messages(&ChatId::from("1")).is_empty());
    }
}
