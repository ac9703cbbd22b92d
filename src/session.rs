//! The process-wide authentication state.

use crate::{
    storage::{MemoryStorage, Storage, StorageError},
    Role, User, UserPatch,
};
use serde_derive::{Deserialize, Serialize};
use tokio::sync::watch;

/// The storage key the session record is persisted under.
pub const SESSION_KEY: &str = "auth-storage";

/// A snapshot of who is currently logged in.
///
/// A session is authenticated exactly when it holds both a token and a user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    token: Option<String>,
    user: Option<User>,
    is_loading: bool,
}

impl Session {
    pub fn token(&self) -> Option<&str> { self.token.as_deref() }

    pub fn user(&self) -> Option<&User> { self.user.as_ref() }

    pub fn role(&self) -> Option<Role> { self.user.as_ref().map(|u| u.role) }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn is_loading(&self) -> bool { self.is_loading }

    pub fn is_admin(&self) -> bool { self.role() == Some(Role::Admin) }

    pub fn is_student(&self) -> bool { self.role() == Some(Role::Student) }

    fn from_record(record: PersistedSession) -> Option<Session> {
        match record {
            PersistedSession {
                token: Some(token),
                user: Some(user),
                is_authenticated: true,
            } => Some(Session {
                token: Some(token),
                user: Some(user),
                is_loading: false,
            }),
            PersistedSession {
                token: None,
                user: None,
                is_authenticated: false,
            } => Some(Session::default()),
            _ => None,
        }
    }

    fn to_record(&self) -> PersistedSession {
        PersistedSession {
            token: self.token.clone(),
            user: self.user.clone(),
            is_authenticated: self.is_authenticated(),
        }
    }
}

/// The JSON record kept in durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
}

/// The single source of truth for "who is logged in".
///
/// State only changes through [`SessionStore::set_auth()`],
/// [`SessionStore::logout()`], [`SessionStore::update_user()`] and
/// [`SessionStore::set_loading()`]. Each change is written to durable storage
/// while the in-memory state is locked, so storage never lags behind a
/// concurrent update. Storage failures are logged and otherwise ignored; the
/// in-memory state stays authoritative.
pub struct SessionStore {
    state: watch::Sender<Session>,
    storage: Box<dyn Storage>,
}

impl SessionStore {
    /// Create a store, restoring whatever session was last persisted.
    pub fn new<S: Storage + 'static>(storage: S) -> Self {
        let session = hydrate(&storage);
        let (state, _) = watch::channel(session);

        SessionStore {
            state,
            storage: Box::new(storage),
        }
    }

    /// A store which forgets everything when the process exits.
    pub fn in_memory() -> Self { SessionStore::new(MemoryStorage::new()) }

    pub fn snapshot(&self) -> Session { self.state.borrow().clone() }

    /// Get notified whenever the session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> { self.state.borrow().user.clone() }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool { self.state.borrow().is_loading }

    pub fn is_admin(&self) -> bool { self.state.borrow().is_admin() }

    pub fn is_student(&self) -> bool { self.state.borrow().is_student() }

    /// Record a freshly established session.
    pub fn set_auth<T: Into<String>>(&self, token: T, user: User) {
        let token = token.into();
        log::info!("Signed in as {} ({})", user.email, user.role);

        self.state.send_modify(|session| {
            session.token = Some(token);
            session.user = Some(user);
            session.is_loading = false;
            self.persist(session);
        });
    }

    /// Forget the current session, both in memory and in durable storage.
    pub fn logout(&self) {
        self.state.send_modify(|session| {
            if let Some(user) = &session.user {
                log::info!("Signing out {}", user.email);
            }

            session.token = None;
            session.user = None;
            session.is_loading = false;
            self.persist(session);
        });
    }

    /// Merge `patch` into the current user, returning the updated user.
    ///
    /// Returns `None` without changing anything when nobody is logged in.
    pub fn update_user(&self, patch: UserPatch) -> Option<User> {
        let mut updated = None;

        self.state.send_if_modified(|session| match session.user.as_mut() {
            Some(user) => {
                user.apply(patch);
                updated = Some(user.clone());
                self.persist(session);
                true
            },
            None => {
                log::debug!("Ignoring a user update without an active session");
                false
            },
        });

        updated
    }

    /// Toggle the transient loading flag. This is never persisted.
    pub fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|session| {
            let changed = session.is_loading != loading;
            session.is_loading = loading;
            changed
        });
    }

    fn persist(&self, session: &Session) {
        let outcome = if session.is_authenticated() {
            write_record(self.storage.as_ref(), &session.to_record())
        } else {
            self.storage.remove(SESSION_KEY)
        };

        if let Err(e) = outcome {
            log::warn!("Unable to persist the session: {}", e);
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.state.borrow();

        f.debug_struct("SessionStore")
            .field("is_authenticated", &session.is_authenticated())
            .field("user", &session.user)
            .finish()
    }
}

fn write_record(
    storage: &dyn Storage,
    record: &PersistedSession,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(record)?;
    storage.set(SESSION_KEY, &json)
}

fn hydrate(storage: &dyn Storage) -> Session {
    let raw = match storage.get(SESSION_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Session::default(),
        Err(e) => {
            log::warn!("Unable to read the persisted session: {}", e);
            return Session::default();
        },
    };

    let record: PersistedSession = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("Ignoring a corrupt session record: {}", e);
            return Session::default();
        },
    };

    match Session::from_record(record) {
        Some(session) => {
            if let Some(user) = session.user() {
                log::debug!("Restored the session for {}", user.email);
            }
            session
        },
        None => {
            log::warn!("Ignoring an inconsistent session record");
            Session::default()
        },
    }
}
