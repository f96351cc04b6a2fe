//! DB Actor - Thread-safe access to SQLite
//!
//! SQLite connections are not `Sync`, so the database lives on a dedicated
//! thread and every request is a message answered through a oneshot channel.

use std::fmt;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use async_trait::async_trait;
use pour_core::{InstalledState, StateStore};
use pour_schema::PackageName;
use tokio::sync::oneshot;

use super::db::{DbError, HistoryEvent, StateDb};

type Reply<T> = oneshot::Sender<Result<T, DbError>>;

/// Events that can be sent to the DB actor
pub enum DbEvent {
    GetInstalled {
        name: String,
        resp: Reply<Option<InstalledState>>,
    },
    PutInstalled {
        state: InstalledState,
        resp: Reply<()>,
    },
    RemoveInstalled {
        name: String,
        resp: Reply<bool>,
    },
    ListInstalled {
        resp: Reply<Vec<InstalledState>>,
    },
    AddHistory {
        event: HistoryEvent,
        resp: Reply<()>,
    },
    History {
        name: String,
        resp: Reply<Vec<HistoryEvent>>,
    },
}

impl fmt::Debug for DbEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetInstalled { name, .. } => f
                .debug_struct("GetInstalled")
                .field("name", name)
                .finish_non_exhaustive(),
            Self::PutInstalled { state, .. } => f
                .debug_struct("PutInstalled")
                .field("name", &state.name)
                .field("version", &state.version)
                .finish_non_exhaustive(),
            Self::RemoveInstalled { name, .. } => f
                .debug_struct("RemoveInstalled")
                .field("name", name)
                .finish_non_exhaustive(),
            Self::ListInstalled { .. } => f.debug_struct("ListInstalled").finish_non_exhaustive(),
            Self::AddHistory { event, .. } => f
                .debug_struct("AddHistory")
                .field("package", &event.package)
                .field("action", &event.action)
                .finish_non_exhaustive(),
            Self::History { name, .. } => f
                .debug_struct("History")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

/// A handle to the Database Actor that is Send + Sync and Clone.
#[derive(Clone)]
pub struct DbHandle {
    sender: mpsc::Sender<DbEvent>,
}

impl fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbHandle").finish_non_exhaustive()
    }
}

impl DbHandle {
    /// Open the database at `path` and spawn the actor thread.
    ///
    /// The thread exits once every handle is dropped.
    pub fn spawn(path: &Path) -> Result<Self, DbError> {
        let (sender, receiver) = mpsc::channel();
        let db = StateDb::open_at(path)?;

        thread::spawn(move || {
            run_db_event_loop(&db, &receiver);
        });

        Ok(Self { sender })
    }

    /// Helper to send a request and wait for the response
    async fn request<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(Reply<T>) -> DbEvent,
    {
        let (tx, rx) = oneshot::channel();
        self.sender.send(f(tx)).map_err(|_| DbError::ActorDied)?;
        rx.await.map_err(|_| DbError::ActorDied)?
    }

    pub async fn get_installed(&self, name: String) -> Result<Option<InstalledState>, DbError> {
        self.request(|resp| DbEvent::GetInstalled { name, resp })
            .await
    }

    pub async fn put_installed(&self, state: InstalledState) -> Result<(), DbError> {
        self.request(|resp| DbEvent::PutInstalled { state, resp })
            .await
    }

    pub async fn remove_installed(&self, name: String) -> Result<bool, DbError> {
        self.request(|resp| DbEvent::RemoveInstalled { name, resp })
            .await
    }

    pub async fn list_installed(&self) -> Result<Vec<InstalledState>, DbError> {
        self.request(|resp| DbEvent::ListInstalled { resp }).await
    }

    pub async fn add_history(&self, event: HistoryEvent) -> Result<(), DbError> {
        self.request(|resp| DbEvent::AddHistory { event, resp })
            .await
    }

    pub async fn history(&self, name: String) -> Result<Vec<HistoryEvent>, DbError> {
        self.request(|resp| DbEvent::History { name, resp }).await
    }
}

fn run_db_event_loop(db: &StateDb, receiver: &mpsc::Receiver<DbEvent>) {
    while let Ok(event) = receiver.recv() {
        tracing::trace!("db: {event:?}");
        match event {
            DbEvent::GetInstalled { name, resp } => {
                let _ = resp.send(db.get_installed(&name));
            }
            DbEvent::PutInstalled { state, resp } => {
                let _ = resp.send(db.put_installed(&state));
            }
            DbEvent::RemoveInstalled { name, resp } => {
                let _ = resp.send(db.remove_installed(&name));
            }
            DbEvent::ListInstalled { resp } => {
                let _ = resp.send(db.list_installed());
            }
            DbEvent::AddHistory { event, resp } => {
                let _ = resp.send(db.add_history(&event));
            }
            DbEvent::History { name, resp } => {
                let _ = resp.send(db.history(&name));
            }
        }
    }
}

fn state_error(e: DbError) -> pour_core::Error {
    pour_core::Error::State(e.to_string())
}

#[async_trait]
impl StateStore for DbHandle {
    async fn get(&self, name: &PackageName) -> pour_core::Result<Option<InstalledState>> {
        self.get_installed(name.to_string())
            .await
            .map_err(state_error)
    }

    async fn put(&self, state: InstalledState) -> pour_core::Result<()> {
        self.put_installed(state).await.map_err(state_error)
    }

    async fn remove(&self, name: &PackageName) -> pour_core::Result<()> {
        self.remove_installed(name.to_string())
            .await
            .map(|_| ())
            .map_err(state_error)
    }

    async fn list(&self) -> pour_core::Result<Vec<InstalledState>> {
        self.list_installed().await.map_err(state_error)
    }
}
