mod auth;
mod communities;
mod events;
mod identity;
mod util;

use std::{future::Future, sync::Arc};

pub use auth::*;
pub use communities::*;
pub use events::*;
pub use identity::*;

use communal_core::{Config, DocumentStore, StoreError};
use crossbeam::channel::unbounded;
use log::warn;

/// The communal collab system, facilitating community registration, authentication, and more.
pub struct Collab<Db: ?Sized> {
    pub auth: Auth<Db>,
    pub communities: Registrar<Db>,

    event_receiver: EventReceiver,
}

/// A type passed to various components of the collab system, to access the store and emit events.
pub struct CollabContext<Db: ?Sized> {
    pub config: Config,
    pub store: Arc<Db>,

    event_sender: EventSender,
}

impl<Db> Collab<Db>
where
    Db: DocumentStore + ?Sized,
{
    pub fn new(config: Config, store: Arc<Db>) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = CollabContext {
            config,
            store,
            event_sender,
        };

        Self {
            auth: Auth::new(&context),
            communities: Registrar::new(&context),
            event_receiver,
        }
    }

    /// Returns a receiver of collab events.
    /// Every receiver competes for the same events, so use one consumer.
    pub fn events(&self) -> EventReceiver {
        self.event_receiver.clone()
    }
}

impl<Db> CollabContext<Db>
where
    Db: DocumentStore + ?Sized,
{
    pub fn emit(&self, event: CollabEvent) {
        // Nobody listening is fine
        let _ = self.event_sender.send(event);
    }

    /// Runs a store operation under the configured transaction timeout.
    /// Expiry drops the operation, which aborts any open transaction, and reports the store as unavailable.
    pub async fn timed<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<StoreError>,
    {
        let timeout = self.config.transaction_timeout();

        match tokio::time::timeout(timeout, operation).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Store operation timed out after {timeout:?}");

                Err(StoreError::Unavailable(format!("no response after {timeout:?}")).into())
            }
        }
    }
}

impl<Db: ?Sized> Clone for CollabContext<Db> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: self.store.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}
