use serde::{Deserialize, Serialize};
use storefront_types::domain::cart::{Cart, CartItem, CartLine, ReAddPolicy};
use storefront_types::ports::cart_storage::CartStorage;
use tokio::sync::broadcast;

use crate::errors::AppError;

const EVENT_CAPACITY: usize = 16;

/// Sent after every persisted cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartChanged {
    pub session_key: String,
    pub item_count: u32,
    pub total: i64,
}

/// The cart of one session, backed by a durable snapshot.
///
/// Each mutation is applied to a copy, written to storage, and only then
/// swapped in and announced to subscribers. A failed write leaves the cart
/// as it was and sends nothing.
pub struct CartStore<S: CartStorage> {
    storage: S,
    session_key: String,
    cart: Cart,
    re_add: ReAddPolicy,
    events: broadcast::Sender<CartChanged>,
}

impl<S: CartStorage> CartStore<S> {
    /// Rehydrates the session's cart; a session with no snapshot starts empty.
    pub async fn open(storage: S, session_key: impl Into<String>) -> Result<Self, AppError> {
        let session_key = session_key.into();
        let lines = storage.load_cart(&session_key).await?.unwrap_or_default();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            storage,
            session_key,
            cart: Cart::from_lines(lines),
            re_add: ReAddPolicy::default(),
            events,
        })
    }

    pub fn with_re_add_policy(mut self, policy: ReAddPolicy) -> Self {
        self.re_add = policy;
        self
    }

    /// Publishes changes on an existing channel, e.g. one shared by every
    /// store of a process so a single observer sees all sessions.
    pub fn with_notifier(mut self, events: broadcast::Sender<CartChanged>) -> Self {
        self.events = events;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CartChanged> {
        self.events.subscribe()
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn total(&self) -> i64 {
        self.cart.total()
    }

    pub fn item_count(&self) -> u32 {
        self.cart.item_count()
    }

    pub async fn add_item(&mut self, item: CartItem) -> Result<(), AppError> {
        let mut next = self.cart.clone();
        tracing::debug!(session = %self.session_key, item = %item.id, "add to cart");
        next.add_item_with(item, self.re_add);
        self.commit(next).await
    }

    /// Unknown ids are ignored without touching storage.
    pub async fn remove_item(&mut self, id: &str) -> Result<(), AppError> {
        let mut next = self.cart.clone();
        if !next.remove_item(id) {
            return Ok(());
        }
        tracing::debug!(session = %self.session_key, item = %id, "remove from cart");
        self.commit(next).await
    }

    pub async fn clear(&mut self) -> Result<(), AppError> {
        self.storage.remove_cart(&self.session_key).await?;
        self.cart.clear();
        self.notify();
        Ok(())
    }

    async fn commit(&mut self, next: Cart) -> Result<(), AppError> {
        self.storage.save_cart(&self.session_key, next.lines()).await?;
        self.cart = next;
        self.notify();
        Ok(())
    }

    fn notify(&self) {
        // no subscribers is not an error
        let _ = self.events.send(CartChanged {
            session_key: self.session_key.clone(),
            item_count: self.cart.item_count(),
            total: self.cart.total(),
        });
    }
}
