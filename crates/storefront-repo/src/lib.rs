#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use storefront_types::domain::cart::CartLine;
use storefront_types::domain::food::Food;
use storefront_types::domain::order::Order;
use storefront_types::domain::recommendation::HistoricalOrder;
use storefront_types::domain::status::OrderStatus;
use storefront_types::ports::cart_storage::CartStorage;
use storefront_types::ports::food_catalog::FoodCatalog;
use storefront_types::ports::order_repository::{OrderRepository, RepoError};
use storefront_types::ports::purchase_history::PurchaseHistory;
use uuid::Uuid;

#[cfg(feature = "memory")]
pub mod memory;
pub mod seed;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(feature = "sqlite", not(feature = "memory")))]
const DEFAULT_SQLITE_URL: &str = "sqlite://storefront.db";

/// The storage backend picked at startup. Every variant implements all ports.
#[derive(Clone)]
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

macro_rules! dispatch {
    ($self:ident, $repo:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory($repo) => $call,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($repo) => $call,
        }
    };
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(_: Option<&str>) -> anyhow::Result<Self> {
        Ok(Repo::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or(DEFAULT_SQLITE_URL);
        Ok(Repo::Sqlite(sqlite::SqliteRepo::new(url).await?))
    }

    // With both features, a database url selects sqlite and its absence the memory store.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Repo::Sqlite(sqlite::SqliteRepo::new(url).await?)),
            None => Ok(Repo::Memory(memory::InMemoryRepo::new())),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(_) => "sqlite",
        }
    }

    pub async fn insert_food(&self, food: Food) -> Result<(), RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(r) => {
                r.insert_food(food).await;
                Ok(())
            }
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.insert_food(&food).await,
        }
    }

    /// Fills an empty catalog with `foods`. Returns how many were inserted.
    pub async fn seed_if_empty(&self, foods: Vec<Food>) -> Result<usize, RepoError> {
        if !self.list_foods().await?.is_empty() {
            return Ok(0);
        }
        let count = foods.len();
        for food in foods {
            self.insert_food(food).await?;
        }
        Ok(count)
    }
}

#[async_trait::async_trait]
impl OrderRepository for Repo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        dispatch!(self, r => r.create(order).await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        dispatch!(self, r => r.get(id).await)
    }

    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        dispatch!(self, r => r.list().await)
    }

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, RepoError> {
        dispatch!(self, r => r.list_for_customer(customer_id).await)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        dispatch!(self, r => r.update_status(id, status).await)
    }
}

#[async_trait::async_trait]
impl FoodCatalog for Repo {
    async fn list_foods(&self) -> Result<Vec<Food>, RepoError> {
        dispatch!(self, r => r.list_foods().await)
    }

    async fn get_food(&self, id: &str) -> Result<Option<Food>, RepoError> {
        dispatch!(self, r => r.get_food(id).await)
    }

    async fn search_foods(&self, text: &str) -> Result<Vec<Food>, RepoError> {
        dispatch!(self, r => r.search_foods(text).await)
    }
}

#[async_trait::async_trait]
impl PurchaseHistory for Repo {
    async fn tag_history(&self, customer_id: &str) -> Result<Vec<HistoricalOrder>, RepoError> {
        dispatch!(self, r => r.tag_history(customer_id).await)
    }
}

#[async_trait::async_trait]
impl CartStorage for Repo {
    async fn load_cart(&self, session_key: &str) -> Result<Option<Vec<CartLine>>, RepoError> {
        dispatch!(self, r => r.load_cart(session_key).await)
    }

    async fn save_cart(&self, session_key: &str, lines: &[CartLine]) -> Result<(), RepoError> {
        dispatch!(self, r => r.save_cart(session_key, lines).await)
    }

    async fn remove_cart(&self, session_key: &str) -> Result<(), RepoError> {
        dispatch!(self, r => r.remove_cart(session_key).await)
    }
}
