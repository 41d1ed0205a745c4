use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use storefront_types::domain::cart::CartLine;
use storefront_types::domain::food::Food;
use storefront_types::domain::order::{sort_newest_first, Order};
use storefront_types::domain::recommendation::{HistoricalLine, HistoricalOrder};
use storefront_types::domain::status::OrderStatus;
use storefront_types::ports::cart_storage::CartStorage;
use storefront_types::ports::food_catalog::FoodCatalog;
use storefront_types::ports::order_repository::{OrderRepository, RepoError};
use storefront_types::ports::purchase_history::PurchaseHistory;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone)]
pub struct InMemoryRepo {
    pub orders: Arc<DashMap<Uuid, Order>>,
    pub carts: Arc<DashMap<String, Vec<CartLine>>>,
    foods: Arc<RwLock<Vec<Food>>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            orders: Arc::new(DashMap::new()),
            carts: Arc::new(DashMap::new()),
            foods: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_foods(foods: Vec<Food>) -> Self {
        Self {
            foods: Arc::new(RwLock::new(foods)),
            ..Self::new()
        }
    }

    /// Inserts or replaces a catalog entry; new ids go to the end of the list.
    pub async fn insert_food(&self, food: Food) {
        let mut foods = self.foods.write().await;
        match foods.iter_mut().find(|f| f.id == food.id) {
            Some(existing) => *existing = food,
            None => foods.push(food),
        }
    }

    async fn tags_of(&self, food_id: &str) -> Vec<String> {
        self.foods
            .read()
            .await
            .iter()
            .find(|f| f.id == food_id)
            .map(|f| f.tags.clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        // header and lines live in one value, so a single insert is atomic
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.get(&id).map(|r| r.clone()))
    }

    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        let mut orders: Vec<Order> = self.orders.iter().map(|kv| kv.value().clone()).collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, RepoError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|kv| kv.value().customer_id == customer_id)
            .map(|kv| kv.value().clone())
            .collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        if let Some(mut v) = self.orders.get_mut(&id) {
            v.update_status(status);
            return Ok(Some(v.clone()));
        }
        Ok(None)
    }
}

#[async_trait]
impl FoodCatalog for InMemoryRepo {
    async fn list_foods(&self) -> Result<Vec<Food>, RepoError> {
        Ok(self.foods.read().await.clone())
    }

    async fn get_food(&self, id: &str) -> Result<Option<Food>, RepoError> {
        Ok(self.foods.read().await.iter().find(|f| f.id == id).cloned())
    }

    async fn search_foods(&self, text: &str) -> Result<Vec<Food>, RepoError> {
        Ok(self
            .foods
            .read()
            .await
            .iter()
            .filter(|f| f.matches(text))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PurchaseHistory for InMemoryRepo {
    async fn tag_history(&self, customer_id: &str) -> Result<Vec<HistoricalOrder>, RepoError> {
        let past = self.list_for_customer(customer_id).await?;
        let mut history = Vec::with_capacity(past.len());
        for order in past {
            let mut lines = Vec::with_capacity(order.lines.len());
            for line in order.lines {
                let tags = self.tags_of(&line.food_id).await;
                lines.push(HistoricalLine {
                    food_id: line.food_id,
                    tags,
                });
            }
            history.push(HistoricalOrder { lines });
        }
        Ok(history)
    }
}

#[async_trait]
impl CartStorage for InMemoryRepo {
    async fn load_cart(&self, session_key: &str) -> Result<Option<Vec<CartLine>>, RepoError> {
        Ok(self.carts.get(session_key).map(|r| r.clone()))
    }

    async fn save_cart(&self, session_key: &str, lines: &[CartLine]) -> Result<(), RepoError> {
        self.carts.insert(session_key.to_string(), lines.to_vec());
        Ok(())
    }

    async fn remove_cart(&self, session_key: &str) -> Result<(), RepoError> {
        self.carts.remove(session_key);
        Ok(())
    }
}
