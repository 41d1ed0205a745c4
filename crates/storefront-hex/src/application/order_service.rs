use crate::application::auth::AdminGrant;
use crate::application::cart_store::CartStore;
use crate::errors::AppError;
use dashmap::DashMap;
use std::sync::Arc;
use storefront_types::domain::order::{
    lines_from_cart, sort_newest_first, Order, OrderLine, ValidationError,
};
use storefront_types::domain::status::{OrderStatus, TransitionPolicy};
use storefront_types::ports::cart_storage::CartStorage;
use storefront_types::ports::order_repository::OrderRepository;
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct OrderService<R: OrderRepository> {
    repo: R,
    policy: TransitionPolicy,
    status_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, TransitionPolicy::default())
    }

    pub fn with_policy(repo: R, policy: TransitionPolicy) -> Self {
        Self {
            repo,
            policy,
            status_locks: DashMap::new(),
        }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Validates customer fields, then stores the order with all its lines as
    /// one unit. Nothing is written when validation fails.
    pub async fn create_order(
        &self,
        customer_id: String,
        customer_name: String,
        customer_phone: String,
        total_price: i64,
        lines: Vec<OrderLine>,
    ) -> Result<Uuid, AppError> {
        let order = Order::new(customer_id, customer_name, customer_phone, total_price, lines)
            .map_err(rejected)?;
        Ok(self.persist(order).await?.id)
    }

    /// Turns the session cart into an order and empties the cart once the
    /// order is stored. The cart is untouched if anything before that fails.
    pub async fn checkout<S: CartStorage>(
        &self,
        cart: &mut CartStore<S>,
        customer_id: String,
        customer_name: String,
        customer_phone: String,
    ) -> Result<Order, AppError> {
        let order = Order::new(
            customer_id,
            customer_name,
            customer_phone,
            cart.total(),
            lines_from_cart(cart.cart()),
        )
        .map_err(rejected)?;
        if order.lines.is_empty() {
            return Err(rejected(ValidationError::EmptyCart));
        }

        let order = self.persist(order).await?;
        if let Err(e) = cart.clear().await {
            // the order is already committed; a retry would place it twice
            tracing::warn!(order_id = %order.id, error = %e, "order placed but cart not cleared");
        }
        Ok(order)
    }

    async fn persist(&self, order: Order) -> Result<Order, AppError> {
        let order = self.repo.create(order).await?;
        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            total_price = order.total_price,
            lines = order.lines.len(),
            "order created"
        );
        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, AppError> {
        match self.repo.get(id).await? {
            Some(o) => Ok(o),
            None => Err(AppError::NotFound(format!("order {}", id))),
        }
    }

    /// The customer's orders, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, AppError> {
        let mut orders = self.repo.list_for_customer(customer_id).await?;
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    /// Every order, newest first.
    pub async fn list_all(&self, _grant: &AdminGrant) -> Result<Vec<Order>, AppError> {
        let mut orders = self.repo.list().await?;
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    /// Applies a status change allowed by the configured policy.
    ///
    /// Calls for the same order id run one at a time, so concurrent updates
    /// land in the order they acquired the lock.
    pub async fn set_status(
        &self,
        _grant: &AdminGrant,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, AppError> {
        let lock = self.status_locks.entry(id).or_default().clone();
        let guard = lock.lock().await;
        let result = self.apply_status(id, status).await;
        drop(guard);
        // the map and this call are the only holders when nobody else is waiting
        self.status_locks
            .remove_if(&id, |_, l| Arc::strong_count(l) == 2);
        result
    }

    async fn apply_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, AppError> {
        let current = self.get_order(id).await?;
        if !self.policy.allows(current.status, status) {
            tracing::warn!(order_id = %id, from = %current.status, to = %status, "transition refused");
            return Err(AppError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }
        match self.repo.update_status(id, status).await? {
            Some(o) => {
                tracing::info!(order_id = %id, from = %current.status, to = %status, "status updated");
                Ok(o)
            }
            None => Err(AppError::NotFound(format!("order {}", id))),
        }
    }
}

fn rejected(e: ValidationError) -> AppError {
    tracing::warn!(error = %e, "order rejected");
    AppError::Validation(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::auth::AdminAuthorizer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use storefront_repo::memory::InMemoryRepo;
    use storefront_types::domain::cart::CartItem;
    use storefront_types::ports::RepoError;

    /// Memory repo whose status writes are slow and count how many run at once.
    #[derive(Clone, Default)]
    struct SlowStatusRepo {
        inner: InMemoryRepo,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
        writes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl OrderRepository for SlowStatusRepo {
        async fn create(&self, order: Order) -> Result<Order, RepoError> {
            self.inner.create(order).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
            self.inner.get(id).await
        }

        async fn list(&self) -> Result<Vec<Order>, RepoError> {
            self.inner.list().await
        }

        async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, RepoError> {
            self.inner.list_for_customer(customer_id).await
        }

        async fn update_status(
            &self,
            id: Uuid,
            status: OrderStatus,
        ) -> Result<Option<Order>, RepoError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            let res = self.inner.update_status(id, status).await;
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            res
        }
    }

    fn grant() -> AdminGrant {
        AdminAuthorizer::new(Some("token".into()))
            .authorize(Some("Bearer token"))
            .unwrap()
    }

    fn lines() -> Vec<OrderLine> {
        vec![OrderLine {
            food_id: "greek-salad".into(),
            name: "Greek Salad".into(),
            quantity: 2,
            unit_price: 85000,
        }]
    }

    #[tokio::test]
    async fn create_and_get_order_in_memory() {
        let svc = OrderService::new(InMemoryRepo::new());
        let id = svc
            .create_order("c1".into(), "Alice".into(), "08123".into(), 170000, lines())
            .await
            .unwrap();
        let got = svc.get_order(id).await.unwrap();
        assert_eq!(got.customer_name, "Alice");
        assert_eq!(got.total_price, 170000);
        assert_eq!(got.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn missing_customer_fields_write_nothing() {
        let repo = InMemoryRepo::new();
        let svc = OrderService::new(repo.clone());
        let res = svc
            .create_order("c1".into(), "".into(), "08123".into(), 10000, lines())
            .await;
        assert!(matches!(
            res,
            Err(AppError::Validation(ValidationError::MissingCustomerName))
        ));
        let res = svc
            .create_order("c1".into(), "Bob".into(), "".into(), 10000, lines())
            .await;
        assert!(matches!(
            res,
            Err(AppError::Validation(ValidationError::MissingCustomerPhone))
        ));
        assert!(svc.list_all(&grant()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn permissive_policy_reopens_cancelled_orders() {
        let svc = OrderService::new(InMemoryRepo::new());
        let id = svc
            .create_order("c1".into(), "Alice".into(), "08123".into(), 170000, lines())
            .await
            .unwrap();
        let g = grant();
        svc.set_status(&g, id, OrderStatus::Cancelled).await.unwrap();
        let reopened = svc.set_status(&g, id, OrderStatus::Processing).await.unwrap();
        assert_eq!(reopened.status, OrderStatus::Processing);
        assert_eq!(reopened.lines, lines());
        assert!(svc.status_locks.is_empty());
    }

    #[tokio::test]
    async fn strict_policy_refuses_leaving_final_states() {
        let svc = OrderService::with_policy(InMemoryRepo::new(), TransitionPolicy::Strict);
        let id = svc
            .create_order("c1".into(), "Alice".into(), "08123".into(), 170000, lines())
            .await
            .unwrap();
        let g = grant();
        svc.set_status(&g, id, OrderStatus::Completed).await.unwrap();
        let res = svc.set_status(&g, id, OrderStatus::Processing).await;
        assert!(matches!(
            res,
            Err(AppError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Processing
            })
        ));
        assert_eq!(svc.get_order(id).await.unwrap().status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn not_found_paths() {
        let svc = OrderService::new(InMemoryRepo::new());
        let missing = svc.get_order(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let updated = svc
            .set_status(&grant(), Uuid::new_v4(), OrderStatus::Completed)
            .await;
        assert!(matches!(updated, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn checkout_snapshots_cart_and_clears_it() {
        let repo = InMemoryRepo::new();
        let svc = OrderService::new(repo.clone());
        let mut cart = CartStore::open(repo.clone(), "s1").await.unwrap();
        for _ in 0..2 {
            cart.add_item(CartItem {
                id: "waldorf-salad".into(),
                name: "Waldorf Salad".into(),
                price: "Rp 80.000".into(),
                image: String::new(),
            })
            .await
            .unwrap();
        }

        let order = svc
            .checkout(&mut cart, "c1".into(), "Alice".into(), "08123".into())
            .await
            .unwrap();
        assert_eq!(order.total_price, 160000);
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(order.lines[0].unit_price, 80000);
        assert!(cart.cart().is_empty());
        assert!(repo.load_cart("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn checkout_keeps_cart_when_rejected() {
        let repo = InMemoryRepo::new();
        let svc = OrderService::new(repo.clone());
        let mut cart = CartStore::open(repo.clone(), "s1").await.unwrap();

        let empty = svc
            .checkout(&mut cart, "c1".into(), "Alice".into(), "08123".into())
            .await;
        assert!(matches!(
            empty,
            Err(AppError::Validation(ValidationError::EmptyCart))
        ));

        cart.add_item(CartItem {
            id: "a".into(),
            name: "A".into(),
            price: "100".into(),
            image: String::new(),
        })
        .await
        .unwrap();
        let res = svc
            .checkout(&mut cart, "c1".into(), "Alice".into(), " ".into())
            .await;
        assert!(matches!(res, Err(AppError::Validation(_))));
        assert_eq!(cart.item_count(), 1);
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn customer_listing_is_scoped_and_newest_first() {
        let svc = OrderService::new(InMemoryRepo::new());
        let first = svc
            .create_order("c1".into(), "Alice".into(), "1".into(), 1, lines())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = svc
            .create_order("c1".into(), "Alice".into(), "1".into(), 1, lines())
            .await
            .unwrap();
        svc.create_order("c2".into(), "Bob".into(), "2".into(), 1, lines())
            .await
            .unwrap();

        let mine: Vec<_> = svc
            .list_for_customer("c1")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(mine, vec![second, first]);
        assert_eq!(svc.list_all(&grant()).await.unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_on_one_order_never_overlap() {
        let repo = SlowStatusRepo::default();
        let svc = Arc::new(OrderService::new(repo.clone()));
        let id = svc
            .create_order("c1".into(), "Alice".into(), "08123".into(), 170000, lines())
            .await
            .unwrap();
        let other = svc
            .create_order("c2".into(), "Bob".into(), "08124".into(), 170000, lines())
            .await
            .unwrap();

        let statuses = [
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ];
        let mut tasks = Vec::new();
        for status in statuses {
            let svc = Arc::clone(&svc);
            let g = grant();
            tasks.push(tokio::spawn(async move {
                svc.set_status(&g, id, status).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(repo.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(repo.writes.load(Ordering::SeqCst), statuses.len());
        assert!(svc.status_locks.is_empty());

        // different orders do not wait on each other
        repo.max_in_flight.store(0, Ordering::SeqCst);
        let (ga, gb) = (grant(), grant());
        let (a, b) = tokio::join!(
            svc.set_status(&ga, id, OrderStatus::Completed),
            svc.set_status(&gb, other, OrderStatus::Completed),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(repo.max_in_flight.load(Ordering::SeqCst), 2);
        assert!(svc.status_locks.is_empty());
    }
}
