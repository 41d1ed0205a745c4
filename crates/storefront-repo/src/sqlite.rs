use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use storefront_types::domain::cart::CartLine;
use storefront_types::domain::food::{join_tags, parse_tags, Food};
use storefront_types::domain::order::{Order, OrderLine};
use storefront_types::domain::recommendation::{HistoricalLine, HistoricalOrder};
use storefront_types::domain::status::OrderStatus;
use storefront_types::ports::cart_storage::CartStorage;
use storefront_types::ports::food_catalog::FoodCatalog;
use storefront_types::ports::order_repository::{OrderRepository, RepoError};
use storefront_types::ports::purchase_history::PurchaseHistory;
use uuid::Uuid;

const FOOD_COLUMNS: &str =
    "id, name, description, price, image, category, tag, vitamins, weight, calories, rating";
const ORDER_COLUMNS: &str = "id, user_id, name, phone, total_price, status, created_at";

#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

fn db_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::DbError(e.to_string())
}

fn timestamp(at: &DateTime<Utc>) -> String {
    // fixed width so lexical ORDER BY matches chronological order
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[derive(FromRow)]
struct DbFood {
    id: String,
    name: String,
    description: String,
    price: i64,
    image: String,
    category: String,
    tag: String,
    vitamins: Option<String>,
    weight: Option<String>,
    calories: Option<String>,
    rating: Option<f64>,
}

impl From<DbFood> for Food {
    fn from(row: DbFood) -> Self {
        Food {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image: row.image,
            category: row.category,
            tags: parse_tags(&row.tag),
            vitamins: row.vitamins,
            weight: row.weight,
            calories: row.calories,
            rating: row.rating,
        }
    }
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    user_id: String,
    name: String,
    phone: String,
    total_price: i64,
    status: String,
    created_at: String,
}

#[derive(FromRow)]
struct DbOrderLine {
    transaction_id: String,
    food_id: String,
    name: String,
    quantity: i64,
    unit_price: i64,
}

impl DbOrder {
    fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, RepoError> {
        let status = OrderStatus::from_str(&self.status).map_err(db_err)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(db_err)?
            .with_timezone(&Utc);
        let id = Uuid::parse_str(&self.id).map_err(db_err)?;
        Ok(Order {
            id,
            customer_id: self.user_id,
            customer_name: self.name,
            customer_phone: self.phone,
            total_price: self.total_price,
            status,
            lines,
            created_at,
        })
    }
}

impl DbOrderLine {
    fn into_line(self) -> Result<OrderLine, RepoError> {
        Ok(OrderLine {
            food_id: self.food_id,
            name: self.name,
            quantity: u32::try_from(self.quantity).map_err(db_err)?,
            unit_price: self.unit_price,
        })
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_storefront.sql");
        for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Inserts or replaces a catalog entry.
    pub async fn insert_food(&self, food: &Food) -> Result<(), RepoError> {
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO foods ({FOOD_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&food.id)
        .bind(&food.name)
        .bind(&food.description)
        .bind(food.price)
        .bind(&food.image)
        .bind(&food.category)
        .bind(join_tags(&food.tags))
        .bind(&food.vitamins)
        .bind(&food.weight)
        .bind(&food.calories)
        .bind(food.rating)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Loads lines for the selected orders and stitches them onto their headers.
    async fn hydrate(
        &self,
        headers: Vec<DbOrder>,
        customer_id: Option<&str>,
    ) -> Result<Vec<Order>, RepoError> {
        let rows: Vec<DbOrderLine> = sqlx::query_as(
            "SELECT fo.transaction_id, fo.food_id, fo.name, fo.quantity, fo.unit_price
             FROM foods_order fo
             JOIN transactions t ON t.id = fo.transaction_id
             WHERE ?1 IS NULL OR t.user_id = ?1
             ORDER BY fo.id",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut by_order: HashMap<String, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let key = row.transaction_id.clone();
            by_order.entry(key).or_default().push(row.into_line()?);
        }

        headers
            .into_iter()
            .map(|h| {
                let lines = by_order.remove(&h.id).unwrap_or_default();
                h.into_order(lines)
            })
            .collect()
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(&format!(
            "INSERT INTO transactions ({ORDER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(order.id.to_string())
        .bind(&order.customer_id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(order.total_price)
        .bind(order.status.as_str())
        .bind(timestamp(&order.created_at))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for line in &order.lines {
            sqlx::query(
                "INSERT INTO foods_order (transaction_id, food_id, name, quantity, unit_price)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(order.id.to_string())
            .bind(&line.food_id)
            .bind(&line.name)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        // dropping an uncommitted transaction rolls it back
        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM transactions WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<DbOrderLine> = sqlx::query_as(
            "SELECT transaction_id, food_id, name, quantity, unit_price
             FROM foods_order WHERE transaction_id = ? ORDER BY id",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        let lines = lines
            .into_iter()
            .map(DbOrderLine::into_line)
            .collect::<Result<Vec<_>, _>>()?;
        row.into_order(lines).map(Some)
    }

    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        let headers: Vec<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM transactions ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        self.hydrate(headers, None).await
    }

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, RepoError> {
        let headers: Vec<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM transactions WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        self.hydrate(headers, Some(customer_id)).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        let updated = sqlx::query("UPDATE transactions SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }
}

#[async_trait]
impl FoodCatalog for SqliteRepo {
    async fn list_foods(&self) -> Result<Vec<Food>, RepoError> {
        let rows: Vec<DbFood> =
            sqlx::query_as(&format!("SELECT {FOOD_COLUMNS} FROM foods ORDER BY rowid"))
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows.into_iter().map(Food::from).collect())
    }

    async fn get_food(&self, id: &str) -> Result<Option<Food>, RepoError> {
        let row: Option<DbFood> =
            sqlx::query_as(&format!("SELECT {FOOD_COLUMNS} FROM foods WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(Food::from))
    }

    async fn search_foods(&self, text: &str) -> Result<Vec<Food>, RepoError> {
        let escaped = text
            .trim()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let rows: Vec<DbFood> = sqlx::query_as(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods
             WHERE name LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\' OR tag LIKE ?1 ESCAPE '\\'
             ORDER BY rowid"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Food::from).collect())
    }
}

#[derive(FromRow)]
struct DbTaggedLine {
    transaction_id: String,
    food_id: String,
    tag: Option<String>,
}

#[async_trait]
impl PurchaseHistory for SqliteRepo {
    async fn tag_history(&self, customer_id: &str) -> Result<Vec<HistoricalOrder>, RepoError> {
        let rows: Vec<DbTaggedLine> = sqlx::query_as(
            "SELECT fo.transaction_id, fo.food_id, f.tag
             FROM foods_order fo
             JOIN transactions t ON t.id = fo.transaction_id
             LEFT JOIN foods f ON f.id = fo.food_id
             WHERE t.user_id = ?
             ORDER BY t.created_at DESC, fo.id",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut history: Vec<HistoricalOrder> = Vec::new();
        let mut current: Option<String> = None;
        for row in rows {
            if current.as_deref() != Some(row.transaction_id.as_str()) {
                history.push(HistoricalOrder::default());
                current = Some(row.transaction_id.clone());
            }
            if let Some(order) = history.last_mut() {
                order.lines.push(HistoricalLine {
                    food_id: row.food_id,
                    tags: row.tag.as_deref().map(parse_tags).unwrap_or_default(),
                });
            }
        }
        Ok(history)
    }
}

#[async_trait]
impl CartStorage for SqliteRepo {
    async fn load_cart(&self, session_key: &str) -> Result<Option<Vec<CartLine>>, RepoError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT lines_json FROM cart_sessions WHERE session_key = ?")
                .bind(session_key)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(|(json,)| serde_json::from_str(&json).map_err(db_err))
            .transpose()
    }

    async fn save_cart(&self, session_key: &str, lines: &[CartLine]) -> Result<(), RepoError> {
        let json = serde_json::to_string(lines).map_err(db_err)?;
        sqlx::query(
            "INSERT INTO cart_sessions (session_key, lines_json) VALUES (?, ?)
             ON CONFLICT(session_key) DO UPDATE SET lines_json = excluded.lines_json",
        )
        .bind(session_key)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn remove_cart(&self, session_key: &str) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM cart_sessions WHERE session_key = ?")
            .bind(session_key)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
