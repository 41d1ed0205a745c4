use async_trait::async_trait;

use crate::domain::recommendation::HistoricalOrder;
use crate::ports::RepoError;

#[async_trait]
pub trait PurchaseHistory: Send + Sync + 'static {
    /// Every past order of the customer, each line carrying the current tags
    /// of the food it ordered.
    async fn tag_history(&self, customer_id: &str) -> Result<Vec<HistoricalOrder>, RepoError>;
}
