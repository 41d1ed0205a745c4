use crate::errors::AppError;
use storefront_types::domain::food::Food;
use storefront_types::domain::recommendation::{rank, rank_scored, ScoredFood, TagFrequency};
use storefront_types::ports::food_catalog::FoodCatalog;
use storefront_types::ports::purchase_history::PurchaseHistory;

/// Orders the catalog by how often its tags show up in a customer's past orders.
pub struct RecommendationService<R: PurchaseHistory + FoodCatalog> {
    repo: R,
}

impl<R: PurchaseHistory + FoodCatalog> RecommendationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn tag_frequency(&self, customer_id: &str) -> Result<TagFrequency, AppError> {
        let history = self.repo.tag_history(customer_id).await?;
        Ok(TagFrequency::from_history(&history))
    }

    /// The full catalog in display order for this customer.
    pub async fn recommend(&self, customer_id: &str) -> Result<Vec<Food>, AppError> {
        let freq = self.tag_frequency(customer_id).await?;
        let catalog = self.repo.list_foods().await?;
        Ok(rank(catalog, &freq))
    }

    pub async fn recommend_scored(&self, customer_id: &str) -> Result<Vec<ScoredFood>, AppError> {
        let freq = self.tag_frequency(customer_id).await?;
        let catalog = self.repo.list_foods().await?;
        tracing::debug!(customer_id, tags = ?freq, foods = catalog.len(), "ranking catalog");
        Ok(rank_scored(catalog, &freq))
    }
}
