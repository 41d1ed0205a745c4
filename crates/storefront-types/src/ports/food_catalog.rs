use async_trait::async_trait;

use crate::domain::food::Food;
use crate::ports::RepoError;

#[async_trait]
pub trait FoodCatalog: Send + Sync + 'static {
    async fn list_foods(&self) -> Result<Vec<Food>, RepoError>;
    async fn get_food(&self, id: &str) -> Result<Option<Food>, RepoError>;
    /// Case-insensitive substring search over name, description and tags.
    async fn search_foods(&self, text: &str) -> Result<Vec<Food>, RepoError>;
}
