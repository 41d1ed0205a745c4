use async_trait::async_trait;

use crate::domain::cart::CartLine;
use crate::ports::RepoError;

/// Durable, session-scoped cart snapshots: one key holds the full ordered
/// list of lines.
#[async_trait]
pub trait CartStorage: Send + Sync + 'static {
    async fn load_cart(&self, session_key: &str) -> Result<Option<Vec<CartLine>>, RepoError>;
    async fn save_cart(&self, session_key: &str, lines: &[CartLine]) -> Result<(), RepoError>;
    async fn remove_cart(&self, session_key: &str) -> Result<(), RepoError>;
}
