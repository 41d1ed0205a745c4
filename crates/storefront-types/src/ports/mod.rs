pub mod cart_storage;
pub mod food_catalog;
pub mod order_repository;
pub mod purchase_history;

pub use order_repository::RepoError;
