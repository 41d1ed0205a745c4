pub mod auth;
pub mod cart_store;
pub mod order_service;
pub mod recommendation_service;
