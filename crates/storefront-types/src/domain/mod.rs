pub mod cart;
pub mod food;
pub mod order;
pub mod recommendation;
pub mod status;
