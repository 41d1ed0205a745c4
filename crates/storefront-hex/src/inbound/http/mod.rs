mod server;

pub use server::{HttpServer, HttpServerConfig, StorefrontRepo, ADMIN_AUTH_HEADER, CUSTOMER_HEADER, SESSION_HEADER};
