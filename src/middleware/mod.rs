pub mod auth;
pub mod jwt;
pub mod request_id;
