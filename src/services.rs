pub mod auth;
pub mod customer_service;
pub mod reconcile;
