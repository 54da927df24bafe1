//! # Commands
//!
//! One module per resource. Every command takes the database (or the whole
//! [`AppContext`](crate::context::AppContext)) and typed input, and returns a
//! serializable result or an [`AppError`](crate::error::AppError).
//!
//! - [`client`] - Client CRUD
//! - [`transfer`] - Transfer CRUD and price quotes
//! - [`bill`] - Preview, create, update, status, delete
//! - [`export`] - CSV export of a stored bill

pub mod bill;
pub mod client;
pub mod export;
pub mod transfer;
