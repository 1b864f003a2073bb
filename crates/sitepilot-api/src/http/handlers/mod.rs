//! HTTP request handlers.

pub mod site;
pub mod turn;
