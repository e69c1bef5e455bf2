//! HTTP handlers for the server.

pub mod pages;
pub mod ticket;
