//! Client core for the Million luxury listings site: typed access to the
//! listings REST backend, per-page state holders, local favorites and token
//! storage, and image upload validation.

pub mod api;
pub mod auth;
pub mod config;
pub mod favorites;
pub mod filter;
pub mod fixtures;
pub mod models;
pub mod state;
pub mod storage;
pub mod upload;
