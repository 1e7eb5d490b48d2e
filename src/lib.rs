pub mod auth;
pub mod cli;
mod constants;
pub mod error;
mod logging;
pub mod multipart;
pub mod server;
pub mod session;
pub mod storage;
pub mod web;

#[cfg(test)]
mod tests;
