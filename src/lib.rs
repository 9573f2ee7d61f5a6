pub mod classifier;
pub mod client;
pub mod controller;
pub mod environment;
pub mod error;
pub mod logging;
pub mod presenter;
pub mod render;
pub mod schema;
pub mod source;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_CONTROLLER: &str = "controller";
