pub mod api;
pub mod buffer;
pub mod collect;
pub mod config;
pub mod drain;
pub mod event;
pub mod processors;
pub mod prometheus;
pub mod resolver;
pub mod router;
pub mod server;
pub mod store;
pub mod time;
