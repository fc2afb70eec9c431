//! modhost - plugin-orchestration core for a chat-bot host
//!
//! Modules are registered statically, resolved against each other's
//! dependencies, and contribute commands, gateway events, UI components,
//! cross-module actions and HTTP routers. Once the host is ready, inbound
//! interactions are routed to whichever module registered the matching
//! handler.
//!
//! ## Layout
//!
//! - [`module`]: discovery, dependency resolution, registries, lifecycle
//! - [`interaction`]: classification, context resolution and dispatch
//! - [`gateway`]: inbound events and outbound responses
//! - [`http`]: per-module routers behind one web server
//! - [`settings`]: the built-in settings module
//! - [`storage`]: settings persistence (memory or sled)
//! - [`config`], [`utils`]: configuration, logging, signals

pub mod config;
pub mod gateway;
pub mod http;
pub mod interaction;
pub mod module;
pub mod settings;
pub mod storage;
pub mod utils;

pub use config::HostConfig;
pub use module::{ModuleHost, ModuleManager};
