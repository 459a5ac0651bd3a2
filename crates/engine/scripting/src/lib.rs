//! Script bridge between native objects and embedded Lua
//!
//! This crate provides:
//! - **Naming**: snake_case to CamelCase translation for script-visible names
//! - **Property proxies**: Lua userdata that routes `obj.field` reads and
//!   writes through a [`Binding`] with translated names
//! - **Markup**: serialization of tag trees (Rust [`Element`]s or Lua tables)
//! - **JSON paths**: `a.b[2].c` lookups in decoded JSON documents
//! - **Lua Engine**: Lua VM wrapper registering all of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use script_bridge::{BridgeConfig, LuaEngine, PropertyProxy};
//!
//! let config = BridgeConfig::from_file("config/bridge.kdl")?;
//! let engine = LuaEngine::with_config(config)?;
//!
//! // Native objects are reachable from scripts with snake_case names
//! engine.install_proxy(PropertyProxy::new(PlayerBinding));
//! engine.expose::<PlayerBinding>("player", player)?;
//!
//! // Decoded payloads are readable by path
//! engine.set_json("payload", serde_json::from_slice(&bytes)?)?;
//! engine.exec_file(Path::new("scripts/init.lua"))?;
//! ```

mod config;
mod error;
pub mod json_path;
mod lua_engine;
pub mod markup;
pub mod naming;
pub mod proxy;

pub use config::{BridgeConfig, GlobalsConfig};
pub use error::{Error, PathFault, Result};
pub use json_path::{resolve, JsonPath};
pub use lua_engine::{json_to_lua, JsonDocument, LuaEngine};
pub use markup::{serialize, Element, Entry, Node};
pub use naming::to_camel;
pub use proxy::{Binding, MethodHook, PropertyProxy, Proxied};

// Re-export mlua for downstream crates
pub use mlua;
