//! Property proxies for native objects exposed to Lua
//!
//! Native objects use CamelCase member names while scripts use snake_case.
//! A [`PropertyProxy`] sits between the two: every `obj.some_field` read or
//! `obj.some_field = v` write from Lua is translated to `SomeField` before it
//! reaches the object's [`Binding`].
//!
//! A proxy can also carry a method hook, consulted before translation on
//! reads, and a set of verbatim names that are forwarded untranslated.
//!
//! # Example
//!
//! ```rust,ignore
//! struct PlayerBinding;
//!
//! impl Binding for PlayerBinding {
//!     type Instance = Player;
//!
//!     fn get(&self, lua: &Lua, player: &Player, name: &str) -> LuaResult<LuaValue> {
//!         match name {
//!             "Health" => Ok(LuaValue::Integer(player.health)),
//!             _ => Err(LuaError::RuntimeError(format!("no field {}", name))),
//!         }
//!     }
//!     // ...
//! }
//!
//! engine.install_proxy(PropertyProxy::new(PlayerBinding))?;
//! engine.expose("player", Player::default())?;
//! engine.exec_string("player.health = player.health - 1")?;
//! ```

use crate::naming::to_camel;
use mlua::prelude::*;
use std::borrow::Cow;
use std::collections::HashSet;
use std::rc::Rc;

/// Native get/set entry points for one bound type
///
/// Errors returned here reach the script unchanged.
pub trait Binding: 'static {
    /// The native object type this binding reads and writes
    type Instance: 'static;

    /// Read the member `name` (already translated to the native convention)
    fn get(&self, lua: &Lua, instance: &Self::Instance, name: &str) -> LuaResult<LuaValue>;

    /// Write the member `name` (already translated to the native convention)
    fn set(
        &self,
        lua: &Lua,
        instance: &mut Self::Instance,
        name: &str,
        value: LuaValue,
    ) -> LuaResult<()>;
}

/// Hook consulted on reads before name translation.
///
/// Returning `Some(value)` claims the access and `value` is handed to the
/// script as-is; `None` falls through to the binding.
pub type MethodHook = Box<dyn Fn(&Lua, &str) -> LuaResult<Option<LuaValue>>>;

/// Name-translating access layer over a [`Binding`]
pub struct PropertyProxy<B: Binding> {
    binding: B,
    method_hook: Option<MethodHook>,
    verbatim: HashSet<String>,
}

impl<B: Binding> PropertyProxy<B> {
    /// Create a proxy with no hook and no verbatim names
    pub fn new(binding: B) -> Self {
        Self {
            binding,
            method_hook: None,
            verbatim: HashSet::new(),
        }
    }

    /// Set the method hook, replacing any previous one
    pub fn with_method_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Lua, &str) -> LuaResult<Option<LuaValue>> + 'static,
    {
        self.method_hook = Some(Box::new(hook));
        self
    }

    /// Add names that are forwarded to the binding without translation
    pub fn with_verbatim_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verbatim.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    /// Native name for a script-side key
    pub fn native_name<'k>(&self, key: &'k str) -> Cow<'k, str> {
        if self.verbatim.contains(key) {
            Cow::Borrowed(key)
        } else {
            Cow::Owned(to_camel(key))
        }
    }

    /// Script-side read of `key`
    pub fn get(&self, lua: &Lua, instance: &B::Instance, key: &str) -> LuaResult<LuaValue> {
        if let Some(hook) = &self.method_hook {
            if let Some(value) = hook(lua, key)? {
                tracing::trace!("Method hook handled {}", key);
                return Ok(value);
            }
        }

        let name = self.native_name(key);
        tracing::trace!("Proxy get {} -> {}", key, name);
        self.binding.get(lua, instance, &name)
    }

    /// Script-side write of `key`
    pub fn set(
        &self,
        lua: &Lua,
        instance: &mut B::Instance,
        key: &str,
        value: LuaValue,
    ) -> LuaResult<()> {
        let name = self.native_name(key);
        tracing::trace!("Proxy set {} -> {}", key, name);
        self.binding.set(lua, instance, &name, value)
    }
}

/// A native instance paired with the proxy of its type, exposed to Lua as
/// userdata with `__index` and `__newindex` routed through the proxy
pub struct Proxied<B: Binding> {
    proxy: Rc<PropertyProxy<B>>,
    instance: B::Instance,
}

impl<B: Binding> Proxied<B> {
    pub fn new(proxy: Rc<PropertyProxy<B>>, instance: B::Instance) -> Self {
        Self { proxy, instance }
    }

    pub fn instance(&self) -> &B::Instance {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut B::Instance {
        &mut self.instance
    }

    pub fn into_instance(self) -> B::Instance {
        self.instance
    }
}

impl<B: Binding> LuaUserData for Proxied<B> {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::Index, |lua, this, key: String| {
            this.proxy.get(lua, &this.instance, &key)
        });

        methods.add_meta_method_mut(
            LuaMetaMethod::NewIndex,
            |lua, this, (key, value): (String, LuaValue)| {
                let Proxied { proxy, instance } = this;
                proxy.set(lua, instance, &key, value)
            },
        );
    }
}
