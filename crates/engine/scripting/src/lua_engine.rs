//! Lua scripting engine with bridge globals
//!
//! Provides a Lua VM wrapper with:
//! - `to_camel`, `markup`, `json_decode` and `json_get` script globals
//! - Property proxies installed once per bound type
//! - JSON documents exposed to scripts as `JsonDocument` userdata

use crate::json_path::JsonPath;
use crate::markup::markup_from_lua;
use crate::naming::to_camel;
use crate::proxy::{Binding, PropertyProxy, Proxied};
use crate::{BridgeConfig, Error, Result};
use mlua::prelude::*;
use std::path::Path;
use std::rc::Rc;

/// A decoded JSON document exposed to Lua
///
/// Scripts read values with `doc:get("a.b[1]")`; `tostring(doc)` gives the
/// compact JSON text.
#[derive(Debug, Clone)]
pub struct JsonDocument {
    root: Rc<serde_json::Value>,
}

impl JsonDocument {
    pub fn new(root: serde_json::Value) -> Self {
        Self {
            root: Rc::new(root),
        }
    }

    /// Decode a JSON document from text
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn root(&self) -> &serde_json::Value {
        &self.root
    }

    /// Resolve a path expression in this document
    pub fn get(&self, path: &str) -> Result<&serde_json::Value> {
        JsonPath::parse(path)?.resolve(&self.root)
    }
}

impl LuaUserData for JsonDocument {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("get", |lua, this, path: String| {
            let value = this.get(&path).map_err(Error::into_lua_err)?;
            json_to_lua(lua, value)
        });

        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(this.root.to_string())
        });
    }
}

/// Lua scripting engine
pub struct LuaEngine {
    lua: Lua,
    config: BridgeConfig,
}

impl LuaEngine {
    /// Create a new Lua engine with every bridge global registered
    pub fn new() -> Result<Self> {
        Self::with_config(BridgeConfig::default())
    }

    /// Create a new Lua engine registering the globals enabled in `config`
    pub fn with_config(config: BridgeConfig) -> Result<Self> {
        let lua = Lua::new();
        let globals = lua.globals();

        if config.globals.naming {
            let to_camel_fn = lua.create_function(|_, name: LuaString| {
                Ok(to_camel(&name.to_string_lossy()))
            })?;
            globals.set("to_camel", to_camel_fn)?;
        }

        if config.globals.markup {
            let markup_fn = lua.create_function(|lua, value: LuaValue| markup_from_lua(lua, value))?;
            globals.set("markup", markup_fn)?;
        }

        if config.globals.json {
            let json_decode_fn = lua.create_function(|_, text: String| {
                JsonDocument::parse(&text).map_err(Error::into_lua_err)
            })?;
            globals.set("json_decode", json_decode_fn)?;

            let json_get_fn = lua.create_function(|lua, (text, path): (String, String)| {
                let doc = JsonDocument::parse(&text).map_err(Error::into_lua_err)?;
                let value = doc.get(&path).map_err(Error::into_lua_err)?;
                json_to_lua(lua, value)
            })?;
            globals.set("json_get", json_get_fn)?;
        }

        tracing::debug!(
            "Created Lua engine (naming={}, markup={}, json={})",
            config.globals.naming,
            config.globals.markup,
            config.globals.json
        );

        Ok(Self { lua, config })
    }

    /// Get the underlying Lua state
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Install the proxy for a bound type.
    ///
    /// Verbatim names from the engine config are added to the proxy. A second
    /// install for the same binding type replaces the first; instances
    /// wrapped earlier keep the proxy they were created with.
    pub fn install_proxy<B: Binding>(&self, proxy: PropertyProxy<B>) -> Rc<PropertyProxy<B>> {
        let proxy = Rc::new(proxy.with_verbatim_names(self.config.verbatim_names.iter().cloned()));

        if self.lua.set_app_data(proxy.clone()).is_some() {
            tracing::debug!("Replaced proxy for {}", std::any::type_name::<B>());
        } else {
            tracing::debug!("Installed proxy for {}", std::any::type_name::<B>());
        }

        proxy
    }

    /// Wrap a native instance as proxied userdata
    pub fn wrap<B: Binding>(&self, instance: B::Instance) -> Result<LuaAnyUserData> {
        let proxy = self
            .lua
            .app_data_ref::<Rc<PropertyProxy<B>>>()
            .map(|p| Rc::clone(&*p))
            .ok_or(Error::ProxyNotInstalled(std::any::type_name::<B>()))?;

        Ok(self.lua.create_userdata(Proxied::new(proxy, instance))?)
    }

    /// Wrap a native instance and bind it to a global
    pub fn expose<B: Binding>(&self, name: &str, instance: B::Instance) -> Result<LuaAnyUserData> {
        let userdata = self.wrap::<B>(instance)?;
        self.lua.globals().set(name, userdata.clone())?;
        tracing::debug!("Exposed {} as {}", std::any::type_name::<B>(), name);
        Ok(userdata)
    }

    /// Bind a decoded JSON document to a global
    pub fn set_json(&self, name: &str, value: serde_json::Value) -> Result<()> {
        self.lua.globals().set(name, JsonDocument::new(value))?;
        tracing::debug!("Exposed JSON document as {}", name);
        Ok(())
    }

    /// Load and execute a Lua file
    pub fn exec_file(&self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Executing {}", path.display());
        self.lua.load(&content).set_name(path.display().to_string()).exec()?;
        Ok(())
    }

    /// Execute a Lua string
    pub fn exec_string(&self, code: &str) -> Result<()> {
        self.lua.load(code).exec()?;
        Ok(())
    }

    /// Evaluate a Lua chunk and convert its result
    pub fn eval<R: FromLuaMulti>(&self, code: &str) -> Result<R> {
        let result = self.lua.load(code).eval()?;
        Ok(result)
    }

    /// Evaluate a Lua file and render the tag tree it returns
    pub fn render_file(&self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Rendering {}", path.display());
        let value: LuaValue = self
            .lua
            .load(&content)
            .set_name(path.display().to_string())
            .eval()?;
        Ok(markup_from_lua(&self.lua, value)?)
    }

    /// Call a Lua function by name
    pub fn call_function<A, R>(&self, name: &str, args: A) -> Result<R>
    where
        A: IntoLuaMulti,
        R: FromLuaMulti,
    {
        let func: LuaFunction = self.lua.globals().get(name)?;
        let result = func.call(args)?;
        Ok(result)
    }

    /// Get a global value from Lua
    pub fn get_global<T: FromLua>(&self, name: &str) -> Result<T> {
        let value = self.lua.globals().get(name)?;
        Ok(value)
    }

    /// Set a global value in Lua
    pub fn set_global<T: IntoLua>(&self, name: &str, value: T) -> Result<()> {
        self.lua.globals().set(name, value)?;
        Ok(())
    }
}

impl Default for LuaEngine {
    fn default() -> Self {
        Self::new().expect("Failed to create default LuaEngine")
    }
}

/// Convert a JSON value to a Lua value
///
/// Objects become tables, arrays become sequences starting at 1, integral
/// numbers that fit in an i64 stay integers and null becomes nil.
pub fn json_to_lua(lua: &Lua, value: &serde_json::Value) -> LuaResult<LuaValue> {
    use serde_json::Value;

    match value {
        Value::Null => Ok(LuaValue::Nil),
        Value::Bool(b) => Ok(LuaValue::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(LuaValue::Integer(i)),
            None => Ok(LuaValue::Number(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => Ok(LuaValue::String(lua.create_string(s)?)),
        Value::Array(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for (i, item) in items.iter().enumerate() {
                table.raw_set(i + 1, json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
        Value::Object(map) => {
            let table = lua.create_table_with_capacity(0, map.len())?;
            for (key, item) in map {
                table.raw_set(key.as_str(), json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Window {
        title: String,
        width: i64,
        visible: bool,
    }

    struct WindowBinding;

    impl Binding for WindowBinding {
        type Instance = Window;

        fn get(&self, lua: &Lua, window: &Window, name: &str) -> LuaResult<LuaValue> {
            match name {
                "Title" => Ok(LuaValue::String(lua.create_string(&window.title)?)),
                "Width" => Ok(LuaValue::Integer(window.width)),
                "IsVisible" => Ok(LuaValue::Boolean(window.visible)),
                "Update" => Ok(LuaValue::Function(lua.create_function(
                    |_, this: LuaAnyUserData| {
                        let mut proxied = this.borrow_mut::<Proxied<WindowBinding>>()?;
                        proxied.instance_mut().width += 1;
                        Ok(())
                    },
                )?)),
                _ => Err(LuaError::RuntimeError(format!("Window has no member {}", name))),
            }
        }

        fn set(
            &self,
            _lua: &Lua,
            window: &mut Window,
            name: &str,
            value: LuaValue,
        ) -> LuaResult<()> {
            match (name, value) {
                ("Title", LuaValue::String(s)) => window.title = s.to_str()?.to_string(),
                ("Width", LuaValue::Integer(i)) => window.width = i,
                ("IsVisible", LuaValue::Boolean(b)) => window.visible = b,
                (name, value) => {
                    return Err(LuaError::RuntimeError(format!(
                        "cannot set Window.{} to {}",
                        name,
                        value.type_name()
                    )))
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_lua_engine_basic() {
        let engine = LuaEngine::new().unwrap();
        engine.exec_string("x = 42").unwrap();

        let x: i64 = engine.get_global("x").unwrap();
        assert_eq!(x, 42);
    }

    #[test]
    fn test_to_camel_global() {
        let engine = LuaEngine::new().unwrap();
        let name: String = engine.eval(r#"return to_camel("max_hit_points")"#).unwrap();
        assert_eq!(name, "MaxHitPoints");
    }

    #[test]
    fn test_markup_global() {
        let engine = LuaEngine::new().unwrap();
        let html: String = engine
            .eval(r#"return markup({ "div", [2] = { "span", [2] = "hi" } })"#)
            .unwrap();
        assert_eq!(html, "<div > <span > hi </span> </div>");

        let empty: String = engine.eval(r#"return markup("text")"#).unwrap();
        assert_eq!(empty, "");
    }

    #[test]
    fn test_markup_global_skips_non_nodes() {
        let engine = LuaEngine::new().unwrap();
        let empty: String = engine
            .eval(r#"return markup({ class = "no tag" })"#)
            .unwrap();
        assert_eq!(empty, "");

        let html: String = engine
            .eval(r#"return markup({ "div", [2] = print, [3] = { "b" } })"#)
            .unwrap();
        assert_eq!(html, "<div > <b >  </b> </div>");
    }

    #[test]
    fn test_to_camel_global_accepts_invalid_utf8() {
        let engine = LuaEngine::new().unwrap();
        let name: String = engine.eval(r#"return to_camel("ab_c\xff")"#).unwrap();
        assert_eq!(name, "AbC\u{FFFD}");
    }

    #[test]
    fn test_json_get_global() {
        let engine = LuaEngine::new().unwrap();
        let value: i64 = engine
            .eval(r#"return json_get('{"a":{"b":[10,20,30]}}', "a.b[1]")"#)
            .unwrap();
        assert_eq!(value, 20);
    }

    #[test]
    fn test_json_get_failure_aborts_script() {
        let engine = LuaEngine::new().unwrap();
        let err = engine
            .exec_string(
                r#"
                reached = false
                json_get('{"a":[1,2]}', "a[5]")
                reached = true
            "#,
            )
            .unwrap_err();
        assert!(err.to_string().contains("out of range"), "{}", err);

        let reached: bool = engine.get_global("reached").unwrap();
        assert!(!reached);
    }

    #[test]
    fn test_json_decode_errors() {
        let engine = LuaEngine::new().unwrap();
        let err = engine.exec_string(r#"json_decode("{not json")"#).unwrap_err();
        assert!(err.to_string().contains("JSON error"), "{}", err);
    }

    #[test]
    fn test_json_document_userdata() {
        let engine = LuaEngine::new().unwrap();
        engine
            .exec_string(
                r#"
                doc = json_decode('{"user":{"name":"ada","tags":["x","y"],"score":1.5,"nick":null}}')
                name = doc:get("user.name")
                tag = doc:get("user.tags[1]")
                count = #doc:get("user.tags")
                score = doc:get("user.score")
                nick_is_nil = doc:get("user.nick") == nil
                text = tostring(doc)
            "#,
            )
            .unwrap();

        assert_eq!(engine.get_global::<String>("name").unwrap(), "ada");
        assert_eq!(engine.get_global::<String>("tag").unwrap(), "y");
        assert_eq!(engine.get_global::<i64>("count").unwrap(), 2);
        assert_eq!(engine.get_global::<f64>("score").unwrap(), 1.5);
        assert!(engine.get_global::<bool>("nick_is_nil").unwrap());
        assert!(engine.get_global::<String>("text").unwrap().contains("\"ada\""));
    }

    #[test]
    fn test_set_json_exposes_document() {
        let engine = LuaEngine::new().unwrap();
        engine
            .set_json("payload", json!({"items": [{"id": 3}, {"id": 4}]}))
            .unwrap();

        let id: i64 = engine.eval(r#"return payload:get("items[1].id")"#).unwrap();
        assert_eq!(id, 4);
    }

    #[test]
    fn test_globals_follow_config() {
        let mut config = BridgeConfig::default();
        config.globals.json = false;
        config.globals.markup = false;
        let engine = LuaEngine::with_config(config).unwrap();

        let present: bool = engine
            .eval("return to_camel ~= nil and markup == nil and json_get == nil")
            .unwrap();
        assert!(present);
    }

    #[test]
    fn test_proxy_install_and_expose() {
        let engine = LuaEngine::new().unwrap();
        engine.install_proxy(PropertyProxy::new(WindowBinding));
        let ud = engine
            .expose::<WindowBinding>(
                "window",
                Window {
                    title: "main".to_string(),
                    width: 640,
                    visible: false,
                },
            )
            .unwrap();

        engine
            .exec_string(
                r#"
                window.title = window.title .. "-view"
                window.width = window.width * 2
                window.is_visible = true
            "#,
            )
            .unwrap();

        let proxied = ud.borrow::<Proxied<WindowBinding>>().unwrap();
        assert_eq!(proxied.instance().title, "main-view");
        assert_eq!(proxied.instance().width, 1280);
        assert!(proxied.instance().visible);
    }

    #[test]
    fn test_wrap_without_install_fails() {
        let engine = LuaEngine::new().unwrap();
        match engine.wrap::<WindowBinding>(Window::default()) {
            Err(Error::ProxyNotInstalled(name)) => assert!(name.contains("WindowBinding")),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("wrap should fail without an installed proxy"),
        }
    }

    #[test]
    fn test_reinstall_is_idempotent() {
        let engine = LuaEngine::new().unwrap();
        engine.install_proxy(PropertyProxy::new(WindowBinding));
        engine.install_proxy(PropertyProxy::new(WindowBinding));

        engine.expose::<WindowBinding>("w", Window::default()).unwrap();
        engine.exec_string("w.width = 3").unwrap();
        let width: i64 = engine.eval("return w.width").unwrap();
        assert_eq!(width, 3);
    }

    #[test]
    fn test_config_verbatim_names_apply_to_proxies() {
        let config = BridgeConfig {
            verbatim_names: vec!["Update".to_string()],
            ..Default::default()
        };
        let engine = LuaEngine::with_config(config).unwrap();
        engine.install_proxy(PropertyProxy::new(WindowBinding));
        let ud = engine
            .expose::<WindowBinding>("window", Window::default())
            .unwrap();

        // "Update" reaches the binding as-is, "update" is translated to it too
        engine.exec_string("window:Update(); window:update()").unwrap();
        assert_eq!(
            ud.borrow::<Proxied<WindowBinding>>().unwrap().instance().width,
            2
        );
    }

    #[test]
    fn test_binding_error_reaches_script() {
        let engine = LuaEngine::new().unwrap();
        engine.install_proxy(PropertyProxy::new(WindowBinding));
        engine.expose::<WindowBinding>("window", Window::default()).unwrap();

        let ok: bool = engine
            .eval(r#"local ok, err = pcall(function() window.width = "wide" end); return not ok and string.find(tostring(err), "cannot set Window.Width to string") ~= nil"#)
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_exec_and_render_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("init.lua");
        std::fs::write(&script, "greeting = to_camel('hello_world')").unwrap();
        let page = dir.path().join("page.lua");
        std::fs::write(&page, r#"return { "p", id = "x", [2] = greeting }"#).unwrap();

        let engine = LuaEngine::new().unwrap();
        engine.exec_file(&script).unwrap();
        let html = engine.render_file(&page).unwrap();
        assert_eq!(html, "<p  id=\"x\" > HelloWorld </p>");
    }

    #[test]
    fn test_call_function() {
        let engine = LuaEngine::new().unwrap();
        engine
            .exec_string("function double(x) return x * 2 end")
            .unwrap();
        let result: i64 = engine.call_function("double", 21).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn test_json_to_lua_shapes() {
        let lua = Lua::new();
        let value = json_to_lua(&lua, &json!({"n": 7, "f": 0.5, "list": [true, null, "s"]})).unwrap();
        let table = match value {
            LuaValue::Table(t) => t,
            other => panic!("expected table, got {:?}", other),
        };
        assert_eq!(table.get::<i64>("n").unwrap(), 7);
        assert_eq!(table.get::<f64>("f").unwrap(), 0.5);
        let list: LuaTable = table.get("list").unwrap();
        assert!(list.get::<bool>(1).unwrap());
        assert_eq!(list.get::<LuaValue>(2).unwrap(), LuaValue::Nil);
        assert_eq!(list.get::<String>(3).unwrap(), "s");
    }
}
