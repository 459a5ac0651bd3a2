//! Tag tree to markup serialization
//!
//! A tag tree is an [`Element`] with a tag name, attributes and children,
//! where every child is either text or another element. Scripts build the
//! same structure as plain tables:
//!
//! ```lua
//! page = { "div", class = "card",
//!     [2] = { "h1", [2] = "Title" },
//!     [3] = "body text",
//! }
//! ```
//!
//! Slot `[1]` holds the tag name, non-positional keys are attributes and the
//! remaining non-negative integer keys are children in ascending order.
//!
//! # Output
//!
//! Serialization emits the fragments `<tag`, one ` name="value"` per
//! attribute, `>`, the children (joined by a single space) and `</tag>`, and
//! joins those fragments with a single space. An empty `div` is therefore
//! `<div >  </div>`. Attribute values and text are emitted verbatim, without
//! escaping.

use mlua::prelude::*;

/// A node in a tag tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted as-is
    Text(String),
    /// Nested element
    Element(Element),
}

impl Node {
    /// Serialize this node. Text at the top level produces no markup.
    pub fn to_markup(&self) -> String {
        match self {
            Node::Text(_) => String::new(),
            Node::Element(element) => element.to_markup(),
        }
    }

    fn write_child(&self) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Element(element) => element.to_markup(),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

/// One entry of an element, discriminated when the element is built
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Attribute { name: String, value: String },
    Text(String),
    Child(Element),
}

/// An element of a tag tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Create an element from a sequence of entries, keeping their order
    pub fn from_entries(tag: impl Into<String>, entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut element = Self::new(tag);
        for entry in entries {
            element.push(entry);
        }
        element
    }

    /// Builder: append an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: append a text child
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Builder: append an element child
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Append an entry
    pub fn push(&mut self, entry: Entry) {
        match entry {
            Entry::Attribute { name, value } => self.attributes.push((name, value)),
            Entry::Text(text) => self.children.push(Node::Text(text)),
            Entry::Child(child) => self.children.push(Node::Element(child)),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Serialize this element and its subtree
    pub fn to_markup(&self) -> String {
        let mut fragments = Vec::with_capacity(self.attributes.len() + 4);

        fragments.push(format!("<{}", self.tag));
        for (name, value) in &self.attributes {
            fragments.push(format!(" {}=\"{}\"", name, value));
        }
        fragments.push(">".to_string());

        let body: Vec<String> = self.children.iter().map(Node::write_child).collect();
        fragments.push(body.join(" "));

        fragments.push(format!("</{}>", self.tag));
        fragments.join(" ")
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_markup())
    }
}

/// Serialize a tag tree. Non-element input produces an empty string.
pub fn serialize(node: &Node) -> String {
    node.to_markup()
}

// Lua conversion

/// Key of a tag table entry
enum TableKey {
    /// Non-negative integer slot
    Position(i64),
    /// Anything else, rendered as an attribute name
    Name(String),
}

fn classify_key(lua: &Lua, key: &LuaValue) -> LuaResult<TableKey> {
    match key {
        LuaValue::Integer(i) if *i >= 0 => Ok(TableKey::Position(*i)),
        other => Ok(TableKey::Name(lua_text(lua, other)?)),
    }
}

/// Lua `tostring` form of a value. Invalid UTF-8 is replaced, not rejected.
fn lua_text(lua: &Lua, value: &LuaValue) -> LuaResult<String> {
    match value {
        LuaValue::String(s) => Ok(s.to_string_lossy()),
        other => {
            let tostring: LuaFunction = lua.globals().get("tostring")?;
            let text: LuaString = tostring.call(other.clone())?;
            Ok(text.to_string_lossy())
        }
    }
}

/// Text of a child slot, `None` for values that emit nothing
fn child_text(lua: &Lua, value: &LuaValue) -> LuaResult<Option<String>> {
    match value {
        LuaValue::String(_) | LuaValue::Integer(_) | LuaValue::Number(_) | LuaValue::Boolean(_) => {
            lua_text(lua, value).map(Some)
        }
        _ => Ok(None),
    }
}

/// Tag name in slot `[1]`, `None` if the table is not a tag node
fn tag_name(table: &LuaTable) -> LuaResult<Option<String>> {
    match table.raw_get::<LuaValue>(1)? {
        LuaValue::String(s) => Ok(Some(s.to_string_lossy())),
        _ => Ok(None),
    }
}

fn conversion_error(value: &LuaValue, message: String) -> LuaError {
    LuaError::FromLuaConversionError {
        from: value.type_name(),
        to: "Element".to_string(),
        message: Some(message),
    }
}

impl FromLua for Element {
    fn from_lua(value: LuaValue, lua: &Lua) -> LuaResult<Self> {
        let table = match value {
            LuaValue::Table(table) => table,
            other => {
                return Err(conversion_error(
                    &other,
                    "tag node must be a table".to_string(),
                ))
            }
        };

        let Some(tag) = tag_name(&table)? else {
            return Err(conversion_error(
                &table.raw_get::<LuaValue>(1)?,
                "slot [1] must hold the tag name".to_string(),
            ));
        };

        let mut element = Element::new(tag);
        let mut positional = Vec::new();

        for pair in table.pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            match classify_key(lua, &key)? {
                TableKey::Position(1) => {}
                TableKey::Position(slot) => positional.push((slot, value)),
                TableKey::Name(name) => {
                    let value = lua_text(lua, &value)?;
                    element.push(Entry::Attribute { name, value });
                }
            }
        }

        // Tables without a tag name, functions and userdata emit nothing
        positional.sort_by_key(|(slot, _)| *slot);
        for (_, value) in positional {
            match value {
                LuaValue::Table(child) => {
                    if tag_name(&child)?.is_some() {
                        let child = Element::from_lua(LuaValue::Table(child), lua)?;
                        element.push(Entry::Child(child));
                    }
                }
                other => {
                    if let Some(text) = child_text(lua, &other)? {
                        element.push(Entry::Text(text));
                    }
                }
            }
        }

        Ok(element)
    }
}

impl FromLua for Node {
    fn from_lua(value: LuaValue, lua: &Lua) -> LuaResult<Self> {
        match value {
            LuaValue::Table(_) => Ok(Node::Element(Element::from_lua(value, lua)?)),
            other => match child_text(lua, &other)? {
                Some(text) => Ok(Node::Text(text)),
                None => Err(conversion_error(
                    &other,
                    "expected a tag table or text".to_string(),
                )),
            },
        }
    }
}

/// Serialize any Lua value. Anything but a tag table produces an empty string.
pub fn markup_from_lua(lua: &Lua, value: LuaValue) -> LuaResult<String> {
    let LuaValue::Table(table) = value else {
        return Ok(String::new());
    };
    if tag_name(&table)?.is_none() {
        return Ok(String::new());
    }
    Ok(Element::from_lua(LuaValue::Table(table), lua)?.to_markup())
}
