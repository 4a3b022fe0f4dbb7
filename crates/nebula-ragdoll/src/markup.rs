//! Backing markup for ragdoll documents.
//!
//! [`Element`] is an owned XML tree used for parsing, writing and detached
//! copies (checkpoints, variant files). [`Markup`] flattens one tree into an
//! index arena so nodes can bind to elements by [`ElementId`] and a whole
//! document can be deep-copied with a plain `clone()`.
//!
//! Element and attribute names match ASCII case-insensitively.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while reading or writing markup.
#[derive(Debug, Error)]
pub enum MarkupError {
    /// The XML reader rejected the input.
    #[error("malformed xml at byte {position}: {source}")]
    Xml {
        /// Byte offset the reader had reached.
        position: u64,
        /// Underlying reader error.
        #[source]
        source: quick_xml::Error,
    },

    /// An attribute could not be decoded.
    #[error("malformed attribute at byte {position}: {message}")]
    Attribute {
        /// Byte offset the reader had reached.
        position: u64,
        /// Reader diagnostic.
        message: String,
    },

    /// An element was opened but never closed.
    #[error("unclosed element <{0}>")]
    Unclosed(String),

    /// The input holds no element at all.
    #[error("document has no root element")]
    NoRoot,

    /// The writer failed.
    #[error("failed to write markup: {0}")]
    Write(String),
}

// ---------------------------------------------------------------------------
// Owned tree
// ---------------------------------------------------------------------------

/// A single `name="value"` pair. Order within an element is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name as it appears in the file.
    pub name: String,
    /// Unescaped attribute value.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One item inside an element body.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Nested element.
    Element(Element),
    /// Character data.
    Text(String),
    /// `<!-- comment -->`, kept so hand-written notes survive a save.
    Comment(String),
}

/// An owned XML element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
    /// Body items in document order.
    pub content: Vec<Content>,
}

impl Element {
    /// Creates an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            content: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style child append.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.content.push(Content::Element(child));
        self
    }

    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.attributes, name)
    }

    /// Sets an attribute, replacing an existing one with the same name.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        set_attribute_in(&mut self.attributes, name, value.into());
    }

    /// Returns `true` if the tag name matches `name` ignoring ASCII case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Iterates over child elements, skipping text and comments.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.content.iter().filter_map(|item| match item {
            Content::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given name.
    pub fn first_child_named(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.is_named(name))
    }

    /// Unwraps an `<override>` wrapper to the element it overrides.
    pub fn without_override(&self) -> &Element {
        if self.is_named("override") {
            self.child_elements().next().unwrap_or(self)
        } else {
            self
        }
    }

    /// Parses a markup document and returns its root element.
    ///
    /// A leading byte-order mark, declaration, doctype and processing
    /// instructions are skipped. Whitespace-only text is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`MarkupError`] for malformed input or when no element exists.
    pub fn parse(text: &str) -> Result<Self, MarkupError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(source) => {
                    return Err(MarkupError::Xml {
                        position: reader.buffer_position() as u64,
                        source,
                    });
                }
            };
            let position = reader.buffer_position() as u64;
            match event {
                Event::Start(start) => stack.push(element_from_start(&start, position)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start, position)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|source| MarkupError::Xml { position, source })?;
                    if let Some(parent) = stack.last_mut() {
                        parent.content.push(Content::Text(text.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&data).into_owned();
                        parent.content.push(Content::Text(text));
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&comment).into_owned();
                        parent.content.push(Content::Comment(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(MarkupError::Unclosed(open.name));
        }
        root.ok_or(MarkupError::NoRoot)
    }

    /// Writes the element as text.
    ///
    /// Output is deterministic: no declaration, `indent` spaces per level,
    /// attributes kept on the element line, trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`MarkupError::Write`] if the writer fails.
    pub fn to_xml_string(&self, indent: usize) -> Result<String, MarkupError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', indent);
        write_element(&mut writer, self)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn element_from_start(start: &BytesStart<'_>, position: u64) -> Result<Element, MarkupError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MarkupError::Attribute {
            position,
            message: e.to_string(),
        })?;
        let value = attr
            .unescape_value()
            .map_err(|source| MarkupError::Xml { position, source })?;
        element.attributes.push(Attribute::new(
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.content.push(Content::Element(element));
    } else if root.is_none() {
        *root = Some(element);
    }
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &Element,
) -> Result<(), MarkupError> {
    let mut start = BytesStart::new(element.name.as_str());
    for attr in &element.attributes {
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }

    if element.content.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| MarkupError::Write(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| MarkupError::Write(e.to_string()))?;
    for item in &element.content {
        match item {
            Content::Element(child) => write_element(writer, child)?,
            Content::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| MarkupError::Write(e.to_string()))?,
            Content::Comment(text) => writer
                .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
                .map_err(|e| MarkupError::Write(e.to_string()))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| MarkupError::Write(e.to_string()))
}

/// Case-insensitive lookup in an attribute list.
pub fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
        .map(|a| a.value.as_str())
}

/// Replaces the value of a case-insensitively matching attribute in place,
/// or appends a new one.
pub fn set_attribute_in(attributes: &mut Vec<Attribute>, name: &str, value: String) {
    match attributes
        .iter_mut()
        .find(|a| a.name.eq_ignore_ascii_case(name))
    {
        Some(existing) => existing.value = value,
        None => attributes.push(Attribute::new(name, value)),
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Stable index of an element inside a [`Markup`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u32);

#[derive(Debug, Clone)]
enum Item {
    Element(ElementId),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    attributes: Vec<Attribute>,
    content: Vec<Item>,
    parent: Option<ElementId>,
}

/// Live markup of one document, stored as an arena.
///
/// Detached elements keep their slot so ids held elsewhere stay valid;
/// they simply stop being reachable from the root. [`Markup::compact`]
/// reclaims them.
///
/// Lookups with an id from another arena return nothing rather than
/// panicking. Inserting under such an id panics.
#[derive(Debug, Clone)]
pub struct Markup {
    slots: Vec<Slot>,
    root: ElementId,
}

impl Markup {
    /// Flattens an owned tree into a new arena.
    pub fn new(root: Element) -> Self {
        let mut markup = Self {
            slots: Vec::new(),
            root: ElementId(0),
        };
        markup.root = markup.insert(root, None);
        markup
    }

    fn insert(&mut self, element: Element, parent: Option<ElementId>) -> ElementId {
        let id = ElementId(self.slots.len() as u32);
        self.slots.push(Slot {
            name: element.name,
            attributes: element.attributes,
            content: Vec::new(),
            parent,
        });
        let content = self.insert_content(id, element.content);
        self.slots[id.0 as usize].content = content;
        id
    }

    fn insert_content(&mut self, parent: ElementId, content: Vec<Content>) -> Vec<Item> {
        content
            .into_iter()
            .map(|item| match item {
                Content::Element(child) => Item::Element(self.insert(child, Some(parent))),
                Content::Text(text) => Item::Text(text),
                Content::Comment(text) => Item::Comment(text),
            })
            .collect()
    }

    fn slot(&self, id: ElementId) -> Option<&Slot> {
        self.slots.get(id.0 as usize)
    }

    fn slot_mut(&mut self, id: ElementId) -> Option<&mut Slot> {
        self.slots.get_mut(id.0 as usize)
    }

    /// The root element.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Allocated element slots, detached ones included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Tag name of an element.
    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.slot(id).map(|slot| slot.name.as_str())
    }

    /// Attributes of an element in document order. Empty for unknown ids.
    pub fn attributes(&self, id: ElementId) -> &[Attribute] {
        self.slot(id)
            .map(|slot| slot.attributes.as_slice())
            .unwrap_or_default()
    }

    /// Mutable attribute list of an element.
    pub fn attributes_mut(&mut self, id: ElementId) -> Option<&mut Vec<Attribute>> {
        self.slot_mut(id).map(|slot| &mut slot.attributes)
    }

    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        find_attribute(self.attributes(id), name)
    }

    /// Sets one attribute on an element. Returns `false` for unknown ids.
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: impl Into<String>) -> bool {
        match self.attributes_mut(id) {
            Some(attributes) => {
                set_attribute_in(attributes, name, value.into());
                true
            }
            None => false,
        }
    }

    /// Child elements of `id` in document order.
    pub fn child_elements(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.slot(id)
            .into_iter()
            .flat_map(|slot| slot.content.iter())
            .filter_map(|item| match item {
                Item::Element(child) => Some(*child),
                _ => None,
            })
    }

    /// Child elements of `id` whose name matches `name`.
    pub fn children_named<'a>(
        &'a self,
        id: ElementId,
        name: &'a str,
    ) -> impl Iterator<Item = ElementId> + 'a {
        self.child_elements(id)
            .filter(move |child| self.name(*child).is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// First child element of `id` whose name matches `name`.
    pub fn first_child_named(&self, id: ElementId, name: &str) -> Option<ElementId> {
        self.children_named(id, name).next()
    }

    /// Appends an owned element as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this arena.
    pub fn append(&mut self, parent: ElementId, element: Element) -> ElementId {
        let id = self.insert(element, Some(parent));
        self.slots[parent.0 as usize].content.push(Item::Element(id));
        id
    }

    /// Inserts an owned element at `index` among the body items of `parent`.
    /// Indices past the end append.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this arena.
    pub fn insert_at(&mut self, parent: ElementId, index: usize, element: Element) -> ElementId {
        let id = self.insert(element, Some(parent));
        let content = &mut self.slots[parent.0 as usize].content;
        content.insert(index.min(content.len()), Item::Element(id));
        id
    }

    /// Overwrites the name, attributes and body of `id` with `element`,
    /// keeping its place among its siblings. Returns `false` for unknown ids.
    pub fn replace(&mut self, id: ElementId, element: Element) -> bool {
        if self.slot(id).is_none() {
            return false;
        }
        let old: Vec<ElementId> = self.child_elements(id).collect();
        for child in old {
            if let Some(slot) = self.slot_mut(child) {
                slot.parent = None;
            }
        }
        let content = self.insert_content(id, element.content);
        if let Some(slot) = self.slot_mut(id) {
            slot.name = element.name;
            slot.attributes = element.attributes;
            slot.content = content;
        }
        true
    }

    /// Parent of `id` and its index among the parent's body items.
    pub fn position_of(&self, id: ElementId) -> Option<(ElementId, usize)> {
        let parent = self.slot(id)?.parent?;
        self.slot(parent)?
            .content
            .iter()
            .position(|item| matches!(item, Item::Element(child) if *child == id))
            .map(|index| (parent, index))
    }

    /// Detaches an element from its parent. Returns `false` if it was not
    /// attached (already detached, or the root).
    pub fn detach(&mut self, id: ElementId) -> bool {
        let Some((parent, index)) = self.position_of(id) else {
            return false;
        };
        if let Some(slot) = self.slot_mut(parent) {
            slot.content.remove(index);
        }
        if let Some(slot) = self.slot_mut(id) {
            slot.parent = None;
        }
        true
    }

    /// Returns `true` if `id` is reachable from the root.
    pub fn is_attached(&self, id: ElementId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.slot(current).and_then(|slot| slot.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Rebuilds an owned copy of the subtree rooted at `id`. Unknown ids
    /// give an empty, unnamed element.
    pub fn to_element(&self, id: ElementId) -> Element {
        let Some(slot) = self.slot(id) else {
            return Element::default();
        };
        Element {
            name: slot.name.clone(),
            attributes: slot.attributes.clone(),
            content: slot
                .content
                .iter()
                .map(|item| match item {
                    Item::Element(child) => Content::Element(self.to_element(*child)),
                    Item::Text(text) => Content::Text(text.clone()),
                    Item::Comment(text) => Content::Comment(text.clone()),
                })
                .collect(),
        }
    }

    /// Drops every slot no longer reachable from the root and renumbers the
    /// rest in document order. Returns the new id of each old id, indexed
    /// by the old id; detached elements map to `None`.
    pub fn compact(&mut self) -> Vec<Option<ElementId>> {
        let mut remap = vec![None; self.slots.len()];
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            remap[id.0 as usize] = Some(ElementId(order.len() as u32));
            order.push(id);
            let children: Vec<ElementId> = self.child_elements(id).collect();
            stack.extend(children.into_iter().rev());
        }

        let mut old = std::mem::take(&mut self.slots);
        let moved = |id: ElementId| remap[id.0 as usize];
        self.slots = order
            .iter()
            .map(|&id| {
                let mut slot = std::mem::replace(
                    &mut old[id.0 as usize],
                    Slot {
                        name: String::new(),
                        attributes: Vec::new(),
                        content: Vec::new(),
                        parent: None,
                    },
                );
                slot.parent = slot.parent.and_then(moved);
                for item in &mut slot.content {
                    if let Item::Element(child) = item
                        && let Some(new) = moved(*child)
                    {
                        *child = new;
                    }
                }
                slot
            })
            .collect();
        self.root = ElementId(0);
        remap
    }

    /// New id of `id` in a remap table returned by [`Markup::compact`].
    pub fn remapped(remap: &[Option<ElementId>], id: ElementId) -> Option<ElementId> {
        remap.get(id.0 as usize).copied().flatten()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
