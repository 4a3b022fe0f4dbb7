//! Parameter nodes and the arena that owns them.
//!
//! Every node is bound to one element of the document's [`Markup`] and keeps
//! a detached checkpoint copy of it. Child nodes follow the fixed slot table
//! of their parent's [`NodeKind`], so a tree can only ever contain the shapes
//! the file format allows.

use std::path::Path;

use crate::error::RagdollError;
use crate::markup::{Element, ElementId, Markup};
use crate::schema::{
    ATTACK_FIELDS, COLLIDER_FIELDS, DAMAGE_MODIFIER_FIELDS, DEFORMATION_FIELDS, FieldError,
    JOINT_FIELDS, LIGHT_SOURCE_FIELDS, LIGHT_TEXTURE_FIELDS, LIMB_FIELDS, PropertyBag,
    SOUND_FIELDS, SPRITE_FIELDS, Schema,
};

// ---------------------------------------------------------------------------
// Kinds and slots
// ---------------------------------------------------------------------------

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Collider,
    Limb,
    Joint,
    Sprite,
    DecorativeSprite,
    DeformableSprite,
    Deformation,
    Attack,
    DamageModifier,
    Sound,
    LightSource,
    LightTexture,
}

/// One position a child node may occupy under its parent.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChildSlot {
    /// Element name, empty when the child shares the parent's element.
    pub tag: &'static str,
    pub kind: NodeKind,
    pub multiple: bool,
}

impl ChildSlot {
    const fn one(tag: &'static str, kind: NodeKind) -> Self {
        Self {
            tag,
            kind,
            multiple: false,
        }
    }

    const fn many(tag: &'static str, kind: NodeKind) -> Self {
        Self {
            tag,
            kind,
            multiple: true,
        }
    }

    const fn inline(kind: NodeKind) -> Self {
        Self::one("", kind)
    }

    fn shares_element(&self) -> bool {
        self.tag.is_empty()
    }
}

static LIMB_SLOTS: &[ChildSlot] = &[
    ChildSlot::one("sprite", NodeKind::Sprite),
    ChildSlot::one("damagedsprite", NodeKind::Sprite),
    ChildSlot::one("deformablesprite", NodeKind::DeformableSprite),
    ChildSlot::many("decorativesprite", NodeKind::DecorativeSprite),
    ChildSlot::one("attack", NodeKind::Attack),
    ChildSlot::many("damagemodifier", NodeKind::DamageModifier),
    ChildSlot::one("sound", NodeKind::Sound),
    ChildSlot::one("lightsource", NodeKind::LightSource),
];

static DEFORMABLE_SLOTS: &[ChildSlot] = &[ChildSlot::inline(NodeKind::Deformation)];

static LIGHT_SOURCE_SLOTS: &[ChildSlot] = &[ChildSlot::one("lighttexture", NodeKind::LightTexture)];

impl NodeKind {
    /// Declared fields of this kind.
    pub fn schema(self) -> Schema {
        match self {
            Self::Collider => COLLIDER_FIELDS,
            Self::Limb => LIMB_FIELDS,
            Self::Joint => JOINT_FIELDS,
            Self::Sprite | Self::DecorativeSprite | Self::DeformableSprite => SPRITE_FIELDS,
            Self::Deformation => DEFORMATION_FIELDS,
            Self::Attack => ATTACK_FIELDS,
            Self::DamageModifier => DAMAGE_MODIFIER_FIELDS,
            Self::Sound => SOUND_FIELDS,
            Self::LightSource => LIGHT_SOURCE_FIELDS,
            Self::LightTexture => LIGHT_TEXTURE_FIELDS,
        }
    }

    /// Default element name.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Collider => "collider",
            Self::Limb => "limb",
            Self::Joint => "joint",
            Self::Sprite => "sprite",
            Self::DecorativeSprite => "decorativesprite",
            Self::DeformableSprite | Self::Deformation => "deformablesprite",
            Self::Attack => "attack",
            Self::DamageModifier => "damagemodifier",
            Self::Sound => "sound",
            Self::LightSource => "lightsource",
            Self::LightTexture => "lighttexture",
        }
    }

    /// Kinds that only matter for drawing. Skipped when visuals are disabled.
    pub fn is_visual(self) -> bool {
        matches!(
            self,
            Self::Sprite
                | Self::DecorativeSprite
                | Self::DeformableSprite
                | Self::Deformation
                | Self::LightSource
                | Self::LightTexture
        )
    }

    pub(crate) fn slots(self) -> &'static [ChildSlot] {
        match self {
            Self::Limb => LIMB_SLOTS,
            Self::DeformableSprite => DEFORMABLE_SLOTS,
            Self::LightSource => LIGHT_SOURCE_SLOTS,
            _ => &[],
        }
    }

    /// Empty element for a freshly added node.
    fn template(self, tag: &str) -> Element {
        let element = Element::new(tag);
        match self {
            Self::LightSource => element.with_child(Element::new(Self::LightTexture.tag())),
            _ => element,
        }
    }
}

// ---------------------------------------------------------------------------
// Load context
// ---------------------------------------------------------------------------

/// Identifies the owning document in errors and carries the visual capability.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeContext<'a> {
    pub species: &'a str,
    pub path: &'a Path,
    pub visuals: bool,
}

impl NodeContext<'_> {
    pub(crate) fn field_error(&self, element: &str, err: FieldError) -> RagdollError {
        RagdollError::InvalidField {
            species: self.species.to_string(),
            path: self.path.to_path_buf(),
            element: element.to_string(),
            field: err.field,
            value: err.value,
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Stable index of a node in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// One configuration node.
#[derive(Debug, Clone)]
pub struct ParamNode {
    kind: NodeKind,
    tag: &'static str,
    slot: usize,
    element: ElementId,
    checkpoint: Element,
    properties: PropertyBag,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl ParamNode {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Element name this node was read from (`damagedsprite` for a damaged
    /// sprite, for instance).
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Live element the node reads from and writes to.
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Element copy [`NodeTree::reset`] restores from.
    pub fn checkpoint(&self) -> &Element {
        &self.checkpoint
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Child nodes in slot order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Arena of every node in one document. Removed nodes leave an empty slot so
/// outstanding ids never alias a different node.
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    nodes: Vec<Option<ParamNode>>,
}

impl NodeTree {
    pub fn get(&self, id: NodeId) -> Option<&ParamNode> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut ParamNode> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub(crate) fn properties_mut(&mut self, id: NodeId) -> Option<&mut PropertyBag> {
        self.get_mut(id).map(|node| &mut node.properties)
    }

    /// Number of nodes still attached to the document.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads a node from `element`, then every child its slots find.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn load(
        &mut self,
        markup: &Markup,
        element: ElementId,
        kind: NodeKind,
        tag: &'static str,
        slot: usize,
        parent: Option<NodeId>,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeId, RagdollError> {
        let properties = PropertyBag::read(kind.schema(), markup.attributes(element))
            .map_err(|e| ctx.field_error(tag, e))?;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(ParamNode {
            kind,
            tag,
            slot,
            element,
            checkpoint: markup.to_element(element),
            properties,
            children: Vec::new(),
            parent,
        }));

        let mut children = Vec::new();
        for (index, child_slot) in kind.slots().iter().enumerate() {
            if child_slot.kind.is_visual() && !ctx.visuals {
                continue;
            }
            if child_slot.shares_element() {
                children.push(self.load(markup, element, child_slot.kind, tag, index, Some(id), ctx)?);
                continue;
            }
            let found: Vec<ElementId> = markup.children_named(element, child_slot.tag).collect();
            let take = if child_slot.multiple { found.len() } else { 1 };
            for child in found.into_iter().take(take) {
                children.push(self.load(
                    markup,
                    child,
                    child_slot.kind,
                    child_slot.tag,
                    index,
                    Some(id),
                    ctx,
                )?);
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.children = children;
        }
        Ok(id)
    }

    /// Inserts `template` after the element `after`, or appends it under
    /// `parent_element`, and loads it as a new node. The new element is
    /// filled with every saveable value and checkpointed.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create(
        &mut self,
        markup: &mut Markup,
        parent_element: ElementId,
        after: Option<ElementId>,
        template: Element,
        kind: NodeKind,
        tag: &'static str,
        slot: usize,
        parent: Option<NodeId>,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeId, RagdollError> {
        let element = match after.and_then(|sibling| markup.position_of(sibling)) {
            Some((parent_element, index)) => markup.insert_at(parent_element, index + 1, template),
            None => markup.append(parent_element, template),
        };
        let id = match self.load(markup, element, kind, tag, slot, parent, ctx) {
            Ok(id) => id,
            Err(err) => {
                markup.detach(element);
                return Err(err);
            }
        };
        self.serialize(id, markup, None, true);
        self.set_checkpoint(id, markup);
        Ok(id)
    }

    /// Writes the node's properties into `target`, or into its live element
    /// when `target` is `None`. With `recursive`, children write into their
    /// own live elements first.
    pub fn serialize(
        &self,
        id: NodeId,
        markup: &mut Markup,
        target: Option<&mut Element>,
        recursive: bool,
    ) {
        let Some(node) = self.get(id) else {
            return;
        };
        if recursive {
            for &child in &node.children {
                self.serialize(child, markup, None, true);
            }
        }
        match target {
            Some(element) => node.properties.serialize(&mut element.attributes),
            None => {
                if let Some(attributes) = markup.attributes_mut(node.element) {
                    node.properties.serialize(attributes);
                }
            }
        }
    }

    /// Re-reads properties from `source`, or from the live element when
    /// `source` is `None`. Children always read their own live elements.
    pub(crate) fn deserialize(
        &mut self,
        id: NodeId,
        markup: &Markup,
        source: Option<&Element>,
        recursive: bool,
        ctx: &NodeContext<'_>,
    ) -> Result<(), RagdollError> {
        let Some(node) = self.get_mut(id) else {
            return Ok(());
        };
        let attributes = match source {
            Some(element) => element.attributes.as_slice(),
            None => markup.attributes(node.element),
        };
        node.properties
            .deserialize(attributes)
            .map_err(|e| ctx.field_error(node.tag, e))?;
        if recursive {
            let children = node.children.clone();
            for child in children {
                self.deserialize(child, markup, None, true, ctx)?;
            }
        }
        Ok(())
    }

    /// Restores properties from the last checkpoint, recursively.
    pub(crate) fn reset(&mut self, id: NodeId, ctx: &NodeContext<'_>) -> Result<(), RagdollError> {
        let Some(node) = self.get_mut(id) else {
            return Ok(());
        };
        node.properties
            .deserialize(&node.checkpoint.attributes)
            .map_err(|e| ctx.field_error(node.tag, e))?;
        let children = node.children.clone();
        for child in children {
            self.reset(child, ctx)?;
        }
        Ok(())
    }

    /// Copies the live element into the checkpoint, recursively.
    pub(crate) fn set_checkpoint(&mut self, id: NodeId, markup: &Markup) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        node.checkpoint = markup.to_element(node.element);
        let children = node.children.clone();
        for child in children {
            self.set_checkpoint(child, markup);
        }
    }

    /// Adds a default-valued child of `kind` in the first slot that accepts it.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] when the parent has no free slot for
    /// `kind`, or when `kind` is visual and visuals are disabled.
    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        markup: &mut Markup,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeId, RagdollError> {
        let parent_node = self
            .get(parent)
            .ok_or_else(|| RagdollError::Edit("node no longer exists".to_string()))?;
        if kind.is_visual() && !ctx.visuals {
            return Err(RagdollError::Edit(format!(
                "cannot add {kind:?} while visuals are disabled"
            )));
        }
        let occupied = |index: usize| {
            parent_node
                .children
                .iter()
                .any(|&child| self.get(child).is_some_and(|n| n.slot == index))
        };
        let (index, slot) = parent_node
            .kind
            .slots()
            .iter()
            .enumerate()
            .find(|(index, s)| {
                s.kind == kind && !s.shares_element() && (s.multiple || !occupied(*index))
            })
            .ok_or_else(|| {
                RagdollError::Edit(format!("{:?} has no free slot for {kind:?}", parent_node.kind))
            })?;
        let parent_element = parent_node.element;

        let child = self.create(
            markup,
            parent_element,
            None,
            kind.template(slot.tag),
            kind,
            slot.tag,
            index,
            Some(parent),
            ctx,
        )?;

        let position = self.get(parent).map_or(0, |p| {
            p.children
                .iter()
                .position(|&c| self.get(c).is_some_and(|n| n.slot > index))
                .unwrap_or(p.children.len())
        });
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.insert(position, child);
        }
        Ok(child)
    }

    /// Detaches `child` from `parent`. Returns `false` if it is not currently
    /// one of `parent`'s children or cannot be removed on its own.
    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId, markup: &mut Markup) -> bool {
        let is_child = self
            .get(parent)
            .is_some_and(|node| node.children.contains(&child));
        is_child && self.remove(child, markup)
    }

    /// Detaches a node's element and drops the node with its subtree.
    pub(crate) fn remove(&mut self, id: NodeId, markup: &mut Markup) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        let parent = node.parent;
        let shares_parent_element = parent
            .and_then(|p| self.get(p))
            .is_some_and(|p| p.element == node.element);
        if shares_parent_element || !markup.detach(node.element) {
            return false;
        }
        if let Some(parent_node) = parent.and_then(|p| self.get_mut(p)) {
            parent_node.children.retain(|&c| c != id);
        }
        self.discard(id);
        true
    }

    fn discard(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0 as usize).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.discard(child);
        }
    }

    /// Drops removed nodes, renumbering the rest in their current order, and
    /// rebinds elements through `elements` (from [`Markup::compact`]).
    /// Returns the new id of each old id.
    pub(crate) fn compact(&mut self, elements: &[Option<ElementId>]) -> Vec<Option<NodeId>> {
        let mut remap = vec![None; self.nodes.len()];
        let mut next = 0;
        for (old, node) in self.nodes.iter().enumerate() {
            if node.is_some() {
                remap[old] = Some(NodeId(next));
                next += 1;
            }
        }
        let moved = |id: NodeId| remap.get(id.0 as usize).copied().flatten();
        self.nodes = std::mem::take(&mut self.nodes)
            .into_iter()
            .flatten()
            .map(|mut node| {
                if let Some(element) = Markup::remapped(elements, node.element) {
                    node.element = element;
                }
                node.parent = node.parent.and_then(moved);
                node.children = node.children.iter().filter_map(|&c| moved(c)).collect();
                Some(node)
            })
            .collect();
        remap
    }

    /// New id of `id` in a remap table returned by [`NodeTree::compact`].
    pub(crate) fn remapped(remap: &[Option<NodeId>], id: NodeId) -> Option<NodeId> {
        remap.get(id.0 as usize).copied().flatten()
    }

    /// Allocated node slots, removed ones included.
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when both subtrees have the same kinds and child counts at
    /// every level.
    pub(crate) fn same_shape(&self, id: NodeId, other: &NodeTree, other_id: NodeId) -> bool {
        match (self.get(id), other.get(other_id)) {
            (Some(a), Some(b)) => {
                a.kind == b.kind
                    && a.children.len() == b.children.len()
                    && a.children
                        .iter()
                        .zip(&b.children)
                        .all(|(&x, &y)| self.same_shape(x, other, y))
            }
            _ => false,
        }
    }

    /// Copies properties from `other` in lockstep. Callers check
    /// [`NodeTree::same_shape`] first.
    pub(crate) fn copy_properties(&mut self, id: NodeId, other: &NodeTree, other_id: NodeId) {
        let Some(source) = other.get(other_id) else {
            return;
        };
        let Some(node) = self.get_mut(id) else {
            return;
        };
        node.properties = source.properties.clone();
        let pairs: Vec<(NodeId, NodeId)> = node
            .children
            .iter()
            .copied()
            .zip(source.children.iter().copied())
            .collect();
        for (child, other_child) in pairs {
            self.copy_properties(child, other, other_child);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParamValue;

    const LIMB: &str = r#"<ragdoll>
  <limb id="2" name="Head" type="Head">
    <lightsource range="40"><lighttexture texture="glow.png"/></lightsource>
    <damagemodifier damagemultiplier="0.5"/>
    <sprite texture="head.png" sourcerect="0,0,32,32"/>
    <damagemodifier damagemultiplier="2"/>
    <deformablesprite subdivisions="4,4"/>
    <sprite texture="ignored.png"/>
    <unknownthing/>
  </limb>
</ragdoll>"#;

    fn ctx(visuals: bool) -> NodeContext<'static> {
        NodeContext {
            species: "test",
            path: Path::new("TestRagdoll.xml"),
            visuals,
        }
    }

    fn load_limb(visuals: bool) -> (NodeTree, Markup, NodeId) {
        let markup = Markup::new(Element::parse(LIMB).unwrap());
        let limb_element = markup.first_child_named(markup.root(), "limb").unwrap();
        let mut tree = NodeTree::default();
        let limb = tree
            .load(&markup, limb_element, NodeKind::Limb, "limb", 0, None, &ctx(visuals))
            .unwrap();
        (tree, markup, limb)
    }

    fn child_tags(tree: &NodeTree, id: NodeId) -> Vec<&'static str> {
        tree.get(id)
            .unwrap()
            .children()
            .iter()
            .map(|&c| tree.get(c).unwrap().tag())
            .collect()
    }

    #[test]
    fn test_children_follow_slot_order() {
        let (tree, _, limb) = load_limb(true);
        assert_eq!(
            child_tags(&tree, limb),
            ["sprite", "deformablesprite", "damagemodifier", "damagemodifier", "lightsource"]
        );
        let sprite = tree.get(limb).unwrap().children()[0];
        assert_eq!(tree.get(sprite).unwrap().properties().text("texture"), Some("head.png"));
    }

    #[test]
    fn test_deformation_shares_its_sprite_element() {
        let (tree, _, limb) = load_limb(true);
        let deformable = tree.get(limb).unwrap().children()[1];
        let deformation = tree.get(deformable).unwrap().children()[0];
        let node = tree.get(deformation).unwrap();
        assert_eq!(node.kind(), NodeKind::Deformation);
        assert_eq!(node.element(), tree.get(deformable).unwrap().element());
        assert_eq!(
            node.properties().get("subdivisions"),
            Some(&ParamValue::Vector2(glam::Vec2::new(4.0, 4.0)))
        );
    }

    #[test]
    fn test_visuals_disabled_skips_visual_nodes() {
        let (tree, _, limb) = load_limb(false);
        assert_eq!(child_tags(&tree, limb), ["damagemodifier", "damagemodifier"]);
    }

    #[test]
    fn test_required_field_error_names_document() {
        let markup = Markup::new(Element::parse(r#"<limb name="x"/>"#).unwrap());
        let mut tree = NodeTree::default();
        let err = tree
            .load(&markup, markup.root(), NodeKind::Limb, "limb", 0, None, &ctx(true))
            .unwrap_err();
        match err {
            RagdollError::InvalidField { species, field, .. } => {
                assert_eq!(species, "test");
                assert_eq!(field, "id");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_add_child_fills_slot_in_order() {
        let (mut tree, mut markup, limb) = load_limb(true);
        let sound = tree.add_child(limb, NodeKind::Sound, &mut markup, &ctx(true)).unwrap();
        assert_eq!(
            child_tags(&tree, limb),
            ["sprite", "deformablesprite", "damagemodifier", "damagemodifier", "sound", "lightsource"]
        );
        let element = tree.get(sound).unwrap().element();
        assert!(markup.is_attached(element));
        assert_eq!(markup.attribute(element, "tag"), Some(""));

        // A second sound has nowhere to go.
        assert!(tree.add_child(limb, NodeKind::Sound, &mut markup, &ctx(true)).is_err());
        // The damaged sprite slot is still free.
        tree.add_child(limb, NodeKind::Sprite, &mut markup, &ctx(true)).unwrap();
        assert_eq!(child_tags(&tree, limb)[1], "damagedsprite");
    }

    #[test]
    fn test_added_light_source_gets_light_texture() {
        let mut markup = Markup::new(Element::parse(r#"<limb id="0"/>"#).unwrap());
        let mut tree = NodeTree::default();
        let limb = tree
            .load(&markup, markup.root(), NodeKind::Limb, "limb", 0, None, &ctx(true))
            .unwrap();
        let light = tree
            .add_child(limb, NodeKind::LightSource, &mut markup, &ctx(true))
            .unwrap();
        let texture = tree.get(light).unwrap().children()[0];
        assert_eq!(
            tree.get(texture).unwrap().properties().text("texture"),
            Some("Content/Lights/pointlight_bright.png")
        );
    }

    #[test]
    fn test_remove_child() {
        let (mut tree, mut markup, limb) = load_limb(true);
        let before = tree.len();
        let light = *tree.get(limb).unwrap().children().last().unwrap();
        let element = tree.get(light).unwrap().element();

        assert!(tree.remove_child(limb, light, &mut markup));
        assert!(!markup.is_attached(element));
        assert!(tree.get(light).is_none());
        assert_eq!(tree.len(), before - 2);
        assert!(!tree.remove_child(limb, light, &mut markup));

        let deformable = tree.get(limb).unwrap().children()[1];
        let deformation = tree.get(deformable).unwrap().children()[0];
        assert!(!tree.remove_child(deformable, deformation, &mut markup));
    }

    #[test]
    fn test_reset_restores_checkpoint_not_live() {
        let (mut tree, mut markup, limb) = load_limb(true);
        tree.properties_mut(limb)
            .unwrap()
            .set("name", ParamValue::Str("Skull".to_string()))
            .unwrap();
        tree.serialize(limb, &mut markup, None, true);
        assert_eq!(markup.attribute(tree.get(limb).unwrap().element(), "name"), Some("Skull"));

        tree.reset(limb, &ctx(true)).unwrap();
        assert_eq!(tree.get(limb).unwrap().properties().text("name"), Some("Head"));

        tree.properties_mut(limb)
            .unwrap()
            .set("name", ParamValue::Str("Skull".to_string()))
            .unwrap();
        tree.serialize(limb, &mut markup, None, true);
        tree.set_checkpoint(limb, &markup);
        tree.properties_mut(limb)
            .unwrap()
            .set("name", ParamValue::Str("Jaw".to_string()))
            .unwrap();
        tree.reset(limb, &ctx(true)).unwrap();
        assert_eq!(tree.get(limb).unwrap().properties().text("name"), Some("Skull"));
    }

    #[test]
    fn test_serialize_into_target_leaves_live_alone() {
        let (tree, mut markup, limb) = load_limb(true);
        let mut target = Element::new("limb");
        tree.serialize(limb, &mut markup, Some(&mut target), false);
        assert_eq!(target.attribute("id"), Some("2"));
        assert_eq!(target.attribute("type"), Some("Head"));
        let live = tree.get(limb).unwrap().element();
        assert_eq!(markup.attribute(live, "density"), None);
    }

    #[test]
    fn test_deserialize_from_live_markup() {
        let (mut tree, mut markup, limb) = load_limb(true);
        let live = tree.get(limb).unwrap().element();
        markup.set_attribute(live, "Scale", "0.75");
        tree.deserialize(limb, &markup, None, true, &ctx(true)).unwrap();
        assert_eq!(tree.get(limb).unwrap().properties().float("scale"), Some(0.75));
    }

    #[test]
    fn test_shape_comparison_and_copy() {
        let (tree, _, limb) = load_limb(true);
        let (mut other, mut other_markup, other_limb) = load_limb(true);
        assert!(other.same_shape(other_limb, &tree, limb));

        other
            .properties_mut(other_limb)
            .unwrap()
            .set("name", ParamValue::Str("Changed".to_string()))
            .unwrap();
        other.copy_properties(other_limb, &tree, limb);
        assert_eq!(other.get(other_limb).unwrap().properties().text("name"), Some("Head"));

        other
            .add_child(other_limb, NodeKind::Attack, &mut other_markup, &ctx(true))
            .unwrap();
        assert!(!other.same_shape(other_limb, &tree, limb));
    }
}
