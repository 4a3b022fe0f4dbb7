//! A ragdoll definition loaded from one file.
//!
//! [`RagdollDocument`] owns the live [`Markup`] of the file, the document-level
//! properties and a [`NodeTree`] holding every collider, limb and joint with
//! their nested sub-parameters. Limbs are always kept sorted by id.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RagdollError;
use crate::markup::{Attribute, Content, Element, ElementId, Markup, find_attribute};
use crate::node::{NodeContext, NodeId, NodeKind, NodeTree, ParamNode};
use crate::schema::{PropertyBag, PropertyError, RAGDOLL_FIELDS};
use crate::value::ParamValue;

/// Indentation used when no configuration is supplied.
pub const DEFAULT_INDENT: usize = 2;

/// Switches applied while loading a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Instantiate sprites, deformations and light sources.
    pub visuals: bool,
    /// Reject joints that reference missing limbs.
    pub validate_joints: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            visuals: true,
            validate_joints: true,
        }
    }
}

/// One `<affliction>` entry of an attack.
#[derive(Debug, Clone, PartialEq)]
pub struct Affliction {
    pub identifier: String,
    pub strength: f32,
    pub probability: f32,
}

impl Affliction {
    fn from_attributes(attributes: &[Attribute]) -> Self {
        let float = |name: &str, default: f32| {
            find_attribute(attributes, name)
                .and_then(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(default)
        };
        Self {
            identifier: find_attribute(attributes, "identifier")
                .unwrap_or_default()
                .to_string(),
            strength: float("strength", 0.0),
            probability: float("probability", 1.0),
        }
    }
}

/// A loaded ragdoll definition.
#[derive(Debug, Clone)]
pub struct RagdollDocument {
    species: String,
    source_path: PathBuf,
    options: LoadOptions,
    markup: Markup,
    root: ElementId,
    properties: PropertyBag,
    checkpoint: Vec<Attribute>,
    tree: NodeTree,
    colliders: Vec<NodeId>,
    limbs: Vec<NodeId>,
    joints: Vec<NodeId>,
    variant_overlay_applied: bool,
}

impl RagdollDocument {
    // -- Loading ---------------------------------------------------------

    /// Loads a document with default options.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError`] if the file is missing, malformed or fails
    /// validation.
    pub fn load(path: impl AsRef<Path>, species: &str) -> Result<Self, RagdollError> {
        Self::load_with(path, species, LoadOptions::default())
    }

    /// Loads a document from `path`.
    ///
    /// # Errors
    ///
    /// See [`RagdollDocument::load`].
    pub fn load_with(
        path: impl AsRef<Path>,
        species: &str,
        options: LoadOptions,
    ) -> Result<Self, RagdollError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RagdollError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::from_markup_str(&text, species, path, options)?;
        tracing::debug!(
            "Loaded ragdoll for `{species}` from {} ({} colliders, {} limbs, {} joints)",
            path.display(),
            document.colliders.len(),
            document.limbs.len(),
            document.joints.len()
        );
        Ok(document)
    }

    /// Parses a document from text. `path` is recorded as the source path.
    ///
    /// # Errors
    ///
    /// See [`RagdollDocument::load`].
    pub fn from_markup_str(
        text: &str,
        species: &str,
        path: impl Into<PathBuf>,
        options: LoadOptions,
    ) -> Result<Self, RagdollError> {
        let path = path.into();
        let element = Element::parse(text).map_err(|source| RagdollError::Markup {
            path: path.clone(),
            source,
        })?;
        Self::from_element(element, species, path, options)
    }

    /// Builds a document from an owned element tree.
    ///
    /// An `<override>` wrapper is kept in the markup but the document fields
    /// are read from the element it wraps.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError`] if a field fails to convert or validation fails.
    pub fn from_element(
        element: Element,
        species: &str,
        path: impl Into<PathBuf>,
        options: LoadOptions,
    ) -> Result<Self, RagdollError> {
        let source_path = path.into();
        let markup = Markup::new(element);
        let mut root = markup.root();
        if markup
            .name(root)
            .is_some_and(|name| name.eq_ignore_ascii_case("override"))
            && let Some(first) = markup.child_elements(root).next()
        {
            root = first;
        }

        let ctx = NodeContext {
            species,
            path: &source_path,
            visuals: options.visuals,
        };
        let properties = PropertyBag::read(RAGDOLL_FIELDS, markup.attributes(root))
            .map_err(|e| ctx.field_error(markup.name(root).unwrap_or("ragdoll"), e))?;
        let mut tree = NodeTree::default();
        let colliders = load_top_level(&mut tree, &markup, root, NodeKind::Collider, &ctx)?;
        let mut limbs = load_top_level(&mut tree, &markup, root, NodeKind::Limb, &ctx)?;
        let joints = load_top_level(&mut tree, &markup, root, NodeKind::Joint, &ctx)?;
        limbs.sort_by_key(|&id| limb_id(&tree, id));

        let document = Self {
            species: species.to_string(),
            checkpoint: markup.attributes(root).to_vec(),
            source_path,
            options,
            markup,
            root,
            properties,
            tree,
            colliders,
            limbs,
            joints,
            variant_overlay_applied: false,
        };
        document.validate()?;
        Ok(document)
    }

    // -- Accessors -------------------------------------------------------

    /// Species key the document was loaded for.
    pub fn species(&self) -> &str {
        &self.species
    }

    /// File the document was loaded from or last saved to.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn options(&self) -> LoadOptions {
        self.options
    }

    /// Live backing markup.
    pub fn markup(&self) -> &Markup {
        &self.markup
    }

    /// Document element (the element inside an `<override>` wrapper, if any).
    pub fn root_element(&self) -> ElementId {
        self.root
    }

    /// Document-level properties.
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&ParamNode> {
        self.tree.get(id)
    }

    pub fn colliders(&self) -> &[NodeId] {
        &self.colliders
    }

    /// Limbs, sorted ascending by id.
    pub fn limbs(&self) -> &[NodeId] {
        &self.limbs
    }

    pub fn joints(&self) -> &[NodeId] {
        &self.joints
    }

    /// Integer id of a limb node.
    pub fn limb_id(&self, limb: NodeId) -> Option<i32> {
        self.tree.get(limb).and_then(|n| n.properties().int("id"))
    }

    /// Limb node with the given id.
    pub fn limb_by_id(&self, id: i32) -> Option<NodeId> {
        self.limbs
            .iter()
            .copied()
            .find(|&limb| self.limb_id(limb) == Some(id))
    }

    /// `true` once a variant overlay has been applied.
    pub fn variant_overlay_applied(&self) -> bool {
        self.variant_overlay_applied
    }

    pub(crate) fn mark_variant_overlay_applied(&mut self) {
        self.variant_overlay_applied = true;
    }

    pub fn limb_scale(&self) -> f32 {
        self.properties.float("limbscale").unwrap_or(1.0)
    }

    pub fn joint_scale(&self) -> f32 {
        self.properties.float("jointscale").unwrap_or(1.0)
    }

    pub fn texture_scale(&self) -> f32 {
        self.properties.float("texturescale").unwrap_or(1.0)
    }

    pub fn source_rect_scale(&self) -> f32 {
        self.properties.float("sourcerectscale").unwrap_or(1.0)
    }

    /// Document texture shared by sprites that leave theirs blank.
    pub fn texture(&self) -> &str {
        self.properties.text("texture").unwrap_or_default()
    }

    /// Orientation of the sprite sheet in degrees.
    pub fn spritesheet_orientation(&self) -> f32 {
        self.properties.float("spritesheetorientation").unwrap_or(0.0)
    }

    /// `true` if the sheet is laid out sideways.
    pub fn is_spritesheet_orientation_horizontal(&self) -> bool {
        let o = self.spritesheet_orientation();
        (o > 45.0 && o < 135.0) || (o > 225.0 && o < 315.0)
    }

    /// Texture a sprite node draws with.
    pub fn texture_path(&self, sprite: NodeId) -> Option<String> {
        let texture = self.tree.get(sprite)?.properties().text("texture")?;
        if texture.trim().is_empty() {
            Some(self.texture().to_string())
        } else {
            Some(texture.to_string())
        }
    }

    /// Sprite orientation of a limb, falling back to the sheet orientation
    /// when the limb leaves it unset.
    pub fn sprite_orientation_degrees(&self, limb: NodeId) -> f32 {
        match self
            .tree
            .get(limb)
            .and_then(|n| n.properties().float("spriteorientation"))
        {
            Some(value) if !value.is_nan() => value,
            _ => self.spritesheet_orientation(),
        }
    }

    /// Name shown for a node, generated when the stored name is blank.
    pub fn display_name(&self, id: NodeId) -> String {
        let Some(node) = self.tree.get(id) else {
            return String::new();
        };
        let properties = node.properties();
        if let Some(name) = properties.text("name").filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        match node.kind() {
            NodeKind::Collider if self.colliders.first() == Some(&id) => "Main Collider".to_string(),
            NodeKind::Collider => "Secondary Collider".to_string(),
            NodeKind::Limb => {
                let limb = properties.int("id").unwrap_or(-1);
                match properties.text("type") {
                    Some(kind) if kind != "None" => format!("{kind} ({limb})"),
                    _ => format!("Limb {limb}"),
                }
            }
            NodeKind::Joint => format!(
                "Joint {} - {}",
                properties.int("limb1").unwrap_or(-1),
                properties.int("limb2").unwrap_or(-1)
            ),
            _ => node.tag().to_string(),
        }
    }

    /// `type` of every `<spritedeformation>` under a deformable sprite.
    pub fn deformation_types(&self, node: NodeId) -> Vec<String> {
        let Some(node) = self.tree.get(node).filter(|n| {
            matches!(n.kind(), NodeKind::DeformableSprite | NodeKind::Deformation)
        }) else {
            return Vec::new();
        };
        self.markup
            .children_named(node.element(), "spritedeformation")
            .map(|el| {
                self.markup
                    .attribute(el, "type")
                    .or_else(|| self.markup.attribute(el, "typename"))
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    // -- Validation ------------------------------------------------------

    /// Rejects duplicate limb ids and, when enabled, joints that reference
    /// missing limbs.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::DuplicateLimbId`] or [`RagdollError::DanglingJoint`].
    pub fn validate(&self) -> Result<(), RagdollError> {
        for pair in self.limbs.windows(2) {
            let id = self.limb_id(pair[0]);
            if id.is_some() && id == self.limb_id(pair[1]) {
                return Err(RagdollError::DuplicateLimbId {
                    species: self.species.clone(),
                    path: self.source_path.clone(),
                    id: id.unwrap_or_default(),
                });
            }
        }
        if !self.options.validate_joints {
            return Ok(());
        }
        for (index, &joint) in self.joints.iter().enumerate() {
            let Some(node) = self.tree.get(joint) else {
                continue;
            };
            for field in ["limb1", "limb2"] {
                let limb = node.properties().int(field).unwrap_or(-1);
                if self.limb_by_id(limb).is_none() {
                    return Err(RagdollError::DanglingJoint {
                        species: self.species.clone(),
                        path: self.source_path.clone(),
                        joint: index,
                        limb,
                    });
                }
            }
        }
        Ok(())
    }

    // -- Serialize / deserialize ----------------------------------------

    /// Writes every property into the live markup without touching storage.
    pub fn apply(&mut self) {
        if let Some(attributes) = self.markup.attributes_mut(self.root) {
            self.properties.serialize(attributes);
        }
        for &id in self.colliders.iter().chain(&self.limbs).chain(&self.joints) {
            self.tree.serialize(id, &mut self.markup, None, true);
        }
    }

    /// Re-reads every property from the live markup.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::InvalidField`] if the markup was edited into
    /// an unreadable state.
    pub fn deserialize(&mut self) -> Result<(), RagdollError> {
        let Self {
            species,
            source_path,
            options,
            markup,
            root,
            properties,
            tree,
            colliders,
            limbs,
            joints,
            ..
        } = self;
        let ctx = NodeContext {
            species,
            path: source_path,
            visuals: options.visuals,
        };
        properties
            .deserialize(markup.attributes(*root))
            .map_err(|e| ctx.field_error(markup.name(*root).unwrap_or("ragdoll"), e))?;
        for &id in colliders.iter().chain(limbs.iter()).chain(joints.iter()) {
            tree.deserialize(id, markup, None, true, &ctx)?;
        }
        Ok(())
    }

    /// Copies the live markup into every checkpoint.
    pub fn set_checkpoint(&mut self) {
        self.checkpoint = self.markup.attributes(self.root).to_vec();
        for &id in self.colliders.iter().chain(&self.limbs).chain(&self.joints) {
            self.tree.set_checkpoint(id, &self.markup);
        }
    }

    /// Restores the last checkpoint, or reloads the file with `force_reload`.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError`] if reloading fails. The document is left
    /// unchanged in that case.
    pub fn reset(&mut self, force_reload: bool) -> Result<(), RagdollError> {
        if force_reload {
            *self = Self::load_with(&self.source_path, &self.species, self.options)?;
            return Ok(());
        }

        let attacks: Vec<NodeId> = self
            .limbs
            .iter()
            .filter_map(|&limb| self.child_of_kind(limb, NodeKind::Attack))
            .collect();
        let Self {
            species,
            source_path,
            options,
            properties,
            checkpoint,
            markup,
            root,
            tree,
            colliders,
            limbs,
            joints,
            ..
        } = &mut *self;
        let ctx = NodeContext {
            species,
            path: source_path,
            visuals: options.visuals,
        };
        properties
            .deserialize(checkpoint)
            .map_err(|e| ctx.field_error(markup.name(*root).unwrap_or("ragdoll"), e))?;
        for &id in colliders.iter().chain(limbs.iter()).chain(joints.iter()) {
            tree.reset(id, &ctx)?;
        }
        for attack in attacks {
            self.restore_afflictions(attack);
        }
        Ok(())
    }

    /// Puts the checkpointed afflictions back in place. Unedited attacks are
    /// left alone; edited ones are rewritten entry by entry so siblings keep
    /// their order.
    fn restore_afflictions(&mut self, attack: NodeId) {
        let Some(node) = self.tree.get(attack) else {
            return;
        };
        let element = node.element();
        let saved: Vec<(usize, Element)> = node
            .checkpoint()
            .content
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item {
                Content::Element(el) if el.is_named("affliction") => Some((index, el.clone())),
                _ => None,
            })
            .collect();
        let live: Vec<ElementId> = self.markup.children_named(element, "affliction").collect();

        let unchanged = live.len() == saved.len()
            && live
                .iter()
                .zip(&saved)
                .all(|(&id, (_, el))| self.markup.to_element(id) == *el);
        if unchanged {
            return;
        }
        for (&id, (_, el)) in live.iter().zip(&saved) {
            if self.markup.to_element(id) != *el {
                self.markup.replace(id, el.clone());
            }
        }
        for &id in live.iter().skip(saved.len()) {
            self.markup.detach(id);
        }
        for (index, el) in saved.into_iter().skip(live.len()) {
            self.markup.insert_at(element, index, el);
        }
    }

    /// Reclaims the markup and node slots left behind by removed elements
    /// and nodes. Every [`NodeId`] and [`ElementId`] taken from this document
    /// before the call is invalidated.
    pub fn compact(&mut self) {
        let elements = self.markup.compact();
        if let Some(root) = Markup::remapped(&elements, self.root) {
            self.root = root;
        }
        let nodes = self.tree.compact(&elements);
        for list in [&mut self.colliders, &mut self.limbs, &mut self.joints] {
            list.retain_mut(|id| match NodeTree::remapped(&nodes, *id) {
                Some(new) => {
                    *id = new;
                    true
                }
                None => false,
            });
        }
    }

    // -- Storage ---------------------------------------------------------

    /// Live markup as text. Does not apply pending property edits.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Markup`] if writing fails.
    pub fn to_markup_string(&self, indent: usize) -> Result<String, RagdollError> {
        self.markup
            .to_element(self.markup.root())
            .to_xml_string(indent)
            .map_err(|source| RagdollError::Markup {
                path: self.source_path.clone(),
                source,
            })
    }

    /// Validates, applies, checkpoints and writes the document to `path`, or
    /// to the source path when `path` is `None`. Saving to a new path makes
    /// it the source path.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError`] if validation or writing fails.
    pub fn save(&mut self, path: Option<&Path>, indent: usize) -> Result<(), RagdollError> {
        self.validate()?;
        self.apply();
        self.set_checkpoint();

        let target = path.map_or_else(|| self.source_path.clone(), Path::to_path_buf);
        let text = self.to_markup_string(indent)?;
        if let Some(dir) = target.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| RagdollError::Write {
                path: target.clone(),
                source,
            })?;
        }
        fs::write(&target, text).map_err(|source| RagdollError::Write {
            path: target.clone(),
            source,
        })?;
        tracing::info!("Saved ragdoll `{}` to {}", self.species, target.display());
        self.source_path = target;
        Ok(())
    }

    // -- Property edits --------------------------------------------------

    /// Sets a document-level property.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] for unknown fields or mismatched types.
    pub fn set_root(&mut self, field: &str, value: ParamValue) -> Result<(), RagdollError> {
        self.properties.set(field, value)?;
        Ok(())
    }

    /// Sets a property of a node. Changing a limb id keeps the limb list
    /// sorted and rejects ids already in use.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] if the node is gone, the field is
    /// unknown, the type does not match or the limb id is taken.
    pub fn set(&mut self, node: NodeId, field: &str, value: ParamValue) -> Result<(), RagdollError> {
        let kind = self
            .tree
            .get(node)
            .map(ParamNode::kind)
            .ok_or_else(|| RagdollError::Edit("node no longer exists".to_string()))?;
        let changes_limb_id = kind == NodeKind::Limb && field.eq_ignore_ascii_case("id");
        if changes_limb_id {
            let new_id = value.as_i32().ok_or(PropertyError::TypeMismatch("id"))?;
            if self
                .limbs
                .iter()
                .any(|&other| other != node && self.limb_id(other) == Some(new_id))
            {
                return Err(RagdollError::Edit(format!("limb id {new_id} is already in use")));
            }
        }
        self.tree
            .properties_mut(node)
            .ok_or_else(|| RagdollError::Edit("node no longer exists".to_string()))?
            .set(field, value)?;
        if changes_limb_id {
            self.sort_limbs();
        }
        Ok(())
    }

    fn sort_limbs(&mut self) {
        let tree = &self.tree;
        self.limbs.sort_by_key(|&id| limb_id(tree, id));
    }

    // -- Structural edits ------------------------------------------------

    fn create_top_level(
        &mut self,
        kind: NodeKind,
        after: Option<NodeId>,
        template: Element,
    ) -> Result<NodeId, RagdollError> {
        let after = after.and_then(|id| self.tree.get(id)).map(ParamNode::element);
        let Self {
            species,
            source_path,
            options,
            markup,
            root,
            tree,
            ..
        } = self;
        let ctx = NodeContext {
            species,
            path: source_path,
            visuals: options.visuals,
        };
        tree.create(markup, *root, after, template, kind, kind.tag(), 0, None, &ctx)
    }

    /// Adds a default collider after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError`] if the new node cannot be read back.
    pub fn add_collider(&mut self) -> Result<NodeId, RagdollError> {
        let after = self.colliders.last().copied();
        let id = self.create_top_level(NodeKind::Collider, after, Element::new("collider"))?;
        self.colliders.push(id);
        Ok(id)
    }

    /// Adds a default limb with the id after the highest one.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] if the highest id is `i32::MAX`, or
    /// another [`RagdollError`] if the new node cannot be read back.
    pub fn add_limb(&mut self) -> Result<NodeId, RagdollError> {
        let next_id = match self.limbs.last().and_then(|&limb| self.limb_id(limb)) {
            Some(last) => last
                .checked_add(1)
                .ok_or_else(|| RagdollError::Edit(format!("no limb id left after {last}")))?,
            None => 0,
        };
        let after = self.limbs.last().copied();
        let template = Element::new("limb").with_attribute("id", next_id.to_string());
        let id = self.create_top_level(NodeKind::Limb, after, template)?;
        self.limbs.push(id);
        self.sort_limbs();
        Ok(id)
    }

    /// Adds a joint between two existing limbs.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] if either limb id does not exist.
    pub fn add_joint(&mut self, limb1: i32, limb2: i32) -> Result<NodeId, RagdollError> {
        for limb in [limb1, limb2] {
            if self.limb_by_id(limb).is_none() {
                return Err(RagdollError::Edit(format!("no limb with id {limb}")));
            }
        }
        let after = self.joints.last().copied();
        let template = Element::new("joint")
            .with_attribute("limb1", limb1.to_string())
            .with_attribute("limb2", limb2.to_string());
        let id = self.create_top_level(NodeKind::Joint, after, template)?;
        self.joints.push(id);
        Ok(id)
    }

    /// Removes any node. Removing a limb also removes the joints attached
    /// to it. Returns `false` if the node is not attached.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if let Some(index) = self.colliders.iter().position(|&c| c == id) {
            if !self.tree.remove(id, &mut self.markup) {
                return false;
            }
            self.colliders.remove(index);
            return true;
        }
        if let Some(index) = self.limbs.iter().position(|&l| l == id) {
            let removed_id = self.limb_id(id);
            if !self.tree.remove(id, &mut self.markup) {
                return false;
            }
            self.limbs.remove(index);
            let attached: Vec<NodeId> = self
                .joints
                .iter()
                .copied()
                .filter(|&joint| {
                    self.tree.get(joint).is_some_and(|n| {
                        let props = n.properties();
                        removed_id.is_some()
                            && (props.int("limb1") == removed_id || props.int("limb2") == removed_id)
                    })
                })
                .collect();
            for joint in attached {
                self.tree.remove(joint, &mut self.markup);
                self.joints.retain(|&j| j != joint);
            }
            return true;
        }
        if let Some(index) = self.joints.iter().position(|&j| j == id) {
            if !self.tree.remove(id, &mut self.markup) {
                return false;
            }
            self.joints.remove(index);
            return true;
        }
        match self.tree.get(id).and_then(ParamNode::parent) {
            Some(parent) => self.tree.remove_child(parent, id, &mut self.markup),
            None => false,
        }
    }

    /// Adds a default child of `kind` under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] when `parent` has no free slot for `kind`.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, RagdollError> {
        let Self {
            species,
            source_path,
            options,
            markup,
            tree,
            ..
        } = self;
        let ctx = NodeContext {
            species,
            path: source_path,
            visuals: options.visuals,
        };
        tree.add_child(parent, kind, markup, &ctx)
    }

    /// Removes `child` from `parent`. Returns `false` if it is not attached
    /// there.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.tree.remove_child(parent, child, &mut self.markup)
    }

    /// First child of `parent` with the given kind.
    pub fn child_of_kind(&self, parent: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.tree
            .get(parent)?
            .children()
            .iter()
            .copied()
            .find(|&c| self.tree.get(c).is_some_and(|n| n.kind() == kind))
    }

    fn add_to_limb(&mut self, limb: NodeId, kind: NodeKind) -> Result<NodeId, RagdollError> {
        if self.tree.get(limb).map(ParamNode::kind) != Some(NodeKind::Limb) {
            return Err(RagdollError::Edit("not a limb".to_string()));
        }
        self.add_child(limb, kind)
    }

    fn remove_from_limb(&mut self, limb: NodeId, kind: NodeKind) -> bool {
        match self.child_of_kind(limb, kind) {
            Some(child) => self.remove_child(limb, child),
            None => false,
        }
    }

    /// Gives a limb an attack.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] if `limb` is not a limb or already has one.
    pub fn add_attack(&mut self, limb: NodeId) -> Result<NodeId, RagdollError> {
        self.add_to_limb(limb, NodeKind::Attack)
    }

    /// Gives a limb a sound.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] if `limb` is not a limb or already has one.
    pub fn add_sound(&mut self, limb: NodeId) -> Result<NodeId, RagdollError> {
        self.add_to_limb(limb, NodeKind::Sound)
    }

    /// Gives a limb a light source with the default light texture.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] if `limb` is not a limb, already has a
    /// light, or visuals are disabled.
    pub fn add_light(&mut self, limb: NodeId) -> Result<NodeId, RagdollError> {
        self.add_to_limb(limb, NodeKind::LightSource)
    }

    /// Adds a damage modifier to a limb.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] if `limb` is not a limb.
    pub fn add_damage_modifier(&mut self, limb: NodeId) -> Result<NodeId, RagdollError> {
        self.add_to_limb(limb, NodeKind::DamageModifier)
    }

    pub fn remove_attack(&mut self, limb: NodeId) -> bool {
        self.remove_from_limb(limb, NodeKind::Attack)
    }

    pub fn remove_sound(&mut self, limb: NodeId) -> bool {
        self.remove_from_limb(limb, NodeKind::Sound)
    }

    pub fn remove_light(&mut self, limb: NodeId) -> bool {
        self.remove_from_limb(limb, NodeKind::LightSource)
    }

    pub fn remove_damage_modifier(&mut self, limb: NodeId, modifier: NodeId) -> bool {
        self.tree.get(modifier).map(ParamNode::kind) == Some(NodeKind::DamageModifier)
            && self.remove_child(limb, modifier)
    }

    // -- Afflictions -----------------------------------------------------

    fn attack_element(&self, attack: NodeId) -> Option<ElementId> {
        self.tree
            .get(attack)
            .filter(|n| n.kind() == NodeKind::Attack)
            .map(ParamNode::element)
    }

    /// Afflictions of an attack, in file order.
    pub fn afflictions(&self, attack: NodeId) -> Vec<Affliction> {
        let Some(element) = self.attack_element(attack) else {
            return Vec::new();
        };
        self.markup
            .children_named(element, "affliction")
            .map(|el| Affliction::from_attributes(self.markup.attributes(el)))
            .collect()
    }

    /// Appends a default affliction and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::Edit`] if `attack` is not an attack.
    pub fn add_affliction(&mut self, attack: NodeId) -> Result<usize, RagdollError> {
        let element = self
            .attack_element(attack)
            .ok_or_else(|| RagdollError::Edit("not an attack".to_string()))?;
        self.markup.append(
            element,
            Element::new("affliction")
                .with_attribute("identifier", "internaldamage")
                .with_attribute("strength", "0")
                .with_attribute("probability", "1"),
        );
        Ok(self.markup.children_named(element, "affliction").count() - 1)
    }

    /// Removes the affliction at `index`. Returns `false` if out of range.
    pub fn remove_affliction(&mut self, attack: NodeId, index: usize) -> bool {
        let Some(element) = self.attack_element(attack) else {
            return false;
        };
        let found = self.markup.children_named(element, "affliction").nth(index);
        match found {
            Some(affliction) => self.markup.detach(affliction),
            None => false,
        }
    }

    // -- Snapshots -------------------------------------------------------

    /// Copies every property of `snapshot` into this document.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::StructuralMismatch`] without changing anything
    /// if the node structure differs at any level.
    pub fn revert_to(&mut self, snapshot: &RagdollDocument) -> Result<(), RagdollError> {
        let lists = [
            ("colliders", &self.colliders, &snapshot.colliders),
            ("limbs", &self.limbs, &snapshot.limbs),
            ("joints", &self.joints, &snapshot.joints),
        ];
        for (name, mine, theirs) in lists {
            if mine.len() != theirs.len() {
                return Err(RagdollError::StructuralMismatch(format!(
                    "{} {name} in the document, {} in the snapshot",
                    mine.len(),
                    theirs.len()
                )));
            }
            if let Some(index) = mine
                .iter()
                .zip(theirs.iter())
                .position(|(&a, &b)| !self.tree.same_shape(a, &snapshot.tree, b))
            {
                return Err(RagdollError::StructuralMismatch(format!(
                    "child nodes of {name} #{index} differ"
                )));
            }
        }

        self.properties = snapshot.properties.clone();
        let pairs: Vec<(NodeId, NodeId)> = self
            .colliders
            .iter()
            .chain(&self.limbs)
            .chain(&self.joints)
            .copied()
            .zip(
                snapshot
                    .colliders
                    .iter()
                    .chain(&snapshot.limbs)
                    .chain(&snapshot.joints)
                    .copied(),
            )
            .collect();
        for (mine, theirs) in pairs {
            self.tree.copy_properties(mine, &snapshot.tree, theirs);
        }
        Ok(())
    }
}

fn load_top_level(
    tree: &mut NodeTree,
    markup: &Markup,
    root: ElementId,
    kind: NodeKind,
    ctx: &NodeContext<'_>,
) -> Result<Vec<NodeId>, RagdollError> {
    markup
        .children_named(root, kind.tag())
        .collect::<Vec<_>>()
        .into_iter()
        .map(|element| tree.load(markup, element, kind, kind.tag(), 0, None, ctx))
        .collect()
}

fn limb_id(tree: &NodeTree, id: NodeId) -> i32 {
    tree.get(id)
        .and_then(|n| n.properties().int("id"))
        .unwrap_or(i32::MAX)
}
