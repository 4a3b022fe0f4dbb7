//! Hierarchical ragdoll definitions for Nebula.
//!
//! A ragdoll is an XML document with document-level settings on the root
//! element and `<collider>`, `<limb>` and `<joint>` sections below it. Each
//! section is loaded into a [`ParamNode`] holding typed properties read
//! through a [`schema`] table, plus child nodes for sprites, attacks,
//! sounds and lights. Documents are shared through a [`RagdollRegistry`],
//! adjusted once by [`apply_variant_overlay`], and edited with
//! [`UndoHistory`] snapshots.

mod catalog;
mod document;
mod error;
mod history;
pub mod markup;
mod node;
mod overlay;
mod registry;
pub mod schema;
pub mod value;

pub use catalog::{SpeciesCatalog, SpeciesDefinition, default_file_name};
pub use document::{Affliction, DEFAULT_INDENT, LoadOptions, RagdollDocument};
pub use error::{ErrorKind, RagdollError};
pub use history::UndoHistory;
pub use markup::{Element, ElementId, Markup, MarkupError};
pub use node::{NodeId, NodeKind, NodeTree, ParamNode};
pub use overlay::{VariantScale, apply_variant_overlay};
pub use registry::{RagdollRegistry, RegistrySettings, SharedDocument};
pub use schema::{FieldDef, PropertyBag, PropertyError};
pub use value::{FieldKind, ParamValue};
