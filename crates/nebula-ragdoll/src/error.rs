//! Ragdoll error types.

use std::path::PathBuf;

use crate::markup::MarkupError;
use crate::schema::PropertyError;

/// Coarse classification used by callers deciding how to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A value or file could not be converted (malformed markup, bad field).
    Parse,
    /// A file or folder is missing or unreadable.
    Load,
    /// A variant-of chain revisits a species.
    Cycle,
    /// A snapshot no longer matches the document structure.
    StructuralMismatch,
    /// Base content failed to resolve. Not recoverable.
    Fatal,
    /// Writing to storage failed.
    Write,
    /// An editor operation was rejected.
    Edit,
}

/// Errors that can occur while loading, editing, saving or resolving ragdolls.
#[derive(Debug, thiserror::Error)]
pub enum RagdollError {
    /// Failed to read a file from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file to disk.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File that was written.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not well-formed markup.
    #[error("malformed markup in {path}: {source}")]
    Markup {
        /// Offending file.
        path: PathBuf,
        /// Reader failure.
        #[source]
        source: MarkupError,
    },

    /// A required field is missing or does not convert to its declared type.
    #[error(
        "{species}: invalid value {} for `{field}` on <{element}> in {path}",
        .value.as_deref().map_or_else(|| "<missing>".to_string(), |v| format!("{v:?}"))
    )]
    InvalidField {
        /// Species the document belongs to.
        species: String,
        /// Document file.
        path: PathBuf,
        /// Tag of the element holding the field.
        element: String,
        /// Field name.
        field: &'static str,
        /// Offending text, `None` if absent.
        value: Option<String>,
    },

    /// Two limbs share an id.
    #[error("{species}: duplicate limb id {id} in {path}")]
    DuplicateLimbId {
        /// Species the document belongs to.
        species: String,
        /// Document file.
        path: PathBuf,
        /// Repeated id.
        id: i32,
    },

    /// A joint names a limb id that does not exist.
    #[error("{species}: joint #{joint} references missing limb {limb} in {path}")]
    DanglingJoint {
        /// Species the document belongs to.
        species: String,
        /// Document file.
        path: PathBuf,
        /// Position of the joint in the joint list.
        joint: usize,
        /// Missing limb id.
        limb: i32,
    },

    /// The ragdoll folder of a species is missing or empty.
    #[error("no ragdoll files in {0}")]
    MissingFolder(PathBuf),

    /// The ragdoll folder has no file with the requested name.
    #[error("no ragdoll file named `{name}` in {folder}")]
    MissingFile {
        /// Folder that was searched.
        folder: PathBuf,
        /// Requested file name without extension.
        name: String,
    },

    /// No character definition is registered for the species.
    #[error("no character definition for species `{0}`")]
    UnknownSpecies(String),

    /// A variant-of chain loops.
    #[error("variant-of chain loops back to `{species}`: {}", .chain.join(" -> "))]
    VariantCycle {
        /// Species that was revisited.
        species: String,
        /// Species visited in order.
        chain: Vec<String>,
    },

    /// Undo/redo target no longer matches the document structure.
    #[error("snapshot does not match the document structure: {0}")]
    StructuralMismatch(String),

    /// Base content failed to resolve even after every fallback.
    #[error("base-content ragdoll for `{species}` failed to resolve: {source}")]
    BaseContent {
        /// Species being resolved.
        species: String,
        /// Last failure.
        #[source]
        source: Box<RagdollError>,
    },

    /// An editor operation was rejected.
    #[error("invalid edit: {0}")]
    Edit(String),
}

impl RagdollError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Markup { .. }
            | Self::InvalidField { .. }
            | Self::DuplicateLimbId { .. }
            | Self::DanglingJoint { .. } => ErrorKind::Parse,
            Self::Read { .. }
            | Self::MissingFolder(_)
            | Self::MissingFile { .. }
            | Self::UnknownSpecies(_) => ErrorKind::Load,
            Self::VariantCycle { .. } => ErrorKind::Cycle,
            Self::StructuralMismatch(_) => ErrorKind::StructuralMismatch,
            Self::BaseContent { .. } => ErrorKind::Fatal,
            Self::Write { .. } => ErrorKind::Write,
            Self::Edit(_) => ErrorKind::Edit,
        }
    }

    /// `true` for errors that must not be recovered from by falling back.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Fatal | ErrorKind::Cycle)
    }
}

impl From<PropertyError> for RagdollError {
    fn from(err: PropertyError) -> Self {
        match err {
            PropertyError::UnknownField(name) => Self::Edit(format!("unknown field `{name}`")),
            PropertyError::TypeMismatch(name) => {
                Self::Edit(format!("value has the wrong type for `{name}`"))
            }
        }
    }
}
