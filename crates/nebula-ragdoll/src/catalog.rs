//! Species definitions read from character files.
//!
//! A character file looks like
//!
//! ```xml
//! <Character speciesname="crawlerhusk" variantof="crawler" humanoid="false">
//!   <ragdolls folder="default" scalemultiplier="1.2"/>
//! </Character>
//! ```
//!
//! optionally wrapped in `<override>`. The catalog only keeps what ragdoll
//! resolution needs.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use crate::error::RagdollError;
use crate::markup::Element;

/// Ragdoll-related data of one character definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesDefinition {
    /// Lower-case species key.
    pub species: String,
    /// Species this one is a variant of.
    pub variant_of: Option<String>,
    /// Humanoids fall back to the human ragdoll, everything else to the
    /// creature ragdoll.
    pub humanoid: bool,
    /// `folder` attribute of the ragdoll element, if any.
    pub folder: Option<String>,
    /// `path` (or `file`) attribute of the ragdoll element, if any.
    pub file: Option<String>,
    /// Character file the definition came from.
    pub source_file: PathBuf,
    /// Shipped content. Failures to resolve base content are fatal.
    pub base_content: bool,
    /// Character element (without any override wrapper).
    pub element: Element,
}

impl SpeciesDefinition {
    /// Reads a definition from a parsed character file.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::InvalidField`] if the element has no species name.
    pub fn from_element(
        element: &Element,
        source_file: impl Into<PathBuf>,
        base_content: bool,
    ) -> Result<Self, RagdollError> {
        let source_file = source_file.into();
        let root = element.without_override();
        let species = root
            .attribute("speciesname")
            .or_else(|| root.attribute("name"))
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RagdollError::InvalidField {
                species: String::new(),
                path: source_file.clone(),
                element: root.name.clone(),
                field: "speciesname",
                value: None,
            })?;
        let ragdoll = root
            .first_child_named("ragdolls")
            .or_else(|| root.first_child_named("ragdoll"));
        let non_empty = |name: &str| {
            ragdoll
                .and_then(|r| r.attribute(name))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            variant_of: root
                .attribute("variantof")
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            humanoid: root
                .attribute("humanoid")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            folder: non_empty("folder"),
            file: non_empty("path").or_else(|| non_empty("file")),
            species,
            source_file,
            base_content,
            element: root.clone(),
        })
    }

    /// Reads a character file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>, base_content: bool) -> Result<Self, RagdollError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RagdollError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let element = Element::parse(&text).map_err(|source| RagdollError::Markup {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_element(&element, path, base_content)
    }

    /// `true` if the ragdoll element names its own folder.
    pub fn has_folder_override(&self) -> bool {
        self.folder
            .as_deref()
            .is_some_and(|f| !f.eq_ignore_ascii_case("default"))
    }

    /// Folder holding this species' ragdoll files. The override folder is
    /// relative to `content_root`; the default is `Ragdolls` next to the
    /// character file.
    pub fn ragdoll_folder(&self, content_root: &Path) -> PathBuf {
        match self.folder.as_deref() {
            Some(folder) if self.has_folder_override() => content_root.join(folder),
            _ => self
                .source_file
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("Ragdolls"),
        }
    }
}

/// `{Species}DefaultRagdoll`, with the first letter capitalised.
pub fn default_file_name(species: &str) -> String {
    let mut chars = species.chars();
    match chars.next() {
        Some(first) => format!("{}{}DefaultRagdoll", first.to_uppercase(), chars.as_str()),
        None => "DefaultRagdoll".to_string(),
    }
}

/// All known species, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct SpeciesCatalog {
    species: FxHashMap<String, SpeciesDefinition>,
}

impl SpeciesCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a definition. Returns the one it replaced.
    pub fn insert(&mut self, definition: SpeciesDefinition) -> Option<SpeciesDefinition> {
        self.species.insert(definition.species.clone(), definition)
    }

    pub fn get(&self, species: &str) -> Option<&SpeciesDefinition> {
        self.species.get(&species.to_lowercase())
    }

    pub fn remove(&mut self, species: &str) -> Option<SpeciesDefinition> {
        self.species.remove(&species.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Iterates over definitions in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &SpeciesDefinition> {
        self.species.values()
    }

    /// Scans `dir` recursively for character files and adds them.
    ///
    /// Files whose root is not a character (ragdolls, animations) are skipped,
    /// as are unreadable ones, with a warning. Returns the number added.
    pub fn scan_dir(&mut self, dir: impl AsRef<Path>, base_content: bool) -> usize {
        let mut files: Vec<PathBuf> = WalkDir::new(dir.as_ref())
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e.into_path()),
                Err(err) => {
                    tracing::warn!("Skipping unreadable content entry: {err}");
                    None
                }
            })
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
            })
            .collect();
        // Deterministic order so later definitions win consistently.
        files.sort();

        let mut added = 0;
        for file in files {
            let element = match fs::read_to_string(&file)
                .map_err(|e| e.to_string())
                .and_then(|text| Element::parse(&text).map_err(|e| e.to_string()))
            {
                Ok(element) => element,
                Err(err) => {
                    tracing::warn!("Skipping {}: {err}", file.display());
                    continue;
                }
            };
            if !element.without_override().is_named("character") {
                continue;
            }
            match SpeciesDefinition::from_element(&element, &file, base_content) {
                Ok(definition) => {
                    tracing::debug!("Found species `{}` in {}", definition.species, file.display());
                    self.insert(definition);
                    added += 1;
                }
                Err(err) => tracing::warn!("Skipping {}: {err}", file.display()),
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name("crawler"), "CrawlerDefaultRagdoll");
        assert_eq!(default_file_name("Human"), "HumanDefaultRagdoll");
    }

    #[test]
    fn test_definition_from_override() {
        let element = Element::parse(
            r#"<override><Character SpeciesName="CrawlerHusk" VariantOf="Crawler">
                 <ragdolls folder="Default" scalemultiplier="1.2"/>
               </Character></override>"#,
        )
        .unwrap();
        let def = SpeciesDefinition::from_element(&element, "Mods/Husk/CrawlerHusk.xml", false)
            .unwrap();
        assert_eq!(def.species, "crawlerhusk");
        assert_eq!(def.variant_of.as_deref(), Some("crawler"));
        assert!(!def.has_folder_override());
        assert_eq!(
            def.ragdoll_folder(Path::new("/game")),
            Path::new("Mods/Husk/Ragdolls")
        );
        assert!(def.element.is_named("character"));
    }

    #[test]
    fn test_folder_override_and_file() {
        let element = Element::parse(
            r#"<Character speciesname="mantis" humanoid="True">
                 <ragdoll folder="Content/Shared/Ragdolls" path="Content/Shared/Ragdolls/Mantis.xml"/>
               </Character>"#,
        )
        .unwrap();
        let def = SpeciesDefinition::from_element(&element, "c/Mantis.xml", true).unwrap();
        assert!(def.humanoid);
        assert!(def.has_folder_override());
        assert_eq!(
            def.ragdoll_folder(Path::new("/game")),
            Path::new("/game/Content/Shared/Ragdolls")
        );
        assert_eq!(def.file.as_deref(), Some("Content/Shared/Ragdolls/Mantis.xml"));
    }

    #[test]
    fn test_missing_species_name() {
        let element = Element::parse("<Character/>").unwrap();
        assert!(SpeciesDefinition::from_element(&element, "x.xml", true).is_err());
    }

    #[test]
    fn test_scan_dir_finds_characters_only() {
        let dir = tempfile::tempdir().unwrap();
        let human = dir.path().join("Human");
        fs::create_dir_all(human.join("Ragdolls")).unwrap();
        fs::write(
            human.join("Human.xml"),
            r#"<Character speciesname="human" humanoid="true"/>"#,
        )
        .unwrap();
        fs::write(
            human.join("Ragdolls").join("HumanDefaultRagdoll.xml"),
            r#"<Ragdoll><limb id="0"/></Ragdoll>"#,
        )
        .unwrap();
        fs::write(dir.path().join("broken.xml"), "<Character speciesname=").unwrap();

        let mut catalog = SpeciesCatalog::new();
        assert_eq!(catalog.scan_dir(dir.path(), true), 1);
        let def = catalog.get("HUMAN").unwrap();
        assert!(def.base_content);
        assert_eq!(def.ragdoll_folder(dir.path()), human.join("Ragdolls"));
    }
}
