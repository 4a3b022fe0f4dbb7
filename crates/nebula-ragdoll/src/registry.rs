//! Shared ragdoll cache keyed by species and file.
//!
//! Resolution order for a species:
//!
//! 1. a cached document for the same key;
//! 2. an explicit content path (from the caller or the character file);
//! 3. the parent species' document, for variants that keep the default folder;
//! 4. the best match in the species' ragdoll folder;
//! 5. the humanoid or creature fallback ragdoll.
//!
//! Failures of base content are never papered over with a fallback.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use nebula_config::{Config, FallbackRagdoll};
use rustc_hash::FxHashMap;

use crate::catalog::{SpeciesCatalog, SpeciesDefinition, default_file_name};
use crate::document::{DEFAULT_INDENT, LoadOptions, RagdollDocument};
use crate::error::RagdollError;

/// A document shared between every caller that resolved it.
pub type SharedDocument = Rc<RefCell<RagdollDocument>>;

/// Ragdoll written by [`RagdollRegistry::create_default`] when no template
/// is given.
const EMPTY_RAGDOLL: &str = "<Ragdoll limbscale=\"1\" jointscale=\"1\">\n</Ragdoll>\n";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything the registry needs besides the species catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySettings {
    /// Directory content paths resolve against.
    pub content_root: PathBuf,
    /// Fallback for humanoid species.
    pub humanoid_fallback: FallbackRagdoll,
    /// Fallback for every other species.
    pub creature_fallback: FallbackRagdoll,
    /// Options every document is loaded with.
    pub load_options: LoadOptions,
    /// Indentation of files written by the registry.
    pub indent: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RegistrySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            content_root: config.ragdoll.content_root.clone(),
            humanoid_fallback: config.ragdoll.humanoid_fallback.clone(),
            creature_fallback: config.ragdoll.creature_fallback.clone(),
            load_options: LoadOptions {
                visuals: config.ragdoll.load_visuals,
                validate_joints: config.ragdoll.validate_joints,
            },
            indent: if config.editor.indent == 0 {
                DEFAULT_INDENT
            } else {
                config.editor.indent
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Cache of resolved ragdolls.
///
/// Resolving the same species and file twice yields the same
/// [`SharedDocument`], so an edit made through one handle is seen by all.
/// Not thread-safe; owned by whichever thread runs the content update loop.
#[derive(Debug, Default)]
pub struct RagdollRegistry {
    settings: RegistrySettings,
    catalog: SpeciesCatalog,
    /// species -> file key -> document
    cache: FxHashMap<String, FxHashMap<String, SharedDocument>>,
    /// parent species -> (variant species, file key) entries sharing its document
    aliases: FxHashMap<String, Vec<(String, String)>>,
}

impl RagdollRegistry {
    pub fn new(settings: RegistrySettings, catalog: SpeciesCatalog) -> Self {
        Self {
            settings,
            catalog,
            cache: FxHashMap::default(),
            aliases: FxHashMap::default(),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn catalog(&self) -> &SpeciesCatalog {
        &self.catalog
    }

    /// Mutable catalog access. Cached documents are not invalidated.
    pub fn catalog_mut(&mut self) -> &mut SpeciesCatalog {
        &mut self.catalog
    }

    /// Resolves the default ragdoll of `species`.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::VariantCycle`] for looping variant chains and
    /// [`RagdollError::BaseContent`] when base content or the fallback
    /// itself fails to load.
    pub fn resolve(&mut self, species: &str) -> Result<SharedDocument, RagdollError> {
        self.resolve_file(species, None)
    }

    /// Resolves `species` using `file`, which is either a content path
    /// (`Content/.../Foo.xml`) or a bare file name looked up in the species'
    /// ragdoll folder.
    ///
    /// # Errors
    ///
    /// See [`RagdollRegistry::resolve`].
    pub fn resolve_file(
        &mut self,
        species: &str,
        file: Option<&str>,
    ) -> Result<SharedDocument, RagdollError> {
        let mut visited = Vec::new();
        self.resolve_inner(&species.trim().to_lowercase(), file, &mut visited)
    }

    /// Cached document of `species` for `file` (or the default file name).
    pub fn cached(&self, species: &str, file: Option<&str>) -> Option<SharedDocument> {
        let species = species.to_lowercase();
        let key = file.map_or_else(|| default_file_name(&species), str::to_string);
        self.cache.get(&species)?.get(&key).cloned()
    }

    /// Drops every cached document of `species`, along with the entries of
    /// variants that share one of them. Returns how many were dropped.
    pub fn invalidate(&mut self, species: &str) -> usize {
        let species = species.to_lowercase();
        let dropped = self
            .cache
            .remove(&species)
            .map_or(0, |entries| entries.len())
            + self.drop_aliases(&species);
        if dropped > 0 {
            tracing::debug!("Invalidated {dropped} cached ragdoll(s) of `{species}`");
        }
        dropped
    }

    /// Drops the variant entries aliasing `parent`, and theirs in turn.
    fn drop_aliases(&mut self, parent: &str) -> usize {
        let Some(aliases) = self.aliases.remove(parent) else {
            return 0;
        };
        let mut dropped = 0;
        for (variant, key) in aliases {
            if let Some(entries) = self.cache.get_mut(&variant)
                && entries.remove(&key).is_some()
            {
                dropped += 1;
            }
            dropped += self.drop_aliases(&variant);
        }
        dropped
    }

    /// Drops the whole cache.
    pub fn clear_all(&mut self) {
        let dropped = self.len();
        self.cache.clear();
        self.aliases.clear();
        tracing::info!("Cleared {dropped} cached ragdoll(s)");
    }

    /// Number of cached (species, file) entries.
    pub fn len(&self) -> usize {
        self.cache.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.values().all(FxHashMap::is_empty)
    }

    /// Character definition whose ragdoll element should be overlaid on the
    /// document resolved for `species`: the species' own definition when it
    /// is a variant, `None` otherwise.
    pub fn variant_source(&self, species: &str) -> Option<&SpeciesDefinition> {
        self.catalog
            .get(species)
            .filter(|definition| definition.variant_of.is_some())
    }

    /// Writes a new ragdoll file for `species` to `path` (relative paths are
    /// taken from the content root), loads it and makes it the cached
    /// document under the file's name. Other cached entries of the species
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError`] if the file cannot be written or the template
    /// does not load.
    pub fn create_default(
        &mut self,
        species: &str,
        path: impl AsRef<Path>,
        template: Option<&str>,
    ) -> Result<SharedDocument, RagdollError> {
        let species = species.trim().to_lowercase();
        let path = self.settings.content_root.join(path.as_ref());
        let mut document = RagdollDocument::from_markup_str(
            template.unwrap_or(EMPTY_RAGDOLL),
            &species,
            &path,
            self.settings.load_options,
        )?;
        document.save(Some(&path), self.settings.indent)?;

        let key = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| default_file_name(&species));
        self.invalidate(&species);
        let shared = Rc::new(RefCell::new(document));
        self.insert(&species, key, Rc::clone(&shared));
        tracing::info!("Created ragdoll for `{species}` at {}", path.display());
        Ok(shared)
    }

    fn insert(&mut self, species: &str, key: String, document: SharedDocument) {
        self.cache
            .entry(species.to_string())
            .or_default()
            .insert(key, document);
    }

    fn resolve_inner(
        &mut self,
        species: &str,
        file: Option<&str>,
        visited: &mut Vec<String>,
    ) -> Result<SharedDocument, RagdollError> {
        if visited.iter().any(|s| s == species) {
            let mut chain = visited.clone();
            chain.push(species.to_string());
            let err = RagdollError::VariantCycle {
                species: species.to_string(),
                chain,
            };
            tracing::error!("{err}");
            return Err(err);
        }
        visited.push(species.to_string());

        let definition = self.catalog.get(species).cloned();
        let file = file
            .map(str::to_string)
            .or_else(|| definition.as_ref().and_then(|d| d.file.clone()));
        let key = file.clone().unwrap_or_else(|| default_file_name(species));

        if let Some(document) = self.cache.get(species).and_then(|e| e.get(&key)) {
            tracing::debug!("Ragdoll cache hit for `{species}` ({key})");
            return Ok(Rc::clone(document));
        }

        // Explicit content path.
        if let Some(content_path) = file.as_deref().filter(|f| is_content_path(f)) {
            let path = self.settings.content_root.join(content_path);
            match RagdollDocument::load_with(&path, species, self.settings.load_options) {
                Ok(document) => {
                    tracing::info!("Loaded ragdoll for `{species}` from {}", path.display());
                    let shared = Rc::new(RefCell::new(document));
                    self.insert(species, key, Rc::clone(&shared));
                    return Ok(shared);
                }
                Err(err) => {
                    tracing::warn!(
                        "Failed to load ragdoll for `{species}` from {}: {err}. Using the default ragdoll.",
                        path.display()
                    );
                }
            }
        }

        // Variants without their own folder share the parent's document.
        if file.is_none()
            && let Some(parent) = definition
                .as_ref()
                .filter(|d| !d.has_folder_override())
                .and_then(|d| d.variant_of.clone())
        {
            tracing::debug!("`{species}` uses the ragdoll of `{parent}`");
            let shared = self.resolve_inner(&parent, None, visited)?;
            self.insert(species, key.clone(), Rc::clone(&shared));
            self.aliases
                .entry(parent)
                .or_default()
                .push((species.to_string(), key));
            return Ok(shared);
        }

        let name = file.as_deref().filter(|f| !is_content_path(f));
        let loaded = match definition.as_ref() {
            Some(definition) => {
                let folder = definition.ragdoll_folder(&self.settings.content_root);
                select_file(&folder, species, name).and_then(|selected| {
                    tracing::debug!("Loading the ragdoll from {}", selected.display());
                    RagdollDocument::load_with(&selected, species, self.settings.load_options)
                })
            }
            None => Err(RagdollError::UnknownSpecies(species.to_string())),
        };

        match loaded {
            Ok(document) => {
                let shared = Rc::new(RefCell::new(document));
                self.insert(species, key, Rc::clone(&shared));
                Ok(shared)
            }
            Err(err) => self.fall_back(species, definition.as_ref(), err),
        }
    }

    /// Handles a species whose own ragdoll failed to load.
    fn fall_back(
        &mut self,
        species: &str,
        definition: Option<&SpeciesDefinition>,
        err: RagdollError,
    ) -> Result<SharedDocument, RagdollError> {
        if err.is_fatal() || self.is_protected(definition) {
            tracing::error!("Failed to load the ragdoll of base content `{species}`: {err}");
            return Err(RagdollError::BaseContent {
                species: species.to_string(),
                source: Box::new(err),
            });
        }

        let fallback = if definition.is_some_and(|d| d.humanoid) {
            self.settings.humanoid_fallback.clone()
        } else {
            self.settings.creature_fallback.clone()
        };
        if fallback.species.eq_ignore_ascii_case(species) {
            tracing::error!("The fallback ragdoll of `{species}` failed to load: {err}");
            return Err(RagdollError::BaseContent {
                species: species.to_string(),
                source: Box::new(err),
            });
        }

        tracing::warn!(
            "Failed to load the ragdoll of `{species}`: {err}. Falling back to `{}`.",
            fallback.species
        );
        let path = fallback.path.to_string_lossy().into_owned();
        let mut visited = Vec::new();
        self.resolve_inner(
            &fallback.species.to_lowercase(),
            Some(&path),
            &mut visited,
        )
    }

    /// Base content whose parent (if any) is base content too.
    fn is_protected(&self, definition: Option<&SpeciesDefinition>) -> bool {
        let Some(definition) = definition.filter(|d| d.base_content) else {
            return false;
        };
        match definition.variant_of.as_deref() {
            None => true,
            Some(parent) => self.catalog.get(parent).is_none_or(|p| p.base_content),
        }
    }
}

/// `true` for values naming a file by path rather than by bare name.
fn is_content_path(file: &str) -> bool {
    file.contains(['/', '\\'])
        || Path::new(file)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// Picks a ragdoll file from `folder`.
///
/// Without a name, the first file containing the default file name wins,
/// otherwise the first file. Files are ordered case-insensitively.
fn select_file(folder: &Path, species: &str, name: Option<&str>) -> Result<PathBuf, RagdollError> {
    let mut files: Vec<PathBuf> = fs::read_dir(folder)
        .map_err(|_| RagdollError::MissingFolder(folder.to_path_buf()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        })
        .collect();
    files.sort_by_cached_key(|p| p.to_string_lossy().to_lowercase());
    if files.is_empty() {
        return Err(RagdollError::MissingFolder(folder.to_path_buf()));
    }

    let default_name = default_file_name(species);
    let stem_is = |p: &PathBuf, wanted: &str| {
        p.file_stem()
            .is_some_and(|s| s.to_string_lossy().eq_ignore_ascii_case(wanted))
    };
    let selected = match name {
        None => {
            let wanted = default_name.to_lowercase();
            files
                .iter()
                .find(|p| {
                    p.file_name()
                        .is_some_and(|n| n.to_string_lossy().to_lowercase().contains(&wanted))
                })
                .or_else(|| files.first())
        }
        Some(name) => files
            .iter()
            .find(|p| stem_is(p, name))
            .or_else(|| {
                tracing::warn!(
                    "No ragdoll named `{name}` in {}. Using the default ragdoll.",
                    folder.display()
                );
                files.iter().find(|p| stem_is(p, &default_name))
            }),
    };
    selected.cloned().ok_or_else(|| RagdollError::MissingFile {
        folder: folder.to_path_buf(),
        name: name.unwrap_or(&default_name).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAGDOLL: &str = r#"<Ragdoll limbscale="1" jointscale="1">
  <limb id="0" type="Torso"/>
  <limb id="1" type="Head"/>
  <joint limb1="0" limb2="1"/>
</Ragdoll>"#;

    struct Content {
        dir: tempfile::TempDir,
    }

    impl Content {
        fn new() -> Self {
            let content = Self {
                dir: tempfile::tempdir().unwrap(),
            };
            content.character("Human", r#"speciesname="human" humanoid="true""#, "");
            content.ragdoll("Human", "HumanDefaultRagdoll.xml", RAGDOLL);
            content.character("Crawler", r#"speciesname="crawler""#, "");
            content.ragdoll("Crawler", "CrawlerDefaultRagdoll.xml", RAGDOLL);
            content
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn character(&self, name: &str, attributes: &str, body: &str) {
            let dir = self.root().join("Content/Characters").join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join(format!("{name}.xml")),
                format!("<Character {attributes}>{body}</Character>"),
            )
            .unwrap();
        }

        fn ragdoll(&self, name: &str, file: &str, text: &str) {
            let dir = self.root().join("Content/Characters").join(name).join("Ragdolls");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(file), text).unwrap();
        }

        fn registry(&self, base_content: bool) -> RagdollRegistry {
            let mut catalog = SpeciesCatalog::new();
            catalog.scan_dir(self.root(), base_content);
            let settings = RegistrySettings {
                content_root: self.root().to_path_buf(),
                ..RegistrySettings::default()
            };
            RagdollRegistry::new(settings, catalog)
        }
    }

    #[test]
    fn test_resolve_is_cached() {
        let content = Content::new();
        let mut registry = content.registry(true);
        let first = registry.resolve("human").unwrap();
        let second = registry.resolve("Human").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert!(registry.cached("human", None).is_some());
    }

    #[test]
    fn test_prefers_default_name_then_first_file() {
        let content = Content::new();
        content.ragdoll("Human", "AHumanVariant.xml", RAGDOLL);
        let mut registry = content.registry(true);
        let doc = registry.resolve("human").unwrap();
        assert!(doc.borrow().source_path().ends_with("HumanDefaultRagdoll.xml"));

        content.character("Mudraptor", r#"speciesname="mudraptor""#, "");
        content.ragdoll("Mudraptor", "Zeta.xml", RAGDOLL);
        content.ragdoll("Mudraptor", "alpha.xml", RAGDOLL);
        let mut registry = content.registry(true);
        let doc = registry.resolve("mudraptor").unwrap();
        assert!(doc.borrow().source_path().ends_with("alpha.xml"));
    }

    #[test]
    fn test_named_file_in_folder() {
        let content = Content::new();
        content.ragdoll("Human", "HumanHusk.xml", RAGDOLL);
        let mut registry = content.registry(true);
        let doc = registry.resolve_file("human", Some("humanhusk")).unwrap();
        assert!(doc.borrow().source_path().ends_with("HumanHusk.xml"));
        assert!(registry.cached("human", Some("humanhusk")).is_some());
    }

    #[test]
    fn test_explicit_content_path() {
        let content = Content::new();
        content.ragdoll("Crawler", "Big.xml", RAGDOLL);
        let mut registry = content.registry(false);
        let doc = registry
            .resolve_file("human", Some("Content/Characters/Crawler/Ragdolls/Big.xml"))
            .unwrap();
        assert_eq!(doc.borrow().species(), "human");
        assert!(doc.borrow().source_path().ends_with("Big.xml"));
    }

    #[test]
    fn test_variant_shares_parent_document() {
        let content = Content::new();
        content.character(
            "Crawlerhusk",
            r#"speciesname="crawlerhusk" variantof="crawler""#,
            r#"<ragdolls scalemultiplier="2"/>"#,
        );
        let mut registry = content.registry(true);
        let husk = registry.resolve("crawlerhusk").unwrap();
        let crawler = registry.resolve("crawler").unwrap();
        assert!(Rc::ptr_eq(&husk, &crawler));
        assert!(registry.variant_source("crawlerhusk").is_some());
        assert!(registry.variant_source("crawler").is_none());
    }

    #[test]
    fn test_invalidating_parent_drops_variant_entries() {
        let content = Content::new();
        content.character(
            "Crawlerhusk",
            r#"speciesname="crawlerhusk" variantof="crawler""#,
            "",
        );
        content.character(
            "Crawlerhuskking",
            r#"speciesname="crawlerhuskking" variantof="crawlerhusk""#,
            "",
        );
        let mut registry = content.registry(true);
        let old = registry.resolve("crawlerhuskking").unwrap();
        assert!(Rc::ptr_eq(&old, &registry.resolve("crawlerhusk").unwrap()));
        assert_eq!(registry.len(), 3);

        content.ragdoll(
            "Crawler",
            "CrawlerDefaultRagdoll.xml",
            &RAGDOLL.replace(r#"limbscale="1""#, r#"limbscale="0.5""#),
        );
        assert_eq!(registry.invalidate("crawler"), 3);
        assert!(registry.is_empty());

        let crawler = registry.resolve("crawler").unwrap();
        let husk = registry.resolve("crawlerhusk").unwrap();
        let king = registry.resolve("crawlerhuskking").unwrap();
        assert_eq!(crawler.borrow().limb_scale(), 0.5);
        assert!(Rc::ptr_eq(&husk, &crawler));
        assert!(Rc::ptr_eq(&king, &crawler));
        assert!(!Rc::ptr_eq(&king, &old));
    }

    #[test]
    fn test_variant_with_own_entries_keeps_them() {
        let content = Content::new();
        content.character(
            "Crawlerhusk",
            r#"speciesname="crawlerhusk" variantof="crawler""#,
            "",
        );
        content.ragdoll("Crawlerhusk", "HuskClaws.xml", RAGDOLL);
        let mut registry = content.registry(true);
        registry.resolve("crawlerhusk").unwrap();
        let claws = registry.resolve_file("crawlerhusk", Some("huskclaws")).unwrap();

        assert_eq!(registry.invalidate("crawler"), 2);
        let kept = registry.cached("crawlerhusk", Some("huskclaws")).unwrap();
        assert!(Rc::ptr_eq(&kept, &claws));
        assert!(registry.cached("crawlerhusk", None).is_none());
    }

    #[test]
    fn test_broken_content_path_uses_folder() {
        let content = Content::new();
        let mut registry = content.registry(true);
        let doc = registry
            .resolve_file("crawler", Some("Content/Characters/Crawler/Ragdolls/Gone.xml"))
            .unwrap();
        assert!(doc.borrow().source_path().ends_with("CrawlerDefaultRagdoll.xml"));
        assert!(
            registry
                .cached("crawler", Some("Content/Characters/Crawler/Ragdolls/Gone.xml"))
                .is_some()
        );
    }

    #[test]
    fn test_broken_content_path_of_mod_falls_back() {
        let content = Content::new();
        content.character(
            "Mantis",
            r#"speciesname="mantis" humanoid="true""#,
            r#"<ragdoll path="Mods/Mantis/Broken.xml"/>"#,
        );
        let broken = content.root().join("Mods/Mantis");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("Broken.xml"), "<Ragdoll><limb id=").unwrap();
        let mut registry = content.registry(false);

        let mantis = registry.resolve("mantis").unwrap();
        assert_eq!(mantis.borrow().species(), "human");
        assert!(registry.cached("mantis", Some("Mods/Mantis/Broken.xml")).is_none());
    }

    #[test]
    fn test_variant_cycle_is_fatal() {
        let content = Content::new();
        content.character("A", r#"speciesname="a" variantof="b""#, "");
        content.character("B", r#"speciesname="b" variantof="a""#, "");
        let mut registry = content.registry(false);
        let err = registry.resolve("a").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_mod_content_falls_back() {
        let content = Content::new();
        content.character("Mantis", r#"speciesname="mantis" humanoid="true""#, "");
        content.ragdoll("Mantis", "MantisDefaultRagdoll.xml", "<Ragdoll><limb");
        content.character("Leech", r#"speciesname="leech""#, "");
        let mut registry = content.registry(false);

        let mantis = registry.resolve("mantis").unwrap();
        assert_eq!(mantis.borrow().species(), "human");
        let leech = registry.resolve("leech").unwrap();
        assert_eq!(leech.borrow().species(), "crawler");
        let unknown = registry.resolve("nobody").unwrap();
        assert!(Rc::ptr_eq(&unknown, &leech));
    }

    #[test]
    fn test_base_content_failure_is_fatal() {
        let content = Content::new();
        content.character("Mantis", r#"speciesname="mantis""#, "");
        let mut registry = content.registry(true);
        let err = registry.resolve("mantis").unwrap_err();
        assert!(matches!(err, RagdollError::BaseContent { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_fallback_is_fatal() {
        let content = Content::new();
        fs::remove_dir_all(content.root().join("Content/Characters/Crawler")).unwrap();
        content.character("Leech", r#"speciesname="leech""#, "");
        let mut registry = content.registry(false);
        assert!(registry.resolve("leech").unwrap_err().is_fatal());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let content = Content::new();
        let mut registry = content.registry(true);
        let first = registry.resolve("human").unwrap();
        registry.resolve("crawler").unwrap();
        assert_eq!(registry.invalidate("HUMAN"), 1);
        assert_eq!(registry.invalidate("human"), 0);
        let second = registry.resolve("human").unwrap();
        assert!(!Rc::ptr_eq(&first, &second));

        registry.clear_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_default_replaces_cache() {
        let content = Content::new();
        let mut registry = content.registry(true);
        let old = registry.resolve("human").unwrap();
        let created = registry
            .create_default(
                "human",
                "Content/Characters/Human/Ragdolls/HumanDefaultRagdoll.xml",
                None,
            )
            .unwrap();
        assert!(!Rc::ptr_eq(&old, &created));
        assert!(created.borrow().limbs().is_empty());
        let resolved = registry.resolve("human").unwrap();
        assert!(Rc::ptr_eq(&resolved, &created));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.ragdoll.load_visuals = false;
        config.editor.indent = 4;
        let settings = RegistrySettings::from_config(&config);
        assert!(!settings.load_options.visuals);
        assert_eq!(settings.indent, 4);
        assert_eq!(settings.creature_fallback.species, "crawler");
    }
}
