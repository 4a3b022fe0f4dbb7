//! Subcommand implementations.

use std::fmt;
use std::path::{Path, PathBuf};

use nebula_config::Config;
use nebula_ragdoll::{
    LoadOptions, RagdollDocument, RagdollError, RagdollRegistry, RegistrySettings, SpeciesCatalog,
    apply_variant_overlay,
};
use tracing::{info, warn};

/// Base content lives under `<root>/Content`, mods under `<root>/Mods`.
const BASE_DIR: &str = "Content";
const MODS_DIR: &str = "Mods";

fn load_options(config: &Config) -> LoadOptions {
    LoadOptions {
        visuals: config.ragdoll.load_visuals,
        validate_joints: config.ragdoll.validate_joints,
    }
}

/// Species key for a file when none is given: the file name without the
/// `DefaultRagdoll` suffix.
fn species_for(file: &Path, species: Option<&str>) -> String {
    if let Some(species) = species {
        return species.to_lowercase();
    }
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    stem.strip_suffix("defaultragdoll")
        .filter(|s| !s.is_empty())
        .map_or_else(|| stem.clone(), str::to_string)
}

/// Loads every file and logs the outcome. Returns how many failed.
pub fn check(config: &Config, files: &[PathBuf], species: Option<&str>) -> usize {
    let options = load_options(config);
    let mut failed = 0;
    for file in files {
        let key = species_for(file, species);
        match RagdollDocument::load_with(file, &key, options) {
            Ok(doc) => info!(
                "{}: ok ({} colliders, {} limbs, {} joints)",
                file.display(),
                doc.colliders().len(),
                doc.limbs().len(),
                doc.joints().len()
            ),
            Err(err) => {
                warn!("{}: {err}", file.display());
                failed += 1;
            }
        }
    }
    failed
}

/// Loads `file` and saves it in the canonical format. Returns the path
/// written.
///
/// # Errors
///
/// Returns [`RagdollError`] if loading or saving fails.
pub fn normalize(
    config: &Config,
    file: &Path,
    output: Option<&Path>,
    species: Option<&str>,
) -> Result<PathBuf, RagdollError> {
    let mut doc = RagdollDocument::load_with(file, &species_for(file, species), load_options(config))?;
    doc.save(output, config.editor.indent)?;
    Ok(doc.source_path().to_path_buf())
}

/// Summary of a resolved ragdoll.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveReport {
    pub species: String,
    /// Species the document was loaded for (differs after a fallback).
    pub resolved_as: String,
    pub source: PathBuf,
    pub colliders: usize,
    pub limbs: usize,
    pub joints: usize,
    pub limb_scale: f32,
    pub joint_scale: f32,
    pub variant_overlay: bool,
}

impl fmt::Display for ResolveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "species:     {}", self.species)?;
        if self.resolved_as != self.species {
            writeln!(f, "ragdoll of:  {}", self.resolved_as)?;
        }
        writeln!(f, "source:      {}", self.source.display())?;
        writeln!(
            f,
            "nodes:       {} colliders, {} limbs, {} joints",
            self.colliders, self.limbs, self.joints
        )?;
        write!(
            f,
            "scale:       limb {} joint {}{}",
            self.limb_scale,
            self.joint_scale,
            if self.variant_overlay { " (variant)" } else { "" }
        )
    }
}

/// Builds a registry over the configured content root.
pub fn registry(config: &Config) -> RagdollRegistry {
    let root = &config.ragdoll.content_root;
    let mut catalog = SpeciesCatalog::new();
    let base = catalog.scan_dir(root.join(BASE_DIR), true);
    let mods = root.join(MODS_DIR);
    let modded = if mods.is_dir() {
        catalog.scan_dir(mods, false)
    } else {
        0
    };
    info!("Found {base} base and {modded} modded species");
    RagdollRegistry::new(RegistrySettings::from_config(config), catalog)
}

/// Resolves `species` and applies its variant overlay to a copy.
///
/// # Errors
///
/// Returns [`RagdollError`] if resolution fails for good.
pub fn resolve(
    config: &Config,
    species: &str,
    file: Option<&str>,
) -> Result<ResolveReport, RagdollError> {
    let mut registry = registry(config);
    let shared = registry.resolve_file(species, file)?;
    let mut doc = shared.borrow().clone();
    let variant = registry.variant_source(species).map(|d| &d.element);
    let variant_overlay = apply_variant_overlay(&mut doc, variant);

    Ok(ResolveReport {
        species: species.to_lowercase(),
        resolved_as: doc.species().to_string(),
        source: doc.source_path().to_path_buf(),
        colliders: doc.colliders().len(),
        limbs: doc.limbs().len(),
        joints: doc.joints().len(),
        limb_scale: doc.limb_scale(),
        joint_scale: doc.joint_scale(),
        variant_overlay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAGDOLL: &str = r#"<Ragdoll limbscale="0.5" jointscale="0.5">
    <limb id="1"/>
        <limb id="0"/>
  <joint limb1="0" limb2="1"/>
</Ragdoll>"#;

    fn content(root: &Path) {
        let write = |path: PathBuf, text: &str| {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, text).unwrap();
        };
        let crawler = root.join("Content/Characters/Crawler");
        write(crawler.join("Crawler.xml"), r#"<Character speciesname="crawler"/>"#);
        write(crawler.join("Ragdolls/CrawlerDefaultRagdoll.xml"), RAGDOLL);
        write(
            root.join("Mods/Husk/Crawlerhusk.xml"),
            r#"<Character speciesname="crawlerhusk" variantof="crawler"><ragdoll scalemultiplier="3"/></Character>"#,
        );
    }

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.ragdoll.content_root = root.to_path_buf();
        config
    }

    #[test]
    fn test_species_for_file() {
        assert_eq!(species_for(Path::new("a/CrawlerDefaultRagdoll.xml"), None), "crawler");
        assert_eq!(species_for(Path::new("Husk.xml"), None), "husk");
        assert_eq!(species_for(Path::new("x.xml"), Some("Human")), "human");
    }

    #[test]
    fn test_check_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.xml");
        let bad = dir.path().join("bad.xml");
        std::fs::write(&good, RAGDOLL).unwrap();
        std::fs::write(&bad, r#"<Ragdoll><joint limb1="0" limb2="9"/></Ragdoll>"#).unwrap();
        let missing = dir.path().join("missing.xml");
        assert_eq!(check(&Config::default(), &[good, bad, missing], None), 2);
    }

    #[test]
    fn test_normalize_reindents() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xml");
        std::fs::write(&input, RAGDOLL).unwrap();
        let output = dir.path().join("out.xml");
        let written = normalize(&Config::default(), &input, Some(&output), Some("crawler")).unwrap();
        assert_eq!(written, output);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("\n  <limb id=\"1\""));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_resolve_variant_applies_overlay() {
        let dir = tempfile::tempdir().unwrap();
        content(dir.path());
        let report = resolve(&config(dir.path()), "CrawlerHusk", None).unwrap();
        assert_eq!(report.species, "crawlerhusk");
        assert_eq!(report.resolved_as, "crawler");
        assert!(report.variant_overlay);
        assert_eq!(report.limb_scale, 1.5);
        assert_eq!(report.limbs, 2);
        assert!(report.to_string().contains("ragdoll of:  crawler"));
    }

    #[test]
    fn test_resolve_base_species() {
        let dir = tempfile::tempdir().unwrap();
        content(dir.path());
        let report = resolve(&config(dir.path()), "crawler", None).unwrap();
        assert!(!report.variant_overlay);
        assert_eq!(report.limb_scale, 0.5);
        assert!(report.source.ends_with("CrawlerDefaultRagdoll.xml"));
    }
}
