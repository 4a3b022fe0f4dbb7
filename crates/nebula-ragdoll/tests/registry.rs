//! Resolution against an on-disk content tree.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use nebula_config::Config;
use nebula_ragdoll::{
    ParamValue, RagdollRegistry, RegistrySettings, SpeciesCatalog, apply_variant_overlay,
};

const RAGDOLL: &str = r#"<Ragdoll limbscale="1" jointscale="1">
  <collider radius="20"/>
  <limb id="1" type="Head"><sprite texture="head.png"/></limb>
  <limb id="0" type="Torso"/>
  <joint limb1="0" limb2="1"/>
</Ragdoll>"#;

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn content_tree(root: &Path) {
    let chars = root.join("Content/Characters");
    write(
        &chars.join("Human/Human.xml"),
        r#"<Character speciesname="human" humanoid="true"/>"#,
    );
    write(&chars.join("Human/Ragdolls/HumanDefaultRagdoll.xml"), RAGDOLL);
    write(
        &chars.join("Crawler/Crawler.xml"),
        r#"<Character speciesname="crawler"/>"#,
    );
    write(&chars.join("Crawler/Ragdolls/CrawlerDefaultRagdoll.xml"), RAGDOLL);
}

fn registry(root: &Path, config: &mut Config) -> RagdollRegistry {
    config.ragdoll.content_root = root.to_path_buf();
    let mut catalog = SpeciesCatalog::new();
    catalog.scan_dir(root.join("Content"), true);
    let mods = root.join("Mods");
    if mods.exists() {
        catalog.scan_dir(mods, false);
    }
    RagdollRegistry::new(RegistrySettings::from_config(config), catalog)
}

#[test]
fn test_shared_document_sees_edits() {
    let dir = tempfile::tempdir().unwrap();
    content_tree(dir.path());
    let mut registry = registry(dir.path(), &mut Config::default());

    let consumer = registry.resolve("human").unwrap();
    let editor = registry.resolve("human").unwrap();
    assert!(Rc::ptr_eq(&consumer, &editor));
    editor
        .borrow_mut()
        .set_root("limbscale", ParamValue::Float(1.5))
        .unwrap();
    assert_eq!(consumer.borrow().limb_scale(), 1.5);
}

#[test]
fn test_mod_variant_gets_overlay_on_copy() {
    let dir = tempfile::tempdir().unwrap();
    content_tree(dir.path());
    write(
        &dir.path().join("Mods/Husk/Crawlerhusk.xml"),
        r#"<override><Character speciesname="crawlerhusk" variantof="crawler">
             <ragdolls scalemultiplier="2"/>
           </Character></override>"#,
    );
    let mut registry = registry(dir.path(), &mut Config::default());

    let shared = registry.resolve("crawlerhusk").unwrap();
    let source = registry.variant_source("crawlerhusk").unwrap().element.clone();
    let mut husk = shared.borrow().clone();
    assert!(apply_variant_overlay(&mut husk, Some(&source)));
    assert_eq!(husk.limb_scale(), 2.0);
    assert_eq!(shared.borrow().limb_scale(), 1.0);
}

#[test]
fn test_broken_mod_ragdoll_uses_fallback() {
    let dir = tempfile::tempdir().unwrap();
    content_tree(dir.path());
    write(
        &dir.path().join("Mods/Golem/Golem.xml"),
        r#"<Character speciesname="golem" humanoid="true"/>"#,
    );
    write(
        &dir.path().join("Mods/Golem/Ragdolls/GolemDefaultRagdoll.xml"),
        r#"<Ragdoll><limb id="0"/><joint limb1="0" limb2="7"/></Ragdoll>"#,
    );
    let mut registry = registry(dir.path(), &mut Config::default());

    let golem = registry.resolve("golem").unwrap();
    assert_eq!(golem.borrow().species(), "human");
    assert_eq!(golem.borrow().limbs().len(), 2);
}

#[test]
fn test_lenient_joints_and_no_visuals_from_config() {
    let dir = tempfile::tempdir().unwrap();
    content_tree(dir.path());
    write(
        &dir.path().join("Mods/Golem/Golem.xml"),
        r#"<Character speciesname="golem"/>"#,
    );
    write(
        &dir.path().join("Mods/Golem/Ragdolls/GolemDefaultRagdoll.xml"),
        r#"<Ragdoll><limb id="0"><sprite/></limb><joint limb1="0" limb2="7"/></Ragdoll>"#,
    );
    let mut config = Config::default();
    config.ragdoll.validate_joints = false;
    config.ragdoll.load_visuals = false;
    let mut registry = registry(dir.path(), &mut config);

    let golem = registry.resolve("golem").unwrap();
    let golem = golem.borrow();
    assert_eq!(golem.species(), "golem");
    assert_eq!(golem.joints().len(), 1);
    let limb = golem.node(golem.limbs()[0]).unwrap();
    assert!(limb.children().is_empty());
}
