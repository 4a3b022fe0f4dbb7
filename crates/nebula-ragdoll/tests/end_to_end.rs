//! Load, edit, save and reload a full ragdoll through the public API.

use nebula_config::Config;
use nebula_ragdoll::{
    DEFAULT_INDENT, Element, LoadOptions, NodeKind, ParamValue, RagdollDocument, UndoHistory,
    apply_variant_overlay,
};

const RAGDOLL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Ragdoll texture="Content/Characters/Crawler/crawler.png" limbscale="0.5" jointscale="0.75" spritesheetorientation="0">
  <!-- body -->
  <collider radius="30" height="40"/>
  <collider radius="12"/>
  <limb id="3" type="RightLeg">
    <sprite sourcerect="0,0,32,64"/>
  </limb>
  <limb id="1" type="Head">
    <sprite sourcerect="32,0,32,32"/>
    <attack cooldown="1.5" damagerange="80">
      <affliction identifier="bleeding" strength="10" probability="1"/>
    </attack>
  </limb>
  <limb id="4" type="LeftLeg"/>
  <limb id="0" type="Torso">
    <damagemodifier damagemultiplier="0.5" armorsector="0,180"/>
  </limb>
  <limb id="2" type="Tail"/>
  <joint limb1="0" limb2="1"/>
  <joint limb1="0" limb2="2"/>
  <joint limb1="0" limb2="3"/>
  <joint limb1="0" limb2="4"/>
</Ragdoll>
"#;

const VARIANT: &str = r#"<override>
  <Character speciesname="crawlerhusk" variantof="crawler">
    <ragdolls scalemultiplier="2.0"/>
  </Character>
</override>"#;

fn limb_ids(doc: &RagdollDocument) -> Vec<i32> {
    doc.limbs().iter().map(|&l| doc.limb_id(l).unwrap()).collect()
}

fn joint_ids(doc: &RagdollDocument) -> Vec<(i32, i32)> {
    doc.joints()
        .iter()
        .map(|&j| {
            let props = doc.node(j).unwrap().properties();
            (props.int("limb1").unwrap(), props.int("limb2").unwrap())
        })
        .collect()
}

fn write_fixture() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CrawlerDefaultRagdoll.xml");
    std::fs::write(&path, RAGDOLL).unwrap();
    (dir, path)
}

#[test]
fn test_load_save_reload_keeps_structure() {
    let (dir, path) = write_fixture();
    let mut doc = RagdollDocument::load(&path, "crawler").unwrap();
    assert_eq!(doc.colliders().len(), 2);
    assert_eq!(limb_ids(&doc), [0, 1, 2, 3, 4]);
    assert_eq!(joint_ids(&doc), [(0, 1), (0, 2), (0, 3), (0, 4)]);

    let out = dir.path().join("saved").join("Crawler.xml");
    doc.save(Some(&out), DEFAULT_INDENT).unwrap();
    assert_eq!(doc.source_path(), out.as_path());

    let reloaded = RagdollDocument::load(&out, "crawler").unwrap();
    assert_eq!(reloaded.colliders().len(), 2);
    assert_eq!(limb_ids(&reloaded), limb_ids(&doc));
    assert_eq!(joint_ids(&reloaded), joint_ids(&doc));
    assert_eq!(reloaded.properties(), doc.properties());
    for (&a, &b) in doc.limbs().iter().zip(reloaded.limbs()) {
        let (a, b) = (doc.node(a).unwrap(), reloaded.node(b).unwrap());
        assert_eq!(a.properties(), b.properties());
        assert_eq!(a.children().len(), b.children().len());
    }

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(!text.starts_with("<?xml"));
    assert!(text.contains("<!-- body -->"));
}

#[test]
fn test_repeated_saves_are_byte_identical() {
    let (dir, path) = write_fixture();
    let mut doc = RagdollDocument::load(&path, "crawler").unwrap();
    let first = dir.path().join("a.xml");
    let second = dir.path().join("b.xml");
    doc.save(Some(&first), DEFAULT_INDENT).unwrap();
    doc.save(Some(&second), DEFAULT_INDENT).unwrap();
    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );

    let mut reloaded = RagdollDocument::load(&first, "crawler").unwrap();
    let third = dir.path().join("c.xml");
    reloaded.save(Some(&third), DEFAULT_INDENT).unwrap();
    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&third).unwrap());
}

#[test]
fn test_variant_overlay_doubles_scales_once() {
    let (_dir, path) = write_fixture();
    let mut doc = RagdollDocument::load(&path, "crawler").unwrap();
    let variant = Element::parse(VARIANT).unwrap();

    assert!(apply_variant_overlay(&mut doc, Some(&variant)));
    assert!(!apply_variant_overlay(&mut doc, Some(&variant)));
    assert_eq!(doc.limb_scale(), 1.0);
    assert_eq!(doc.joint_scale(), 1.5);
}

#[test]
fn test_edit_session_with_undo_and_reset() {
    let (_dir, path) = write_fixture();
    let mut doc = RagdollDocument::load(&path, "crawler").unwrap();
    let mut config = Config::default();
    config.editor.undo_depth = 8;
    let mut history = UndoHistory::from_config(&config);
    let head = doc.limb_by_id(1).unwrap();

    history.store(&doc);
    doc.set(head, "steerforce", ParamValue::Float(3.0)).unwrap();
    history.store(&doc);
    doc.set(head, "steerforce", ParamValue::Float(9.0)).unwrap();
    history.store(&doc);

    assert!(history.undo_into(&mut doc).unwrap());
    let force = |doc: &RagdollDocument| {
        doc.node(head).unwrap().properties().float("steerforce").unwrap()
    };
    assert_eq!(force(&doc), 3.0);
    assert!(history.undo_into(&mut doc).unwrap());
    let original = force(&doc);
    assert!(history.redo_into(&mut doc).unwrap());
    assert_eq!(force(&doc), 3.0);

    // Structural edits make older snapshots unusable.
    doc.add_sound(head).unwrap();
    assert!(history.undo_into(&mut doc).is_err());
    assert!(doc.child_of_kind(head, NodeKind::Sound).is_some());

    doc.reset(true).unwrap();
    let head = doc.limb_by_id(1).unwrap();
    assert!(doc.child_of_kind(head, NodeKind::Sound).is_none());
    assert_eq!(
        doc.node(head).unwrap().properties().float("steerforce").unwrap(),
        original
    );
}

#[test]
fn test_visuals_can_be_skipped() {
    let options = LoadOptions {
        visuals: false,
        ..LoadOptions::default()
    };
    let doc = RagdollDocument::from_markup_str(RAGDOLL, "crawler", "c.xml", options).unwrap();
    let head = doc.limb_by_id(1).unwrap();
    assert!(doc.child_of_kind(head, NodeKind::Sprite).is_none());
    assert!(doc.child_of_kind(head, NodeKind::Attack).is_some());
}
