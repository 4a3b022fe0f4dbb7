//! One-shot scale adjustments taken from a variant character definition.

use crate::document::RagdollDocument;
use crate::markup::Element;
use crate::value::ParamValue;

/// Scale settings a variant character declares for the ragdoll it borrows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantScale {
    /// Multiplies both the limb and the joint scale.
    pub scale_multiplier: f32,
    /// Replaces the texture scale when positive.
    pub texture_scale: f32,
    /// Replaces the source rect scale when positive.
    pub source_rect_scale: f32,
}

impl Default for VariantScale {
    fn default() -> Self {
        Self {
            scale_multiplier: 1.0,
            texture_scale: 0.0,
            source_rect_scale: 0.0,
        }
    }
}

impl VariantScale {
    /// Reads the `<ragdoll>` (or `<ragdolls>`) element of a variant character
    /// file. Missing attributes keep their defaults.
    pub fn from_character(character: &Element) -> Self {
        let root = character.without_override();
        let Some(ragdoll) = root
            .first_child_named("ragdoll")
            .or_else(|| root.first_child_named("ragdolls"))
        else {
            return Self::default();
        };
        let float = |name: &str, default: f32| {
            ragdoll
                .attribute(name)
                .and_then(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(default)
        };
        Self {
            scale_multiplier: float("scalemultiplier", 1.0),
            texture_scale: float("texturescale", 0.0),
            source_rect_scale: float("sourcerectscale", 0.0),
        }
    }
}

/// Applies a variant's scales to `document` once.
///
/// Does nothing if `variant` is `None` or an overlay was already applied.
/// Otherwise the document is marked as adjusted even when the variant
/// declares no scales, so later calls are no-ops. Returns `true` if this
/// call applied the overlay.
pub fn apply_variant_overlay(document: &mut RagdollDocument, variant: Option<&Element>) -> bool {
    if document.variant_overlay_applied() {
        return false;
    }
    let Some(variant) = variant else {
        return false;
    };
    let scale = VariantScale::from_character(variant);
    let limb_scale = document.limb_scale() * scale.scale_multiplier;
    let joint_scale = document.joint_scale() * scale.scale_multiplier;

    let properties = document.properties_mut();
    let mut updates = vec![
        ("limbscale", limb_scale),
        ("jointscale", joint_scale),
    ];
    if scale.texture_scale > 0.0 {
        updates.push(("texturescale", scale.texture_scale));
    }
    if scale.source_rect_scale > 0.0 {
        updates.push(("sourcerectscale", scale.source_rect_scale));
    }
    for (field, value) in updates {
        if let Err(err) = properties.set(field, ParamValue::Float(value)) {
            tracing::warn!("Variant overlay could not set `{field}`: {err:?}");
        }
    }

    document.mark_variant_overlay_applied();
    tracing::debug!(
        "Applied variant overlay to `{}` (x{})",
        document.species(),
        scale.scale_multiplier
    );
    true
}
