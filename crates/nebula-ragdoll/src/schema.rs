//! Declared field tables for every node kind, and the property bag built
//! from them.
//!
//! Each node kind has one ordered table of [`FieldDef`]s describing how its
//! values are read from and written to markup attributes.

use crate::markup::{Attribute, find_attribute, set_attribute_in};
use crate::value::{
    ATTACK_CONTEXTS, ATTACK_TARGETS, BODY_TYPES, CAN_ENTER_SUBMARINE, FieldKind, LIMB_TYPES,
    ParamValue, TRANSITION_MODES,
};

/// Lower bound for the document limb and joint scale.
pub const MIN_SCALE: f32 = 0.1;
/// Upper bound for the document limb and joint scale.
pub const MAX_SCALE: f32 = 2.0;

// ---------------------------------------------------------------------------
// Field definitions
// ---------------------------------------------------------------------------

/// One declared field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDef {
    /// Attribute name (lower case; matched case-insensitively).
    pub name: &'static str,
    /// Declared type.
    pub kind: FieldKind,
    /// Default in markup notation.
    pub default: &'static str,
    /// Clamp range for numeric fields.
    pub bounds: Option<(f32, f32)>,
    /// Written back on serialize. Unsaveable fields are still read.
    pub saveable: bool,
    /// Must be present and convertible when loading.
    pub required: bool,
}

impl FieldDef {
    const fn new(name: &'static str, kind: FieldKind, default: &'static str) -> Self {
        Self {
            name,
            kind,
            default,
            bounds: None,
            saveable: true,
            required: false,
        }
    }

    const fn bounded(mut self, min: f32, max: f32) -> Self {
        self.bounds = Some((min, max));
        self
    }

    const fn unsaved(mut self) -> Self {
        self.saveable = false;
        self
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Parsed default value.
    pub fn default_value(&self) -> ParamValue {
        ParamValue::parse(self.kind, self.default).unwrap_or_else(|| ParamValue::zero(self.kind))
    }

    /// Applies the field bounds to a numeric value.
    pub fn clamp(&self, value: ParamValue) -> ParamValue {
        match (self.bounds, value) {
            (Some((min, max)), ParamValue::Float(v)) if !v.is_nan() => {
                ParamValue::Float(v.clamp(min, max))
            }
            (Some((min, max)), ParamValue::Int(v)) => {
                ParamValue::Int(v.clamp(min as i32, max as i32))
            }
            (_, value) => value,
        }
    }
}

/// Ordered field table of one node kind.
pub type Schema = &'static [FieldDef];

const fn string(name: &'static str, default: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Str, default)
}
const fn float(name: &'static str, default: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Float, default)
}
const fn int(name: &'static str, default: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Int, default)
}
const fn boolean(name: &'static str, default: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Bool, default)
}
const fn vector(name: &'static str, default: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Vector2, default)
}
const fn color(name: &'static str, default: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Color, default)
}
const fn choice(
    name: &'static str,
    variants: &'static [&'static str],
    default: &'static str,
) -> FieldDef {
    FieldDef::new(name, FieldKind::Enum(variants), default)
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Document-level fields on the root element.
pub static RAGDOLL_FIELDS: &[FieldDef] = &[
    string("texture", ""),
    color("color", "1,1,1,1"),
    float("spritesheetorientation", "0"),
    float("limbscale", "1").bounded(MIN_SCALE, MAX_SCALE),
    float("jointscale", "1").bounded(MIN_SCALE, MAX_SCALE),
    float("texturescale", "1").unsaved(),
    float("sourcerectscale", "1").unsaved(),
    float("colliderheightfromfloor", "45"),
    float("impacttolerance", "50"),
    choice("canentersubmarine", CAN_ENTER_SUBMARINE, "True"),
    boolean("canwalk", "true"),
    boolean("draggable", "true"),
    choice("mainlimb", LIMB_TYPES, "Torso"),
];

pub(crate) static COLLIDER_FIELDS: &[FieldDef] = &[
    string("name", ""),
    float("radius", "0"),
    float("height", "0"),
    float("width", "0"),
    choice("bodytype", BODY_TYPES, "Dynamic"),
];

pub(crate) static LIMB_FIELDS: &[FieldDef] = &[
    int("id", "-1").required(),
    string("name", ""),
    choice("type", LIMB_TYPES, "None"),
    choice("secondarytype", LIMB_TYPES, "None"),
    string("notes", ""),
    float("scale", "1"),
    boolean("flip", "true"),
    boolean("mirrorvertically", "false"),
    boolean("mirrorhorizontally", "false"),
    boolean("hide", "false"),
    float("spriteorientation", "NaN"),
    choice("inheritlimbdepth", LIMB_TYPES, "None"),
    float("steerforce", "0"),
    float("radius", "0"),
    float("height", "0"),
    float("width", "0"),
    float("density", "10"),
    boolean("ignorecollisions", "false"),
    float("angulardamping", "7"),
    float("attackpriority", "1"),
    vector("pullpos", "0,0"),
    vector("stepoffset", "0,0"),
    int("refjoint", "-1"),
    vector("mouthpos", "0,0"),
    float("eattorque", "50"),
    float("eatimpulse", "2"),
    float("constanttorque", "0"),
    float("constantangle", "0"),
    float("attackforcemultiplier", "1"),
    float("minseverancedamage", "1"),
    boolean("canbeseveredalive", "true"),
    float("severedfadeouttime", "10"),
    boolean("applytailangle", "false"),
    boolean("applysinemovement", "false"),
    float("sinefrequencymultiplier", "1"),
    float("sineamplitudemultiplier", "1"),
    float("blinkfrequency", "0"),
    float("blinkdurationin", "0.2"),
    float("blinkdurationout", "0.5"),
    float("blinkholdtime", "0"),
    float("blinkrotationin", "0"),
    float("blinkrotationout", "45"),
    float("blinkforce", "50"),
    boolean("onlyblinkinwater", "false"),
    boolean("usetextureoffsetforblinking", "false"),
    vector("blinktextureoffsetin", "0.5,0.5"),
    vector("blinktextureoffsetout", "0.5,0.5"),
    choice("blinktransitionin", TRANSITION_MODES, "Linear"),
    choice("blinktransitionout", TRANSITION_MODES, "Linear"),
    int("healthindex", "0"),
    float("friction", "0.3"),
    float("restitution", "0.05"),
    boolean("canentersubmarine", "true"),
    choice("inherithiding", LIMB_TYPES, "None"),
];

pub(crate) static JOINT_FIELDS: &[FieldDef] = &[
    string("name", ""),
    int("limb1", "-1").required(),
    int("limb2", "-1").required(),
    vector("limb1anchor", "1,1"),
    vector("limb2anchor", "1,1"),
    boolean("canbesevered", "true"),
    float("severanceprobabilitymodifier", "0"),
    string("breaksound", "gore"),
    boolean("limitenabled", "true"),
    float("upperlimit", "0"),
    float("lowerlimit", "0"),
    float("stiffness", "0.25"),
    float("scale", "1"),
    boolean("weldjoint", "false").unsaved(),
    boolean("clockwiserotation", "false"),
];

pub(crate) static SPRITE_FIELDS: &[FieldDef] = &[
    FieldDef::new("sourcerect", FieldKind::Rect, "0,0,0,0"),
    vector("origin", "0.5,0.5"),
    float("depth", "0"),
    string("texture", ""),
    boolean("ignoretint", "false"),
    color("color", "1,1,1,1"),
    color("deadcolor", "1,1,1,1"),
    float("deadcolortime", "0"),
];

pub(crate) static DEFORMATION_FIELDS: &[FieldDef] = &[vector("subdivisions", "10,10")];

pub(crate) static ATTACK_FIELDS: &[FieldDef] = &[
    choice("context", ATTACK_CONTEXTS, "Any"),
    choice("targettype", ATTACK_TARGETS, "Any"),
    float("range", "0"),
    float("damagerange", "0"),
    float("duration", "0"),
    float("cooldown", "5"),
    float("structuredamage", "0"),
    float("itemdamage", "0"),
    float("force", "0"),
    float("torque", "0"),
    float("targetimpulse", "0"),
    float("severlimbsprobability", "0"),
    float("priority", "1"),
];

pub(crate) static DAMAGE_MODIFIER_FIELDS: &[FieldDef] = &[
    float("damagemultiplier", "1"),
    float("probabilitymultiplier", "1"),
    string("afflictionidentifiers", ""),
    string("afflictiontypes", ""),
    vector("armorsector", "0,0"),
    boolean("deflectprojectiles", "false"),
    string("damagesound", ""),
];

pub(crate) static SOUND_FIELDS: &[FieldDef] = &[string("tag", "")];

pub(crate) static LIGHT_SOURCE_FIELDS: &[FieldDef] = &[
    color("color", "1,1,1,1"),
    float("range", "100"),
    float("flicker", "0"),
    float("flickerspeed", "1"),
    float("pulsefrequency", "0"),
    float("pulseamount", "0"),
    float("blinkfrequency", "0"),
];

pub(crate) static LIGHT_TEXTURE_FIELDS: &[FieldDef] = &[
    string("texture", "Content/Lights/pointlight_bright.png"),
    vector("origin", "0.5,0.5"),
    vector("size", "1,1"),
];

// ---------------------------------------------------------------------------
// Property bag
// ---------------------------------------------------------------------------

/// A field that failed to convert while reading markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name.
    pub field: &'static str,
    /// Offending text, or `None` if the required attribute was missing.
    pub value: Option<String>,
}

/// Rejected property assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The schema has no field with this name.
    UnknownField(String),
    /// The value's type does not match the declared kind.
    TypeMismatch(&'static str),
}

/// Schema-backed property values of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBag {
    schema: Schema,
    values: Vec<ParamValue>,
}

impl PropertyBag {
    /// All fields at their declared defaults.
    pub fn with_defaults(schema: Schema) -> Self {
        Self {
            schema,
            values: schema.iter().map(FieldDef::default_value).collect(),
        }
    }

    /// Reads every field from `attributes`.
    ///
    /// Missing attributes take the declared default; unconvertible optional
    /// ones fall back to the default as well. A required field that is
    /// missing or unconvertible yields a [`FieldError`].
    pub fn read(schema: Schema, attributes: &[Attribute]) -> Result<Self, FieldError> {
        let mut bag = Self::with_defaults(schema);
        bag.deserialize(attributes)?;
        Ok(bag)
    }

    /// Re-reads every field from `attributes` with the same rules as
    /// [`PropertyBag::read`]. On error the bag is left unchanged.
    pub fn deserialize(&mut self, attributes: &[Attribute]) -> Result<(), FieldError> {
        let mut values = Vec::with_capacity(self.schema.len());
        for field in self.schema {
            let value = match find_attribute(attributes, field.name) {
                Some(text) => match ParamValue::parse(field.kind, text) {
                    Some(value) => field.clamp(value),
                    None if field.required => {
                        return Err(FieldError {
                            field: field.name,
                            value: Some(text.to_string()),
                        });
                    }
                    None => {
                        tracing::debug!(
                            "Ignoring unconvertible value {text:?} for `{}`",
                            field.name
                        );
                        field.default_value()
                    }
                },
                None if field.required => {
                    return Err(FieldError {
                        field: field.name,
                        value: None,
                    });
                }
                None => field.default_value(),
            };
            values.push(value);
        }
        self.values = values;
        Ok(())
    }

    /// Writes every saveable field into `attributes`, replacing existing
    /// values in place and appending missing ones. Foreign attributes are
    /// left untouched.
    pub fn serialize(&self, attributes: &mut Vec<Attribute>) {
        for (field, value) in self.schema.iter().zip(&self.values) {
            if field.saveable {
                set_attribute_in(attributes, field.name, value.to_string());
            }
        }
    }

    /// The field table this bag follows.
    pub fn schema(&self) -> Schema {
        self.schema
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.schema
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Value of a field by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.index_of(name).map(|i| &self.values[i])
    }

    /// Assigns a field, applying its bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError`] for unknown fields or mismatched types.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), PropertyError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| PropertyError::UnknownField(name.to_string()))?;
        let field = &self.schema[index];
        if !value.matches(field.kind) {
            return Err(PropertyError::TypeMismatch(field.name));
        }
        self.values[index] = field.clamp(value);
        Ok(())
    }

    /// Iterates over `(field, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldDef, &ParamValue)> {
        self.schema.iter().zip(&self.values)
    }

    /// Float field, or `None` if missing or of another type.
    pub fn float(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(ParamValue::as_f32)
    }

    /// Integer field.
    pub fn int(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(ParamValue::as_i32)
    }

    /// Boolean field.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    /// String or enum field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }
}
