//! Typed property values and their textual markup encoding.

use std::fmt;

use glam::Vec2;

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Str,
    /// 32-bit float. `NaN` is a legal value.
    Float,
    /// 32-bit signed integer.
    Int,
    /// `true` / `false`.
    Bool,
    /// One name out of a closed set, matched case-insensitively.
    Enum(&'static [&'static str]),
    /// `"x,y"`.
    Vector2,
    /// `"r,g,b,a"` with components in `0..=1`.
    Color,
    /// `"x,y,w,h"` in integer pixels.
    Rect,
}

/// A single typed property value.
///
/// Equality treats two `NaN` floats as equal so that unset orientation
/// fields compare the same after a save and reload.
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// Text value.
    Str(String),
    /// Float value.
    Float(f32),
    /// Integer value.
    Int(i32),
    /// Boolean value.
    Bool(bool),
    /// Canonical enum variant name.
    Enum(&'static str),
    /// 2D vector.
    Vector2(Vec2),
    /// RGBA color, components in `0..=1`.
    Color([f32; 4]),
    /// Integer rectangle.
    Rect([i32; 4]),
}

impl ParamValue {
    /// Parses `text` as a value of `kind`. Returns `None` if it does not convert.
    pub fn parse(kind: FieldKind, text: &str) -> Option<Self> {
        let text = text.trim();
        match kind {
            FieldKind::Str => Some(Self::Str(text.to_string())),
            FieldKind::Float => parse_float(text).map(Self::Float),
            FieldKind::Int => text
                .parse::<i32>()
                .ok()
                .or_else(|| {
                    // Integral floats such as "3.0" show up in hand-edited files.
                    parse_float(text)
                        .filter(|v| v.fract() == 0.0 && v.is_finite())
                        .map(|v| v as i32)
                })
                .map(Self::Int),
            FieldKind::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Self::Bool(true)),
                "false" | "0" | "no" => Some(Self::Bool(false)),
                _ => None,
            },
            FieldKind::Enum(variants) => variants
                .iter()
                .find(|v| v.eq_ignore_ascii_case(text))
                .copied()
                .map(Self::Enum),
            FieldKind::Vector2 => {
                let parts = parse_floats(text)?;
                match parts.as_slice() {
                    [x, y] => Some(Self::Vector2(Vec2::new(*x, *y))),
                    _ => None,
                }
            }
            FieldKind::Color => parse_color(text).map(Self::Color),
            FieldKind::Rect => {
                let parts: Option<Vec<i32>> =
                    text.split(',').map(|p| p.trim().parse::<i32>().ok()).collect();
                match parts?.as_slice() {
                    [x, y, w, h] => Some(Self::Rect([*x, *y, *w, *h])),
                    _ => None,
                }
            }
        }
    }

    /// Returns `true` if this value is a legal instance of `kind`.
    pub fn matches(&self, kind: FieldKind) -> bool {
        match (self, kind) {
            (Self::Enum(name), FieldKind::Enum(variants)) => variants.contains(name),
            (Self::Str(_), FieldKind::Str)
            | (Self::Float(_), FieldKind::Float)
            | (Self::Int(_), FieldKind::Int)
            | (Self::Bool(_), FieldKind::Bool)
            | (Self::Vector2(_), FieldKind::Vector2)
            | (Self::Color(_), FieldKind::Color)
            | (Self::Rect(_), FieldKind::Rect) => true,
            _ => false,
        }
    }

    /// Float payload, if this is a float.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer payload, if this is an integer.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean payload, if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload for strings and enum names.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            Self::Enum(v) => Some(v),
            _ => None,
        }
    }

    /// Vector payload, if this is a vector.
    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Self::Vector2(v) => Some(*v),
            _ => None,
        }
    }

    /// Color payload, if this is a color.
    pub fn as_color(&self) -> Option<[f32; 4]> {
        match self {
            Self::Color(v) => Some(*v),
            _ => None,
        }
    }

    /// Rectangle payload, if this is a rect.
    pub fn as_rect(&self) -> Option<[i32; 4]> {
        match self {
            Self::Rect(v) => Some(*v),
            _ => None,
        }
    }

    /// Zero value of a kind, used when a declared default fails to parse.
    pub(crate) fn zero(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Str => Self::Str(String::new()),
            FieldKind::Float => Self::Float(0.0),
            FieldKind::Int => Self::Int(0),
            FieldKind::Bool => Self::Bool(false),
            FieldKind::Enum(variants) => Self::Enum(variants.first().copied().unwrap_or("")),
            FieldKind::Vector2 => Self::Vector2(Vec2::ZERO),
            FieldKind::Color => Self::Color([0.0; 4]),
            FieldKind::Rect => Self::Rect([0; 4]),
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Vector2(a), Self::Vector2(b)) => a == b,
            (Self::Color(a), Self::Color(b)) => a == b,
            (Self::Rect(a), Self::Rect(b)) => a == b,
            _ => false,
        }
    }
}

/// Markup encoding. Floats use the shortest text that parses back exactly.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(v) => f.write_str(v),
            Self::Float(v) => write_float(f, *v),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Enum(v) => f.write_str(v),
            Self::Vector2(v) => {
                write_float(f, v.x)?;
                f.write_str(",")?;
                write_float(f, v.y)
            }
            Self::Color(c) => {
                for (i, component) in c.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_float(f, *component)?;
                }
                Ok(())
            }
            Self::Rect([x, y, w, h]) => write!(f, "{x},{y},{w},{h}"),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f32) -> fmt::Result {
    if v.is_nan() {
        f.write_str("NaN")
    } else {
        write!(f, "{v}")
    }
}

fn parse_float(text: &str) -> Option<f32> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("nan") {
        return Some(f32::NAN);
    }
    text.parse::<f32>().ok()
}

fn parse_floats(text: &str) -> Option<Vec<f32>> {
    text.split(',').map(parse_float).collect()
}

fn parse_color(text: &str) -> Option<[f32; 4]> {
    if let Some(hex) = text.strip_prefix('#') {
        return parse_hex_color(hex);
    }
    let parts = parse_floats(text)?;
    let mut rgba = match parts.as_slice() {
        [r, g, b] => [*r, *g, *b, 1.0],
        [r, g, b, a] => [*r, *g, *b, *a],
        _ => return None,
    };
    // Byte notation ("255,128,0,255") is converted to unit range.
    if rgba.iter().any(|c| *c > 1.0) {
        for c in &mut rgba {
            *c = (*c / 255.0).clamp(0.0, 1.0);
        }
    }
    Some(rgba)
}

fn parse_hex_color(hex: &str) -> Option<[f32; 4]> {
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return None;
    }
    let mut rgba = [1.0; 4];
    for (i, slot) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
        let byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        *slot = f32::from(byte) / 255.0;
    }
    Some(rgba)
}

// ---------------------------------------------------------------------------
// Enum variant tables
// ---------------------------------------------------------------------------

/// Limb roles used by animation and damage code.
pub const LIMB_TYPES: &[&str] = &[
    "None",
    "LeftHand",
    "RightHand",
    "LeftArm",
    "RightArm",
    "LeftForearm",
    "RightForearm",
    "LeftLeg",
    "RightLeg",
    "LeftFoot",
    "RightFoot",
    "Head",
    "Torso",
    "Tail",
    "Legs",
    "RightThigh",
    "LeftThigh",
    "Waist",
    "Jaw",
];

/// Whether a ragdoll (or part of it) can enter a submarine.
pub const CAN_ENTER_SUBMARINE: &[&str] = &["False", "True", "Partial"];

/// Physics body types.
pub const BODY_TYPES: &[&str] = &["Static", "Kinematic", "Dynamic"];

/// Easing curves for blink transitions.
pub const TRANSITION_MODES: &[&str] = &[
    "Linear",
    "Smooth",
    "Smoother",
    "EaseIn",
    "EaseOut",
    "Exponential",
];

/// Environments an attack can be used in.
pub const ATTACK_CONTEXTS: &[&str] = &["Any", "Water", "Ground", "Inside", "Outside", "NotDefined"];

/// What an attack can target.
pub const ATTACK_TARGETS: &[&str] = &["Any", "Character", "Structure", "Item"];
