use serde::{Deserialize, Serialize};
use tinyscene_common::Color;

/// Live-tweakable values read once per tick.
///
/// Last write wins; there is no history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneParams {
    pub sphere_color: Color,
    pub highlight_color: Color,
    pub wireframe: bool,
    pub rotation_speed: f32,
    pub bounce_speed: f32,
    pub angle: f32,
    pub penumbra: f32,
    pub intensity: f32,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            sphere_color: Color::from_hex(0x0000ff),
            highlight_color: Color::from_hex(0xff0000),
            wireframe: false,
            rotation_speed: 0.01,
            bounce_speed: 0.01,
            angle: 0.2,
            penumbra: 0.0,
            intensity: 150.0,
        }
    }
}

/// Declared widget range of a numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
}

impl ParamSpec {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

pub const NUMERIC_PARAMS: [ParamSpec; 5] = [
    ParamSpec { name: "rotation_speed", min: 0.001, max: 0.1 },
    ParamSpec { name: "bounce_speed", min: 0.0, max: 0.1 },
    ParamSpec { name: "angle", min: 0.0, max: 1.0 },
    ParamSpec { name: "penumbra", min: 0.0, max: 1.0 },
    ParamSpec { name: "intensity", min: 0.0, max: 1000.0 },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Color(Color),
    Bool(bool),
    Number(f32),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Color(_) => "color",
            ParamValue::Bool(_) => "bool",
            ParamValue::Number(_) => "number",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter {0:?}")]
    UnknownField(String),
    #[error("parameter {field} expects a {expected}, got a {got}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        got: &'static str,
    },
}

impl SceneParams {
    pub const FIELD_NAMES: [&'static str; 8] = [
        "sphere_color",
        "highlight_color",
        "wireframe",
        "rotation_speed",
        "bounce_speed",
        "angle",
        "penumbra",
        "intensity",
    ];

    /// Range for a numeric field, `None` for colors, flags and unknown names.
    pub fn spec(name: &str) -> Option<ParamSpec> {
        NUMERIC_PARAMS.iter().copied().find(|s| s.name == name)
    }

    pub fn get(&self, name: &str) -> Result<ParamValue, ParamError> {
        Ok(match name {
            "sphere_color" => ParamValue::Color(self.sphere_color),
            "highlight_color" => ParamValue::Color(self.highlight_color),
            "wireframe" => ParamValue::Bool(self.wireframe),
            "rotation_speed" => ParamValue::Number(self.rotation_speed),
            "bounce_speed" => ParamValue::Number(self.bounce_speed),
            "angle" => ParamValue::Number(self.angle),
            "penumbra" => ParamValue::Number(self.penumbra),
            "intensity" => ParamValue::Number(self.intensity),
            other => return Err(ParamError::UnknownField(other.to_string())),
        })
    }

    /// Set a field by name. No range check: widgets enforce their ranges.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        let (field, slot) = self.slot(name)?;
        match (slot, value) {
            (Slot::Color(c), ParamValue::Color(v)) => *c = v,
            (Slot::Bool(b), ParamValue::Bool(v)) => *b = v,
            (Slot::Number(n), ParamValue::Number(v)) => *n = v,
            (slot, value) => {
                return Err(ParamError::TypeMismatch {
                    field,
                    expected: slot.kind(),
                    got: value.kind(),
                });
            }
        }
        Ok(())
    }

    /// Copy with every numeric field pulled into its declared range.
    /// Used when values come from a config file rather than a widget.
    pub fn clamped(mut self) -> Self {
        for spec in NUMERIC_PARAMS {
            if let Ok((_, Slot::Number(n))) = self.slot(spec.name) {
                *n = spec.clamp(*n);
            }
        }
        self
    }

    fn slot(&mut self, name: &str) -> Result<(&'static str, Slot<'_>), ParamError> {
        let field = Self::FIELD_NAMES
            .iter()
            .copied()
            .find(|f| *f == name)
            .ok_or_else(|| ParamError::UnknownField(name.to_string()))?;
        let slot = match field {
            "sphere_color" => Slot::Color(&mut self.sphere_color),
            "highlight_color" => Slot::Color(&mut self.highlight_color),
            "wireframe" => Slot::Bool(&mut self.wireframe),
            "rotation_speed" => Slot::Number(&mut self.rotation_speed),
            "bounce_speed" => Slot::Number(&mut self.bounce_speed),
            "angle" => Slot::Number(&mut self.angle),
            "penumbra" => Slot::Number(&mut self.penumbra),
            _ => Slot::Number(&mut self.intensity),
        };
        Ok((field, slot))
    }
}

enum Slot<'a> {
    Color(&'a mut Color),
    Bool(&'a mut bool),
    Number(&'a mut f32),
}

impl Slot<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Slot::Color(_) => "color",
            Slot::Bool(_) => "bool",
            Slot::Number(_) => "number",
        }
    }
}
