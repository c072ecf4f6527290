//! Choosing how a block body is painted from its current admissible set.

use std::fmt;

use crate::block::Block;
use crate::block::kind::Shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Colour {
        let h6 = (hue.rem_euclid(360.0) / 60.0) % 6.0;
        let c = value * saturation;
        let x = c * (1.0 - ((h6 % 2.0) - 1.0).abs());
        let (r1, g1, b1) = if h6 < 1.0 {
            (c, x, 0.0)
        } else if h6 < 2.0 {
            (x, c, 0.0)
        } else if h6 < 3.0 {
            (0.0, c, x)
        } else if h6 < 4.0 {
            (0.0, x, c)
        } else if h6 < 5.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };
        let m = value - c;
        let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Colour {
            r: to_u8(r1),
            g: to_u8(g1),
            b: to_u8(b1),
        }
    }

    /// Block colours share one saturation and value; only the hue varies.
    pub fn from_hue(hue: u16) -> Colour {
        Colour::from_hsv(f64::from(hue), 0.45, 0.65)
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Hue of a concrete type name. Unknown names get a stable hue derived from the name.
pub fn type_hue(name: &str) -> u16 {
    match name {
        "int" => 230,
        "float" => 290,
        "str" => 160,
        "bool" => 210,
        "range" => 120,
        "turtle" => 30,
        other => {
            // FNV-1a
            let mut hash: u32 = 0x811c_9dc5;
            for byte in other.bytes() {
                hash ^= u32::from(byte);
                hash = hash.wrapping_mul(0x0100_0193);
            }
            (hash % 360) as u16
        }
    }
}

pub fn type_colour(name: &str) -> Colour {
    Colour::from_hue(type_hue(name))
}

/// Colour of a full tag. Lists share their element's hue in a darker shade.
pub fn tag_colour(tag: &str) -> Colour {
    match tag.strip_prefix('*') {
        Some(element) => Colour::from_hsv(f64::from(type_hue(element)), 0.45, 0.45),
        None => type_colour(tag),
    }
}

/// A stripe fill for a block that can still produce several concrete types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StripePattern {
    /// Sorted, distinct tags; lists keep their `*`.
    pub types: Vec<String>,
}

impl StripePattern {
    /// SVG id; equal tag combinations share a pattern.
    pub fn id(&self) -> String {
        let parts: Vec<String> = self
            .types
            .iter()
            .map(|t| match t.strip_prefix('*') {
                Some(element) => format!("list_{}", element),
                None => t.clone(),
            })
            .collect();
        format!("stripes-{}", parts.join("-"))
    }

    pub fn colours(&self) -> Vec<Colour> {
        self.types.iter().map(|t| tag_colour(t)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Colour),
    Striped(StripePattern),
    /// `any` or `matching` still admissible: the type is open.
    Rainbow,
    /// No admissible vector left.
    Unsatisfiable,
}

impl Fill {
    /// Value of the SVG `fill` attribute.
    pub fn paint(&self) -> String {
        match self {
            Fill::Solid(colour) => colour.to_string(),
            Fill::Striped(pattern) => format!("url(#{})", pattern.id()),
            Fill::Rainbow => "url(#rainbow)".to_string(),
            Fill::Unsatisfiable => "url(#unsatisfiable)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStyle {
    Plain,
    /// Three parallel strips, for blocks that only produce lists.
    ListStrips,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub fill: Fill,
    pub body: BodyStyle,
}

pub fn select_fill(block: &Block) -> Appearance {
    if block.type_vecs.is_empty() {
        return Appearance {
            fill: Fill::Unsatisfiable,
            body: BodyStyle::Plain,
        };
    }
    if block.shape() == Shape::Statement {
        return Appearance {
            fill: Fill::Solid(Colour::from_hue(block.kind.colour)),
            body: BodyStyle::Plain,
        };
    }

    let outputs = block.type_vecs.output_types();
    let body = if outputs.iter().all(|t| t.is_list()) {
        BodyStyle::ListStrips
    } else {
        BodyStyle::Plain
    };
    if outputs.iter().any(|t| t.is_wildcard()) {
        return Appearance {
            fill: Fill::Rainbow,
            body,
        };
    }

    let tags: Vec<String> = block.type_vecs.concrete_output_tags().into_iter().collect();
    let fill = match tags.as_slice() {
        [] => Fill::Unsatisfiable,
        // A lone list tag already gets the list body, so it keeps its element's colour.
        [only] => Fill::Solid(type_colour(only.trim_start_matches('*'))),
        _ => Fill::Striped(StripePattern { types: tags }),
    };
    Appearance { fill, body }
}

