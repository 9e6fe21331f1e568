//! Visual attributes of rendered nodes and links.
//!
//! Styling is purely cosmetic: nothing here feeds back into the physics.

use serde::{Deserialize, Serialize};
use tiny_skia::Color;

use crate::error::RenderError;

/// The Tableau10 categorical palette.
pub const TABLEAU10: [&str; 10] = [
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

/// How the ends of link strokes are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

impl From<LineCap> for tiny_skia::LineCap {
    fn from(cap: LineCap) -> Self {
        match cap {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        }
    }
}

/// Node and link appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Palette indexed by group ordinal.
    pub colors: Vec<String>,
    /// Fixed node fill; `None` colours nodes by group.
    pub node_fill: Option<String>,
    pub node_stroke: String,
    pub node_stroke_width: f64,
    pub node_stroke_opacity: f64,
    pub node_radius: f64,
    pub link_stroke: String,
    pub link_stroke_width: f64,
    pub link_stroke_opacity: f64,
    pub link_stroke_linecap: LineCap,
    /// Canvas fill; `None` leaves it transparent.
    pub background: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            colors: TABLEAU10.iter().map(|c| c.to_string()).collect(),
            node_fill: None,
            node_stroke: "#fff".into(),
            node_stroke_width: 1.5,
            node_stroke_opacity: 1.0,
            node_radius: 5.0,
            link_stroke: "#999".into(),
            link_stroke_width: 1.5,
            link_stroke_opacity: 0.6,
            link_stroke_linecap: LineCap::Round,
            background: None,
        }
    }
}

impl Style {
    /// Check that every colour parses and every size is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.colors.is_empty() {
            return Err("style.colors must not be empty".into());
        }
        let colours = self
            .colors
            .iter()
            .chain(self.node_fill.iter())
            .chain(self.background.iter())
            .chain([&self.node_stroke, &self.link_stroke]);
        for text in colours {
            if parse_color(text).is_none() {
                return Err(format!("invalid color {text:?}"));
            }
        }

        let sizes = [
            ("node_radius", self.node_radius),
            ("node_stroke_width", self.node_stroke_width),
            ("link_stroke_width", self.link_stroke_width),
        ];
        for (name, value) in sizes {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("style.{name} must be >= 0"));
            }
        }
        for (name, value) in [
            ("node_stroke_opacity", self.node_stroke_opacity),
            ("link_stroke_opacity", self.link_stroke_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("style.{name} must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

/// Parse `text` into a colour, failing with [`RenderError::InvalidColor`].
pub(crate) fn color(text: &str) -> Result<Color, RenderError> {
    parse_color(text).ok_or_else(|| RenderError::InvalidColor(text.to_string()))
}

/// `color` with its alpha multiplied by `opacity`.
pub(crate) fn with_opacity(mut color: Color, opacity: f64) -> Color {
    color.apply_opacity(opacity.clamp(0.0, 1.0) as f32);
    color
}

/// Parse a CSS-style colour: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
/// `white`, `black` or `transparent`.
pub fn parse_color(text: &str) -> Option<Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(Color::from_rgba8(255, 255, 255, 255)),
        "black" => return Some(Color::from_rgba8(0, 0, 0, 255)),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    fn hex2(b: &[u8]) -> Option<u8> {
        let hi = (*b.first()? as char).to_digit(16)? as u8;
        let lo = (*b.get(1)? as char).to_digit(16)? as u8;
        Some((hi << 4) | lo)
    }
    fn hex1(c: u8) -> Option<u8> {
        let v = (c as char).to_digit(16)? as u8;
        Some((v << 4) | v)
    }

    let b = hex.as_bytes();
    let (r, g, bl, a) = match b.len() {
        3 => (hex1(b[0])?, hex1(b[1])?, hex1(b[2])?, 255),
        4 => (hex1(b[0])?, hex1(b[1])?, hex1(b[2])?, hex1(b[3])?),
        6 => (hex2(&b[0..2])?, hex2(&b[2..4])?, hex2(&b[4..6])?, 255),
        8 => (
            hex2(&b[0..2])?,
            hex2(&b[2..4])?,
            hex2(&b[4..6])?,
            hex2(&b[6..8])?,
        ),
        _ => return None,
    };
    Some(Color::from_rgba8(r, g, bl, a))
}

/// Ordinal colour scale: the i-th smallest group gets palette entry `i mod len`.
#[derive(Debug, Clone)]
pub struct GroupPalette {
    groups: Vec<i64>,
    colors: Vec<Color>,
}

impl GroupPalette {
    /// `groups` must be sorted and distinct.
    pub fn new(groups: Vec<i64>, colors: &[String]) -> Result<Self, RenderError> {
        let colors = colors
            .iter()
            .map(|c| color(c))
            .collect::<Result<Vec<_>, _>>()?;
        if colors.is_empty() {
            return Err(RenderError::InvalidColor(String::new()));
        }
        Ok(Self { groups, colors })
    }

    pub fn color_of(&self, group: i64) -> Color {
        let ordinal = match self.groups.binary_search(&group) {
            Ok(i) | Err(i) => i,
        };
        self.colors[ordinal % self.colors.len()]
    }
}
