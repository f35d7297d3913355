use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PixelpressError, PixelpressResult};

/// Absolute pixel position on a canvas. May be negative (element partly
/// outside the canvas); compositing clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: i64, y: i64, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// Element offset: an absolute pixel count or a percentage of the canvas
/// dimension it applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offset {
    Px(i64),
    Percent(i64),
}

impl Default for Offset {
    fn default() -> Self {
        Self::Px(0)
    }
}

impl Offset {
    /// Convert to pixels against the given canvas dimension.
    ///
    /// Percent values truncate toward zero after scaling.
    pub fn to_pixels(self, canvas_dim: u32) -> i64 {
        match self {
            Self::Px(v) => v,
            Self::Percent(p) => (f64::from(canvas_dim) * p as f64 / 100.0).trunc() as i64,
        }
    }
}

impl FromStr for Offset {
    type Err = PixelpressError;

    fn from_str(s: &str) -> PixelpressResult<Self> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            let v: i64 = pct.trim().parse().map_err(|_| {
                PixelpressError::validation(format!("invalid percent offset '{s}'"))
            })?;
            Ok(Self::Percent(v))
        } else {
            let v: i64 = s
                .parse()
                .map_err(|_| PixelpressError::validation(format!("invalid pixel offset '{s}'")))?;
            Ok(Self::Px(v))
        }
    }
}

impl Serialize for Offset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Px(v) => serializer.serialize_i64(*v),
            Self::Percent(p) => serializer.serialize_str(&format!("{p}%")),
        }
    }
}

impl<'de> Deserialize<'de> for Offset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(i64),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(v) => Ok(Self::Px(v)),
            Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Symbolic reference point for element placement.
///
/// Closed enumeration; unrecognized symbolic names are a parse error rather
/// than a silent top-left fallback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Anchor {
    #[default]
    TopLeft,
    RightTop,
    CenterTop,
    LeftCenter,
    LeftBottom,
    CenterBottom,
    RightBottom,
    RightCenter,
    CenterCenter,
}

impl Anchor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "left top",
            Self::RightTop => "right top",
            Self::CenterTop => "center top",
            Self::LeftCenter => "left center",
            Self::LeftBottom => "left bottom",
            Self::CenterBottom => "center bottom",
            Self::RightBottom => "right bottom",
            Self::RightCenter => "right center",
            Self::CenterCenter => "center center",
        }
    }
}

impl FromStr for Anchor {
    type Err = PixelpressError;

    fn from_str(s: &str) -> PixelpressResult<Self> {
        match s {
            "left top" => Ok(Self::TopLeft),
            "right top" => Ok(Self::RightTop),
            "center top" => Ok(Self::CenterTop),
            "left center" => Ok(Self::LeftCenter),
            "left bottom" => Ok(Self::LeftBottom),
            "center bottom" => Ok(Self::CenterBottom),
            "right bottom" => Ok(Self::RightBottom),
            "right center" => Ok(Self::RightCenter),
            "center center" => Ok(Self::CenterCenter),
            other => Err(PixelpressError::validation(format!(
                "unrecognized anchor '{other}'"
            ))),
        }
    }
}

impl Serialize for Anchor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Anchor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Resolve an anchor plus offsets into absolute top-left coordinates for an
/// element of known size against a known canvas size.
pub fn resolve(
    anchor: Anchor,
    x: Offset,
    y: Offset,
    elem_w: u32,
    elem_h: u32,
    canvas_w: u32,
    canvas_h: u32,
) -> Point {
    let mut x = x.to_pixels(canvas_w) as f64;
    let mut y = y.to_pixels(canvas_h) as f64;

    let cw = f64::from(canvas_w);
    let ch = f64::from(canvas_h);
    let ew = f64::from(elem_w);
    let eh = f64::from(elem_h);

    match anchor {
        Anchor::TopLeft => {}
        Anchor::RightTop => x += cw - ew,
        Anchor::CenterTop => x += cw / 2.0 - ew / 2.0,
        Anchor::LeftCenter => y += ch / 2.0 - eh / 2.0,
        Anchor::LeftBottom => y += ch - eh,
        Anchor::CenterBottom => {
            x += cw / 2.0 - ew / 2.0;
            y += ch - eh;
        }
        Anchor::RightBottom => {
            x += cw - ew;
            y += ch - eh;
        }
        Anchor::RightCenter => {
            x += cw - ew;
            y += ch / 2.0 - eh / 2.0;
        }
        Anchor::CenterCenter => {
            x += cw / 2.0 - ew / 2.0;
            y += ch / 2.0 - eh / 2.0;
        }
    }

    Point {
        x: x.round() as i64,
        y: y.round() as i64,
    }
}
