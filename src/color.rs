use serde::{Deserialize, Serialize};

/// RGB channel triple, each channel in `0..=255`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// Parse a hex color token: `#RGB`, `RGB`, `#RRGGBB` or `RRGGBB`,
    /// case-insensitive. Tokens of any other length fall back to white;
    /// invalid digits inside a correctly-sized token are stripped, leaving
    /// 0 for a channel with no valid digits.
    pub fn parse(token: &str) -> Self {
        match parse_hex(token) {
            Some(rgb) => rgb,
            None => {
                tracing::warn!(token, "unparseable color token, falling back to white");
                Self::white()
            }
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn parse_hex(token: &str) -> Option<Rgb> {
    let s = token.strip_prefix('#').unwrap_or(token);
    let b = s.as_bytes();

    match b.len() {
        3 => {
            // Short form: each digit duplicated, "f" -> "ff".
            let channel = |d: u8| hex_val(d).map_or(0, |v| v * 17);
            Some(Rgb::new(channel(b[0]), channel(b[1]), channel(b[2])))
        }
        6 => Some(Rgb::new(
            pair_value(b[0], b[1]),
            pair_value(b[2], b[3]),
            pair_value(b[4], b[5]),
        )),
        _ => None,
    }
}

fn hex_val(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|v| v as u8)
}

/// Invalid digits are stripped before the remaining pair parses; a pair
/// with no valid digits reads 0.
fn pair_value(hi: u8, lo: u8) -> u8 {
    match (hex_val(hi), hex_val(lo)) {
        (Some(h), Some(l)) => h * 16 + l,
        (Some(h), None) => h,
        (None, Some(l)) => l,
        (None, None) => 0,
    }
}

impl Serialize for Rgb {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Rgb::parse(&s))
    }
}
