use crate::foundation::core::Rgb8;
use crate::foundation::error::StoryreelError;
use serde::{Deserialize, Serialize};

impl std::str::FromStr for Rgb8 {
    type Err = StoryreelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex(s).map_err(StoryreelError::validation)
    }
}

impl std::fmt::Display for Rgb8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Obj { r: u8, g: u8, b: u8 },
            Arr([u8; 3]),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
            Repr::Obj { r, g, b } => Ok(Rgb8::new(r, g, b)),
            Repr::Arr([r, g, b]) => Ok(Rgb8::new(r, g, b)),
        }
    }
}

fn parse_hex(s: &str) -> Result<Rgb8, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    if s.len() != 6 || !s.is_ascii() {
        return Err("fill color must be #RRGGBB (case-insensitive)".to_owned());
    }

    Ok(Rgb8::new(
        hex_byte(&s[0..2])?,
        hex_byte(&s[2..4])?,
        hex_byte(&s[4..6])?,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
