pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Blend a straight-alpha channel value over an opaque background channel.
pub(crate) fn over_opaque(src: u8, alpha: u8, bg: u8) -> u8 {
    let a = u16::from(alpha);
    let inv = 255u16 - a;
    (mul_div255_u16(u16::from(src), a) + mul_div255_u16(u16::from(bg), inv)).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
