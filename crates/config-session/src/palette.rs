//! Color palette snapping.
//!
//! The device renders 64 colors: each 8-bit channel is one of
//! 0x00, 0x55, 0xAA or 0xFF. Editor color values are snapped to the nearest
//! of those before they are sent or shown.

use serde_json::Value;

/// Snap one 8-bit channel to the nearest of the four palette levels.
pub fn quantize_channel(channel: u8) -> u8 {
    // (c + 42) / 85 is at most 3, so the product stays within u8.
    (((channel as u16 + 42) / 85) * 85) as u8
}

/// Snap a `0xRRGGBB` color. Bits above the low 24 are discarded.
pub fn quantize_color(color: u32) -> u32 {
    let r = quantize_channel(((color >> 16) & 0xFF) as u8) as u32;
    let g = quantize_channel(((color >> 8) & 0xFF) as u8) as u32;
    let b = quantize_channel((color & 0xFF) as u8) as u32;
    (r << 16) | (g << 8) | b
}

/// Snap a color field's JSON value.
///
/// Integers are treated as `0xRRGGBB`. Strings of the form `#RRGGBB` or
/// `0xRRGGBB` are snapped and re-rendered in the same notation. Anything
/// else is returned unchanged.
pub fn quantize_value(value: &Value) -> Value {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(color) if color <= u32::MAX as u64 => Value::from(quantize_color(color as u32)),
            _ => value.clone(),
        },
        Value::String(text) => quantize_hex(text)
            .map(Value::String)
            .unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

fn quantize_hex(text: &str) -> Option<String> {
    let (prefix, digits) = if let Some(rest) = text.strip_prefix('#') {
        ("#", rest)
    } else if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (&text[..2], rest)
    } else {
        return None;
    };

    if digits.len() != 6 {
        return None;
    }
    let color = u32::from_str_radix(digits, 16).ok()?;
    Some(format!("{}{:06X}", prefix, quantize_color(color)))
}
