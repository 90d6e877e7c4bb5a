//! Colour strings stored on points.

pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> String {
    format!("hsl({hue}, {saturation}%, {lightness}%)")
}

pub fn hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Parses `#rgb` or `#rrggbb` (leading `#` optional).
pub fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let digits = color.trim().trim_start_matches('#');
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match digits.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (slot, c) in rgb.iter_mut().zip(digits.chars()) {
                let nibble = c.to_digit(16)? as u8;
                *slot = nibble * 17;
            }
            Some(rgb)
        }
        6 => {
            let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
            Some([channel(0)?, channel(2)?, channel(4)?])
        }
        _ => None,
    }
}
