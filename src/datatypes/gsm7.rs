// ABOUTME: GSM 03.38 default alphabet and 7-bit septet unpacking for SMS user data
// ABOUTME: Maps packed septets to Unicode text, including the escape extension table

/// Escape septet introducing a character from the extension table
pub const ESCAPE: u8 = 0x1B;

/// GSM 03.38 default alphabet, indexed by septet value
#[rustfmt::skip]
const DEFAULT_ALPHABET: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å',
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1B}', 'Æ', 'æ', 'ß', 'É',
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/',
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?',
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§',
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à',
];

/// Character for a septet following `ESCAPE`
///
/// Unassigned extension codes fall back to the default alphabet, which is
/// what handsets display for them.
fn extension_char(septet: u8) -> char {
    match septet {
        0x0A => '\u{0C}',
        0x14 => '^',
        0x28 => '{',
        0x29 => '}',
        0x2F => '\\',
        0x3C => '[',
        0x3D => '~',
        0x3E => ']',
        0x40 => '|',
        0x65 => '€',
        other => DEFAULT_ALPHABET[(other & 0x7F) as usize],
    }
}

/// Unpack a packed 7-bit stream into `floor(len * 8 / 7)` septets
///
/// Each septet takes its low bits from the current octet and spills into the
/// next one, least significant bit first.
pub fn unpack_septets(bytes: &[u8]) -> Vec<u8> {
    let count = bytes.len() * 8 / 7;
    let mut septets = Vec::with_capacity(count);

    let mut acc: u16 = 0;
    let mut bits = 0u32;
    for &byte in bytes {
        acc |= (byte as u16) << bits;
        bits += 8;
        while bits >= 7 && septets.len() < count {
            septets.push((acc & 0x7F) as u8);
            acc >>= 7;
            bits -= 7;
        }
    }

    septets
}

/// Map septets to text through the default alphabet
pub fn decode_septets(septets: &[u8]) -> String {
    let mut text = String::with_capacity(septets.len());
    let mut iter = septets.iter();

    while let Some(&septet) = iter.next() {
        if septet == ESCAPE {
            match iter.next() {
                Some(&next) => text.push(extension_char(next)),
                // A dangling escape at the end of a segment reads as a space
                None => text.push(' '),
            }
        } else {
            text.push(DEFAULT_ALPHABET[(septet & 0x7F) as usize]);
        }
    }

    text
}

/// Pack septets the way a sender would; only used to build test PDUs
#[cfg(test)]
pub(crate) fn pack_septets(septets: &[u8], fill_bits: u32) -> Vec<u8> {
    let mut out = Vec::new();
    let mut acc: u32 = 0;
    let mut bits = fill_bits;
    for &septet in septets {
        acc |= ((septet & 0x7F) as u32) << bits;
        bits += 7;
        while bits >= 8 {
            out.push((acc & 0xFF) as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        out.push((acc & 0xFF) as u8);
    }
    out
}
