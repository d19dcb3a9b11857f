use crate::error::{Result, XrayError};

/// Parses one of the two address text fields. Exactly two hex digits.
pub fn parse_hex_byte_field(field: &str) -> Result<u8> {
    let field = field.trim();
    if field.len() != 2 || !field.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(XrayError::InvalidAddressInput(format!(
            "'{}' is not a two-digit hex byte",
            field
        )));
    }
    u8::from_str_radix(field, 16).map_err(|e| XrayError::InvalidAddressInput(e.to_string()))
}

/// Composes the high and low address fields into `hi * 256 + lo`.
pub fn parse_address_fields(hi: &str, lo: &str) -> Result<u16> {
    let hi = parse_hex_byte_field(hi)?;
    let lo = parse_hex_byte_field(lo)?;
    Ok(u16::from_be_bytes([hi, lo]))
}

/// A byte value typed as hex, one or two digits, optional `$` prefix.
pub fn parse_hex_value(text: &str) -> Result<u8> {
    let digits = text.trim().trim_start_matches('$');
    if digits.is_empty() || digits.len() > 2 {
        return Err(XrayError::InvalidAddressInput(format!(
            "'{}' is not a hex byte value",
            text
        )));
    }
    u8::from_str_radix(digits, 16)
        .map_err(|_| XrayError::InvalidAddressInput(format!("'{}' is not a hex byte value", text)))
}

/// TRS-80 character codes to printable text for dumps.
pub fn trs80_to_char(byte: u8) -> char {
    match byte {
        0x20..=0x7E => byte as char,
        // Graphics blocks
        0x80..=0xBF => '▒',
        _ => '.',
    }
}

/// One hexdump row: address, bytes with changed ones starred, ASCII column.
/// Bytes are grouped `group` at a time with an extra space between groups.
pub fn hexdump_line(addr: u16, bytes: &[u8], changed: &[bool], group: u8) -> String {
    let group = group.max(1) as usize;
    let mut hex = String::new();
    for (i, b) in bytes.iter().enumerate() {
        if group > 1 && i > 0 && i % group == 0 {
            hex.push(' ');
        }
        let mark = if changed.get(i).copied().unwrap_or(false) {
            '*'
        } else {
            ' '
        };
        hex.push_str(&format!("{:02X}{}", b, mark));
    }
    let text: String = bytes.iter().map(|b| trs80_to_char(*b)).collect();
    format!("{:04X}  {} {}", addr, hex, text)
}
