//! Byte-to-text decoding with a bounded encoding fallback list.
//!
//! The fallback order is a policy, not a hard-coded constant — see
//! `ENCODING_FALLBACK_ORDER` — so it can be inspected or reconfigured by a
//! caller building a custom pipeline.

/// A single-byte (or UTF-8) text encoding this crate can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
    Windows1252,
    Iso8859_1,
}

/// Fallback order applied by [`decode_bytes`]: UTF-8 first, then the
/// single-byte Western encodings broker exports most commonly use.
pub const ENCODING_FALLBACK_ORDER: &[Encoding] = &[
    Encoding::Utf8,
    Encoding::Latin1,
    Encoding::Windows1252,
    Encoding::Iso8859_1,
];

/// Windows-1252 deviates from Latin-1/ISO-8859-1 only in 0x80-0x9F, which
/// Latin-1 maps to C1 control characters; Windows-1252 maps most of that
/// range to printable characters instead.
fn windows_1252_high_byte(b: u8) -> char {
    match b {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        other => other as char,
    }
}

/// Decodes a byte slice as a single-byte encoding where every byte maps
/// directly to the Unicode code point of the same value (Latin-1 /
/// ISO-8859-1); always succeeds.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn decode_windows_1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if (0x80..=0x9F).contains(&b) {
                windows_1252_high_byte(b)
            } else {
                b as char
            }
        })
        .collect()
}

/// Decodes `bytes` to text, trying [`ENCODING_FALLBACK_ORDER`] in order and
/// returning the first successful decode. The single-byte encodings never
/// fail, so this only fails if an exotic encoding list omits them all.
pub fn decode_bytes(bytes: &[u8]) -> Option<String> {
    for encoding in ENCODING_FALLBACK_ORDER {
        let decoded = match encoding {
            Encoding::Utf8 => match std::str::from_utf8(bytes) {
                Ok(s) => Some(s.to_string()),
                Err(_) => None,
            },
            Encoding::Latin1 | Encoding::Iso8859_1 => Some(decode_latin1(bytes)),
            Encoding::Windows1252 => Some(decode_windows_1252(bytes)),
        };
        if let Some(s) = decoded {
            return Some(s);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_utf8() {
        assert_eq!(decode_bytes("héllo".as_bytes()).unwrap(), "héllo");
    }

    #[test]
    fn falls_back_to_latin1_for_invalid_utf8() {
        // 0xE9 is 'é' in Latin-1 but not valid standalone UTF-8.
        let bytes = [b'h', 0xE9, b'y'];
        assert_eq!(decode_bytes(&bytes).unwrap(), "h\u{e9}y");
    }
}
