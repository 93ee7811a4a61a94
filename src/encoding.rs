//! Text repair for exam banks that went through a wrong decode/encode cycle
//!
//! A typical damaged export reads `Physiologie Digestive (FÃ©vrier 2025)`:
//! UTF-8 bytes were decoded as Windows-1252 and saved again. Reversing the
//! single-byte decode and reading the bytes back as UTF-8 restores the text.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

// A UTF-8 lead byte followed by a continuation byte, both seen through Windows-1252
static MOJIBAKE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        concat!(
            r"[\x{C2}-\x{F4}]",
            r"[\x{80}-\x{BF}\x{152}\x{153}\x{160}\x{161}\x{178}\x{17D}\x{17E}\x{192}",
            r"\x{2C6}\x{2DC}\x{2013}\x{2014}\x{2018}-\x{201A}\x{201C}-\x{201E}",
            r"\x{2020}-\x{2022}\x{2026}\x{2030}\x{2039}\x{203A}\x{20AC}\x{2122}]",
        ),
    )
    .unwrap()
});

/// Windows-1252 characters in the 0x80..=0x9F range and their byte values
const CP1252_HIGH: [(char, u8); 27] = [
    ('\u{20AC}', 0x80),
    ('\u{201A}', 0x82),
    ('\u{0192}', 0x83),
    ('\u{201E}', 0x84),
    ('\u{2026}', 0x85),
    ('\u{2020}', 0x86),
    ('\u{2021}', 0x87),
    ('\u{02C6}', 0x88),
    ('\u{2030}', 0x89),
    ('\u{0160}', 0x8A),
    ('\u{2039}', 0x8B),
    ('\u{0152}', 0x8C),
    ('\u{017D}', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('\u{2022}', 0x95),
    ('\u{2013}', 0x96),
    ('\u{2014}', 0x97),
    ('\u{02DC}', 0x98),
    ('\u{2122}', 0x99),
    ('\u{0161}', 0x9A),
    ('\u{203A}', 0x9B),
    ('\u{0153}', 0x9C),
    ('\u{017E}', 0x9E),
    ('\u{0178}', 0x9F),
];

/// Whether `text` contains a byte sequence typical of double-decoded UTF-8
pub fn looks_garbled(text: &str) -> bool {
    !text.is_ascii() && MOJIBAKE_REGEX.is_match(text)
}

/// Repaired text, or `None` when `text` is not recognisably garbled
/// or does not round-trip
pub fn repair_text(text: &str) -> Option<String> {
    if !looks_garbled(text) {
        return None;
    }

    let bytes = text
        .chars()
        .map(single_byte)
        .collect::<Option<Vec<u8>>>()?;
    let repaired = String::from_utf8(bytes).ok()?;

    (repaired != text).then_some(repaired)
}

fn single_byte(c: char) -> Option<u8> {
    let code = c as u32;
    if code <= 0xFF {
        return Some(code as u8);
    }
    CP1252_HIGH
        .iter()
        .find(|(ch, _)| *ch == c)
        .map(|(_, byte)| *byte)
}

/// Repair every string value and object key in the tree. Returns the number of strings fixed.
pub fn repair_mojibake(value: &mut Value) -> usize {
    match value {
        Value::String(s) => match repair_text(s) {
            Some(fixed) => {
                *s = fixed;
                1
            }
            None => 0,
        },
        Value::Array(arr) => arr.iter_mut().map(repair_mojibake).sum(),
        Value::Object(obj) => repair_object(obj),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}

fn repair_object(obj: &mut Map<String, Value>) -> usize {
    let mut count = 0;

    if !obj.keys().any(|k| looks_garbled(k)) {
        for child in obj.values_mut() {
            count += repair_mojibake(child);
        }
        return count;
    }

    // Keys change, so rebuild the map in its original order.
    // A repaired key never replaces a key the object already has.
    let original: HashSet<String> = obj.keys().cloned().collect();
    for (key, mut child) in std::mem::take(obj) {
        let key = match repair_text(&key) {
            Some(fixed) if original.contains(&fixed) || obj.contains_key(&fixed) => {
                warn!("Keeping garbled key '{}': '{}' already exists", key, fixed);
                key
            }
            Some(fixed) => {
                count += 1;
                fixed
            }
            None => key,
        };
        count += repair_mojibake(&mut child);
        obj.insert(key, child);
    }
    count
}
