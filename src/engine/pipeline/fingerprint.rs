use crate::engine::types::DocValue;
use crate::shared::hash::stable_hash128;

// Type tag bytes prefixing every canonical serialization. Tags and layout
// are persisted through continuation tokens; changing them requires a token
// migration.
const TAG_NULL: u8 = 0x01;
const TAG_BOOL: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_FLOAT: u8 = 0x04;
const TAG_STRING: u8 = 0x05;
const TAG_ARRAY: u8 = 0x06;
const TAG_OBJECT: u8 = 0x07;

/// 128-bit content fingerprint of a document element.
///
/// Fingerprint equality is the only equality relation used by the distinct
/// map and the grouping table. The canonical form tags every value by type
/// (so `Int(1)`, `Float(1.0)`, `"1"` and `true` all differ), serializes
/// numbers as little-endian raw bits, keeps arrays order-sensitive, and
/// visits object keys in codepoint order so field order never matters.
/// Hash collisions are accepted as negligible and not resolved.
pub fn fingerprint(value: &DocValue) -> u128 {
    match value {
        DocValue::Null => stable_hash128(&[TAG_NULL]),
        DocValue::Bool(b) => stable_hash128(&[TAG_BOOL, u8::from(*b)]),
        DocValue::Int(i) => {
            let mut buf = [0u8; 9];
            buf[0] = TAG_INT;
            buf[1..].copy_from_slice(&i.to_le_bytes());
            stable_hash128(&buf)
        }
        DocValue::Float(f) => {
            let mut buf = [0u8; 9];
            buf[0] = TAG_FLOAT;
            buf[1..].copy_from_slice(&f.to_bits().to_le_bytes());
            stable_hash128(&buf)
        }
        DocValue::String(s) => string_fingerprint(s),
        DocValue::Array(items) => fingerprint_array(items),
        DocValue::Object(fields) => {
            let mut sorted: Vec<&(String, DocValue)> = fields.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));

            let mut buf = Vec::with_capacity(9 + sorted.len() * 32);
            buf.push(TAG_OBJECT);
            buf.extend_from_slice(&(sorted.len() as u64).to_le_bytes());
            for (key, field_value) in sorted {
                buf.extend_from_slice(&string_fingerprint(key).to_le_bytes());
                buf.extend_from_slice(&fingerprint(field_value).to_le_bytes());
            }
            stable_hash128(&buf)
        }
    }
}

/// Fingerprint of an element sequence, identical to hashing
/// `DocValue::Array` over the same items. Used for grouping-key tuples.
pub fn fingerprint_array(items: &[DocValue]) -> u128 {
    let mut buf = Vec::with_capacity(9 + items.len() * 16);
    buf.push(TAG_ARRAY);
    buf.extend_from_slice(&(items.len() as u64).to_le_bytes());
    for item in items {
        buf.extend_from_slice(&fingerprint(item).to_le_bytes());
    }
    stable_hash128(&buf)
}

fn string_fingerprint(s: &str) -> u128 {
    let mut buf = Vec::with_capacity(1 + s.len());
    buf.push(TAG_STRING);
    buf.extend_from_slice(s.as_bytes());
    stable_hash128(&buf)
}
