//! Chain-address literal detection.
//!
//! Recognised forms, matched anywhere inside a string:
//! - EVM: `0x` followed by 40 hex digits
//! - TON raw: `<workchain>:` followed by 64 hex digits
//! - TON user-friendly: `EQ`, `UQ`, `kQ` or `0Q` followed by 46 base64url chars

use serde_json::Value;

const EVM_HEX_LEN: usize = 40;
const TON_RAW_HEX_LEN: usize = 64;
const TON_FRIENDLY_BODY_LEN: usize = 46;
const TON_FRIENDLY_PREFIXES: [&[u8; 2]; 4] = [b"EQ", b"UQ", b"kQ", b"0Q"];

fn is_base64url(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn run_of(bytes: &[u8], pred: impl Fn(u8) -> bool, len: usize) -> bool {
    bytes.len() >= len && bytes[..len].iter().all(|&b| pred(b))
}

/// Whether `text` contains anything that looks like a chain address.
pub fn contains_address(text: &str) -> bool {
    let bytes = text.as_bytes();
    for i in 0..bytes.len() {
        let rest = &bytes[i..];

        if rest.starts_with(b"0x") && run_of(&rest[2..], |b| b.is_ascii_hexdigit(), EVM_HEX_LEN) {
            return true;
        }

        if TON_FRIENDLY_PREFIXES.iter().any(|p| rest.starts_with(*p))
            && run_of(&rest[2..], is_base64url, TON_FRIENDLY_BODY_LEN)
        {
            return true;
        }

        if rest[0] == b':'
            && i > 0
            && bytes[i - 1].is_ascii_digit()
            && run_of(&rest[1..], |b| b.is_ascii_hexdigit(), TON_RAW_HEX_LEN)
        {
            return true;
        }
    }
    false
}

/// Whether any string nested anywhere in `value` contains an address.
pub fn value_contains_address(value: &Value) -> bool {
    match value {
        Value::String(s) => contains_address(s),
        Value::Array(items) => items.iter().any(value_contains_address),
        Value::Object(map) => map.values().any(value_contains_address),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evm_address() {
        assert!(contains_address(
            "send to 0x52908400098527886E0F7030069857D2E4169EE7 now"
        ));
        assert!(!contains_address("0x1234"));
    }

    #[test]
    fn ton_raw_address() {
        let raw = format!("0:{}", "a".repeat(64));
        assert!(contains_address(&raw));
        let neg = format!("-1:{}", "F".repeat(64));
        assert!(contains_address(&neg));
        assert!(!contains_address(&format!(":{}", "a".repeat(64))));
        assert!(!contains_address(&format!("0:{}", "a".repeat(63))));
    }

    #[test]
    fn ton_friendly_address() {
        assert!(contains_address(
            "EQDtFpEwcFAEcRe5mLVh2N6C0x-_hJEM7W61_JLnSF74p4q2"
        ));
        assert!(contains_address(&format!("UQ{}", "A".repeat(46))));
        assert!(!contains_address(&format!("EQ{}", "A".repeat(45))));
    }

    #[test]
    fn plain_config_values_are_clean() {
        for s in ["TON", "stonfi", "webhook", "crosses_above", "12:30"] {
            assert!(!contains_address(s), "{s}");
        }
    }

    #[test]
    fn nested_values_are_scanned() {
        let v = json!({"targets": [{"to": format!("kQ{}", "_".repeat(46))}]});
        assert!(value_contains_address(&v));
        assert!(!value_contains_address(&json!([1, 2, {"a": true}])));
    }
}
