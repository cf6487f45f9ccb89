//! Helpers for converting values to and from hex strings

/// Convert a byte array to a hex string
pub fn bytes_to_hex_string(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Convert a hex string to a byte array, tolerating a 0x prefix
pub fn bytes_from_hex_string(hex_str: &str) -> Result<Vec<u8>, String> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(stripped).map_err(|e| format!("error deserializing bytes from hex string: {e}"))
}

#[cfg(test)]
mod test {
    use super::{bytes_from_hex_string, bytes_to_hex_string};

    /// Round trips a byte array through the hex helpers
    #[test]
    fn test_hex_round_trip() {
        let bytes = vec![0x00, 0xde, 0xad, 0xbe, 0xef, 0xff];
        let hex_str = bytes_to_hex_string(&bytes);
        assert_eq!(bytes_from_hex_string(&hex_str).unwrap(), bytes);
        assert_eq!(bytes_from_hex_string(&format!("0x{hex_str}")).unwrap(), bytes);
    }

    /// Invalid hex fails rather than returning partial data
    #[test]
    fn test_invalid_hex() {
        assert!(bytes_from_hex_string("zz").is_err());
    }
}
