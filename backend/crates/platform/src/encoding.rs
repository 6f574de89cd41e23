//! Encoding Utilities

use base64::{Engine, engine::general_purpose};

/// Encode bytes as base64
pub fn to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 to bytes
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(s)
}

/// `data:<mime>;base64,<payload>`
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    let payload = to_base64(bytes);
    let mut url = String::with_capacity(mime.len() + payload.len() + 13);
    url.push_str("data:");
    url.push_str(mime);
    url.push_str(";base64,");
    url.push_str(&payload);
    url
}

/// Length of [`data_url`] for `raw_len` bytes, without building it.
pub fn data_url_len(mime: &str, raw_len: usize) -> usize {
    "data:".len() + mime.len() + ";base64,".len() + raw_len.div_ceil(3) * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip() {
        let original = b"Hello, World!";
        let encoded = to_base64(original);
        let decoded = from_base64(&encoded).unwrap();
        assert_eq!(original.to_vec(), decoded);
    }

    #[test]
    fn test_data_url_shape() {
        let url = data_url("image/jpeg", &[0xFF, 0xD8, 0xFF]);
        assert_eq!(url, "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_data_url_len_matches() {
        for n in [0usize, 1, 2, 3, 4, 100, 4097] {
            let bytes = vec![7u8; n];
            assert_eq!(
                data_url("image/png", &bytes).len(),
                data_url_len("image/png", n)
            );
        }
    }
}
