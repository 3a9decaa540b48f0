//! Data generation utilities for testing.

use std::io::Write;

use largetext_charset::Charset;

/// Characters used by [`random_text`]: one, two, three and four byte UTF-8
/// sequences, all encodable in UTF-16.
const MIXED_ALPHABET: &[char] = &[
    'a', 'b', 'z', ' ', '\n', '0', 'é', 'ß', 'Ж', 'ω', '€', '中', '文', '😀', '𝄞',
];

/// `unit` repeated `count` times.
pub fn repeated_text(unit: &str, count: usize) -> String {
    unit.repeat(count)
}

/// Pseudo-random text of `len` characters with a mix of encoded widths.
pub fn random_text(len: usize, seed: u64) -> String {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..len)
        .map(|_| MIXED_ALPHABET[rng.usize(..MIXED_ALPHABET.len())])
        .collect()
}

/// Pseudo-random ASCII letters and digits.
pub fn random_ascii_text(len: usize, seed: u64) -> String {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..len).map(|_| rng.alphanumeric()).collect()
}

/// Encodes `text` in `charset`.
///
/// Fails if a character cannot be represented in the charset.
pub fn encode(text: &str, charset: Charset) -> anyhow::Result<Vec<u8>> {
    let bytes = match charset {
        Charset::Utf8 => text.as_bytes().to_vec(),
        Charset::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        Charset::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        Charset::UsAscii => single_byte(text, charset, 0x7F)?,
        Charset::Iso8859_1 => single_byte(text, charset, 0xFF)?,
        Charset::Windows1252 => {
            if let Some(c) = text.chars().find(|c| ('\u{80}'..='\u{9F}').contains(c)) {
                anyhow::bail!("{c:?} is not encodable in {charset}");
            }
            single_byte(text, charset, 0xFF)?
        }
    };
    Ok(bytes)
}

fn single_byte(text: &str, charset: Charset, max: u32) -> anyhow::Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            if (c as u32) <= max {
                Ok(c as u32 as u8)
            } else {
                anyhow::bail!("{c:?} is not encodable in {charset}")
            }
        })
        .collect()
}

/// Writes `bytes` to a new temporary file.
pub fn bytes_file(bytes: &[u8]) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// Writes `text` encoded in `charset` to a new temporary file.
pub fn text_file(text: &str, charset: Charset) -> anyhow::Result<tempfile::NamedTempFile> {
    bytes_file(&encode(text, charset)?)
}

#[cfg(test)]
mod tests {
    use largetext_charset::Charset;

    use super::{encode, random_text};

    #[test]
    fn test_random_text_is_reproducible() {
        assert_eq!(random_text(100, 7), random_text(100, 7));
        assert_eq!(random_text(100, 7).chars().count(), 100);
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("aé", Charset::Utf16Be).unwrap(), vec![0, 0x61, 0, 0xE9]);
        assert_eq!(encode("aé", Charset::Iso8859_1).unwrap(), vec![0x61, 0xE9]);
        assert!(encode("aé", Charset::UsAscii).is_err());
        assert!(encode("€", Charset::Windows1252).is_err());
    }
}
