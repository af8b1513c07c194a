use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encodings tried, in order, when decoding a corpus file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[serde(alias = "utf-8")]
    Utf8,
    /// UTF-8 with the byte-order mark stripped (also accepts input without one)
    #[serde(alias = "utf-8-sig")]
    Utf8Bom,
    /// Windows code page 949 (Unified Hangul Code)
    Cp949,
    /// EUC-KR. Decoded with the CP949 tables, which are a strict superset
    EucKr,
    /// ISO-8859-1. Every byte sequence decodes, so this is the usual last resort
    Latin1,
}

impl TextEncoding {
    pub const DEFAULT_CANDIDATES: [TextEncoding; 5] = [
        TextEncoding::Utf8,
        TextEncoding::Utf8Bom,
        TextEncoding::Cp949,
        TextEncoding::EucKr,
        TextEncoding::Latin1,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Bom => "utf-8-sig",
            TextEncoding::Cp949 => "cp949",
            TextEncoding::EucKr => "euc-kr",
            TextEncoding::Latin1 => "latin1",
        }
    }

    /// Strict decode: `None` on the first malformed sequence, never a replacement char.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => strict(encoding_rs::UTF_8, bytes),
            TextEncoding::Utf8Bom => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                strict(encoding_rs::UTF_8, body)
            }
            TextEncoding::Cp949 | TextEncoding::EucKr => strict(encoding_rs::EUC_KR, bytes),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

fn strict(encoding: &'static encoding_rs::Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decode with the first candidate that succeeds.
pub fn decode_with_fallback(
    bytes: &[u8],
    candidates: &[TextEncoding],
) -> Option<(TextEncoding, String)> {
    candidates.iter().find_map(|enc| {
        let text = enc.decode(bytes);
        if text.is_none() {
            log::debug!("corpus is not valid {enc}");
        }
        text.map(|t| (*enc, t))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_wins_for_plain_ascii() {
        let (enc, text) =
            decode_with_fallback(b"filename\na.txt\n", &TextEncoding::DEFAULT_CANDIDATES).unwrap();
        assert_eq!(enc, TextEncoding::Utf8);
        assert_eq!(text, "filename\na.txt\n");
    }

    #[test]
    fn utf8_bom_strips_marker() {
        let decoded = TextEncoding::Utf8Bom.decode(b"\xEF\xBB\xBFfilename").unwrap();
        assert_eq!(decoded, "filename");
        let plain = TextEncoding::Utf8Bom.decode(b"filename").unwrap();
        assert_eq!(plain, "filename");
    }

    #[test]
    fn korean_legacy_bytes_fall_through_to_cp949() {
        let (bytes, _, had_errors) = encoding_rs::EUC_KR.encode("filename\n토지정책.hwp\n");
        assert!(!had_errors);
        let (enc, text) =
            decode_with_fallback(&bytes, &TextEncoding::DEFAULT_CANDIDATES).unwrap();
        assert_eq!(enc, TextEncoding::Cp949);
        assert!(text.contains("토지정책.hwp"));
    }

    #[test]
    fn latin1_is_the_last_resort() {
        let (enc, text) =
            decode_with_fallback(b"filename\ncaf\xE9.txt\n", &TextEncoding::DEFAULT_CANDIDATES)
                .unwrap();
        assert_eq!(enc, TextEncoding::Latin1);
        assert!(text.contains("café.txt"));
    }

    #[test]
    fn no_candidate_decodes_invalid_utf8() {
        let only_utf8 = [TextEncoding::Utf8, TextEncoding::Utf8Bom];
        assert!(decode_with_fallback(b"\xFF\xFE\xFD", &only_utf8).is_none());
    }
}
