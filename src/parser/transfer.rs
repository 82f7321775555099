//! Content-Transfer-Encoding decoders (RFC 2045 §6).

use std::borrow::Cow;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use tracing::warn;

use crate::model::part::TransferEncoding;

/// Standard alphabet, padding optional, trailing bits tolerated.
///
/// Archives written by browsers are generally clean, but hand-edited or
/// truncated files routinely lose their final `=` padding.
pub(crate) const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Apply the transfer decoding named by `encoding` to `raw`.
///
/// Identity encodings borrow the input. A base64 body that cannot be
/// decoded is passed through unchanged (and logged).
pub fn decode_body<'a>(raw: &'a [u8], encoding: &TransferEncoding) -> Cow<'a, [u8]> {
    match encoding {
        TransferEncoding::Base64 => match decode_base64(raw) {
            Ok(bytes) => Cow::Owned(bytes),
            Err(e) => {
                warn!(error = %e, len = raw.len(), "Invalid base64 body, keeping raw bytes");
                Cow::Borrowed(raw)
            }
        },
        TransferEncoding::QuotedPrintable => Cow::Owned(decode_quoted_printable(raw)),
        TransferEncoding::Unknown(name) => {
            warn!(encoding = %name, "Unknown transfer encoding, passing body through");
            Cow::Borrowed(raw)
        }
        TransferEncoding::SevenBit
        | TransferEncoding::EightBit
        | TransferEncoding::Binary
        | TransferEncoding::Absent => Cow::Borrowed(raw),
    }
}

/// Decode a base64 body, ignoring line breaks and other whitespace.
pub fn decode_base64(raw: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64.decode(compact)
}

/// Decode quoted-printable: `=XX` escapes and soft line breaks (`=CRLF`, `=LF`,
/// with optional transport padding before the break). Malformed escapes are
/// kept literally.
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let b = input[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }

        // Soft line break, possibly padded with spaces or tabs
        let mut j = i + 1;
        while j < input.len() && (input[j] == b' ' || input[j] == b'\t') {
            j += 1;
        }
        if j == input.len() {
            i = j;
            continue;
        }
        if input[j] == b'\n' {
            i = j + 1;
            continue;
        }
        if input[j] == b'\r' && input.get(j + 1) == Some(&b'\n') {
            i = j + 2;
            continue;
        }

        if i + 2 < input.len() {
            if let (Some(hi), Some(lo)) = (hex_value(input[i + 1]), hex_value(input[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }

        out.push(b'=');
        i += 1;
    }

    out
}

/// Value of an ASCII hex digit (either case).
pub(crate) fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}
