//! BER to DER re-encoding.
//!
//! Many signers emit signed-data in BER: indefinite lengths, non-minimal
//! length octets and constructed (segmented) strings. `der` only reads DER,
//! so such input is rewritten into its DER form before decoding:
//!
//! - indefinite and non-minimal lengths become minimal definite lengths
//! - constructed universal strings are joined into one primitive value
//! - elements of a universal SET are sorted by their encoding
//!
//! Content octets of primitive values are copied unchanged.

use crate::error::{Error, Result};

/// Nesting limit; real CMS stays well below it.
const MAX_DEPTH: usize = 64;

const CONSTRUCTED: u8 = 0x20;
const CLASS_MASK: u8 = 0xc0;
const HIGH_TAG: u8 = 0x1f;
const BIT_STRING: u8 = 0x03;
const SET: u8 = 0x31;

/// Re-encode the first BER element of `input` as DER.
///
/// Returns the DER bytes and the number of input bytes the element used, so
/// callers can inspect whatever follows it.
pub(crate) fn to_der(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    let (element, consumed) = read_element(input, 0)?;
    Ok((element.encode(), consumed))
}

struct Element {
    tag: Vec<u8>,
    content: Vec<u8>,
}

impl Element {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.tag.len() + 6 + self.content.len());
        out.extend_from_slice(&self.tag);
        push_length(&mut out, self.content.len());
        out.extend_from_slice(&self.content);
        out
    }

    fn is_constructed(&self) -> bool {
        self.tag[0] & CONSTRUCTED != 0
    }
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedEncoding(format!("BER: {}", msg.into()))
}

fn read_element(input: &[u8], depth: usize) -> Result<(Element, usize)> {
    if depth > MAX_DEPTH {
        return Err(malformed("nesting too deep"));
    }

    let tag_len = tag_length(input)?;
    let tag = input[..tag_len].to_vec();
    let constructed = tag[0] & CONSTRUCTED != 0;
    let (length, length_len) = read_length(&input[tag_len..])?;
    let start = tag_len + length_len;

    let Some(length) = length else {
        if !constructed {
            return Err(malformed("indefinite length on a primitive value"));
        }
        let mut children = Vec::new();
        let mut pos = start;
        loop {
            let rest = &input[pos..];
            if rest.len() < 2 {
                return Err(malformed("missing end-of-contents"));
            }
            if rest[0] == 0 && rest[1] == 0 {
                pos += 2;
                break;
            }
            let (child, used) = read_element(rest, depth + 1)?;
            children.push(child);
            pos += used;
        }
        return Ok((constructed_element(tag, children)?, pos));
    };

    let end = start
        .checked_add(length)
        .filter(|end| *end <= input.len())
        .ok_or_else(|| malformed("length exceeds input"))?;

    if !constructed {
        let content = input[start..end].to_vec();
        return Ok((Element { tag, content }, end));
    }

    let mut children = Vec::new();
    let mut pos = start;
    while pos < end {
        let (child, used) = read_element(&input[pos..end], depth + 1)?;
        children.push(child);
        pos += used;
    }
    Ok((constructed_element(tag, children)?, end))
}

fn constructed_element(mut tag: Vec<u8>, children: Vec<Element>) -> Result<Element> {
    if is_segmented_string(&tag) {
        let primitive = tag[0] & !CONSTRUCTED;
        let content = join_segments(primitive, children)?;
        tag[0] = primitive;
        return Ok(Element { tag, content });
    }

    let mut encoded: Vec<Vec<u8>> = children.iter().map(Element::encode).collect();
    if tag == [SET] {
        encoded.sort();
    }
    Ok(Element {
        tag,
        content: encoded.concat(),
    })
}

/// Universal string types that BER allows in constructed form.
fn is_segmented_string(tag: &[u8]) -> bool {
    let [first] = tag else {
        return false;
    };
    if first & CLASS_MASK != 0 || first & CONSTRUCTED == 0 {
        return false;
    }
    matches!(first & HIGH_TAG, 3 | 4 | 12 | 18..=22 | 25..=30)
}

fn join_segments(primitive: u8, segments: Vec<Element>) -> Result<Vec<u8>> {
    for segment in &segments {
        if segment.tag != [primitive] || segment.is_constructed() {
            return Err(malformed("string segment with a different tag"));
        }
    }

    if primitive != BIT_STRING {
        return Ok(segments.into_iter().flat_map(|s| s.content).collect());
    }

    // Each BIT STRING segment starts with its unused-bits count; only the
    // last one may be nonzero.
    let mut unused = 0u8;
    let mut bits = Vec::new();
    let count = segments.len();
    for (i, segment) in segments.into_iter().enumerate() {
        let Some((&segment_unused, data)) = segment.content.split_first() else {
            return Err(malformed("empty BIT STRING segment"));
        };
        if segment_unused != 0 && i + 1 != count {
            return Err(malformed("unused bits in an inner BIT STRING segment"));
        }
        unused = segment_unused;
        bits.extend_from_slice(data);
    }

    let mut content = Vec::with_capacity(bits.len() + 1);
    content.push(unused);
    content.extend_from_slice(&bits);
    Ok(content)
}

fn tag_length(input: &[u8]) -> Result<usize> {
    let first = *input.first().ok_or_else(|| malformed("missing tag"))?;
    if first & HIGH_TAG != HIGH_TAG {
        return Ok(1);
    }
    for (i, byte) in input.iter().enumerate().skip(1) {
        if byte & 0x80 == 0 {
            return Ok(i + 1);
        }
    }
    Err(malformed("truncated tag"))
}

/// Decode a length. `None` means indefinite.
fn read_length(input: &[u8]) -> Result<(Option<usize>, usize)> {
    let first = *input.first().ok_or_else(|| malformed("missing length"))?;
    if first < 0x80 {
        return Ok((Some(usize::from(first)), 1));
    }
    if first == 0x80 {
        return Ok((None, 1));
    }

    let count = usize::from(first & 0x7f);
    if first == 0xff || count > std::mem::size_of::<usize>() {
        return Err(malformed("unsupported length encoding"));
    }
    let octets = input
        .get(1..=count)
        .ok_or_else(|| malformed("truncated length"))?;
    let length = octets
        .iter()
        .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));
    Ok((Some(length), 1 + count))
}

fn push_length(out: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let bytes = length.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_der_input_is_unchanged() {
        let der = [0x30, 0x06, 0x02, 0x01, 0x05, 0x04, 0x01, 0xaa];
        let (out, used) = to_der(&der).unwrap();
        assert_eq!(out, der);
        assert_eq!(used, der.len());
    }

    #[test]
    fn test_indefinite_length_becomes_definite() {
        let ber = [0x30, 0x80, 0x02, 0x01, 0x05, 0x00, 0x00, 0x00, 0x00];
        let (out, used) = to_der(&ber).unwrap();
        assert_eq!(out, [0x30, 0x03, 0x02, 0x01, 0x05]);
        // Trailing zero padding after the end-of-contents is left alone
        assert_eq!(used, 7);
    }

    #[test]
    fn test_non_minimal_length() {
        let ber = [0x04, 0x82, 0x00, 0x02, 0xde, 0xad];
        let (out, _) = to_der(&ber).unwrap();
        assert_eq!(out, [0x04, 0x02, 0xde, 0xad]);
    }

    #[test]
    fn test_segmented_octet_string_is_joined() {
        let ber = [
            0x24, 0x80, 0x04, 0x02, 0x01, 0x02, 0x04, 0x01, 0x03, 0x00, 0x00,
        ];
        let (out, _) = to_der(&ber).unwrap();
        assert_eq!(out, [0x04, 0x03, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_segmented_bit_string() {
        let ber = [0x23, 0x08, 0x03, 0x02, 0x00, 0xff, 0x03, 0x02, 0x04, 0xf0];
        let (out, _) = to_der(&ber).unwrap();
        assert_eq!(out, [0x03, 0x03, 0x04, 0xff, 0xf0]);
    }

    #[test]
    fn test_set_elements_are_sorted() {
        let ber = [0x31, 0x80, 0x02, 0x01, 0x09, 0x02, 0x01, 0x01, 0x00, 0x00];
        let (out, _) = to_der(&ber).unwrap();
        assert_eq!(out, [0x31, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x09]);
    }

    #[test]
    fn test_long_content_length() {
        let mut ber = vec![0x30, 0x80, 0x04, 0x81, 0xc8];
        ber.extend(std::iter::repeat(0x11).take(200));
        ber.extend_from_slice(&[0x00, 0x00]);

        let (out, used) = to_der(&ber).unwrap();
        assert_eq!(used, ber.len());
        assert_eq!(&out[..5], &[0x30, 0x81, 0xcb, 0x04, 0x81]);
        assert_eq!(out.len(), 3 + 3 + 200);
    }

    #[test]
    fn test_malformed_ber() {
        // Missing end-of-contents
        assert!(to_der(&[0x30, 0x80, 0x02, 0x01, 0x05]).is_err());
        // Indefinite primitive
        assert!(to_der(&[0x04, 0x80, 0x01, 0x00, 0x00]).is_err());
        // Length past the end
        assert!(to_der(&[0x04, 0x05, 0x01]).is_err());
        // Mixed segment tags
        assert!(to_der(&[0x24, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00]).is_err());
        assert!(to_der(&[]).is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let mut ber = Vec::new();
        for _ in 0..(MAX_DEPTH + 2) {
            ber.extend_from_slice(&[0x30, 0x80]);
        }
        assert!(matches!(to_der(&ber), Err(Error::MalformedEncoding(_))));
    }
}
