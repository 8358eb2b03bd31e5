//! Decoder for the gateway's concatenated multi-blob framing.
//!
//! A response body is a sequence of frames:
//!
//! ```text
//! $$$IPFS/<address>:<payload bytes>/$$$IPFS
//! ```
//!
//! Payloads are raw bytes and are not escaped.

use std::ops::Range;

/// Marker opening a frame; followed by `<address>:`.
pub const FRAME_START: &[u8] = b"$$$IPFS/";

/// Marker closing the most recently opened frame.
pub const FRAME_END: &[u8] = b"/$$$IPFS";

/// The `<address>:` header must fit within this many bytes of the start marker.
const HEADER_WINDOW: usize = 128;

/// One decoded blob: its address and its byte range in the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub address: String,
    pub range: Range<usize>,
}

/// Match a frame header at the beginning of `rest`.
/// Returns the address and the header length.
fn match_header(rest: &[u8]) -> Option<(&str, usize)> {
    if !rest.starts_with(FRAME_START) {
        return None;
    }
    let window = &rest[..rest.len().min(HEADER_WINDOW)];
    let after_marker = &window[FRAME_START.len()..];
    let colon = after_marker.iter().position(|&b| b == b':')?;
    if colon == 0 {
        return None;
    }
    let address = std::str::from_utf8(&after_marker[..colon]).ok()?;
    Some((address, FRAME_START.len() + colon + 1))
}

/// Split a response body into frames for the addresses accepted by `wanted`.
///
/// The scan is a single pass over the body. Headers naming other addresses
/// are ignored. An end marker only closes the latest frame while that frame
/// is still open, so stray end markers are harmless. Frames that are never
/// closed are dropped.
pub fn parse_frames<F>(body: &[u8], wanted: F) -> Vec<Frame>
where
    F: Fn(&str) -> bool,
{
    let mut frames: Vec<(String, usize, Option<usize>)> = Vec::new();
    let mut i = 0;

    while i < body.len() {
        let rest = &body[i..];

        if let Some((address, header_len)) = match_header(rest) {
            if wanted(address) {
                frames.push((address.to_string(), i + header_len, None));
                i += header_len;
                continue;
            }
        }

        if rest.starts_with(FRAME_END) {
            if let Some((_, _, end @ None)) = frames.last_mut() {
                *end = Some(i);
            }
        }

        i += 1;
    }

    frames
        .into_iter()
        .filter_map(|(address, start, end)| {
            end.map(|end| Frame {
                address,
                range: start..end,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(address: &str, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(FRAME_START);
        out.extend_from_slice(address.as_bytes());
        out.push(b':');
        out.extend_from_slice(payload);
        out.extend_from_slice(FRAME_END);
        out
    }

    fn any(_: &str) -> bool {
        true
    }

    #[test]
    fn test_two_frames() {
        let mut body = frame("QmA", b"hello");
        body.extend(frame("QmB", b"world!"));

        let frames = parse_frames(&body, any);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].address, "QmA");
        assert_eq!(&body[frames[0].range.clone()], b"hello");
        assert_eq!(frames[1].address, "QmB");
        assert_eq!(&body[frames[1].range.clone()], b"world!");
    }

    #[test]
    fn test_binary_payload() {
        let payload = [0x89, b'P', b'N', b'G', 0x00, 0xff, 0xfe, b'$', b'$'];
        let body = frame("QmBin", &payload);

        let frames = parse_frames(&body, any);
        assert_eq!(frames.len(), 1);
        assert_eq!(&body[frames[0].range.clone()], &payload);
    }

    #[test]
    fn test_empty_payload() {
        let mut body = frame("QmEmpty", b"");
        body.extend(frame("QmNext", b"x"));

        let frames = parse_frames(&body, any);
        assert_eq!(frames.len(), 2);
        assert!(frames[0].range.is_empty());
        assert_eq!(&body[frames[1].range.clone()], b"x");
    }

    #[test]
    fn test_path_address() {
        let body = frame("QmDir/1.png", b"img");
        let frames = parse_frames(&body, any);
        assert_eq!(frames[0].address, "QmDir/1.png");
    }

    #[test]
    fn test_unwanted_address_is_skipped() {
        let mut body = frame("QmA", b"aaa");
        body.extend(frame("QmOther", b"zzz"));

        let frames = parse_frames(&body, |a| a == "QmA");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].address, "QmA");
        assert_eq!(&body[frames[0].range.clone()], b"aaa");
    }

    #[test]
    fn test_surrounding_noise() {
        let mut body = b"HTTP junk /$$$IPFS before\n".to_vec();
        body.extend(frame("QmA", b"data"));
        body.extend_from_slice(b"\ntrailer /$$$IPFS");

        let frames = parse_frames(&body, any);
        assert_eq!(frames.len(), 1);
        assert_eq!(&body[frames[0].range.clone()], b"data");
    }

    #[test]
    fn test_unclosed_frame_is_dropped() {
        let mut body = frame("QmA", b"complete");
        body.extend_from_slice(b"$$$IPFS/QmB:truncated");

        let frames = parse_frames(&body, any);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].address, "QmA");
    }

    #[test]
    fn test_header_without_colon_in_window_is_ignored() {
        let mut body = b"$$$IPFS/".to_vec();
        body.extend(std::iter::repeat(b'x').take(200));
        body.extend_from_slice(b":payload/$$$IPFS");

        assert!(parse_frames(&body, any).is_empty());
    }

    #[test]
    fn test_empty_body() {
        assert!(parse_frames(b"", any).is_empty());
    }
}
