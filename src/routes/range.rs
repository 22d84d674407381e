//! `Range: bytes=...` handling for downloads. Only single ranges are served.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range; send the whole body.
    Full,
    /// Inclusive byte offsets.
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

/// Interpret a `Range` header against content of `len` bytes.
///
/// Malformed headers and multi-range requests are ignored, which yields
/// the full body.
pub fn parse_range(header: Option<&str>, len: u64) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };

    match (first.trim(), last.trim()) {
        ("", "") => ByteRange::Full,
        // suffix: the final n bytes
        ("", suffix) => match suffix.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(_) if len == 0 => ByteRange::Unsatisfiable,
            Ok(n) => ByteRange::Partial {
                start: len.saturating_sub(n),
                end: len - 1,
            },
            Err(_) => ByteRange::Full,
        },
        (start, "") => match start.parse::<u64>() {
            Ok(start) if start >= len => ByteRange::Unsatisfiable,
            Ok(start) => ByteRange::Partial {
                start,
                end: len - 1,
            },
            Err(_) => ByteRange::Full,
        },
        (start, end) => match (start.parse::<u64>(), end.parse::<u64>()) {
            (Ok(start), Ok(end)) if start > end => ByteRange::Full,
            (Ok(start), Ok(_)) if start >= len => ByteRange::Unsatisfiable,
            (Ok(start), Ok(end)) => ByteRange::Partial {
                start,
                end: end.min(len - 1),
            },
            _ => ByteRange::Full,
        },
    }
}
