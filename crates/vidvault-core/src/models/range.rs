use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Half-open byte range `[start, end)` within a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create a range; returns `None` when `start >= end`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        if start < end {
            Some(ByteRange { start, end })
        } else {
            None
        }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Clamp the range to an object of `total` bytes. Returns `None` when the
    /// range starts at or past the end of the object.
    pub fn clamp(&self, total: u64) -> Option<ByteRange> {
        if self.start >= total {
            return None;
        }
        Some(ByteRange {
            start: self.start,
            end: self.end.min(total),
        })
    }

    /// Parse an HTTP `Range` header (`bytes=a-b`, `bytes=a-`, `bytes=-n`)
    /// against an object of `total` bytes. Only single ranges are supported;
    /// multipart ranges and unsatisfiable ranges yield `None`.
    pub fn from_header(header: &str, total: u64) -> Option<ByteRange> {
        let spec = header.strip_prefix("bytes=")?.trim();
        if spec.contains(',') {
            return None;
        }
        let (start_str, end_str) = spec.split_once('-')?;
        let range = match (start_str.trim(), end_str.trim()) {
            // bytes=-n : final n bytes
            ("", suffix) => {
                let n: u64 = suffix.parse().ok()?;
                if n == 0 {
                    return None;
                }
                ByteRange {
                    start: total.saturating_sub(n),
                    end: total,
                }
            }
            // bytes=a- : from a to the end
            (start, "") => ByteRange {
                start: start.parse().ok()?,
                end: total,
            },
            // bytes=a-b : inclusive on the wire, half-open here
            (start, end) => {
                let start: u64 = start.parse().ok()?;
                let end: u64 = end.parse().ok()?;
                if end < start {
                    return None;
                }
                ByteRange {
                    start,
                    end: end + 1,
                }
            }
        };
        range.clamp(total).filter(|r| !r.is_empty())
    }

    /// Render as an HTTP `Content-Range` value against `total` bytes.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end - 1, total)
    }
}

impl Display for ByteRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_range_is_inclusive_on_the_wire() {
        let range = ByteRange::from_header("bytes=0-499", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 500 });
        assert_eq!(range.len(), 500);
    }

    #[test]
    fn open_ended_range_runs_to_total() {
        let range = ByteRange::from_header("bytes=200-", 1000).unwrap();
        assert_eq!(
            range,
            ByteRange {
                start: 200,
                end: 1000
            }
        );
    }

    #[test]
    fn suffix_range_takes_final_bytes() {
        let range = ByteRange::from_header("bytes=-100", 1000).unwrap();
        assert_eq!(
            range,
            ByteRange {
                start: 900,
                end: 1000
            }
        );
        // Suffix longer than the object covers the whole object.
        let range = ByteRange::from_header("bytes=-5000", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 1000 });
    }

    #[test]
    fn end_clamped_to_total() {
        let range = ByteRange::from_header("bytes=900-1999", 1000).unwrap();
        assert_eq!(
            range,
            ByteRange {
                start: 900,
                end: 1000
            }
        );
    }

    #[test]
    fn unsatisfiable_and_malformed_rejected() {
        assert!(ByteRange::from_header("bytes=1000-", 1000).is_none());
        assert!(ByteRange::from_header("bytes=5-2", 1000).is_none());
        assert!(ByteRange::from_header("bytes=0-10,20-30", 1000).is_none());
        assert!(ByteRange::from_header("items=0-10", 1000).is_none());
        assert!(ByteRange::from_header("bytes=-0", 1000).is_none());
    }

    #[test]
    fn content_range_header_value() {
        let range = ByteRange { start: 0, end: 500 };
        assert_eq!(range.content_range(1000), "bytes 0-499/1000");
    }
}
