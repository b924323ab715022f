use core::ops::Range;

/// Divides `0..len` into at most `parts` contiguous ranges whose sizes differ
/// by at most one. The first `len % parts` ranges carry the extra item.
///
/// Fewer than `parts` ranges are produced when `len < parts`; no range is
/// ever empty.
pub struct RangeSplitter {
    len: usize,
    position: usize,
    index: usize,
    base: usize,
    extra: usize,
}

impl RangeSplitter {
    pub fn new(len: usize, parts: usize) -> Self {
        let parts = parts.max(1);
        RangeSplitter {
            len,
            position: 0,
            index: 0,
            base: len / parts,
            extra: len % parts,
        }
    }
}

impl Iterator for RangeSplitter {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        let start = self.position;
        if start == self.len {
            return None;
        }

        let end = start + self.base + (self.index < self.extra) as usize;
        self.index += 1;
        self.position = end;
        Some(start..end)
    }
}
