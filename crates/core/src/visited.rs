use roaring::RoaringBitmap;

/// Line indices already placed into a bucket during a rescan build.
#[derive(Debug, Default, Clone)]
pub struct VisitedLines {
    lines: RoaringBitmap,
}

impl VisitedLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `line` was not present before.
    pub fn insert(&mut self, line: u32) -> bool {
        self.lines.insert(line)
    }

    pub fn contains(&self, line: u32) -> bool {
        self.lines.contains(line)
    }

    pub fn len(&self) -> u64 {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
