//! Attack table and the inbound garbage counter

/// Garbage lines sent for clearing `lines` rows with one lock
pub fn attack_for_lines(lines: u32) -> u32 {
    match lines {
        0 | 1 => 0,
        2 => 1,
        3 => 2,
        _ => 4,
    }
}

/// Garbage received from opponents, waiting for the next lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingGarbage {
    lines: u32,
}

impl PendingGarbage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, lines: u32) {
        self.lines = self.lines.saturating_add(lines);
    }

    /// Take everything queued, leaving zero behind
    pub fn take(&mut self) -> u32 {
        std::mem::take(&mut self.lines)
    }

    pub fn get(&self) -> u32 {
        self.lines
    }
}
