/// Last block height fully scanned by one poller. Zero means the poller has
/// not synchronized yet; it never backfills past its first observed height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Cursor(u64);

/// Inclusive block range queried by one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub from: u64,
    pub to: u64,
}

impl ScanWindow {
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// What a scan should do given the cursor and the current height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// First observation; jump straight to this height.
    Synchronize(u64),
    UpToDate,
    Scan(ScanWindow),
}

impl Cursor {
    pub const UNINITIALIZED: Cursor = Cursor(0);

    pub fn at(height: u64) -> Self {
        Cursor(height)
    }

    pub fn height(&self) -> u64 {
        self.0
    }

    pub fn is_initialized(&self) -> bool {
        self.0 != 0
    }

    pub fn next_step(&self, current_height: u64, max_window: u64) -> NextStep {
        if !self.is_initialized() {
            return NextStep::Synchronize(current_height);
        }
        if current_height <= self.0 {
            return NextStep::UpToDate;
        }
        let from = self.0 + 1;
        let size = (current_height - from + 1).min(max_window.max(1));
        NextStep::Scan(ScanWindow {
            from,
            to: from + size - 1,
        })
    }

    /// Moves forward to `height`; never moves backwards.
    pub fn advance_to(&mut self, height: u64) {
        self.0 = self.0.max(height);
    }
}
