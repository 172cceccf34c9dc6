use prism_core::commands::NavDirection;

pub const DEFAULT_CAPACITY: usize = 10;

/// Bounded, deduplicated recency stack with a position cursor.
///
/// Index 0 is the most recent entry. Inserting a duplicate (by the supplied
/// equality) relocates it to the top instead of growing the stack; pushing a
/// genuinely new entry while the cursor sits in the past truncates the
/// forward entries beyond it.
pub struct NavigationHistory<T> {
    entries: Vec<T>,
    cursor: usize,
    capacity: usize,
    eq: Box<dyn Fn(&T, &T) -> bool + Send + Sync>,
}

impl<T: PartialEq> NavigationHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_equality(capacity, |a: &T, b: &T| a == b)
    }
}

impl<T> NavigationHistory<T> {
    pub fn with_equality(
        capacity: usize,
        eq: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            entries: Vec::new(),
            cursor: 0,
            capacity,
            eq: Box::new(eq),
        }
    }

    /// Insert an entry, relocating an equal one to the top without growing
    /// the stack. Evicts the least-recently-used entry at capacity. Does not
    /// move the cursor.
    pub fn insert(&mut self, entry: T) {
        if let Some(pos) = self.entries.iter().position(|e| (self.eq)(e, &entry)) {
            self.entries.remove(pos);
        } else if self.entries.len() == self.capacity {
            self.entries.pop();
        }
        self.entries.insert(0, entry);
    }

    /// Insert and reset the cursor to the top. Forward entries beyond the
    /// old cursor position are truncated first.
    pub fn add(&mut self, entry: T) {
        if self.cursor > 0 {
            self.entries.drain(0..self.cursor.min(self.entries.len()));
            self.cursor = 0;
        }
        self.insert(entry);
    }

    /// Move the cursor one step, clamped to bounds. Returns the entry at the
    /// new cursor, or `None` when already at a bound.
    pub fn navigate(&mut self, direction: NavDirection) -> Option<&T> {
        match direction {
            NavDirection::Back => {
                if self.cursor + 1 >= self.entries.len() {
                    return None;
                }
                self.cursor += 1;
            }
            NavDirection::Forward => {
                if self.cursor == 0 {
                    return None;
                }
                self.cursor -= 1;
            }
        }
        self.entries.get(self.cursor)
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.cursor)
    }

    /// 1-based cursor position for the "position/count" indicator.
    pub fn position(&self) -> u32 {
        if self.entries.is_empty() {
            0
        } else {
            self.cursor as u32 + 1
        }
    }

    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &T) -> bool {
        self.entries.iter().any(|e| (self.eq)(e, entry))
    }
}
