//! Rate limiting for repeated, non-fatal warnings

/// Counts occurrences of one kind of warning and decides which of them are
/// worth logging.
///
/// The first `limit` occurrences are always reported. After that, every
/// `period`-th occurrence is reported (never, if `period` is 0), so a long
/// file with a systematic problem produces a handful of lines instead of one
/// per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningLimiter {
    limit: usize,
    period: usize,
    count: usize,
    reported: usize,
}

impl WarningLimiter {
    /// Report only the first `limit` occurrences
    pub fn new(limit: usize) -> Self {
        Self::periodic(limit, 0)
    }

    pub fn periodic(limit: usize, period: usize) -> Self {
        Self {
            limit,
            period,
            count: 0,
            reported: 0,
        }
    }

    /// Record one occurrence; returns `true` if it should be logged
    pub fn hit(&mut self) -> bool {
        self.count += 1;
        let report =
            self.count <= self.limit || (self.period > 0 && self.count % self.period == 0);
        if report {
            self.reported += 1;
        }
        report
    }

    /// Total number of occurrences seen so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// Occurrences that were counted but not logged
    pub fn suppressed(&self) -> usize {
        self.count - self.reported
    }
}

/// Keeps the first `capacity` messages of a kind and counts the rest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedLog {
    capacity: usize,
    messages: Vec<String>,
    dropped: usize,
}

impl BoundedLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: Vec::new(),
            dropped: 0,
        }
    }

    /// Returns `true` if the message was stored
    pub fn push<S: Into<String>>(&mut self, message: S) -> bool {
        if self.messages.len() < self.capacity {
            self.messages.push(message.into());
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.messages.len() + self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
