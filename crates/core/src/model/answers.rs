use std::collections::BTreeSet;

/// Per-question answer slots plus the set of time-expired questions.
///
/// An expired slot is frozen for good: whatever it held at expiry is what
/// gets scored. After `freeze` the whole sheet is read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: Vec<Option<String>>,
    expired: BTreeSet<usize>,
    frozen: bool,
}

impl AnswerSheet {
    /// Creates a sheet with `len` unset slots.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            answers: vec![None; len],
            expired: BTreeSet::new(),
            frozen: false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Record an answer, replacing any earlier one for the same slot.
    ///
    /// Returns `false` without touching the sheet when the slot is expired,
    /// out of range, or the sheet is frozen.
    pub fn set_answer(&mut self, index: usize, value: impl Into<String>) -> bool {
        if self.frozen || self.expired.contains(&index) {
            return false;
        }
        match self.answers.get_mut(index) {
            Some(slot) => {
                *slot = Some(value.into());
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_answered(&self, index: usize) -> bool {
        matches!(self.answers.get(index), Some(Some(_)))
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(index).and_then(Option::as_deref)
    }

    /// Freeze a slot because its countdown reached zero.
    ///
    /// Returns `true` only the first time an in-range index is marked.
    pub fn mark_expired(&mut self, index: usize) -> bool {
        if index >= self.answers.len() {
            return false;
        }
        self.expired.insert(index)
    }

    #[must_use]
    pub fn is_expired(&self, index: usize) -> bool {
        self.expired.contains(&index)
    }

    /// Answered, or frozen by expiry; either satisfies a progression gate.
    #[must_use]
    pub fn is_settled(&self, index: usize) -> bool {
        self.is_answered(index) || self.is_expired(index)
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    #[must_use]
    pub fn expired_indices(&self) -> &BTreeSet<usize> {
        &self.expired
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_before_expiry() {
        let mut sheet = AnswerSheet::new(2);
        assert!(sheet.set_answer(0, "a"));
        assert!(sheet.set_answer(0, "b"));
        assert_eq!(sheet.answer(0), Some("b"));
        assert!(sheet.is_answered(0));
        assert!(!sheet.is_answered(1));
    }

    #[test]
    fn expired_slot_is_frozen_with_its_prior_answer() {
        let mut sheet = AnswerSheet::new(3);
        sheet.set_answer(1, "early");
        assert!(sheet.mark_expired(1));
        assert!(!sheet.mark_expired(1));

        for attempt in ["late", "later", "latest"] {
            assert!(!sheet.set_answer(1, attempt));
        }
        assert_eq!(sheet.answer(1), Some("early"));
        assert!(sheet.is_settled(1));
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut sheet = AnswerSheet::new(1);
        assert!(!sheet.set_answer(5, "x"));
        assert!(!sheet.mark_expired(5));
        assert!(sheet.expired_indices().is_empty());
    }

    #[test]
    fn frozen_sheet_rejects_writes() {
        let mut sheet = AnswerSheet::new(2);
        sheet.set_answer(0, "a");
        sheet.freeze();
        assert!(!sheet.set_answer(1, "b"));
        assert_eq!(sheet.answered_count(), 1);
    }
}
