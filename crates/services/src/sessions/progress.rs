/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub current: usize,
    pub answered: usize,
    pub expired: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    /// One-based position label such as `"2 / 5"`.
    #[must_use]
    pub fn position_label(&self) -> String {
        format!("{} / {}", self.current + 1, self.total)
    }
}
