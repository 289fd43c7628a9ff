/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    /// Index of the open question; `None` once the session is complete.
    pub current: Option<usize>,
    pub is_complete: bool,
}
