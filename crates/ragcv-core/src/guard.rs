use crate::latex;

/// Latch that stops generated text from overwriting a source the user has touched.
///
/// Set by any manual edit, cleared only when a new query result starts a new document.
#[derive(Debug, Default)]
pub struct ManualEditGuard {
    latched: bool,
}

impl ManualEditGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_manual_edit(&mut self) {
        if !self.latched {
            tracing::debug!("manual edit latched; auto-populate suppressed");
        }
        self.latched = true;
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// New document: generated text may populate the source again
    pub fn reset(&mut self) {
        self.latched = false;
    }

    /// Formats `generated` as document source unless the latch is set.
    pub fn try_auto_populate(&self, generated: &str) -> Option<String> {
        if self.latched {
            return None;
        }
        Some(latex::to_document(generated))
    }
}
