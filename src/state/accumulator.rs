use crate::types::frame_delta;
use serde_json::Value;

/// Running assistant text for one request.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    content: String,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the frame's delta. Returns the updated text, or `None` when
    /// the frame carried no text.
    pub fn apply(&mut self, frame: &Value) -> Option<&str> {
        let delta = frame_delta(frame).filter(|delta| !delta.is_empty())?;
        self.content.push_str(delta);
        Some(&self.content)
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}
