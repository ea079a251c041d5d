use serde::Deserialize;

/// Request body for finishing a shift. The whole body is optional on the
/// wire; a missing report becomes the empty string.
#[derive(Debug, Deserialize)]
pub struct FinishShiftRequest {
    pub report: Option<String>,
}
