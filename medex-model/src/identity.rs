use serde::{Deserialize, Serialize};

/// A patient identity extracted from a file or directory name, together
/// with the confidence of the pattern tier that matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientIdentity {
    /// Short Hangul name token, 2 to 5 syllables.
    pub patient_name: String,
    /// Registration number, 6 to 8 digits.
    pub patient_id: String,
    /// Confidence of the matching tier, in `[0, 1]`.
    pub confidence: f64,
}
