use medex_model::PatientIdentity;
use regex::Regex;
use std::sync::LazyLock;

/// One ranked filename-matching rule with its confidence value.
struct Tier {
    pattern: Regex,
    confidence: f64,
}

/// The ordered pattern tiers, highest priority first.
///
/// Delimited forms outrank whitespace-separated forms, which outrank loose
/// "both tokens appear somewhere" forms. The name token is 2-5 Hangul
/// syllables, the registration number 6-8 ASCII digits.
static TIERS: LazyLock<Vec<Tier>> = LazyLock::new(|| {
    let tier = |pattern: &str, confidence: f64| Tier {
        pattern: Regex::new(pattern).expect("tier pattern must compile"),
        confidence,
    };
    vec![
        // 홍길동_1234567_검사결과
        tier(r"^(?P<name>[가-힣]{2,5})_(?P<id>[0-9]{6,8})_", 0.95),
        // 1234567_홍길동_MRI
        tier(r"^(?P<id>[0-9]{6,8})_(?P<name>[가-힣]{2,5})_", 0.95),
        // 홍길동 1234567 초음파
        tier(r"^(?P<name>[가-힣]{2,5})\s+(?P<id>[0-9]{6,8})", 0.90),
        // 1234567 홍길동 CT
        tier(r"^(?P<id>[0-9]{6,8})\s+(?P<name>[가-힣]{2,5})", 0.90),
        // name somewhere before id
        tier(r"(?P<name>[가-힣]{2,5}).*?(?P<id>[0-9]{6,8})", 0.70),
        // id somewhere before name
        tier(r"(?P<id>[0-9]{6,8}).*?(?P<name>[가-힣]{2,5})", 0.70),
    ]
});

/// Extracts a patient identity from a file or directory name.
///
/// Pure and deterministic: the same input always yields the same tier
/// result. Tiers are tried in priority order and the first candidate that
/// survives validation wins; there is no score combination across tiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityExtractor;

impl IdentityExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Try each tier against `name` (a base name, extension already
    /// stripped for files). Returns `None` when no tier produces a valid
    /// candidate; the caller must not fabricate a record from that.
    pub fn extract(&self, name: &str) -> Option<PatientIdentity> {
        for tier in TIERS.iter() {
            let Some(captures) = tier.pattern.captures(name) else {
                continue;
            };
            let patient_name = &captures["name"];
            let patient_id = &captures["id"];
            // A tier can match syntactically while the tokens are still
            // unusable; such a candidate falls through to the next tier.
            if !valid_name(patient_name) || !valid_id(patient_id) {
                continue;
            }
            return Some(PatientIdentity {
                patient_name: patient_name.to_string(),
                patient_id: patient_id.to_string(),
                confidence: tier.confidence,
            });
        }
        None
    }
}

/// 2-5 characters, all Hangul syllables. The syllable range excludes
/// digits and delimiters by construction; the explicit check also rejects
/// captures that somehow picked up other scripts.
fn valid_name(name: &str) -> bool {
    let count = name.chars().count();
    (2..=5).contains(&count) && name.chars().all(|c| ('가'..='힣').contains(&c))
}

/// 6-8 ASCII digits.
fn valid_id(id: &str) -> bool {
    (6..=8).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_digit())
}
