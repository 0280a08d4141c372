//! Canned clause suggestions keyed by clause category.

pub const FALLBACK: &str = "No suggestion available";

const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "confidentiality",
        "Both parties agree to keep confidential any proprietary information received from the other party during the term of this agreement.",
    ),
    (
        "termination",
        "Either party may terminate this agreement with 30 days written notice to the other party.",
    ),
    (
        "payment",
        "The client agrees to pay the provider $X upon completion of the deliverables outlined in this agreement.",
    ),
    (
        "liability",
        "In no event shall either party be liable for any indirect, special, incidental, or consequential damages.",
    ),
];

pub fn suggestion_for(kind: Option<&str>) -> &'static str {
    kind.and_then(|kind| {
        SUGGESTIONS
            .iter()
            .find(|(key, _)| *key == kind)
            .map(|(_, text)| *text)
    })
    .unwrap_or(FALLBACK)
}
