/// Profile content limits. A profile counts as complete once it carries
/// the minimum photos and prompts plus the required text fields.
pub const MIN_PHOTOS: i64 = 3;
pub const MAX_PHOTOS: usize = 6;
pub const REQUIRED_PROMPTS: i64 = 3;
pub const MAX_PROMPTS: usize = 3;
pub const MAX_ANSWER_LENGTH: usize = 300;

/// Fixed catalog of prompt questions. Answers referencing anything else
/// are rejected.
pub const PROMPT_IDS: &[&str] = &[
    "two-truths-and-a-lie",
    "ideal-first-date",
    "library-or-party",
    "my-green-flag",
    "dining-hall-order",
    "best-study-break",
    "campus-hot-take",
    "this-semester-i-will",
];

pub fn is_known_prompt(prompt_id: &str) -> bool {
    PROMPT_IDS.contains(&prompt_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup() {
        assert!(is_known_prompt("ideal-first-date"));
        assert!(!is_known_prompt("not-a-prompt"));
        assert!(!is_known_prompt(""));
    }
}
