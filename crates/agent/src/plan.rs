//! Heuristic classification of a final reply as a structured plan.

use regex_lite::Regex;
use std::sync::LazyLock;

type Pattern = LazyLock<Option<Regex>>;

static PLAN_TITLE: Pattern = LazyLock::new(|| Regex::new(r"(?im)^#\s*Plan\s+for").ok());
static OBJECTIVE: Pattern = LazyLock::new(|| Regex::new(r"(?im)^##\s*Objective").ok());
static FILES_TO_MODIFY: Pattern =
    LazyLock::new(|| Regex::new(r"(?im)^##\s*Files\s+to\s+Modify").ok());
static IMPLEMENTATION_STEPS: Pattern =
    LazyLock::new(|| Regex::new(r"(?im)^##\s*Implementation\s+Steps").ok());
static LIST_LINE: Pattern = LazyLock::new(|| Regex::new(r"(?m)^\d+\.\s|^[-*+]\s").ok());

const PLAN_KEYWORDS: &[&str] = &[
    "plan",
    "objective",
    "analysis",
    "modify",
    "implement",
    "steps",
    "files to modify",
    "expected outcome",
    "codebase",
];

fn found(pattern: &Pattern, text: &str) -> bool {
    matches!(&**pattern, Some(re) if re.is_match(text))
}

/// Whether `content` looks like a plan written in the requested format.
///
/// True when the main headers are present, or when at least three distinct
/// plan keywords appear alongside a numbered or bulleted list.
pub fn is_plan_content(content: &str) -> bool {
    let has_main_structure = found(&PLAN_TITLE, content)
        && found(&OBJECTIVE, content)
        && (found(&FILES_TO_MODIFY, content) || found(&IMPLEMENTATION_STEPS, content));
    if has_main_structure {
        return true;
    }

    let lower = content.to_lowercase();
    let keyword_count = PLAN_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    keyword_count >= 3 && found(&LIST_LINE, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        for pattern in [&PLAN_TITLE, &OBJECTIVE, &FILES_TO_MODIFY, &IMPLEMENTATION_STEPS, &LIST_LINE] {
            assert!(pattern.is_some(), "pattern failed to compile");
        }
    }

    #[test]
    fn headers_make_a_plan() {
        let content = "# Plan for caching\n\n## Objective\nSpeed up reads\n\n## Files to Modify\n- src/cache.rs";
        assert!(is_plan_content(content));
    }

    #[test]
    fn headers_are_case_insensitive() {
        let content = "# plan FOR x\n## objective\n## implementation steps\n";
        assert!(is_plan_content(content));
    }

    #[test]
    fn plain_prose_is_not_a_plan() {
        assert!(!is_plan_content("The project builds fine and all tests pass."));
    }

    #[test]
    fn keywords_with_numbered_list_make_a_plan() {
        let content = "To implement this we need a few steps after analysis:\n1. Add the module\n2. Wire it in";
        assert!(is_plan_content(content));
    }

    #[test]
    fn keywords_without_list_are_not_a_plan() {
        let content = "The plan has an objective and several steps, but no list.";
        assert!(!is_plan_content(content));
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let content = "plan plan plan\n- item";
        assert!(!is_plan_content(content));
    }
}
