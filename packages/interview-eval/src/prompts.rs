//! Prompt templates and rendering.
//!
//! Two template sets exist: a rubric-anchored set for general-purpose models
//! and a terse set for a model fine-tuned on the rubric. One set is chosen per
//! run through [`PromptMode`].

use serde::{Deserialize, Serialize};

/// Placeholder replaced with the interviewer's question.
pub const QUESTION_PLACEHOLDER: &str = "{interviewer_question}";

/// Placeholder replaced with the candidate's answer.
pub const ANSWER_PLACEHOLDER: &str = "{interviewee_answer}";

// =============================================================================
// Templates
// =============================================================================

pub const RUBRIC_SYSTEM_PROMPT: &str = r#"You are an experienced technical interviewer evaluating a single answer from a candidate interview.

Assess the candidate's TECHNICAL EXPERTISE as shown in this answer only. Use the full 1-5 scale:

5 - Expert: precise and correct use of technical concepts, explains trade-offs and design decisions, gives concrete examples with measurable outcomes, discusses challenges and how they were solved.
4 - Strong: accurate and detailed, good command of the tools and methods involved, minor gaps in depth or in discussion of challenges.
3 - Competent: generally correct but mostly descriptive, limited depth, few specifics about the candidate's own contribution.
2 - Limited: vague or partly incorrect, relies on buzzwords, little evidence of hands-on work.
1 - Insufficient: incorrect, off-topic or no technical content.

Process:
1. Identify the key technologies and concepts mentioned.
2. Check whether they are used accurately.
3. Judge the depth of the explanation.
4. Consider the relevance and quality of examples.
5. Decide whether the level of technical detail fits the question.

Respond with a single JSON object and nothing else:
{"expertise": {"score": <integer 1-5>, "justification": "<why this score>", "thought_process": "<numbered steps you followed>"}}"#;

pub const RUBRIC_USER_PROMPT: &str = r#"
You will now be presented with an interview question and answer. Please evaluate it using the rubric and process described above. Remember to use the full range of scores from 1 to 5, and avoid clustering around middle values.

Interviewer: {interviewer_question}
Interviewee: {interviewee_answer}

Provide your evaluation in the specified JSON format, including the score, justification, and thought process. Ensure your scoring is consistent with the rubric.
Do not give anything outside of the JSON. No explanation or any text is required outside of the JSON.
"#;

pub const FINE_TUNED_SYSTEM_PROMPT: &str = "You evaluate interview answers for technical expertise. \
Reply with JSON: {\"expertise\": {\"score\": 1-5, \"justification\": string, \"thought_process\": string}}.";

pub const FINE_TUNED_USER_PROMPT: &str = "Evaluate the following interview response for technical expertise:

Interviewer: {interviewer_question}
Interviewee: {interviewee_answer}
";

// =============================================================================
// Prompt sets
// =============================================================================

/// Which template set a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PromptMode {
    /// Verbose rubric-anchored prompts for general-purpose models
    #[default]
    Rubric,
    /// Terse prompts for a model fine-tuned on the rubric
    FineTuned,
}

impl std::str::FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rubric" => Ok(Self::Rubric),
            "fine-tuned" | "finetuned" | "fine_tuned" => Ok(Self::FineTuned),
            other => Err(format!("unknown prompt mode '{}'", other)),
        }
    }
}

/// System prompt plus user template for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub system: String,
    pub user_template: String,
}

impl PromptSet {
    pub fn new(system: impl Into<String>, user_template: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user_template: user_template.into(),
        }
    }

    pub fn for_mode(mode: PromptMode) -> Self {
        match mode {
            PromptMode::Rubric => Self::new(RUBRIC_SYSTEM_PROMPT, RUBRIC_USER_PROMPT),
            PromptMode::FineTuned => Self::new(FINE_TUNED_SYSTEM_PROMPT, FINE_TUNED_USER_PROMPT),
        }
    }

    /// Render the user prompt for one question/answer pair.
    pub fn user_prompt(&self, question: &str, answer: &str) -> String {
        format(&self.user_template, question, answer)
    }
}

/// Substitute the question and answer placeholders in `template`.
///
/// Single left-to-right pass: inserted text is never rescanned, so a question
/// that itself contains a placeholder is copied literally. Braces that do not
/// form a known placeholder are left untouched.
pub fn format(template: &str, question: &str, answer: &str) -> String {
    let mut out = String::with_capacity(template.len() + question.len() + answer.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
            out.push_str(question);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(ANSWER_PLACEHOLDER) {
            out.push_str(answer);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}
