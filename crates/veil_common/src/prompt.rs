//! Prompt template for the sanitizer model.
//!
//! The user's text is appended verbatim after the instructions. It is not
//! escaped, so a crafted input can steer the model.

/// Bumped whenever the instruction block changes meaning
pub const PROMPT_VERSION: &str = "3";

/// Instruction block sent ahead of every user input
pub const INSTRUCTIONS: &str = r#"You are a privacy filter (prompt v3). Rewrite the user's input so it can be shared with a third-party AI service without leaking personal or confidential information.

Produce exactly three alternative versions:
- "Masked": the original text with every sensitive item replaced by a bracketed placeholder such as [NAME], [EMAIL], [PHONE], [ADDRESS], [DATE], [ID], [ORGANIZATION] or [AMOUNT]. Keep everything else word for word.
- "Rephrased": the same request rewritten in neutral, general terms so that no individual, organization or location can be identified, while preserving the intent of the question.
- "Synthetic": the same text with every sensitive item replaced by a realistic but fictional value of the same kind.

Respond with a single JSON object and nothing else, in this exact shape:
{"Masked": "...", "Rephrased": "...", "Synthetic": "..."}

Do not add explanations, markdown or code fences. Do not answer the user's question."#;

/// Combine the instruction block with the user's text.
pub fn compose(user_text: &str) -> String {
    format!("{INSTRUCTIONS}\n\nUser input: {user_text}\n\nSanitized output:")
}
