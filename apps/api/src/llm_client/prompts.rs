// Prompt fragments shared by every screening call.
// Feature-specific prompts live next to the code that sends them.

/// Appended to every system prompt.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps the model from filling gaps with guesses.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    Only report facts stated in the resume. Do NOT infer employers, dates, \
    degrees or skills that are not written down. Use null or an empty list \
    when the resume is silent.";
