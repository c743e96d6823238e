// Pulse annotation prompt templates.

pub const PULSE_SYSTEM: &str = "\
You are a sharp analyst who summarizes online discussions in one line each. \
Respond with valid JSON only, no markdown fences and no explanations.";

pub const PULSE_PROMPT_TEMPLATE: &str = r#"Analyze this Reddit post briefly.

Title: {title}
Sub: r/{source}
Text: {body}
Comments: {comments}

Reply ONLY with JSON:
{"core_debate":"1 sentence","expert_lens":"1 sentence","logic_quality":"strong|moderate|weak","key_insight":"1 sentence","contrarian_take":"optional, 1 sentence"}"#;
