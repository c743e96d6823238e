// Digest synthesis prompt templates.

pub const DIGEST_SYSTEM: &str = "\
You write short, insightful personal newsletters. \
You MUST respond with valid JSON only, with no markdown fences and no explanations.";

pub const DIGEST_PROMPT_TEMPLATE: &str = r#"Create a brief newsletter for a reader interested in: {interests}

Recent likes:
{liked_lines}

Reply ONLY with JSON:
{"subject":"short subject","content":"markdown: ## Themes\n- bullets\n## Insights\n- bullets\n## Explore Next\n- bullets"}"#;
