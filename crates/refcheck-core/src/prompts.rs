//! Prompt templates (`MiniJinja`).

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

/// System instruction sent with every advisory request.
pub const SYSTEM_PROMPT: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/system.md"));

/// Wraps a scenario for legal-risk analysis. Variable: `user_text`.
pub const ANALYZE_PROMPT_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/analyze.md"));

/// Asks for reference-check questions for a job role. Variable: `user_text`.
pub const GENERATE_PROMPT_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/generate.md"));

/// Speaking-style instruction for narration synthesis. Variable: `script`.
pub const NARRATION_PROMPT_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/narration.md"));

/// Renders `template` with `vars`, failing on undefined variables.
///
/// # Errors
/// Returns an error if the template does not parse or references a
/// variable missing from `vars`.
pub fn render<S: Serialize>(template: &str, vars: S) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_template("prompt", template)?;

    let output = env.get_template("prompt")?.render(vars)?;
    Ok(output.replace("\r\n", "\n").trim().to_string())
}
