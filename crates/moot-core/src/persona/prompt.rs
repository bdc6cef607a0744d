//! System prompt rendering.

use minijinja::{Environment, context};

use crate::error::Result;

const SYSTEM_PROMPT_TEMPLATE: &str = "{{ base_prompt }}
{%- if case_context %}

[CASE CONTEXT]
{{ case_context }}
{%- endif %}";

/// Attaches the case context (when present) to a persona's base prompt.
pub fn render_system_prompt(base_prompt: &str, case_context: Option<&str>) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("system_prompt", SYSTEM_PROMPT_TEMPLATE)?;
    let template = env.get_template("system_prompt")?;
    let rendered = template.render(context! {
        base_prompt => base_prompt.trim(),
        case_context => case_context,
    })?;
    Ok(rendered)
}
