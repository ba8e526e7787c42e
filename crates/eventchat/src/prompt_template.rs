use serde::Serialize;
use std::fs;
use std::path::Path;
use strum::IntoEnumIterator;
use tera::{Context, Error as TeraError, Tera};

use crate::models::event::Category;
use crate::models::tool::Tool;

const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");

#[derive(Serialize)]
struct SystemPromptContext<'a> {
    tools: &'a [Tool],
    categories: Vec<String>,
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

pub fn load_prompt_file<T: Serialize>(
    template_file: impl AsRef<Path>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_content = fs::read_to_string(template_file.as_ref())
        .map_err(|e| TeraError::chain("Failed to read template file", e))?;
    load_prompt(&template_content, context_data)
}

/// Render the system message, from `template_file` when given or the built-in prompt otherwise.
///
/// Templates see `tools` (name, description, input_schema) and `categories`.
pub fn system_prompt(tools: &[Tool], template_file: Option<&Path>) -> Result<String, TeraError> {
    let context = SystemPromptContext {
        tools,
        categories: Category::iter().map(|c| c.to_string()).collect(),
    };
    match template_file {
        Some(path) => load_prompt_file(path, &context),
        None => load_prompt(SYSTEM_PROMPT, &context),
    }
}
