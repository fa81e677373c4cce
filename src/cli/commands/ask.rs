//! Ask command implementation.

use crate::cli::preflight;
use crate::cli::{build_assistant, load_prompts, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, mut settings: Settings) -> Result<()> {
    let api_key = match preflight::require_api_key(&settings) {
        Ok(key) => key,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'scout doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    if let Some(model) = model {
        settings.llm.model = model;
    }

    let prompts = load_prompts(&settings)?;
    let assistant = build_assistant(&settings, &prompts, &api_key)?;

    let spinner = Output::spinner("Thinking...");

    match assistant.answer(question).await {
        Ok(answer) => {
            spinner.finish_and_clear();

            println!("\n{}\n", answer.text);

            if !answer.steps.is_empty() {
                Output::header("Lookups");
                Output::tool_steps(&answer.steps);
            }
            if answer.fallback {
                Output::info("The agent gave up; this answer came from the model without tools.");
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
