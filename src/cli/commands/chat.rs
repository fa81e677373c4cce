//! Interactive chat command.

use crate::chat::ChatSession;
use crate::cli::preflight;
use crate::cli::{build_assistant, load_prompts, Output};
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, no_history: bool, mut settings: Settings) -> Result<()> {
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
    if no_history {
        settings.chat.inject_history = false;
    }

    let prompts = load_prompts(&settings)?;
    let assistant = build_assistant(&settings, &prompts, &api_key)?;
    let mut session = ChatSession::from_settings(&settings.chat);

    println!("\n{}", style("Scout Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );
    println!("{} {}\n", style("Scout:").cyan().bold(), settings.chat.greeting);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = session.ask(&assistant, &prompts, input).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => {
                Output::tool_steps(&answer.steps);
                if answer.fallback {
                    println!("{}", style("  (answered without tools)").dim());
                }
                println!("\n{} {}\n", style("Scout:").cyan().bold(), answer.text);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
