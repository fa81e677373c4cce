//! Search command - run one lookup tool without the LLM.

use crate::cli::{Output, ToolKind};
use crate::config::Settings;
use crate::tools::{ToolCall, Toolbox};
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, tool: ToolKind, settings: Settings) -> Result<()> {
    let toolbox = Toolbox::from_settings(&settings.tools)?;
    let call = tool_call(tool, query);

    let spinner = Output::spinner(&format!("Running {}...", call.name()));
    let result = toolbox.execute(&call).await;
    spinner.finish_and_clear();

    match result {
        Ok(text) => {
            Output::header(call.name());
            println!("{}\n", text);
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

fn tool_call(tool: ToolKind, query: &str) -> ToolCall {
    let query = query.to_string();
    match tool {
        ToolKind::Web => ToolCall::SafeSearch { query },
        ToolKind::Wikipedia => ToolCall::Wikipedia { query },
        ToolKind::Arxiv => ToolCall::Arxiv { query },
    }
}
