//! Doctor command - verify API key, configuration and network access.

use crate::cli::Output;
use crate::config::Settings;
use crate::gate::{ConnectivityProbe, HttpProbe};
use crate::tools::Wikipedia;
use console::style;
use futures::future::join_all;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Timeout for each reachability check.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Scout Doctor");
    println!();
    println!("Checking API key, configuration and network access...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let api_check = check_api_key(settings);
    api_check.print();
    checks.push(api_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    println!("{}", style("Network").bold());
    let network_checks = check_endpoints(settings).await;
    for check in &network_checks {
        check.print();
    }
    checks.extend(network_checks);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Scout.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Scout is ready to use.");
    }

    Ok(())
}

/// Check that an API key is configured and looks like a Groq key.
fn check_api_key(settings: &Settings) -> CheckResult {
    let name = settings.llm.api_key_env.as_str();
    let hint = format!("Set with: export {}='gsk_...' (or llm.api_key in the config)", name);

    match settings.llm.resolve_api_key() {
        Some(key) if key.starts_with("gsk_") && key.chars().count() > 12 => {
            CheckResult::ok(name, &format!("configured ({})", mask_key(&key)))
        }
        Some(_) => CheckResult::warning(
            name,
            "set but format looks unusual",
            "Expected format: gsk_... (Groq API key)",
        ),
        None => CheckResult::error(name, "not set", &hint),
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let head: String = chars.iter().take(7).collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: scout config edit",
        )
    }
}

/// URLs whose reachability the tools depend on.
fn endpoints(settings: &Settings) -> Vec<(&'static str, String)> {
    vec![
        (
            "LLM endpoint",
            format!("{}/models", settings.llm.base_url.trim_end_matches('/')),
        ),
        ("Search probe", settings.tools.web_search.probe_url.clone()),
        ("Wikipedia", Wikipedia::site_url(&settings.tools.wikipedia.lang)),
        ("arXiv", "https://export.arxiv.org/".to_string()),
    ]
}

/// Probe every endpoint concurrently.
async fn check_endpoints(settings: &Settings) -> Vec<CheckResult> {
    let checks = endpoints(settings)
        .into_iter()
        .map(|(name, endpoint)| async move { check_endpoint(name, &endpoint).await });
    join_all(checks).await
}

async fn check_endpoint(name: &str, endpoint: &str) -> CheckResult {
    let host = match Url::parse(endpoint) {
        Ok(url) => url.host_str().unwrap_or(endpoint).to_string(),
        Err(e) => {
            return CheckResult::error(
                name,
                &format!("invalid URL {}: {}", endpoint, e),
                "Fix the URL in the config file",
            )
        }
    };

    let probe = match HttpProbe::new(endpoint, CHECK_TIMEOUT) {
        Ok(probe) => probe,
        Err(e) => return CheckResult::error(name, &format!("error: {}", e), "Check TLS setup"),
    };

    if probe.is_reachable().await {
        CheckResult::ok(name, &format!("{} reachable", host))
    } else {
        CheckResult::warning(
            name,
            &format!("{} unreachable", host),
            "Check your network connection or proxy settings",
        )
    }
}
