use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use sitewarden_core::config::{CONFIG_FILE_NAME, DEFAULT_CONFIG, expand_config_dir};
use sitewarden_core::remediation::{RemediationReport, remediate_rows};
use sitewarden_core::report::save_report;
use sitewarden_core::{
    ReportError, ReportForm, ReportFormat, ReportRegistry, ReportScript, ReportTable, Settings,
    execute_report,
};
use sitewarden_scanner::SiteClient;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use url::Url;

// Helper functions for the run handler

/// Combine `--url` values with the lines of a hosts file, in that order.
/// An empty result means the operator will be asked for URLs.
pub fn load_urls_from_source(
    urls: &[String],
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    let mut loaded: Vec<String> = urls.iter().filter_map(|u| parse_url_line(u)).collect();
    if let Some(hosts_file_path) = hosts_file {
        loaded.extend(load_urls_from_file(hosts_file_path)?);
    }
    Ok(loaded)
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a site URL. Server-relative paths are kept for the
/// client to resolve against the tenant; bare hosts get `https://`.
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('/') && !line.contains(char::is_whitespace) {
        return Some(line.to_string());
    }

    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
    {
        return Some(line.to_string());
    }

    if !line.contains("://") {
        let with_scheme = format!("https://{}", line);
        if let Ok(url) = Url::parse(&with_scheme)
            && url.host_str().is_some_and(|h| h.contains('.') || h == "localhost")
        {
            return Some(with_scheme);
        }
    }

    eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
    None
}

/// Dashboard entry chosen by number (1-based) or by name
pub fn select_report(
    registry: &ReportRegistry,
    choice: &str,
) -> Result<Arc<dyn ReportScript>, ReportError> {
    let choice = choice.trim();
    if let Ok(index) = choice.parse::<usize>()
        && index >= 1
        && let Some(script) = registry.iter().nth(index - 1)
    {
        return Ok(script.clone());
    }
    registry.get(choice)
}

/// `--format` wins over the configured default; unknown names fall back to text
pub fn resolve_format(requested: Option<&str>, configured: &str) -> ReportFormat {
    let name = requested.unwrap_or(configured);
    ReportFormat::from_str(name).unwrap_or_else(|| {
        warn!("Unknown report format '{}', using text", name);
        ReportFormat::Text
    })
}

pub fn render_dashboard(registry: &ReportRegistry) -> String {
    let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (i, script) in registry.iter().enumerate() {
        let action = script
            .action()
            .map(|a| format!("  [{}]", a.label()))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {:>2}. {:<width$}  {}{}\n",
            i + 1,
            script.name(),
            script.description(),
            action,
            width = width
        ));
    }
    out
}

/// Write the default configuration into `config_dir`
pub fn create_configuration_assets(config_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(config_dir)?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);
    fs::write(&config_path, DEFAULT_CONFIG)?;
    Ok(config_path)
}

/// One line of counts, then every failure with its reason
pub fn format_remediation_summary(report: &RemediationReport) -> String {
    let mut out = format!(
        "{} succeeded, {} failed, {} declined\n",
        report.succeeded.len(),
        report.failed.len(),
        report.declined
    );
    for (label, reason) in &report.failed {
        out.push_str(&format!("  ✗ {}: {}\n", label, reason));
    }
    out
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().lock().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_string()
}

fn confirmed(response: &str) -> bool {
    matches!(response.to_lowercase().as_str(), "y" | "yes")
}

pub fn handle_init(args: &ArgMatches) -> anyhow::Result<()> {
    print_divider();
    println!("{}", "  SITEWARDEN INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_dir_arg = args
        .get_one::<String>("PATH")
        .context("no configuration directory given")?;
    let force = args.get_flag("force");
    let config_dir = expand_config_dir(config_dir_arg);
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if config_path.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Configuration already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            config_path.display().to_string().bright_white()
        );
        println!();
        println!("{}", "This operation will overwrite it.".yellow());

        let response = print_prompt("Do you want to continue? [y/N]:");
        println!();

        if !confirmed(&response) {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
        println!("{} Proceeding with overwrite", "→".yellow().bold());
        println!();
    }

    println!("{} Writing default configuration...", "→".blue());
    let written = create_configuration_assets(&config_dir)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Config: {}",
        "✓".green().bold(),
        written.display().to_string().bright_white()
    );
    println!(
        "{} Set {} and {} before running reports",
        "ℹ".blue(),
        "tenant_url".bright_white(),
        "SITEWARDEN_ACCESS_TOKEN".bright_white()
    );
    println!();
    Ok(())
}

pub fn handle_list(registry: &ReportRegistry) {
    print_divider();
    println!("{}", "  REPORTS".bright_white().bold());
    print_divider();
    print!("{}", render_dashboard(registry));
    println!();
}

fn pick_report_interactively(registry: &ReportRegistry) -> anyhow::Result<Arc<dyn ReportScript>> {
    handle_list(registry);
    loop {
        let choice = print_prompt("Report (number or name, empty to quit):");
        if choice.is_empty() {
            bail!("no report selected");
        }
        match select_report(registry, &choice) {
            Ok(script) => return Ok(script),
            Err(e) => println!("{} {}", "✗".red().bold(), e),
        }
    }
}

fn enter_urls_interactively(form: &mut ReportForm) {
    println!(
        "{} Enter site URLs, one per line. An empty line starts the report.",
        "ℹ".blue()
    );
    loop {
        let line = print_prompt("URL:");
        if line.is_empty() {
            break;
        }
        if let Some(url) = parse_url_line(&line) {
            form.add_url(url);
        }
    }
}

pub async fn handle_run(
    args: &ArgMatches,
    settings: &Settings,
    registry: &ReportRegistry,
    quiet: bool,
) -> anyhow::Result<()> {
    let script = match args.get_one::<String>("NAME") {
        Some(name) => registry.get(name)?,
        None => pick_report_interactively(registry)?,
    };

    let cli_urls: Vec<String> = args
        .get_many::<String>("url")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let seed_urls = load_urls_from_source(&cli_urls, args.get_one::<PathBuf>("hosts-file"))
        .map_err(anyhow::Error::msg)?;

    let mut form = script.initialize(seed_urls);
    form.recursive(args.get_flag("recursive") || settings.recursive)
        .search_term(args.get_one::<String>("search").cloned())
        .older_than_days(args.get_one::<i64>("older-than").copied())
        .include_hidden(args.get_flag("include-hidden"));
    if form.urls.is_empty() {
        enter_urls_interactively(&mut form);
    }

    // Fail on a remediation request before touching the tenant
    let act = args.get_flag("act");
    let action = if act {
        Some(script.action().ok_or(ReportError::NoAction(script.name()))?)
    } else {
        None
    };

    let client = SiteClient::new(settings.client_settings())?;
    if !quiet {
        let scope = if form.params.recursive {
            " (recursive)"
        } else {
            ""
        };
        println!(
            "{} Running {} over {} site(s){}",
            "→".blue(),
            script.name().bright_white().bold(),
            form.urls.len(),
            scope
        );
    }
    let outcome = execute_report(&client, script.clone(), &form, None, !quiet).await?;

    let mut table = ReportTable::new(script.description(), script.columns(), outcome.rows);
    if let Some(sort) = args.get_one::<String>("sort")
        && !table.sort_by(sort, args.get_flag("desc"))
    {
        eprintln!("{} Unknown sort column '{}'", "⚠".yellow(), sort);
    }
    if let Some(filter) = args.get_one::<String>("filter") {
        table.filter(filter);
    }

    let format = resolve_format(
        args.get_one::<String>("format").map(String::as_str),
        &settings.default_format,
    );
    let rendered = table.render(format, &outcome.errors)?;
    if format == ReportFormat::Csv {
        for failure in &outcome.errors {
            eprintln!("{} {}: {}", "✗".red().bold(), failure.url, failure.reason);
        }
    }

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            save_report(&rendered, path)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", rendered),
    }

    if let Some(action) = action {
        print_divider();
        println!("{}", format!("  {}", action.label().to_uppercase()).bright_white().bold());
        print_divider();

        let report = remediate_rows(&client, action, &table.rows, |target| {
            let response = print_prompt(&format!("{} {}? [y/N]:", action.label(), target.describe()));
            confirmed(&response)
        })
        .await;

        println!();
        print!("{}", format_remediation_summary(&report));
    }

    Ok(())
}
