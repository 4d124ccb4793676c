//! Moltbot Widgets CLI binary.
//!
//! Create and manage custom desktop widgets, and query the local gateway.
//!
//! # Commands
//!
//! - `create` - Create a new widget from a URL
//! - `list` - List all configured widgets (default)
//! - `update` - Update a widget configuration
//! - `delete` - Delete a widget
//! - `validate` - Validate a URL returns valid widget JSON
//! - `refresh` - Re-fetch widgets now
//! - `schema` - Show widget schema documentation
//! - `skill` - Manage the assistant skill
//! - `gateway` - Query the local automation gateway

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use moltbot_widgets::{
    api::GatewayClient,
    config::Config,
    skill,
    widget::{schema, CustomWidgetConfig, WidgetAuth, WidgetConfigStore, WidgetFetcher, WidgetType},
    MoltbotError, VERSION,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "moltbot-widgets")]
#[command(version = VERSION)]
#[command(about = "Create and manage dynamic macOS widgets", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Widget config file (default: shared group container)
    #[arg(long, global = true, value_name = "PATH")]
    widgets_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new widget from a URL
    Create {
        /// Display name for the widget
        #[arg(long)]
        name: String,

        /// URL to fetch widget data from
        #[arg(long)]
        url: String,

        #[command(flatten)]
        auth: AuthArgs,

        /// Refresh interval in minutes
        #[arg(long, default_value_t = 5)]
        interval: u32,
    },

    /// List all configured widgets
    #[command(visible_alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a widget configuration
    Update {
        /// Widget ID or name
        identifier: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New URL
        #[arg(long)]
        url: Option<String>,

        #[command(flatten)]
        auth: AuthArgs,

        /// New refresh interval in minutes
        #[arg(long)]
        interval: Option<u32>,

        /// Remove authentication
        #[arg(long)]
        remove_auth: bool,
    },

    /// Delete a widget
    #[command(visible_aliases = ["rm", "remove"])]
    Delete {
        /// Widget ID or name
        identifier: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Validate a URL returns valid widget JSON
    Validate {
        /// URL to validate
        url: String,

        #[command(flatten)]
        auth: AuthArgs,

        /// Show raw JSON response
        #[arg(long)]
        show_json: bool,
    },

    /// Re-fetch widgets now and report each result
    Refresh {
        /// Widget ID or name (all widgets if omitted)
        identifier: Option<String>,
    },

    /// Show widget schema documentation
    Schema {
        /// Show schema for one type (status, number, gauge, list, text)
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Output raw JSON schema
        #[arg(long)]
        json: bool,
    },

    /// Manage Moltbot skill integration
    Skill {
        #[command(subcommand)]
        action: Option<SkillAction>,
    },

    /// Query the local automation gateway
    Gateway {
        #[command(flatten)]
        conn: GatewayArgs,

        #[command(subcommand)]
        action: GatewayAction,
    },
}

#[derive(Args, Default)]
struct AuthArgs {
    /// HTTP header (format: 'Key: Value'). Can be repeated.
    #[arg(long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// Basic authentication (format: 'username:password')
    #[arg(long)]
    basic_auth: Option<String>,

    /// Query parameter (format: 'key=value'). Can be repeated.
    #[arg(long = "query", value_name = "PARAM")]
    query: Vec<String>,
}

impl AuthArgs {
    fn parse(&self) -> anyhow::Result<Option<WidgetAuth>> {
        Ok(WidgetAuth::from_cli(&self.headers, self.basic_auth.as_deref(), &self.query)?)
    }
}

#[derive(Subcommand)]
enum SkillAction {
    /// Install the Moltbot skill
    Install,
    /// Uninstall the Moltbot skill
    Uninstall,
    /// Check skill installation status
    Status,
}

#[derive(Args)]
struct GatewayArgs {
    /// Gateway host
    #[arg(long)]
    host: Option<String>,

    /// Gateway port
    #[arg(long)]
    port: Option<u16>,

    /// Bearer token
    #[arg(long)]
    token: Option<String>,

    /// Use wss://
    #[arg(long)]
    secure: bool,

    /// Overall deadline in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum GatewayAction {
    /// Scheduler status (cron.status)
    CronStatus,

    /// Scheduled jobs (cron.list)
    CronList {
        /// Include disabled jobs
        #[arg(long)]
        include_disabled: bool,
    },

    /// Run history of one job (cron.runs)
    CronRuns {
        /// Job id
        id: String,

        /// Maximum entries
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Gateway health (health)
    Health {
        /// Ask the gateway to probe its channels
        #[arg(long)]
        probe: bool,
    },

    /// Token spend (usage.cost)
    Usage {
        /// Window in days
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

/// Error already shown to the user; only the exit code remains
#[derive(Debug)]
struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed")
    }
}

impl std::error::Error for Reported {}

mod output {
    pub fn success(message: &str) {
        println!("✓ {message}");
    }

    pub fn error(message: &str) {
        eprintln!("✗ {message}");
    }

    pub fn info(message: &str) {
        println!("{message}");
    }

    pub fn warning(message: &str) {
        println!("⚠ {message}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.downcast_ref::<Reported>().is_none() {
                output::error(&format!("{err:#}"));
            }
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = match cli.widgets_file.or_else(|| config.widgets.store_path.clone()) {
        Some(path) => WidgetConfigStore::new(path),
        None => WidgetConfigStore::default_location()?,
    };
    let fetch_timeout = config.widgets.fetch_timeout();

    match cli.command.unwrap_or(Commands::List { json: false }) {
        Commands::Create {
            name,
            url,
            auth,
            interval,
        } => cmd_create(&store, fetch_timeout, name, url, &auth, interval),

        Commands::List { json } => cmd_list(&store, json),

        Commands::Update {
            identifier,
            name,
            url,
            auth,
            interval,
            remove_auth,
        } => cmd_update(
            &store,
            fetch_timeout,
            &identifier,
            name,
            url,
            &auth,
            interval,
            remove_auth,
        ),

        Commands::Delete { identifier, yes } => cmd_delete(&store, &identifier, yes),

        Commands::Validate {
            url,
            auth,
            show_json,
        } => cmd_validate(fetch_timeout, &url, &auth, show_json),

        Commands::Refresh { identifier } => cmd_refresh(&store, fetch_timeout, identifier.as_deref()),

        Commands::Schema { kind, json } => cmd_schema(kind.as_deref(), json),

        Commands::Skill { action } => cmd_skill(action.unwrap_or(SkillAction::Status)),

        Commands::Gateway { conn, action } => cmd_gateway(config, &conn, action),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

fn cmd_create(
    store: &WidgetConfigStore,
    fetch_timeout: Duration,
    name: String,
    url: String,
    auth: &AuthArgs,
    interval: u32,
) -> anyhow::Result<()> {
    output::info(&format!("Fetching {url}..."));
    let auth = auth.parse()?;

    let fetcher = WidgetFetcher::with_timeout(fetch_timeout)?;
    match runtime()?.block_on(fetcher.fetch_raw(&url, auth.as_ref())) {
        Ok((_, response)) => output::success(&format!("Valid \"{}\" widget response", response.kind())),
        Err(err) => {
            output::error("Failed to fetch URL");
            output::error(&err.to_string());
            return Err(Reported.into());
        },
    }

    let widget = CustomWidgetConfig::new(name, url)
        .with_auth(auth)
        .with_interval(interval);
    store.add(widget.clone())?;

    println!();
    output::success(&format!("Created widget \"{}\"", widget.name));
    output::info(&format!("  ID:       {}", widget.id));
    output::info(&format!("  URL:      {}", widget.url));
    output::info(&format!("  Interval: {} minutes", widget.interval_minutes));
    println!();
    output::info("To add to your desktop:");
    output::info("  1. Right-click desktop → Edit Widgets");
    output::info("  2. Find \"MoltbotWidgets\" → \"Custom Widget\"");
    output::info(&format!("  3. Add widget, then click to select \"{}\"", widget.name));
    Ok(())
}

fn cmd_list(store: &WidgetConfigStore, json: bool) -> anyhow::Result<()> {
    let widgets = store.load_widgets()?;

    if json {
        print_json(&widgets)?;
        return Ok(());
    }

    if widgets.is_empty() {
        output::info("No widgets configured.");
        output::info("");
        output::info("Create one with:");
        output::info("  moltbot-widgets create --name \"My Widget\" --url \"https://...\" --interval 5");
        return Ok(());
    }

    output::info("Configured widgets:");
    output::info("");

    for widget in &widgets {
        let auth = widget
            .auth
            .as_ref()
            .map_or_else(|| "None".to_string(), WidgetAuth::describe);
        println!("  {}", widget.name);
        println!("    ID:       {}", widget.id);
        println!("    URL:      {}", widget.url);
        println!("    Auth:     {auth}");
        println!("    Interval: {} min", widget.interval_minutes);
        println!();
    }

    output::info(&format!("Total: {} widget(s)", widgets.len()));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_update(
    store: &WidgetConfigStore,
    fetch_timeout: Duration,
    identifier: &str,
    name: Option<String>,
    url: Option<String>,
    auth: &AuthArgs,
    interval: Option<u32>,
    remove_auth: bool,
) -> anyhow::Result<()> {
    let mut widget = store.find(identifier)?;
    let mut changes = Vec::new();

    if let Some(name) = name {
        changes.push(format!("name → {name}"));
        widget.name = name;
    }

    let url_changed = url.is_some();
    if let Some(url) = url {
        changes.push(format!("url → {url}"));
        widget.url = url;
    }

    if let Some(interval) = interval {
        changes.push(format!("interval → {interval} min"));
        widget.interval_minutes = interval;
    }

    if remove_auth {
        widget.auth = None;
        changes.push("auth → removed".to_string());
    } else if let Some(auth) = auth.parse()? {
        widget.auth = Some(auth);
        changes.push("auth → updated".to_string());
    }

    if changes.is_empty() {
        output::warning("No changes specified");
        return Ok(());
    }

    if url_changed {
        output::info("Validating new URL...");
        let fetcher = WidgetFetcher::with_timeout(fetch_timeout)?;
        if let Err(err) = runtime()?.block_on(fetcher.fetch(&widget)) {
            output::error(&format!("Failed to validate URL: {err}"));
            return Err(Reported.into());
        }
        output::success("URL is valid");
    }

    let widget = store.update(widget)?;

    output::success(&format!("Updated widget \"{}\"", widget.name));
    for change in changes {
        output::info(&format!("  {change}"));
    }
    Ok(())
}

fn cmd_delete(store: &WidgetConfigStore, identifier: &str, yes: bool) -> anyhow::Result<()> {
    let widget = store.find(identifier)?;

    if !yes {
        print!("Delete widget \"{}\" ({})? [y/N] ", widget.name, widget.id);
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            output::info("Cancelled");
            return Ok(());
        }
    }

    store.delete(&widget.id)?;
    output::success(&format!("Deleted widget \"{}\"", widget.name));
    Ok(())
}

fn cmd_validate(fetch_timeout: Duration, url: &str, auth: &AuthArgs, show_json: bool) -> anyhow::Result<()> {
    output::info(&format!("Fetching {url}..."));
    let auth = auth.parse()?;

    let fetcher = WidgetFetcher::with_timeout(fetch_timeout)?;
    let (body, response) = match runtime()?.block_on(fetcher.fetch_raw(url, auth.as_ref())) {
        Ok(result) => result,
        Err(MoltbotError::InvalidJson(message)) => {
            output::error("Invalid widget response");
            println!();
            output::error("JSON parsing error:");
            output::error(&format!("  {message}"));
            println!();
            output::info(&format!("Schema: {}", schema::SCHEMA_URL));
            return Err(Reported.into());
        },
        Err(err) => {
            output::error(&err.to_string());
            return Err(Reported.into());
        },
    };

    output::success(&format!("Valid \"{}\" widget response", response.kind()));

    if show_json {
        println!();
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            Err(_) => println!("{body}"),
        }
    }

    println!();
    output::info(&format!("Widget type: {}", response.kind()));
    for (key, value) in response.summary() {
        output::info(&format!("  {key}: {value}"));
    }
    Ok(())
}

fn cmd_refresh(store: &WidgetConfigStore, fetch_timeout: Duration, identifier: Option<&str>) -> anyhow::Result<()> {
    let widgets = match identifier {
        Some(identifier) => {
            let widget = store.find(identifier)?;
            output::info(&format!("Refreshing widget \"{}\"...", widget.name));
            vec![widget]
        },
        None => {
            output::info("Refreshing all widgets...");
            store.load_widgets()?
        },
    };

    if widgets.is_empty() {
        output::warning("No widgets configured");
        return Ok(());
    }

    let fetcher = WidgetFetcher::with_timeout(fetch_timeout)?;
    let results = runtime()?.block_on(futures::future::join_all(
        widgets.iter().map(|widget| fetcher.fetch(widget)),
    ));

    let mut failures = 0usize;
    for (widget, result) in widgets.iter().zip(results) {
        match result {
            Ok(response) => output::success(&format!("{}: {}", widget.name, response.kind())),
            Err(err) => {
                failures += 1;
                output::error(&format!("{}: {err}", widget.name));
            },
        }
    }

    if failures > 0 {
        output::warning(&format!("{failures} of {} widget(s) failed to refresh", widgets.len()));
        return Err(Reported.into());
    }

    output::success("Refresh complete");
    Ok(())
}

fn cmd_schema(kind: Option<&str>, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&schema::json_schema())?;
        println!();
        output::info(&format!("Full schema: {}", schema::SCHEMA_URL));
        return Ok(());
    }

    match kind {
        Some(kind) => match kind.parse::<WidgetType>() {
            Ok(kind) => println!("{}", schema::type_doc(kind)),
            Err(message) => {
                output::error(&message);
                output::info("Valid types: status, number, gauge, list, text");
                return Err(Reported.into());
            },
        },
        None => println!("{}", schema::overview()),
    }
    Ok(())
}

fn cmd_skill(action: SkillAction) -> anyhow::Result<()> {
    let home = dirs::home_dir().context("Cannot determine home directory")?;

    match action {
        SkillAction::Install => {
            output::info("Installing moltbot-widgets skill...");
            let report = skill::install(&home)?;
            let base = report.base.display();
            if report.created_base {
                output::success(&format!("Created {base} directory"));
            } else {
                output::success(&format!("Detected Moltbot config at {base}"));
            }
            output::success(&format!("Created {}", report.skill_path.display()));
            println!();
            output::info("Skill installed! Moltbot can now help you create widgets.");
            println!();
            output::info("Try asking: \"Create a widget that shows my server status\"");
        },

        SkillAction::Uninstall => {
            let removed = skill::uninstall(&home)?;
            for path in &removed {
                output::success(&format!("Removed {}", path.display()));
            }
            if removed.is_empty() {
                output::warning("Skill was not installed.");
            } else {
                output::info("Skill uninstalled.");
            }
        },

        SkillAction::Status => match skill::status(&home) {
            Some(dir) => output::success(&format!("Skill installed at {}", dir.display())),
            None => {
                output::warning("Skill not installed");
                output::info("");
                output::info("Install with: moltbot-widgets skill install");
            },
        },
    }
    Ok(())
}

fn cmd_gateway(mut config: Config, conn: &GatewayArgs, action: GatewayAction) -> anyhow::Result<()> {
    if let Some(host) = &conn.host {
        config.gateway.host.clone_from(host);
    }
    if let Some(port) = conn.port {
        config.gateway.port = port;
    }
    if conn.token.is_some() {
        config.gateway.token.clone_from(&conn.token);
    }
    if conn.secure {
        config.gateway.secure = true;
    }
    if let Some(timeout) = conn.timeout {
        config.gateway.timeout_secs = timeout;
    }

    let client = GatewayClient::new(config.gateway.endpoint())
        .with_timeout(config.gateway.timeout())
        .with_max_attempts(config.gateway.max_attempts);

    let result = runtime()?.block_on(async {
        match action {
            GatewayAction::CronStatus => {
                let status = client.cron_status().await?;
                if conn.json {
                    return print_json(&status);
                }
                output::info(&format!("Enabled:   {}", yes_no(status.enabled)));
                output::info(&format!("Jobs:      {}", status.jobs));
                output::info(&format!("Store:     {}", status.store_path));
                if let Some(next) = status.next_wake_at_ms {
                    output::info(&format!("Next wake: {}", format_millis(next)));
                }
            },

            GatewayAction::CronList { include_disabled } => {
                let list = client.cron_list(include_disabled).await?;
                if conn.json {
                    return print_json(&list);
                }
                if list.jobs.is_empty() {
                    output::info("No scheduled jobs.");
                }
                for job in &list.jobs {
                    let marker = if job.enabled { "●" } else { "○" };
                    println!("  {marker} {}", job.display_name());
                    println!("    ID:          {}", job.id);
                    if let Some(last_run) = job.last_run_at {
                        println!("    Last run:    {}", format_millis(last_run));
                    }
                    if let Some(result) = &job.last_result {
                        println!("    Last result: {result}");
                    }
                }
            },

            GatewayAction::CronRuns { id, limit } => {
                let history = client.cron_runs(&id, limit).await?;
                if conn.json {
                    return print_json(&history);
                }
                if history.entries.is_empty() {
                    output::info("No runs recorded.");
                }
                for entry in &history.entries {
                    let started = entry.started_at.map_or_else(|| "-".to_string(), format_millis);
                    match &entry.error {
                        Some(error) => println!("  {started}  {}  {error}", entry.status),
                        None => println!("  {started}  {}", entry.status),
                    }
                }
            },

            GatewayAction::Health { probe } => {
                let health = client.health(probe).await?;
                if conn.json {
                    return print_json(&health);
                }
                output::info(&format!("Status:   {}", if health.ok { "OK" } else { "Degraded" }));
                if let Some(version) = &health.version {
                    output::info(&format!("Version:  {version}"));
                }
                if let Some(uptime) = health.uptime_display() {
                    output::info(&format!("Uptime:   {uptime}"));
                }
                if let (Some(connected), Some(total)) = (health.channels_connected, health.channels_total) {
                    output::info(&format!("Channels: {connected}/{total} connected"));
                }
            },

            GatewayAction::Usage { days } => {
                let usage = client.usage_cost(days).await?;
                if conn.json {
                    return print_json(&usage);
                }
                output::info(&format!("Cost ({} days): {}", usage.days, usage.formatted_cost()));
                output::info(&format!("Tokens:         {}", usage.formatted_tokens()));
                output::info(&format!("  Input:        {}", usage.input));
                output::info(&format!("  Output:       {}", usage.output));
                output::info(&format!("  Cache read:   {}", usage.cache_read));
                output::info(&format!("  Cache write:  {}", usage.cache_write));
            },
        }
        Ok(())
    });

    if let Err(err) = &result {
        if err.downcast_ref::<MoltbotError>().is_some_and(MoltbotError::is_auth_required) {
            output::error(&format!("{err}"));
            output::info("Pair this device with the gateway or pass a token (--token or MOLTBOT_TOKEN).");
            return Err(Reported.into());
        }
    }
    result
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn format_millis(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms).map_or_else(|| ms.to_string(), |t| t.to_rfc3339())
}
