//! bfrb CLI - command-line client for the BFRB tracker API
//!
//! Commands:
//! - login / register / logout / status / refresh: session management
//! - instances: list, show and delete recorded instances
//! - track: record a new instance through the tracking wizard
//! - strategies: list, show and delete coping strategies
//! - catalog: print the option catalog
//! - history: day-grouped history with summary statistics

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use bfrb_tracker::auth::AuthState;
use bfrb_tracker::catalog::Category;
use bfrb_tracker::history::{group_by_day, HistorySummary, InstanceDetails};
use bfrb_tracker::logging::{self, mask_token};
use bfrb_tracker::types::{IntentionType, RegisterRequest};
use bfrb_tracker::{BfrbClient, ClientConfig, ClientError, VERSION};

/// bfrb - track body-focused repetitive behaviors from the terminal
#[derive(Parser)]
#[command(name = "bfrb")]
#[command(version = VERSION)]
#[command(about = "Command-line client for the BFRB tracker", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true, env = "BFRB_CONFIG")]
    config: Option<PathBuf>,

    /// Always print JSON, even on a terminal
    #[arg(long, global = true)]
    json: bool,

    /// Log level override (e.g. debug, info, warn)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "BFRB_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "BFRB_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        display_name: String,
    },

    /// Sign out and forget the local session
    Logout,

    /// Show the current session
    Status,

    /// Refresh the access token if needed
    Refresh,

    /// Recorded instances
    Instances {
        #[command(subcommand)]
        command: RecordCommand,
    },

    /// Record a new instance
    Track(TrackArgs),

    /// Coping strategies
    Strategies {
        #[command(subcommand)]
        command: RecordCommand,
    },

    /// Print the option catalog
    Catalog {
        /// Only this category (e.g. emotion, sensory_trigger)
        #[arg(long)]
        category: Option<String>,
    },

    /// Recorded instances grouped by day
    History {
        /// Only print summary statistics
        #[arg(long)]
        summary: bool,
    },
}

#[derive(Subcommand)]
enum RecordCommand {
    /// List all records
    List,
    /// Show one record
    Show { id: String },
    /// Delete one record
    Delete { id: String },
}

#[derive(Args)]
struct TrackArgs {
    /// When it happened (RFC 3339); defaults to now
    #[arg(long)]
    time: Option<DateTime<Utc>>,

    /// Duration in minutes
    #[arg(long, default_value = "1")]
    duration: u32,

    /// Urge strength, 1-10
    #[arg(long, default_value = "5")]
    urge: u8,

    /// automatic or intentional
    #[arg(long, default_value = "automatic")]
    intention: IntentionType,

    #[arg(long = "location")]
    locations: Vec<String>,

    #[arg(long = "activity")]
    activities: Vec<String>,

    #[arg(long = "emotion")]
    emotions: Vec<String>,

    #[arg(long = "thought")]
    thoughts: Vec<String>,

    #[arg(long = "sensation")]
    sensations: Vec<String>,

    #[arg(long = "sensory-trigger")]
    sensory_triggers: Vec<String>,

    #[arg(long)]
    notes: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), BfrbCliError> {
    let output = Output {
        json: cli.json || !atty::is(atty::Stream::Stdout),
    };

    // Offline commands
    if let Commands::Catalog { category } = &cli.command {
        return cmd_catalog(category.as_deref(), &output);
    }

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ClientConfig::load(&config_path)?;
    logging::init(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    let client = BfrbClient::from_config(config)?;
    client.session().initialize();

    match cli.command {
        Commands::Login { email, password } => cmd_login(&client, &email, &password, &output).await,
        Commands::Register {
            username,
            email,
            password,
            display_name,
        } => {
            let request = RegisterRequest {
                username,
                email,
                password,
                display_name,
            };
            cmd_register(&client, &request, &output).await
        }
        Commands::Logout => {
            let snapshot = client.session().logout().await;
            output.print(&snapshot, || "Signed out.".to_string())
        }
        Commands::Status => cmd_status(&client, &output),
        Commands::Refresh => {
            let snapshot = client.session().refresh().await;
            if snapshot.auth_state != AuthState::Authenticated {
                return Err(BfrbCliError::NotSignedIn);
            }
            output.print(&snapshot, || "Session refreshed.".to_string())
        }
        Commands::Instances { command } => cmd_instances(&client, command, &output).await,
        Commands::Track(args) => cmd_track(&client, args, &output).await,
        Commands::Strategies { command } => cmd_strategies(&client, command, &output).await,
        Commands::History { summary } => cmd_history(&client, summary, &output).await,
        Commands::Catalog { .. } => Ok(()),
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bfrb")
        .join("config.toml")
}

struct Output {
    json: bool,
}

impl Output {
    fn print<T: Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> Result<(), BfrbCliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", human());
        }
        Ok(())
    }
}

fn require_session(client: &BfrbClient) -> Result<(), BfrbCliError> {
    match client.session().state() {
        AuthState::Authenticated => Ok(()),
        AuthState::PendingApproval => Err(BfrbCliError::PendingApproval),
        _ => Err(BfrbCliError::NotSignedIn),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_login(
    client: &BfrbClient,
    email: &str,
    password: &str,
    output: &Output,
) -> Result<(), BfrbCliError> {
    let snapshot = client.session().login(email, password).await?;
    output.print(&snapshot, || match snapshot.auth_state {
        AuthState::PendingApproval => {
            "Signed in. Your account is waiting for approval.".to_string()
        }
        _ => format!(
            "Signed in as {}.",
            snapshot
                .user
                .as_ref()
                .map(|u| u.display_name.as_str())
                .unwrap_or(email)
        ),
    })
}

async fn cmd_register(
    client: &BfrbClient,
    request: &RegisterRequest,
    output: &Output,
) -> Result<(), BfrbCliError> {
    let snapshot = client.session().register(request).await?;
    output.print(&snapshot, || match snapshot.auth_state {
        AuthState::PendingApproval => "Account created and waiting for approval.".to_string(),
        AuthState::Authenticated => "Account created. You are signed in.".to_string(),
        _ => "Account created. Sign in to continue.".to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    auth_state: AuthState,
    user: Option<String>,
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    base_url: String,
}

fn cmd_status(client: &BfrbClient, output: &Output) -> Result<(), BfrbCliError> {
    let snapshot = client.session().snapshot();
    let expires_at = client
        .tokens()
        .expiry_millis()?
        .and_then(DateTime::from_timestamp_millis);

    let report = StatusReport {
        auth_state: snapshot.auth_state,
        user: snapshot.user.as_ref().map(|u| u.email.clone()),
        token: snapshot.token.as_deref().map(mask_token),
        expires_at,
        base_url: client.api().base_url().to_string(),
    };

    output.print(&report, || {
        let mut lines = vec![format!("State:   {}", report.auth_state.as_str())];
        if let Some(user) = &report.user {
            lines.push(format!("User:    {user}"));
        }
        if let Some(expires_at) = report.expires_at {
            lines.push(format!("Expires: {expires_at}"));
        }
        lines.push(format!("API:     {}", report.base_url));
        lines.join("\n")
    })
}

async fn cmd_instances(
    client: &BfrbClient,
    command: RecordCommand,
    output: &Output,
) -> Result<(), BfrbCliError> {
    require_session(client)?;
    let api = client.instances();

    match command {
        RecordCommand::List => {
            let instances = api.list().await?;
            output.print(&instances, || {
                instances
                    .iter()
                    .map(|i| {
                        format!(
                            "{}  {}  urge {:>2}  {}",
                            i.id,
                            i.occurred_at().format("%Y-%m-%d %H:%M"),
                            i.urge_strength,
                            i.intention_type.as_str()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        RecordCommand::Show { id } => {
            let details = InstanceDetails::from_instance(&api.get(&id).await?);
            output.print(&details, || render_details(&details))
        }
        RecordCommand::Delete { id } => {
            api.delete(&id).await?;
            output.print(&serde_json::json!({ "deleted": id }), || format!("Deleted {id}."))
        }
    }
}

fn render_details(details: &InstanceDetails) -> String {
    let mut lines = vec![
        format!("{}  {}", details.id, details.occurred_at.format("%Y-%m-%d %H:%M")),
        format!(
            "Urge {} / {}, {} min",
            details.urge_strength,
            details.intention_type.as_str(),
            details.duration
        ),
    ];
    for section in &details.sections {
        let labels: Vec<String> = section
            .options
            .iter()
            .map(|o| match &o.emoji {
                Some(emoji) => format!("{emoji} {}", o.label),
                None => o.label.clone(),
            })
            .collect();
        lines.push(format!("{}: {}", section.title, labels.join(", ")));
    }
    if let Some(notes) = &details.notes {
        lines.push(format!("Notes: {notes}"));
    }
    lines.join("\n")
}

async fn cmd_track(client: &BfrbClient, args: TrackArgs, output: &Output) -> Result<(), BfrbCliError> {
    let mut wizard = client.wizard();

    if let Some(time) = args.time {
        wizard.set_time(time);
    }
    wizard.set_duration(args.duration);
    wizard.set_urge_strength(args.urge)?;
    wizard.set_intention(args.intention);

    let selections = [
        (Category::Location, &args.locations),
        (Category::Activity, &args.activities),
        (Category::Emotion, &args.emotions),
        (Category::Thought, &args.thoughts),
        (Category::Sensation, &args.sensations),
        (Category::SensoryTrigger, &args.sensory_triggers),
    ];
    for (category, ids) in selections {
        for id in ids {
            if !wizard.is_selected(category, id) {
                wizard.toggle(category, id)?;
            }
        }
    }
    if let Some(notes) = args.notes {
        wizard.set_notes(notes);
    }

    require_session(client)?;
    let (instance, _) = client.submit_tracking(&mut wizard).await?;
    output.print(&instance, || format!("Recorded instance {}.", instance.id))
}

async fn cmd_strategies(
    client: &BfrbClient,
    command: RecordCommand,
    output: &Output,
) -> Result<(), BfrbCliError> {
    require_session(client)?;
    let api = client.strategies();

    match command {
        RecordCommand::List => {
            let strategies = api.list().await?;
            output.print(&strategies, || {
                strategies
                    .iter()
                    .map(|s| {
                        let triggers: Vec<&str> = s.triggers.iter().map(|t| t.label()).collect();
                        format!("{}  {}  [{}]", s.id, s.name, triggers.join(", "))
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        RecordCommand::Show { id } => {
            let strategy = api.get(&id).await?;
            output.print(&strategy, || {
                let mut lines = vec![strategy.name.clone()];
                if let Some(description) = &strategy.description {
                    lines.push(description.clone());
                }
                for trigger in &strategy.triggers {
                    lines.push(format!("  - {}", trigger.label()));
                }
                lines.join("\n")
            })
        }
        RecordCommand::Delete { id } => {
            api.delete(&id).await?;
            output.print(&serde_json::json!({ "deleted": id }), || format!("Deleted {id}."))
        }
    }
}

fn cmd_catalog(category: Option<&str>, output: &Output) -> Result<(), BfrbCliError> {
    let categories: Vec<Category> = match category {
        Some(name) => vec![Category::parse(name)
            .ok_or_else(|| BfrbCliError::Usage(format!("Unknown category: {name}")))?],
        None => Category::ALL.to_vec(),
    };

    let catalog: Vec<serde_json::Value> = categories
        .iter()
        .map(|c| {
            serde_json::json!({
                "category": c,
                "title": c.title(),
                "options": c.options(),
            })
        })
        .collect();

    output.print(&catalog, || {
        categories
            .iter()
            .map(|c| {
                let options: Vec<String> = c
                    .options()
                    .iter()
                    .map(|o| format!("  {} {} ({})", o.emoji, o.label, o.id))
                    .collect();
                format!("{}\n{}", c.title(), options.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    })
}

async fn cmd_history(client: &BfrbClient, summary_only: bool, output: &Output) -> Result<(), BfrbCliError> {
    require_session(client)?;
    let instances = client.instances().list().await?;
    let summary = HistorySummary::from_instances(&instances);

    if summary_only {
        return output.print(&summary, || render_summary(&summary));
    }

    let days = group_by_day(&instances);
    let report = serde_json::json!({ "summary": summary, "days": days });
    output.print(&report, || {
        let mut lines = vec![render_summary(&summary), String::new()];
        for day in &days {
            lines.push(day.date.format("%A %e %B %Y").to_string());
            for instance in &day.instances {
                lines.push(format!(
                    "  {}  urge {:>2}  {}",
                    instance.occurred_at().format("%H:%M"),
                    instance.urge_strength,
                    instance.intention_type.as_str()
                ));
            }
        }
        lines.join("\n")
    })
}

fn render_summary(summary: &HistorySummary) -> String {
    let mean = summary
        .mean_urge_strength
        .map(|m| format!("{m:.1}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} instances, mean urge {mean}, {} automatic / {} intentional, {} min total",
        summary.count, summary.automatic, summary.intentional, summary.total_minutes
    )
}

// ============================================================================
// Errors
// ============================================================================

enum BfrbCliError {
    Client(ClientError),
    Json(serde_json::Error),
    NotSignedIn,
    PendingApproval,
    Usage(String),
}

impl From<ClientError> for BfrbCliError {
    fn from(e: ClientError) -> Self {
        BfrbCliError::Client(e)
    }
}

impl From<serde_json::Error> for BfrbCliError {
    fn from(e: serde_json::Error) -> Self {
        BfrbCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BfrbCliError> for CliError {
    fn from(e: BfrbCliError) -> Self {
        match e {
            BfrbCliError::Client(e) => client_error(e),
            BfrbCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            BfrbCliError::NotSignedIn => CliError {
                code: "NOT_SIGNED_IN".to_string(),
                message: "No active session".to_string(),
                hint: Some("Run `bfrb login` first".to_string()),
            },
            BfrbCliError::PendingApproval => CliError {
                code: "PENDING_APPROVAL".to_string(),
                message: "Your account is waiting for approval".to_string(),
                hint: Some("Try again once an administrator has approved it".to_string()),
            },
            BfrbCliError::Usage(message) => CliError {
                code: "USAGE_ERROR".to_string(),
                message,
                hint: Some("Run `bfrb catalog` to see valid values".to_string()),
            },
        }
    }
}

fn client_error(e: ClientError) -> CliError {
    let (code, hint) = match &e {
        ClientError::Unauthorized(_) => ("UNAUTHORIZED", Some("Run `bfrb login` to sign in again")),
        ClientError::Rejected(_) => ("REJECTED", Some("Check your email and password")),
        ClientError::Api { .. } => ("API_ERROR", None),
        ClientError::Http(_) => ("NETWORK_ERROR", Some("Check the API URL and your connection")),
        ClientError::Validation(_) => ("VALIDATION_ERROR", Some("Run `bfrb catalog` to see valid option ids")),
        ClientError::Config(_) | ClientError::Url(_) => ("CONFIG_ERROR", Some("Check the config file")),
        ClientError::Storage(_) | ClientError::Io(_) => ("STORAGE_ERROR", None),
        ClientError::Json(_) | ClientError::MalformedResponse(_) => ("RESPONSE_ERROR", None),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}
