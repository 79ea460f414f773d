use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use labdesk_api::{
    auth::{AuthConfig, AuthService, TokenSubject},
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::{profile, ProfileRole},
    events::{Event, EventSender},
    services::{profiles::CreateProfileInput, PageParams, ProfileService},
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use validator::Validate;

#[derive(Parser)]
#[command(name = "labdesk", about = "LabDesk CLI for schema, profiles and access tokens", version)]
struct Cli {
    #[arg(long, global = true, help = "Print machine-readable JSON instead of text")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Manage profiles
    #[command(subcommand)]
    Profiles(ProfileCommands),
    /// Issue access tokens
    #[command(subcommand)]
    Token(TokenCommands),
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Register a new profile
    Create(CreateProfileArgs),
    /// List profiles, optionally by role
    List(ListProfilesArgs),
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Issue a bearer token for an existing profile
    Issue(IssueTokenArgs),
}

#[derive(Args)]
struct CreateProfileArgs {
    #[arg(long, help = "Full name shown on documents")]
    name: String,
    #[arg(long, help = "Unique email address")]
    email: String,
    #[arg(long, value_parser = parse_role, help = "admin, operator, field_officer or client")]
    role: ProfileRole,
    #[arg(long, help = "Contact phone number")]
    phone: Option<String>,
    #[arg(long, help = "Company name for client profiles")]
    company: Option<String>,
}

#[derive(Args)]
struct ListProfilesArgs {
    #[arg(long, value_parser = parse_role, help = "Only list profiles with this role")]
    role: Option<ProfileRole>,
    #[arg(long, default_value_t = 1)]
    page: u64,
    #[arg(long, default_value_t = 20)]
    per_page: u64,
}

#[derive(Args)]
struct IssueTokenArgs {
    #[arg(long, help = "Email of the profile the token is issued for")]
    email: String,
}

#[derive(Serialize)]
struct IssuedToken<'a> {
    profile_id: String,
    role: ProfileRole,
    access_token: &'a str,
    token_type: &'a str,
    expires_in: i64,
}

fn parse_role(raw: &str) -> Result<ProfileRole, String> {
    raw.parse::<ProfileRole>()
        .map_err(|_| format!("unknown role '{raw}'"))
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(32);
        let event_sender = Arc::new(EventSender::new(event_tx));

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "labdesk_cli", event = ?event, "received async event");
            }
        });

        Ok(Self {
            config,
            db,
            event_sender,
        })
    }

    fn profile_service(&self) -> ProfileService {
        ProfileService::new(self.db.clone(), self.event_sender.clone())
    }

    fn auth_service(&self) -> AuthService {
        AuthService::new(AuthConfig::from_app_config(&self.config))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db).await?;
            println!("Migrations applied");
        }
        Commands::Profiles(ProfileCommands::Create(args)) => {
            handle_create_profile(&context, args, cli.json).await?
        }
        Commands::Profiles(ProfileCommands::List(args)) => {
            handle_list_profiles(&context, args, cli.json).await?
        }
        Commands::Token(TokenCommands::Issue(args)) => {
            handle_issue_token(&context, args, cli.json).await?
        }
    }

    Ok(())
}

async fn handle_create_profile(
    context: &CliContext,
    args: CreateProfileArgs,
    json: bool,
) -> Result<()> {
    let input = CreateProfileInput {
        full_name: args.name,
        email: args.email,
        role: args.role,
        phone: args.phone,
        company_name: args.company,
    };
    input
        .validate()
        .map_err(|e| anyhow!("invalid profile: {e}"))?;

    let created = context
        .profile_service()
        .create(input)
        .await
        .context("failed to create profile")?;

    if json {
        print_json(&created)?;
    } else {
        println!("Created profile:");
        render_profile(&created);
    }
    Ok(())
}

async fn handle_list_profiles(
    context: &CliContext,
    args: ListProfilesArgs,
    json: bool,
) -> Result<()> {
    let filter = labdesk_api::services::profiles::ProfileFilter { role: args.role };
    let (profiles, total) = context
        .profile_service()
        .list(filter, PageParams::new(args.page, args.per_page))
        .await
        .context("failed to list profiles")?;

    if json {
        print_json(&profiles)?;
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No profiles found");
        return Ok(());
    }
    println!("{} profile(s) of {}:", profiles.len(), total);
    for profile in &profiles {
        render_profile(profile);
    }
    Ok(())
}

async fn handle_issue_token(context: &CliContext, args: IssueTokenArgs, json: bool) -> Result<()> {
    let profile = context
        .profile_service()
        .find_by_email(&args.email)
        .await
        .context("failed to look up profile")?
        .ok_or_else(|| anyhow!("no profile registered for {}", args.email))?;

    let token = context
        .auth_service()
        .issue_token(&TokenSubject::from(&profile))
        .map_err(|e| anyhow!("failed to issue token: {e}"))?;

    if json {
        print_json(&IssuedToken {
            profile_id: profile.id.to_string(),
            role: profile.role,
            access_token: &token.access_token,
            token_type: &token.token_type,
            expires_in: token.expires_in,
        })?;
    } else {
        println!(
            "Token for {} ({}) expires in {}s:",
            profile.email, profile.role, token.expires_in
        );
        println!("{}", token.access_token);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_profile(profile: &profile::Model) {
    println!(
        "- {} • {} • {} • {}",
        profile.id, profile.full_name, profile.email, profile.role
    );
}
