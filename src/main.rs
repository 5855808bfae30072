use anyhow::{Context as _, Result};
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot that gates new members behind a verification step
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands to all guilds (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,

    /// Do not start the verification web server
    #[arg(long)]
    no_web: bool,
}

mod commands;
mod config;
mod error;
mod events;
mod guild;
mod logging;
mod managers;
mod messages;
mod state;
mod verification;
mod web;

use commands::{help, ping, verify};
use config::BotSettings;
use events::{handle_interaction, handle_member_add};
use guild::{SerenityGateway, SharedGuildGateway};
use managers::{
    create_shared_audit_log, create_shared_config_manager, create_shared_join_handler,
    create_shared_pending_removals, create_shared_verification_manager, SharedAuditLog,
    SharedConfigManager, SharedJoinHandler, SharedVerificationManager,
};
use state::{create_shared_document_store, DocumentStore};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub settings: BotSettings,
    pub config_manager: SharedConfigManager,
    pub audit_log: SharedAuditLog,
    pub join_handler: SharedJoinHandler,
    pub verification_manager: SharedVerificationManager,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = handle_member_add(ctx, new_member, data).await {
                error!("Failed to handle new member: {}", e);
            }
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Err(e) = handle_interaction(ctx, interaction, data).await {
                error!("Failed to handle interaction: {}", e);
            }
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    let settings = BotSettings::from_env();

    // Create log buffer for the dashboard API
    let log_buffer = logging::create_log_buffer(settings.log_buffer_size);

    // Initialize tracing with our custom layer
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .with(logging::LogCaptureLayer::new(log_buffer.clone()))
        .init();

    let token = std::env::var("DISCORD_TOKEN").context("Missing DISCORD_TOKEN environment variable")?;

    // Ensure state directory exists
    if let Err(e) = tokio::fs::create_dir_all(&settings.state_path).await {
        warn!(
            "Could not create state directory {}: {}",
            settings.state_path.display(),
            e
        );
    }

    let store_path = settings.store_file();
    info!("Loading verification store from {}...", store_path.display());
    // An unreadable snapshot stops startup instead of being overwritten
    let store = DocumentStore::load(&store_path)
        .await
        .with_context(|| format!("Could not load verification store {}", store_path.display()))?;
    info!("Loaded {} documents", store.len());
    let store = create_shared_document_store(store);

    let config_manager = create_shared_config_manager(store.clone());
    let audit_log = create_shared_audit_log(store.clone());
    let removals = create_shared_pending_removals();

    // Extract CLI flags for use in setup
    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;
    let start_web = !args.no_web;

    if sync_commands {
        info!("--sync-commands: Will force re-register slash commands");
    }
    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }
    if let Some(gid) = target_guild_id {
        info!("--guild-id: Targeting specific guild {}", gid);
    }

    let setup_removals = removals.clone();

    // Build framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), help(), verify()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content(format!("An error occurred: {}", error))
                                        .ephemeral(true),
                                )
                                .await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say(format!("Bot is missing permissions: {:?}", missing_permissions)).await;
                        }
                        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
                            error!("User {} missing permissions for '{}': {:?}", ctx.author().name, ctx.command().qualified_name, missing_permissions);
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config_manager = config_manager.clone();
            let audit_log = audit_log.clone();
            let removals = setup_removals.clone();
            let log_buffer = log_buffer.clone();
            let settings = settings.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let gateway: SharedGuildGateway = Arc::new(SerenityGateway::new(ctx.http.clone()));
                let join_handler = create_shared_join_handler(
                    config_manager.clone(),
                    audit_log.clone(),
                    gateway.clone(),
                    removals.clone(),
                );
                let verification_manager = create_shared_verification_manager(
                    config_manager.clone(),
                    audit_log.clone(),
                    gateway,
                    removals,
                );

                // Determine which guilds to register commands for
                let guilds_to_register: Vec<serenity::GuildId> = if let Some(gid) = target_guild_id {
                    // Only register to specific guild
                    vec![serenity::GuildId::new(gid)]
                } else {
                    // Register to all guilds the bot is in
                    ready.guilds.iter().map(|g| g.id).collect()
                };

                if guild_commands || sync_commands {
                    // Register commands per-guild (faster for testing)
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!("Successfully registered {} commands for guild {}",
                                  framework.options().commands.len(), guild_id);
                        }
                    }
                } else {
                    // Default: Register commands globally
                    info!("Registering commands globally...");
                    if let Err(e) = poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    ).await {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                              framework.options().commands.len());
                    }
                }

                if start_web {
                    let web_state = web::AppState {
                        config_manager: config_manager.clone(),
                        audit_log: audit_log.clone(),
                        verification_manager: verification_manager.clone(),
                        log_buffer,
                        api_key: settings.dashboard_api_key.as_deref().map(Arc::from),
                    };
                    let port = settings.web_port;

                    tokio::spawn(async move {
                        info!("Starting verification web server on port {}...", port);
                        if let Err(e) = web::start_web_server(port, web_state).await {
                            error!("Web server error: {}", e);
                        }
                    });
                } else {
                    info!("--no-web: Verification web server not started");
                }

                if settings.web_base_url.is_none() {
                    info!("WEB_BASE_URL not set, members verify with in-Discord buttons");
                }

                Ok(Data {
                    settings,
                    config_manager,
                    audit_log,
                    join_handler,
                    verification_manager,
                })
            })
        })
        .build();

    // GUILD_MEMBERS is privileged and needed for join events
    let intents = serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down...");
            shard_manager.shutdown_all().await;
        }
    });

    info!("Starting bot...");
    let run = client.start().await;

    if removals.len() > 0 {
        info!("Aborting {} pending removals", removals.len());
    }
    removals.shutdown();
    if let Err(e) = store.persist().await {
        error!("Failed to persist verification store on shutdown: {}", e);
    }

    if let Err(e) = run {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable the GUILD_MEMBERS privileged intent in the Discord Developer Portal:");
            error!("Go to https://discord.com/developers/applications -> Your App -> Bot -> Privileged Gateway Intents");
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents. Enable GUILD_MEMBERS in the Discord Developer Portal"
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
