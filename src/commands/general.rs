use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.send(poise::CreateReply::default()
        .content("Pong! Gatekeeper is up.")
        .ephemeral(true))
        .await?;
    Ok(())
}

/// Show help information
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("Gatekeeper Commands")
        .description("New members press **Verify** on the panel to get access.\nThe commands below require Manage Server.")
        .field("/ping", "Check if the bot is running", false)
        .field("/verify setup", "Configure verification and post the Verify panel", false)
        .field("/verify settings", "Change the channel, role, method, welcome DM or removal timeout", false)
        .field("/verify toggle", "Turn verification on or off", false)
        .field("/verify status", "Show settings and verification statistics", false)
        .field("/verify logs", "Show recent verification activity", false)
        .field("/verify clear_logs", "Delete the verification log", false)
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}
