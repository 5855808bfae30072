use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::events::VERIFY_START_ID;
use crate::managers::guild_stats;
use crate::messages::panel_description;
use crate::verification::{
    AuditEntry, AuditEntryType, SettingsUpdate, VerificationConfig, VerificationMethod,
    VerificationSetup, VerificationStats,
};
use crate::{Context, Error};

const EMBED_COLOR: u32 = 0x5865F2;
const DEFAULT_LOG_COUNT: u32 = 10;

/// Manage member verification for this server
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_GUILD",
    subcommands("setup", "settings", "toggle", "status", "logs", "clear_logs"),
    subcommand_required
)]
pub async fn verify(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set up verification and post the Verify panel
#[poise::command(slash_command, guild_only)]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "Channel where the Verify panel is posted"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
    #[description = "Role granted after verification"] role: serenity::Role,
    #[description = "How members prove they are human"] method: Option<VerificationMethod>,
    #[description = "DM new members a welcome message"] dm_welcome: Option<bool>,
    #[description = "Custom welcome text, {user} is replaced by the member"]
    welcome_message: Option<String>,
    #[description = "Kick members who do not verify in time"] remove_unverified: Option<bool>,
    #[description = "Hours before unverified members are kicked"] timeout_hours: Option<f64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;

    let setup = VerificationSetup {
        channel_id: channel.id,
        role_id: role.id,
        method: method.unwrap_or_default(),
        dm_welcome: dm_welcome.unwrap_or(true),
        welcome_message: welcome_message.unwrap_or_default(),
        remove_unverified: remove_unverified.unwrap_or(false),
        timeout_hours: timeout_hours.unwrap_or(24.0),
    };
    let config = ctx.data().config_manager.setup(guild_id, setup).await?;

    let panel = serenity::CreateMessage::new()
        .embed(
            serenity::CreateEmbed::new()
                .title("🔐 Verification")
                .description(panel_description(config.method))
                .color(EMBED_COLOR),
        )
        .components(vec![serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new(VERIFY_START_ID)
                .label("Verify")
                .style(serenity::ButtonStyle::Primary),
        ])]);

    let panel_note = match channel.id.send_message(ctx.http(), panel).await {
        Ok(_) => format!("The Verify panel was posted in <#{}>.", channel.id),
        Err(e) => {
            warn!(guild_id = %guild_id, "Failed to post verification panel in {}: {}", channel.id, e);
            format!(
                "⚠️ Could not post the Verify panel in <#{}>: {}\nCheck the bot's permissions in that channel and run setup again.",
                channel.id, e
            )
        }
    };

    info!(
        guild_id = %guild_id,
        "Verification set up by {}: channel {}, role {}, method {:?}",
        ctx.author().name,
        config.channel_id,
        config.role_id,
        config.method
    );

    ctx.send(
        poise::CreateReply::default()
            .content(format!("✅ Verification is set up and enabled.\n{}", panel_note))
            .embed(config_embed(&config, None))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Change individual verification settings
#[poise::command(slash_command, guild_only)]
pub async fn settings(
    ctx: Context<'_>,
    #[description = "Channel of the Verify panel"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
    #[description = "Role granted after verification"] role: Option<serenity::Role>,
    #[description = "How members prove they are human"] method: Option<VerificationMethod>,
    #[description = "DM new members a welcome message"] dm_welcome: Option<bool>,
    #[description = "Custom welcome text, {user} is replaced by the member"]
    welcome_message: Option<String>,
    #[description = "Kick members who do not verify in time"] remove_unverified: Option<bool>,
    #[description = "Hours before unverified members are kicked"] timeout_hours: Option<f64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;

    let update = SettingsUpdate {
        channel_id: channel.map(|c| c.id),
        role_id: role.map(|r| r.id),
        method,
        dm_welcome,
        welcome_message,
        remove_unverified,
        timeout_hours,
    };
    let config = ctx
        .data()
        .config_manager
        .update_settings(guild_id, &update)
        .await?;

    info!(guild_id = %guild_id, "Verification settings updated by {}", ctx.author().name);

    ctx.send(
        poise::CreateReply::default()
            .content("✅ Settings updated.")
            .embed(config_embed(&config, None))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Turn verification on or off
#[poise::command(slash_command, guild_only)]
pub async fn toggle(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;
    let config = ctx.data().config_manager.toggle_enabled(guild_id).await?;

    let state = if config.enabled { "enabled" } else { "disabled" };
    info!(guild_id = %guild_id, "Verification {} by {}", state, ctx.author().name);

    ctx.send(
        poise::CreateReply::default()
            .content(format!("Verification is now **{}**.", state))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show the current configuration and statistics
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;
    let data = ctx.data();

    let Some(config) = data.config_manager.get_config(guild_id)? else {
        ctx.send(
            poise::CreateReply::default()
                .content("Verification is not set up here yet. Run `/verify setup` first.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };
    let stats = guild_stats(&data.audit_log, guild_id)?;

    ctx.send(
        poise::CreateReply::default()
            .embed(config_embed(&config, Some(&stats)))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show the most recent verification log entries
#[poise::command(slash_command, guild_only)]
pub async fn logs(
    ctx: Context<'_>,
    #[description = "Number of entries to show (max 25)"]
    #[min = 1]
    #[max = 25]
    count: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;
    let count = count.unwrap_or(DEFAULT_LOG_COUNT).clamp(1, 25) as usize;

    let entries = ctx.data().audit_log.recent(guild_id, count)?;
    let description = if entries.is_empty() {
        "No verification activity yet.".to_string()
    } else {
        entries.iter().map(format_entry).collect::<Vec<_>>().join("\n")
    };

    let embed = serenity::CreateEmbed::new()
        .title("Verification Log")
        .description(description)
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Delete all verification log entries and attempts
#[poise::command(slash_command, guild_only)]
pub async fn clear_logs(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;
    ctx.data().config_manager.clear_logs(guild_id).await?;

    info!(guild_id = %guild_id, "Verification logs cleared by {}", ctx.author().name);
    ctx.send(
        poise::CreateReply::default()
            .content("🧹 Verification logs cleared.")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

fn config_embed(config: &VerificationConfig, stats: Option<&VerificationStats>) -> serenity::CreateEmbed {
    let removal = if config.remove_unverified {
        format!("after {} hour(s)", config.timeout_hours)
    } else {
        "off".to_string()
    };
    let welcome = match (config.dm_welcome, config.welcome_message.trim().is_empty()) {
        (false, _) => "off".to_string(),
        (true, true) => "default message".to_string(),
        (true, false) => "custom message".to_string(),
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("Verification Settings")
        .field("Status", if config.enabled { "✅ Enabled" } else { "⛔ Disabled" }, true)
        .field("Method", method_name(config.method), true)
        .field("Channel", format!("<#{}>", config.channel_id), true)
        .field("Role", format!("<@&{}>", config.role_id), true)
        .field("Welcome DM", welcome, true)
        .field("Remove unverified", removal, true)
        .color(EMBED_COLOR);

    if let Some(stats) = stats {
        embed = embed
            .field("Verified", stats.total_verifications.to_string(), true)
            .field("Pending", stats.pending_verifications.to_string(), true)
            .field("Failed attempts", stats.failed_attempts.to_string(), true)
            .field("Verification rate", format!("{}%", stats.verification_rate), true);
    }
    embed
}

fn method_name(method: VerificationMethod) -> &'static str {
    match method {
        VerificationMethod::Button => "Button",
        VerificationMethod::Captcha => "Captcha",
    }
}

fn format_entry(entry: &AuditEntry) -> String {
    let outcome = match (entry.entry_type, entry.success) {
        (AuditEntryType::MemberJoin, None) => "⏳ joined, pending",
        (AuditEntryType::MemberJoin, Some(true)) => "✅ joined, verified",
        (AuditEntryType::MemberJoin, Some(false)) => "❌ joined, failed",
        (AuditEntryType::VerifySuccess, _) => "✅ verified",
        (AuditEntryType::VerifyFail, _) => "❌ failed",
    };
    let reason = entry
        .reason
        .as_deref()
        .map(|r| format!(" ({})", r))
        .unwrap_or_default();
    format!(
        "<t:{}:R> **{}** {}{}",
        entry.timestamp.timestamp(),
        entry.user_tag,
        outcome,
        reason
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::{GuildId, UserId};

    #[test]
    fn test_format_entry() {
        let guild = GuildId::new(1);
        let join = AuditEntry::member_join(guild, UserId::new(2), "alice");
        assert!(format_entry(&join).contains("**alice** ⏳ joined, pending"));

        let fail = AuditEntry::verify_fail(guild, "2", "alice", "invalid_timing".to_string());
        assert!(format_entry(&fail).ends_with("❌ failed (invalid_timing)"));
    }
}
