//! Button interactions of the verification panel.
//!
//! `verify_start` issues a token and either links to the hosted page or
//! answers with a confirm prompt. `verify_confirm:<token>[:<answer>]`
//! completes the verification in place.

use poise::serenity_prelude as serenity;
use tracing::{debug, error, info};

use crate::error::BotError;
use crate::managers::verification_manager::PendingToken;
use crate::messages::failure_message;
use crate::{Data, Error};

/// Custom id of the panel's Verify button
pub const VERIFY_START_ID: &str = "verify_start";
const CONFIRM_PREFIX: &str = "verify_confirm:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerifyAction<'a> {
    Start,
    Confirm { token: &'a str, answer: Option<i64> },
}

fn parse_custom_id(custom_id: &str) -> Option<VerifyAction<'_>> {
    if custom_id == VERIFY_START_ID {
        return Some(VerifyAction::Start);
    }

    let rest = custom_id.strip_prefix(CONFIRM_PREFIX)?;
    match rest.split_once(':') {
        Some((token, answer)) => Some(VerifyAction::Confirm {
            token,
            answer: Some(answer.parse().ok()?),
        }),
        None => Some(VerifyAction::Confirm {
            token: rest,
            answer: None,
        }),
    }
}

fn confirm_id(token: &str, answer: Option<i64>) -> String {
    match answer {
        Some(answer) => format!("{}{}:{}", CONFIRM_PREFIX, token, answer),
        None => format!("{}{}", CONFIRM_PREFIX, token),
    }
}

/// Route component interactions that belong to verification
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), Error> {
    let Some(component) = interaction.as_message_component() else {
        return Ok(());
    };

    match parse_custom_id(&component.data.custom_id) {
        Some(VerifyAction::Start) => start_verification(ctx, component, data).await,
        Some(VerifyAction::Confirm { token, answer }) => {
            confirm_verification(ctx, component, data, token, answer).await
        }
        None => Ok(()),
    }
}

async fn start_verification(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some(guild_id) = component.guild_id else {
        return reply(ctx, component, "Verification only works inside a server.").await;
    };

    let config = match data.config_manager.get_config(guild_id)? {
        Some(config) if config.enabled => config,
        _ => {
            return reply(ctx, component, "Verification is not enabled on this server.").await;
        }
    };

    let already_verified = component
        .member
        .as_ref()
        .is_some_and(|m| m.roles.contains(&config.role_id));
    if already_verified {
        return reply(ctx, component, "You are already verified.").await;
    }

    let pending = data.verification_manager.issue_token(
        guild_id,
        component.user.id,
        &component.user.tag(),
        config.method,
    );
    info!(
        guild_id = %guild_id,
        user_id = %component.user.id,
        "Verification started by {}",
        component.user.tag()
    );

    let message = match data.settings.verify_url(&pending.token) {
        Some(url) => serenity::CreateInteractionResponseMessage::new()
            .content("Open the verification page to continue. The link is personal and expires in one hour.")
            .components(vec![serenity::CreateActionRow::Buttons(vec![
                serenity::CreateButton::new_link(url).label("Open verification page"),
            ])]),
        None => confirm_prompt(&pending),
    };

    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(message.ephemeral(true)),
        )
        .await?;
    Ok(())
}

/// In-Discord prompt: a single confirm button, or one button per captcha choice
fn confirm_prompt(pending: &PendingToken) -> serenity::CreateInteractionResponseMessage {
    let (content, buttons) = match &pending.captcha {
        Some(captcha) => (
            format!("🧮 **{}**\n\nPick the right answer.", captcha.question),
            captcha
                .options
                .iter()
                .map(|option| {
                    serenity::CreateButton::new(confirm_id(&pending.token, Some(*option)))
                        .label(option.to_string())
                        .style(serenity::ButtonStyle::Secondary)
                })
                .collect(),
        ),
        None => (
            "Take a moment to read the rules, then confirm below.".to_string(),
            vec![serenity::CreateButton::new(confirm_id(&pending.token, None))
                .label("I'm human")
                .style(serenity::ButtonStyle::Success)],
        ),
    };

    serenity::CreateInteractionResponseMessage::new()
        .content(content)
        .components(vec![serenity::CreateActionRow::Buttons(buttons)])
}

async fn confirm_verification(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
    token: &str,
    answer: Option<i64>,
) -> Result<(), Error> {
    let Some(guild_id) = component.guild_id else {
        return reply(ctx, component, "Verification only works inside a server.").await;
    };

    let content = match data
        .verification_manager
        .complete_from_interaction(token, guild_id, answer)
        .await
    {
        Ok(response) => response.message,
        Err(e) if e.is_rejection() => {
            debug!(guild_id = %guild_id, user_id = %component.user.id, "Verification rejected: {}", e);
            failure_message(&rejection_text(&e))
        }
        Err(e) => {
            error!(guild_id = %guild_id, user_id = %component.user.id, "Verification failed: {}", e);
            failure_message("Something went wrong on our side.")
        }
    };

    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .components(vec![]),
            ),
        )
        .await?;
    Ok(())
}

/// Member-facing wording for a rejected claim
fn rejection_text(error: &BotError) -> String {
    match error {
        BotError::InvalidTiming { .. } => {
            "That was a little too fast. Take a moment and try again.".to_string()
        }
        BotError::CaptchaMismatch => "That answer was not correct.".to_string(),
        BotError::NotFound { .. } => "This verification session has expired.".to_string(),
        BotError::NotConfigured { .. } => {
            "Verification is not enabled on this server.".to_string()
        }
        other => other.to_string(),
    }
}

async fn reply(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    content: &str,
) -> Result<(), Error> {
    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}
