// src/messages.rs
use poise::serenity_prelude::ChannelId;

use crate::verification::VerificationMethod;

pub fn welcome_dm(user_tag: &str, welcome_message: &str, channel_id: ChannelId) -> String {
    let greeting = if welcome_message.trim().is_empty() {
        format!("**Welcome to the server, {}!**", user_tag)
    } else {
        welcome_message.replace("{user}", user_tag)
    };

    format!(
        "{}\n\n\
        🔐 **Verification Required**\n\
        To get access to the server, head to <#{}> and press the **Verify** button.\n\n\
        ❓ If you run into problems, please contact a moderator.",
        greeting, channel_id
    )
}

pub fn removal_warning(timeout_hours: f64) -> String {
    format!(
        "⏳ Unverified members are removed after {} hour(s).",
        format_hours(timeout_hours)
    )
}

pub fn panel_description(method: VerificationMethod) -> String {
    let steps = match method {
        VerificationMethod::Button => "Press **Verify** and confirm that you are human.",
        VerificationMethod::Captcha => "Press **Verify** and solve the short captcha.",
    };
    format!(
        "This server requires verification before you can see the rest of the channels.\n\n{}",
        steps
    )
}

pub fn success_message() -> String {
    "✅ **Verification Successful!**\n\nYou now have access to the server.".to_string()
}

pub fn failure_message(reason: &str) -> String {
    format!(
        "❌ **Verification Failed**\n\n{}\n\nPress **Verify** to try again, or contact a moderator.",
        reason
    )
}

fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}", hours as u64)
    } else {
        format!("{:.2}", hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_dm_uses_custom_message() {
        let dm = welcome_dm("alice", "Hi {user}, glad you're here", ChannelId::new(5));
        assert!(dm.starts_with("Hi alice, glad you're here"));
        assert!(dm.contains("<#5>"));
    }

    #[test]
    fn test_welcome_dm_default_greeting() {
        let dm = welcome_dm("bob", "  ", ChannelId::new(5));
        assert!(dm.starts_with("**Welcome to the server, bob!**"));
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(24.0), "24");
        assert_eq!(format_hours(0.5), "0.50");
    }
}
