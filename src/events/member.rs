use poise::serenity_prelude as serenity;
use tracing::debug;

use crate::managers::MemberJoin;
use crate::{Data, Error};

/// Hand a new member to the join handler
pub async fn handle_member_add(
    _ctx: &serenity::Context,
    new_member: &serenity::Member,
    data: &Data,
) -> Result<(), Error> {
    if new_member.user.bot {
        debug!(
            guild_id = %new_member.guild_id,
            "Ignoring bot account {} joining",
            new_member.user.name
        );
        return Ok(());
    }

    let join = MemberJoin {
        guild_id: new_member.guild_id,
        user_id: new_member.user.id,
        user_tag: new_member.user.tag(),
    };
    data.join_handler.on_member_join(join).await;
    Ok(())
}
