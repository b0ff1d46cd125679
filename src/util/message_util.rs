use poise::serenity_prelude::{ChannelId, CreateEmbed, Http};
use serenity::all::CreateMessage;

use crate::chime::config::EMBED_COLOUR;

/// Every bot reply goes out as a single accent-coloured embed.
pub async fn send_embed(http: &Http, channel_id: ChannelId, text: &str) -> anyhow::Result<()> {
    let embed = CreateEmbed::new().colour(EMBED_COLOUR).description(text);
    channel_id
        .send_message(http, CreateMessage::new().add_embed(embed))
        .await?;
    Ok(())
}
