use anyhow::Context;
use poise::{serenity_prelude::CacheHttp, Command};
use serenity::all::{CreateActionRow, CreateButton, CreateMessage};

use super::player::TriggerOutcome;
use super::settings::GuildSetting;
use crate::{util::send_embed, Data, Error, PoiseContext};

const HELP_TEXT: &str = "\
!enable - chime every hour in the busiest voice channel
!max - same as !enable
!disable - stop chiming in this guild
!specific - chime every hour in the voice channel you are in
!status - show this guild's setting
!list - show the settings of every guild
!test - run the chime for this guild right now
!invites - get the invite link
!help - this message";

/// Chime every hour in the voice channel with the most connected members
#[poise::command(prefix_command, guild_only, aliases("max"))]
async fn enable(ctx: PoiseContext<'_>) -> anyhow::Result<(), Error> {
    let guild_id = ctx.guild_id().context("failed to get guild id")?;
    ctx.data().settings.set(guild_id, GuildSetting::max()).await?;
    send_embed(ctx.serenity_context().http(), ctx.channel_id(), "Enabled").await?;
    Ok(())
}

/// Stop chiming in this guild
#[poise::command(prefix_command, guild_only)]
async fn disable(ctx: PoiseContext<'_>) -> anyhow::Result<(), Error> {
    let guild_id = ctx.guild_id().context("failed to get guild id")?;
    ctx.data().settings.remove(guild_id).await?;
    send_embed(ctx.serenity_context().http(), ctx.channel_id(), "Disabled").await?;
    Ok(())
}

/// Chime every hour in the voice channel you are currently in
#[poise::command(prefix_command, guild_only)]
async fn specific(ctx: PoiseContext<'_>) -> anyhow::Result<(), Error> {
    let guild_id = ctx.guild_id().context("failed to get guild id")?;
    let channel_id = {
        let guild = ctx.guild().context("failed to get guild")?;
        guild
            .voice_states
            .get(&ctx.author().id)
            .and_then(|voice_state| voice_state.channel_id)
    };
    let channel_id = match channel_id {
        Some(channel_id) => channel_id,
        None => {
            send_embed(
                ctx.serenity_context().http(),
                ctx.channel_id(),
                "You are not in voice channel",
            )
            .await?;
            return Ok(());
        }
    };
    ctx.data()
        .settings
        .set(guild_id, GuildSetting::specific(channel_id))
        .await?;
    send_embed(ctx.serenity_context().http(), ctx.channel_id(), "Enabled").await?;
    Ok(())
}

/// Show this guild's setting
#[poise::command(prefix_command, guild_only)]
async fn status(ctx: PoiseContext<'_>) -> anyhow::Result<(), Error> {
    let guild_id = ctx.guild_id().context("failed to get guild id")?;
    let setting = ctx.data().settings.get(guild_id).await;
    let text = serde_json::to_string(&setting).context("failed to serialize setting")?;
    send_embed(
        ctx.serenity_context().http(),
        ctx.channel_id(),
        &format!("Current setting: {}", text),
    )
    .await?;
    Ok(())
}

/// Show the settings of every guild
#[poise::command(prefix_command, guild_only)]
async fn list(ctx: PoiseContext<'_>) -> anyhow::Result<(), Error> {
    let entries = ctx.data().settings.snapshot().await;
    let text = serde_json::to_string(&entries).context("failed to serialize settings")?;
    send_embed(
        ctx.serenity_context().http(),
        ctx.channel_id(),
        &format!("Current settings: {}", text),
    )
    .await?;
    Ok(())
}

/// Run the chime for this guild right now
#[poise::command(prefix_command, guild_only)]
async fn test(ctx: PoiseContext<'_>) -> anyhow::Result<(), Error> {
    let guild_id = ctx.guild_id().context("failed to get guild id")?;
    let setting = ctx.data().settings.get(guild_id).await;
    let outcome = ctx
        .data()
        .player
        .trigger(ctx.serenity_context(), guild_id, &setting)
        .await?;
    match outcome {
        TriggerOutcome::Started => {}
        TriggerOutcome::NoChannel => {
            send_embed(
                ctx.serenity_context().http(),
                ctx.channel_id(),
                "No voice channel to chime in",
            )
            .await?
        }
        TriggerOutcome::AlreadyActive => {
            send_embed(
                ctx.serenity_context().http(),
                ctx.channel_id(),
                "Already chiming",
            )
            .await?
        }
    }
    Ok(())
}

/// Get the invite link
#[poise::command(prefix_command, guild_only)]
async fn invites(ctx: PoiseContext<'_>) -> anyhow::Result<(), Error> {
    let client_id = ctx.serenity_context().cache.current_user().id;
    let url = format!(
        "https://discord.com/oauth2/authorize?client_id={}",
        client_id
    );
    let components = vec![CreateActionRow::Buttons(vec![
        CreateButton::new_link(url).label("Invite"),
    ])];
    ctx.channel_id()
        .send_message(
            ctx.serenity_context().http(),
            CreateMessage::new()
                .content("Invite the bot to your server")
                .components(components),
        )
        .await?;
    Ok(())
}

/// Show the command summary
#[poise::command(prefix_command, guild_only)]
async fn help(ctx: PoiseContext<'_>) -> anyhow::Result<(), Error> {
    send_embed(ctx.serenity_context().http(), ctx.channel_id(), HELP_TEXT).await?;
    Ok(())
}

pub fn add_group(commands: &mut Vec<Command<Data, Error>>) {
    commands.extend(vec![
        enable(),
        disable(),
        specific(),
        status(),
        list(),
        test(),
        invites(),
        help(),
    ])
}
