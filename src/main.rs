use chime::{
    config::{self, BOT_PREFIX},
    player::ChimePlayer,
    settings::{JsonFileRepository, SettingsStore},
};
use serenity::all::ClientBuilder;
use songbird::SerenityInit;
use std::{env, sync::Arc};
use util::send_embed;

mod chime;
mod logger;
mod util;

use poise::{
    serenity_prelude::{CacheHttp, GatewayIntents},
    Context as RawPoiseContext,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type PoiseContext<'a> = RawPoiseContext<'a, Data, Error>;

pub struct Data {
    pub settings: Arc<SettingsStore>,
    pub player: Arc<ChimePlayer>,
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            if let Err(e) = send_embed(
                ctx.serenity_context().http(),
                ctx.channel_id(),
                &error.to_string(),
            )
            .await
            {
                log::error!("Error while sending error embed: {}", e)
            };
        }
        // commands issued outside a guild are dropped without a reply
        poise::FrameworkError::GuildOnly { .. } => {}
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                log::error!("Error while handling error: {}", e)
            }
        }
    }
}

async fn is_administrator(ctx: &PoiseContext<'_>) -> bool {
    let member = match ctx.author_member().await {
        Some(member) => member,
        None => return false,
    };
    match member.permissions(&ctx.serenity_context().cache) {
        Ok(permissions) => permissions.administrator(),
        Err(why) => {
            log::warn!("failed to resolve member permissions: {}", why);
            false
        }
    }
}

/// Runs for every recognized command: removes the command message from the
/// channel, then gates on the administrator permission.
async fn command_check(ctx: PoiseContext<'_>) -> Result<bool, Error> {
    if ctx.guild_id().is_none() {
        return Ok(false);
    }
    if let RawPoiseContext::Prefix(prefix_ctx) = ctx {
        if let Err(why) = prefix_ctx.msg.delete(ctx.serenity_context()).await {
            log::warn!("failed to delete command message: {}", why);
        }
    }
    if !is_administrator(&ctx).await {
        send_embed(
            ctx.serenity_context().http(),
            ctx.channel_id(),
            "You don't have permission",
        )
        .await?;
        return Ok(false);
    }
    Ok(true)
}

#[tokio::main]
async fn main() {
    logger::init_logger().expect("failed to init logger");
    let settings = Arc::new(
        SettingsStore::load(Box::new(JsonFileRepository::new(config::settings_path())))
            .expect("failed to load guild settings"),
    );
    let player = Arc::new(ChimePlayer::new(config::chime_path()));

    let mut commands = vec![];
    chime::add_group(&mut commands);
    let options = poise::FrameworkOptions {
        commands,
        on_error: |error| Box::pin(on_error(error)),
        command_check: Some(|ctx| Box::pin(command_check(ctx))),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(BOT_PREFIX.to_owned()),
            mention_as_prefix: false,

            ..Default::default()
        },
        ..Default::default()
    };
    let framework = poise::Framework::builder()
        .options(options)
        .setup({
            let settings = settings.clone();
            let player = player.clone();
            move |ctx, _, _| {
                Box::pin(async move {
                    chime::scheduler::start_scheduler(ctx.clone(), settings.clone(), player.clone())
                        .await?;
                    Ok(Data { settings, player })
                })
            }
        })
        .build();
    let token = env::var("CARILLON_BOT_TOKEN").expect("Error: token not found");
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS;
    let client = ClientBuilder::new(token, intents)
        .framework(framework)
        .register_songbird()
        .await;
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    client.unwrap().start().await.unwrap()
}
