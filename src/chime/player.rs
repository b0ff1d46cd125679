use anyhow::Context as AnyhowContext;
use async_trait::async_trait;
use serenity::all::{ChannelId, GuildId};
use serenity::client::Context;
use songbird::{
    input::File, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{collections::HashSet, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

use super::selector;
use super::settings::{GuildSetting, SettingsStore};

/// Lifecycle of a single chime in one guild. The voice connection is torn
/// down only on the first transition out of `Playing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlaybackState {
    Connecting,
    Playing,
    Finished,
    Failed,
}

fn advance(state: &mut PlaybackState, outcome: PlaybackState) -> bool {
    if *state != PlaybackState::Playing {
        return false;
    }
    *state = outcome;
    true
}

pub enum TriggerOutcome {
    Started,
    NoChannel,
    AlreadyActive,
}

pub struct ChimePlayer {
    source: File<PathBuf>,
    in_flight: Mutex<HashSet<GuildId>>,
}

impl ChimePlayer {
    pub fn new(path: PathBuf) -> ChimePlayer {
        if !path.exists() {
            log::warn!("chime audio file {} not found", path.display());
        }
        ChimePlayer {
            source: File::new(path),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Runs the chime for every guild whose mode is not off. Each guild is
    /// handled in its own task so a slow join cannot hold up the others.
    pub async fn run_all(self: &Arc<Self>, ctx: &Context, settings: &Arc<SettingsStore>) {
        for (guild_id, setting) in settings.enabled().await {
            match self.trigger(ctx, guild_id, &setting).await {
                Ok(TriggerOutcome::Started) => {}
                Ok(TriggerOutcome::NoChannel) => {
                    log::info!("guild {}: no eligible voice channel", guild_id)
                }
                Ok(TriggerOutcome::AlreadyActive) => {
                    log::info!("guild {}: chime already active, skipping", guild_id)
                }
                Err(why) => log::error!("guild {}: failed to start chime: {}", guild_id, why),
            }
        }
    }

    /// Selects a channel and spawns the playback task for one guild. A guild
    /// that is already mid-chime is skipped rather than joined twice.
    pub async fn trigger(
        self: &Arc<Self>,
        ctx: &Context,
        guild_id: GuildId,
        setting: &GuildSetting,
    ) -> anyhow::Result<TriggerOutcome> {
        let channel_id = match selector::select(ctx, guild_id, setting) {
            Some(channel_id) => channel_id,
            None => return Ok(TriggerOutcome::NoChannel),
        };
        if !self.begin(guild_id).await {
            return Ok(TriggerOutcome::AlreadyActive);
        }
        let player = self.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(why) = player.play_chime(&ctx, guild_id, channel_id).await {
                log::error!("guild {}: chime playback failed: {}", guild_id, why);
                player.abort(&ctx, guild_id).await;
            }
        });
        Ok(TriggerOutcome::Started)
    }

    async fn play_chime(
        self: &Arc<Self>,
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> anyhow::Result<()> {
        let manager = songbird::get(ctx)
            .await
            .context("songbird voice client missing at initialisation")?;
        let call = manager
            .join(guild_id, channel_id)
            .await
            .with_context(|| format!("failed to join voice channel {}", channel_id))?;
        let state = Arc::new(Mutex::new(PlaybackState::Connecting));
        {
            let mut call = call.lock().await;
            let handle = call.play_only_input(self.source.clone().into());
            *state.lock().await = PlaybackState::Playing;
            for (event, outcome) in [
                (TrackEvent::End, PlaybackState::Finished),
                (TrackEvent::Error, PlaybackState::Failed),
            ] {
                handle
                    .add_event(
                        Event::Track(event),
                        ChimeEndNotifier {
                            guild_id,
                            outcome,
                            manager: manager.clone(),
                            player: self.clone(),
                            state: state.clone(),
                        },
                    )
                    .context("failed to attach track event handler")?;
            }
        }
        log::info!("guild {}: chiming in channel {}", guild_id, channel_id);
        Ok(())
    }

    /// Best-effort teardown for playbacks that never reached a track event.
    async fn abort(self: &Arc<Self>, ctx: &Context, guild_id: GuildId) {
        if let Some(manager) = songbird::get(ctx).await {
            if manager.get(guild_id).is_some() {
                if let Err(why) = manager.remove(guild_id).await {
                    log::error!("guild {}: failed to leave voice channel: {}", guild_id, why);
                }
            }
        }
        self.clear_in_flight(guild_id).await;
    }

    async fn begin(&self, guild_id: GuildId) -> bool {
        self.in_flight.lock().await.insert(guild_id)
    }

    async fn clear_in_flight(&self, guild_id: GuildId) {
        self.in_flight.lock().await.remove(&guild_id);
    }
}

struct ChimeEndNotifier {
    guild_id: GuildId,
    outcome: PlaybackState,
    manager: Arc<Songbird>,
    player: Arc<ChimePlayer>,
    state: Arc<Mutex<PlaybackState>>,
}

#[async_trait]
impl VoiceEventHandler for ChimeEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        {
            let mut state = self.state.lock().await;
            if !advance(&mut state, self.outcome) {
                return None;
            }
        }
        if self.outcome == PlaybackState::Failed {
            log::error!("guild {}: chime track errored", self.guild_id);
        }
        if self.manager.get(self.guild_id).is_some() {
            if let Err(why) = self.manager.remove(self.guild_id).await {
                log::error!(
                    "guild {}: failed to leave voice channel: {}",
                    self.guild_id,
                    why
                );
            }
        }
        self.player.clear_in_flight(self.guild_id).await;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_trigger_for_same_guild_is_coalesced() {
        let player = ChimePlayer::new(PathBuf::from("chime.mp3"));
        assert!(player.begin(GuildId::new(1)).await);
        assert!(!player.begin(GuildId::new(1)).await);
        assert!(player.begin(GuildId::new(2)).await);
        player.clear_in_flight(GuildId::new(1)).await;
        assert!(player.begin(GuildId::new(1)).await);
    }

    #[test]
    fn teardown_runs_only_once_per_playback() {
        let mut state = PlaybackState::Playing;
        assert!(advance(&mut state, PlaybackState::Finished));
        assert_eq!(state, PlaybackState::Finished);
        // a late error event after the track already ended is ignored
        assert!(!advance(&mut state, PlaybackState::Failed));
        assert_eq!(state, PlaybackState::Finished);
    }

    #[test]
    fn status_churn_before_playback_does_not_tear_down() {
        let mut state = PlaybackState::Connecting;
        assert!(!advance(&mut state, PlaybackState::Finished));
        assert_eq!(state, PlaybackState::Connecting);
    }
}
