use serenity::all::{ChannelId, ChannelType, GuildId};
use serenity::client::Context;

use super::settings::{ChimeMode, GuildSetting};

/// Point-in-time view of one voice channel, built fresh for every selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceChannelSnapshot {
    pub id: ChannelId,
    pub member_count: usize,
}

/// Picks the voice channel to chime in, or nothing. Absence is not an error:
/// scheduled runs skip silently, the test command reports it to the issuer.
pub fn select(ctx: &Context, guild_id: GuildId, setting: &GuildSetting) -> Option<ChannelId> {
    match setting.mode {
        ChimeMode::Off => None,
        ChimeMode::Max => {
            let channels = snapshot_voice_channels(ctx, guild_id);
            log::info!(
                "guild {}: {} voice channel(s) considered",
                guild_id,
                channels.len()
            );
            busiest(&channels)
        }
        ChimeMode::Specific => {
            let target = setting.specific_channel_id?;
            let guild = ctx.cache.guild(guild_id)?;
            resolve_specific(
                target,
                guild.channels.get(&target).map(|channel| channel.kind),
            )
        }
    }
}

/// A stored target is honored only while it still resolves to a voice
/// channel; a deleted or re-typed channel means no chime.
fn resolve_specific(target: ChannelId, kind: Option<ChannelType>) -> Option<ChannelId> {
    match kind {
        Some(ChannelType::Voice) => Some(target),
        _ => None,
    }
}

/// Voice channels in board order, top to bottom, with their connected-member
/// counts taken from the cached voice states.
fn snapshot_voice_channels(ctx: &Context, guild_id: GuildId) -> Vec<VoiceChannelSnapshot> {
    let guild = match ctx.cache.guild(guild_id) {
        Some(guild) => guild,
        None => return vec![],
    };
    let mut channels: Vec<_> = guild
        .channels
        .values()
        .filter(|channel| channel.kind == ChannelType::Voice)
        .collect();
    channels.sort_by_key(|channel| (channel.position, channel.id));
    channels
        .iter()
        .map(|channel| VoiceChannelSnapshot {
            id: channel.id,
            member_count: guild
                .voice_states
                .values()
                .filter(|voice_state| voice_state.channel_id == Some(channel.id))
                .count(),
        })
        .collect()
}

/// The first channel wins ties; a later candidate must be strictly busier.
pub fn busiest(channels: &[VoiceChannelSnapshot]) -> Option<ChannelId> {
    let mut best: Option<&VoiceChannelSnapshot> = None;
    for candidate in channels {
        match best {
            Some(current) if candidate.member_count <= current.member_count => {}
            _ => best = Some(candidate),
        }
    }
    best.map(|channel| channel.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: u64, member_count: usize) -> VoiceChannelSnapshot {
        VoiceChannelSnapshot {
            id: ChannelId::new(id),
            member_count,
        }
    }

    #[test]
    fn empty_set_selects_nothing() {
        assert_eq!(busiest(&[]), None);
    }

    #[test]
    fn distinct_counts_select_the_global_max() {
        let channels = [snapshot(1, 2), snapshot(2, 9), snapshot(3, 4)];
        assert_eq!(busiest(&channels), Some(ChannelId::new(2)));
    }

    #[test]
    fn first_channel_wins_ties() {
        // A(3), B(7), C(7) in that order picks B, not C
        let channels = [snapshot(1, 3), snapshot(2, 7), snapshot(3, 7)];
        assert_eq!(busiest(&channels), Some(ChannelId::new(2)));
    }

    #[test]
    fn a_lone_empty_channel_is_still_selected() {
        let channels = [snapshot(1, 0)];
        assert_eq!(busiest(&channels), Some(ChannelId::new(1)));
    }

    #[test]
    fn specific_target_resolves_while_voice_typed() {
        assert_eq!(
            resolve_specific(ChannelId::new(5), Some(ChannelType::Voice)),
            Some(ChannelId::new(5))
        );
    }

    #[test]
    fn specific_target_vanishes_with_the_channel() {
        assert_eq!(resolve_specific(ChannelId::new(5), None), None);
    }

    #[test]
    fn specific_target_of_the_wrong_type_is_ignored() {
        assert_eq!(
            resolve_specific(ChannelId::new(5), Some(ChannelType::Text)),
            None
        );
    }
}
