use tracing::trace;

use crate::core::config::AudioSettings;
use crate::simulation::region::Region;
use crate::simulation::session::{SessionState, MAX_RELAX_GAUGE};
use crate::ui::notification::Notification;
use crate::ui::sink::PresentationSink;

/// One console line per notification. HUD refreshes and typewriter ticks are
/// folded into other lines and return `None`.
pub fn render_notification(notification: &Notification) -> Option<String> {
    let line = match notification {
        Notification::StartupFailed { reason } => format!("!! content failed to load: {}", reason),
        Notification::ScreenChanged { screen, background } => match background {
            Some(bg) => format!("== {} == ({})", screen, bg),
            None => format!("== {} ==", screen),
        },
        Notification::CharacterSelected { char_id, name } => {
            format!("Selected {} [{}]", name, char_id)
        }
        Notification::TargetChanged(Some(region)) => format!("Target: {}", region),
        Notification::Hit { region, gain } => format!("  hit {} +{:.2}", region, gain),
        Notification::Miss { region, reason } => match region {
            Some(region) => format!("  miss {} ({:?})", region, reason),
            None => format!("  miss ({:?})", reason),
        },
        Notification::StatusChanged {
            combo,
            max_combo,
            miss_count,
        } => format!("  combo {} (max {}) misses {}", combo, max_combo, miss_count),
        Notification::BuffCutin(buff) => format!("*** {} ***", buff),
        Notification::BuffActivated { buff, duration_ms } => {
            format!("Buff {} active for {}s", buff, duration_ms / 1000)
        }
        Notification::BuffTick {
            buff,
            remaining_secs,
        } => format!("  {} {}s", buff, remaining_secs),
        Notification::BuffDeactivated(buff) => format!("Buff {} ended", buff),
        Notification::DialogueLine { speaker, text } => format!("{}: {}", speaker, text),
        Notification::EndingResolved {
            ending,
            title,
            text,
        } => {
            if text.is_empty() {
                format!("Ending {}: {}", ending, title)
            } else {
                format!("Ending {}: {}\n{}", ending, title, text)
            }
        }
        Notification::VolumeChanged { channel, level } => {
            format!("Volume {} = {:.0}%", channel.as_str(), level * 100.0)
        }
        Notification::Exited => "Bye.".to_string(),
        Notification::TargetChanged(None)
        | Notification::GaugeChanged(_)
        | Notification::ComboChanged(_)
        | Notification::DialogueReveal { .. }
        | Notification::Sound(_) => return None,
    };
    Some(line)
}

pub fn render_status(state: &SessionState, audio: &AudioSettings) -> String {
    let mut output = String::new();
    output.push_str("=== Session ===\n");
    output.push_str(&format!("  Screen: {}\n", state.screen));
    output.push_str(&format!(
        "  Character: {}\n",
        state.selected_character.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "  Relax: {:.1}/{:.0}\n",
        state.relax_gauge, MAX_RELAX_GAUGE
    ));
    output.push_str(&format!(
        "  Combo: {} (max {}), misses: {}\n",
        state.combo, state.max_combo, state.miss_count
    ));
    if let Some(target) = &state.current_target {
        output.push_str(&format!("  Target: {}\n", target.region));
    }
    if let Some(buff) = state.cutin_buff {
        output.push_str(&format!("  Cut-in: {}\n", buff));
    }
    for buff in &state.active_buffs {
        output.push_str(&format!("  Active: {}\n", buff));
    }

    output.push_str("Balance\n");
    let total = state.balance.total();
    for region in Region::ALL {
        let value = state.balance.get(region);
        let share = if total > 0.0 { value / total * 100.0 } else { 0.0 };
        output.push_str(&format!("  {:<9} {:>7.2} ({:>5.1}%)\n", region.as_str(), value, share));
    }
    output.push_str(&format!(
        "Audio: master {:.0}% bgm {:.0}% se {:.0}%\n",
        audio.master * 100.0,
        audio.bgm * 100.0,
        audio.se * 100.0
    ));
    output
}

/// Prints rendered notifications to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl PresentationSink for ConsoleSink {
    fn notify(&mut self, notification: &Notification) {
        if let Notification::Sound(cue) = notification {
            trace!(cue = cue.as_str(), "sound");
        }
        if let Some(line) = render_notification(notification) {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ending::EndingId;
    use crate::simulation::session::Screen;
    use crate::ui::notification::MissReason;

    #[test]
    fn hud_refreshes_are_silent() {
        assert_eq!(render_notification(&Notification::GaugeChanged(3.0)), None);
        assert_eq!(render_notification(&Notification::TargetChanged(None)), None);
        assert_eq!(
            render_notification(&Notification::DialogueReveal { visible_chars: 2 }),
            None
        );
    }

    #[test]
    fn lines_name_regions_and_screens() {
        assert_eq!(
            render_notification(&Notification::Miss {
                region: Some(Region::Foot),
                reason: MissReason::Timeout
            })
            .unwrap(),
            "  miss foot (Timeout)"
        );
        assert_eq!(
            render_notification(&Notification::ScreenChanged {
                screen: Screen::Game,
                background: Some("room.png".to_string())
            })
            .unwrap(),
            "== game == (room.png)"
        );
        let ending = render_notification(&Notification::EndingResolved {
            ending: EndingId::E2,
            title: "Light Feet".to_string(),
            text: String::new(),
        })
        .unwrap();
        assert_eq!(ending, "Ending E2: Light Feet");
    }

    #[test]
    fn status_lists_every_region() {
        let mut state = SessionState::new();
        state.balance.add(Region::Neck, 3.0);
        state.balance.add(Region::Back, 1.0);
        let status = render_status(&state, &AudioSettings::default());
        for region in Region::ALL {
            assert!(status.contains(region.as_str()));
        }
        assert!(status.contains("75.0%"));
        assert!(status.contains("master 70%"));
    }
}
