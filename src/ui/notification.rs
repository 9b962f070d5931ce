use crate::rules::ending::EndingId;
use crate::simulation::buff::BuffId;
use crate::simulation::region::Region;
use crate::simulation::session::Screen;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// The reaction window closed, whether the target went unclicked or was clicked late.
    Timeout,
    WrongRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    ButtonClick,
    ClickSoft,
    SkillActivate,
    EndingChime,
}

impl SoundCue {
    /// Identifier in the `sound_effects` content rows.
    pub fn as_str(self) -> &'static str {
        match self {
            SoundCue::ButtonClick => "button_click",
            SoundCue::ClickSoft => "click_soft",
            SoundCue::SkillActivate => "skill_activate",
            SoundCue::EndingChime => "ending_chime",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeChannel {
    Master,
    Bgm,
    Se,
}

impl VolumeChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            VolumeChannel::Master => "master",
            VolumeChannel::Bgm => "bgm",
            VolumeChannel::Se => "se",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "master" => Some(VolumeChannel::Master),
            "bgm" => Some(VolumeChannel::Bgm),
            "se" => Some(VolumeChannel::Se),
            _ => None,
        }
    }
}

/// State change pushed from the game to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    StartupFailed { reason: String },
    ScreenChanged { screen: Screen, background: Option<String> },
    CharacterSelected { char_id: String, name: String },
    GaugeChanged(f64),
    ComboChanged(u32),
    StatusChanged { combo: u32, max_combo: u32, miss_count: u32 },
    TargetChanged(Option<Region>),
    Hit { region: Region, gain: f64 },
    Miss { region: Option<Region>, reason: MissReason },
    BuffCutin(BuffId),
    BuffActivated { buff: BuffId, duration_ms: u64 },
    BuffTick { buff: BuffId, remaining_secs: u32 },
    BuffDeactivated(BuffId),
    DialogueLine { speaker: String, text: String },
    DialogueReveal { visible_chars: usize },
    EndingResolved { ending: EndingId, title: String, text: String },
    Sound(SoundCue),
    VolumeChanged { channel: VolumeChannel, level: f64 },
    Exited,
}
