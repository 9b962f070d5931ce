use thiserror::Error;

use crate::simulation::session::Screen;

/// Raw input forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    SelectCharacter(String),
    Start,
    AdvanceDialogue,
    ClickRegion(String),
    Retry,
    ReturnToTitle,
    OpenConfig,
    /// `channel` is `master`, `bgm` or `se`; `value` is a percentage.
    AdjustVolume { channel: String, value: i32 },
    Exit,
}

impl Input {
    pub fn name(&self) -> &'static str {
        match self {
            Input::SelectCharacter(_) => "select-character",
            Input::Start => "start",
            Input::AdvanceDialogue => "advance-dialogue",
            Input::ClickRegion(_) => "click-region",
            Input::Retry => "retry",
            Input::ReturnToTitle => "return-to-title",
            Input::OpenConfig => "open-config",
            Input::AdjustVolume { .. } => "adjust-volume",
            Input::Exit => "exit",
        }
    }
}

/// Why an input left the game untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectedInput {
    #[error("unknown region: {0}")]
    UnknownRegion(String),
    #[error("unknown character: {0}")]
    UnknownCharacter(String),
    #[error("unknown volume channel: {0}")]
    UnknownChannel(String),
    #[error("volume out of range: {0}")]
    VolumeOutOfRange(i32),
    #[error("no character selected")]
    NoCharacterSelected,
    #[error("no target pending")]
    NoPendingTarget,
    #[error("{input} not accepted on the {screen} screen")]
    WrongScreen { input: &'static str, screen: Screen },
    #[error("game closed")]
    Closed,
}

impl RejectedInput {
    /// The input named something outside the known sets.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            RejectedInput::UnknownRegion(_)
                | RejectedInput::UnknownCharacter(_)
                | RejectedInput::UnknownChannel(_)
                | RejectedInput::VolumeOutOfRange(_)
        )
    }
}
