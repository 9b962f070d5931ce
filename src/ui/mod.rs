pub mod console;
pub mod notification;
pub mod sink;

pub use console::{render_notification, render_status, ConsoleSink};
pub use notification::{MissReason, Notification, SoundCue, VolumeChannel};
pub use sink::{PresentationSink, RecordingSink};
