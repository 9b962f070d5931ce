use bevy_ecs::prelude::*;

use crate::ui::notification::Notification;

/// Resource collecting the notifications raised during a tick, flushed to the sink afterwards.
#[derive(Resource, Default, Debug)]
pub struct Outbox(pub Vec<Notification>);

/// Receives every notification the game emits, in emission order.
pub trait PresentationSink {
    fn notify(&mut self, notification: &Notification);
}

impl<S: PresentationSink + ?Sized> PresentationSink for Box<S> {
    fn notify(&mut self, notification: &Notification) {
        (**self).notify(notification);
    }
}

/// Keeps everything it is sent; used by tests and tools.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub notifications: Vec<Notification>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

impl PresentationSink for RecordingSink {
    fn notify(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }
}
