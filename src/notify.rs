use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use strum::Display;

/// Toasts kept when nobody drains; older ones are dropped first.
pub const DEFAULT_BACKLOG: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Error,
}

/// Transient message for the host's toast area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Cloneable sending half; the UI drains the paired receiver.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Sender<Notification>,
    rx: Receiver<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_backlog(DEFAULT_BACKLOG)
    }

    pub fn with_backlog(backlog: usize) -> Self {
        let (tx, rx) = bounded(backlog.max(1));
        Self { tx, rx }
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.rx.clone()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(Level::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(Level::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Level::Error, message.into());
    }

    /// Everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.rx.try_iter().collect()
    }

    fn send(&self, level: Level, message: String) {
        let mut pending = Notification { level, message };
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.rx.try_recv();
                    pending = back;
                }
                // the notifier owns a receiver, so this never happens
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_messages_in_order() {
        let notifier = Notifier::new();
        notifier.info("loading");
        notifier.error("failed");
        let drained = notifier.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, Level::Info);
        assert_eq!(drained[1].message, "failed");
        assert!(notifier.drain().is_empty());
    }

    #[test]
    fn undrained_backlog_keeps_the_newest() {
        let notifier = Notifier::with_backlog(3);
        for n in 0..10 {
            notifier.info(format!("toast {n}"));
        }
        let messages: Vec<_> = notifier
            .drain()
            .into_iter()
            .map(|notice| notice.message)
            .collect();
        assert_eq!(messages, vec!["toast 7", "toast 8", "toast 9"]);
    }
}
