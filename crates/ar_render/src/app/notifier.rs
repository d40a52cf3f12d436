//! User-facing status and error messages

/// Surface for short user-facing messages
///
/// The frame renderer calls [`show_message`](Self::show_message) or
/// [`hide`](Self::hide) every tick, so implementations should treat repeats
/// of the current message as no-ops.
pub trait UserNotifier {
    /// Show an informational status message
    fn show_message(&mut self, message: &str);

    /// Show an error message
    fn show_error(&mut self, message: &str);

    /// Hide the current message
    fn hide(&mut self);

    /// Ask whether depth-based occlusion should be enabled; `true` accepts
    fn offer_depth_occlusion(&mut self) -> bool {
        false
    }
}

/// Notifier that writes messages to the log
#[derive(Debug, Default)]
pub struct LogNotifier {
    current: Option<String>,
    accept_depth_occlusion: bool,
}

impl LogNotifier {
    /// Create a notifier answering the depth prompt with `accept_depth_occlusion`
    pub fn new(accept_depth_occlusion: bool) -> Self {
        Self { current: None, accept_depth_occlusion }
    }

    /// Message currently shown
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

impl UserNotifier for LogNotifier {
    fn show_message(&mut self, message: &str) {
        if self.current.as_deref() != Some(message) {
            log::info!("{}", message);
            self.current = Some(message.to_string());
        }
    }

    fn show_error(&mut self, message: &str) {
        log::error!("{}", message);
        self.current = Some(message.to_string());
    }

    fn hide(&mut self) {
        if self.current.take().is_some() {
            log::debug!("Message hidden");
        }
    }

    fn offer_depth_occlusion(&mut self) -> bool {
        log::info!(
            "This device supports depth-based occlusion: {}",
            if self.accept_depth_occlusion { "enabled" } else { "declined" }
        );
        self.accept_depth_occlusion
    }
}

/// One notifier call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierEvent {
    /// `show_message`
    Message(String),
    /// `show_error`
    Error(String),
    /// `hide`
    Hide,
    /// `offer_depth_occlusion`
    DepthOffered,
}

/// Notifier that records every call, for embedding hosts and tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    /// Calls in order
    pub events: Vec<NotifierEvent>,
    /// Answer to the depth prompt
    pub accept_depth_occlusion: bool,
}

impl RecordingNotifier {
    /// Last message or error shown, `None` after a hide
    pub fn visible(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match e {
            NotifierEvent::Message(m) | NotifierEvent::Error(m) => Some(Some(m.as_str())),
            NotifierEvent::Hide => Some(None),
            NotifierEvent::DepthOffered => None,
        })?
    }

    /// Errors shown so far
    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                NotifierEvent::Error(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl UserNotifier for RecordingNotifier {
    fn show_message(&mut self, message: &str) {
        self.events.push(NotifierEvent::Message(message.to_string()));
    }

    fn show_error(&mut self, message: &str) {
        self.events.push(NotifierEvent::Error(message.to_string()));
    }

    fn hide(&mut self) {
        self.events.push(NotifierEvent::Hide);
    }

    fn offer_depth_occlusion(&mut self) -> bool {
        self.events.push(NotifierEvent::DepthOffered);
        self.accept_depth_occlusion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_notifier_tracks_the_visible_message() {
        let mut notifier = LogNotifier::default();
        notifier.show_message("Searching for surfaces...");
        notifier.show_message("Searching for surfaces...");
        assert_eq!(notifier.current(), Some("Searching for surfaces..."));
        notifier.hide();
        assert_eq!(notifier.current(), None);
        assert!(!notifier.offer_depth_occlusion());
    }

    #[test]
    fn recording_notifier_reports_visibility() {
        let mut notifier = RecordingNotifier::default();
        assert_eq!(notifier.visible(), None);
        notifier.show_error("boom");
        notifier.offer_depth_occlusion();
        assert_eq!(notifier.visible(), Some("boom"));
        notifier.hide();
        assert_eq!(notifier.visible(), None);
        assert_eq!(notifier.errors(), vec!["boom"]);
    }
}
