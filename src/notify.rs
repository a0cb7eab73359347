//! Side-channel announcements. The original web client spoke detected
//! colors out loud via speech synthesis; here it is an optional
//! collaborator the pages may call but never depend on for correctness.

pub trait Notifier {
    fn announce(&self, message: &str);

    /// Cancel any announcement in progress. No-op by default.
    fn hush(&self) {}
}

/// Default sink: announcements go to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn announce(&self, message: &str) {
        log::info!("announce: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        messages: RefCell<Vec<String>>,
    }

    impl Notifier for Recorder {
        fn announce(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_owned());
        }
    }

    #[test]
    fn notifier_is_swappable() {
        let recorder = Recorder::default();
        let notifier: &dyn Notifier = &recorder;
        notifier.announce("The color is red.");
        notifier.hush();
        assert_eq!(recorder.messages.borrow().as_slice(), ["The color is red."]);
    }
}
