//! Host lifecycle abstraction.
//!
//! The engine never talks to an application framework directly; the host
//! forwards its own focus/pause/terminate callbacks as `LifecycleEvent`s.

/// Transitions on which dirty state is flushed to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    FocusLost,
    Paused,
    Terminating,
}

/// Receiver of host lifecycle transitions. `FocusLost` and `Paused` both
/// route to `on_background`; `Terminating` routes to `on_terminate`.
pub trait LifecycleObserver {
    fn on_background(&mut self);
    fn on_terminate(&mut self);

    fn notify(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::FocusLost | LifecycleEvent::Paused => self.on_background(),
            LifecycleEvent::Terminating => self.on_terminate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        background: usize,
        terminate: usize,
    }

    impl LifecycleObserver for Recorder {
        fn on_background(&mut self) {
            self.background += 1;
        }
        fn on_terminate(&mut self) {
            self.terminate += 1;
        }
    }

    #[test]
    fn test_event_routing() {
        let mut r = Recorder::default();
        r.notify(LifecycleEvent::FocusLost);
        r.notify(LifecycleEvent::Paused);
        r.notify(LifecycleEvent::Terminating);
        assert_eq!(r.background, 2);
        assert_eq!(r.terminate, 1);
    }
}
