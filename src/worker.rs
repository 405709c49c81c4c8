use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    thread,
};

use crate::{
    config::Timing,
    error::{Error, Result},
    events::{Event, Reporter},
    monitor::{thread_token, Monitor, MonitorGuard},
};

/// What a worker did, handed back to whoever joins its thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub worker: usize,
    pub acquired: bool,
    pub retries: u32,
    pub failure: Option<String>,
}

/// Default guarded work: sit in the monitor for the hold interval.
pub fn hold(timing: &Timing) -> Result<()> {
    thread::sleep(timing.hold);
    Ok(())
}

/// Polls `monitor` until it gets in, runs `work` while holding it, then
/// reports `Exiting` and releases. Must be called on the worker's own thread.
///
/// Neither an error returned by `work` nor a panic inside the loop escapes:
/// both are reported as `Failed`. The monitor is released exactly once if it
/// was entered, and never otherwise.
pub fn run<R, F>(monitor: &Monitor, reporter: &R, timing: Timing, work: F) -> Outcome
where
    R: Reporter + ?Sized,
    F: FnOnce(&Timing) -> Result<()>,
{
    let worker = thread_token();
    let mut entered: Option<MonitorGuard<'_>> = None;
    let mut retries: u32 = 0;

    let attempt = panic::catch_unwind(AssertUnwindSafe(|| loop {
        if let Some(guard) = monitor.try_lock() {
            entered = Some(guard);
            reporter.report(Event::Entered { worker });
            return work(&timing);
        }
        reporter.report(Event::Retrying { worker });
        retries = retries.saturating_add(1);
        thread::sleep(timing.retry);
    }));

    let failure = match attempt {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err),
        Err(payload) => Some(Error::Panicked(panic_message(&*payload))),
    }
    .map(|err| {
        let message = err.to_string();
        tracing::warn!(worker, %message, "guarded work failed");
        reporter.report(Event::Failed {
            worker,
            message: message.clone(),
        });
        message
    });

    reporter.report(Event::Exiting { worker });
    let acquired = entered.is_some();
    drop(entered);

    Outcome {
        worker,
        acquired,
        retries,
        failure,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, time::Duration};

    use super::*;
    use crate::events::RecordingReporter;

    fn quick() -> Timing {
        Timing {
            hold: Duration::from_millis(20),
            retry: Duration::from_millis(5),
        }
    }

    struct PollPanicReporter(RecordingReporter);

    impl Reporter for PollPanicReporter {
        fn report(&self, event: Event) {
            if let Event::Retrying { .. } = event {
                panic!("reporter broke while polling");
            }
            self.0.report(event);
        }
    }

    fn other_thread_can_enter(monitor: &Monitor) -> bool {
        thread::scope(|s| {
            s.spawn(|| {
                let entered = monitor.try_acquire();
                if entered {
                    monitor.release().unwrap();
                }
                entered
            })
            .join()
            .unwrap()
        })
    }

    #[test]
    fn test_uncontended_worker() {
        let monitor = Monitor::new();
        let reporter = RecordingReporter::default();

        let outcome = run(&monitor, &reporter, quick(), hold);

        let worker = thread_token();
        assert_eq!(
            outcome,
            Outcome {
                worker,
                acquired: true,
                retries: 0,
                failure: None,
            }
        );
        assert_eq!(
            reporter.events(),
            vec![Event::Entered { worker }, Event::Exiting { worker }]
        );
        assert!(!monitor.is_locked());
    }

    #[test]
    fn test_worker_retries_until_monitor_is_free() {
        let monitor = Monitor::new();
        let reporter = RecordingReporter::default();
        let (tx, rx) = mpsc::channel();

        let outcome = thread::scope(|s| {
            s.spawn(|| {
                assert!(monitor.try_acquire());
                tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(40));
                monitor.release().unwrap();
            });
            rx.recv().unwrap();
            run(&monitor, &reporter, quick(), hold)
        });

        assert!(outcome.acquired);
        assert!(outcome.retries >= 1);
        let events = reporter.events();
        let (polls, last_two) = events.split_at(events.len() - 2);
        assert_eq!(polls.len(), outcome.retries as usize);
        assert!(polls
            .iter()
            .all(|event| matches!(event, Event::Retrying { .. })));
        assert_eq!(
            last_two,
            [
                Event::Entered {
                    worker: outcome.worker
                },
                Event::Exiting {
                    worker: outcome.worker
                }
            ]
        );
        assert!(!monitor.is_locked());
    }

    #[test]
    fn test_failed_work_still_releases() {
        let monitor = Monitor::new();
        let reporter = RecordingReporter::default();

        let outcome = run(&monitor, &reporter, quick(), |_| {
            Err(Error::Work("disk on fire".to_string()))
        });

        let worker = outcome.worker;
        assert!(outcome.acquired);
        assert_eq!(outcome.failure.as_deref(), Some("disk on fire"));
        assert_eq!(
            reporter.events(),
            vec![
                Event::Entered { worker },
                Event::Failed {
                    worker,
                    message: "disk on fire".to_string()
                },
                Event::Exiting { worker },
            ]
        );
        assert!(other_thread_can_enter(&monitor));
    }

    #[test]
    fn test_panicking_work_still_releases() {
        let monitor = Monitor::new();
        let reporter = RecordingReporter::default();

        let outcome = run(&monitor, &reporter, quick(), |_| panic!("kaboom"));

        let worker = outcome.worker;
        assert!(outcome.acquired);
        assert_eq!(outcome.failure.as_deref(), Some("kaboom"));
        assert_eq!(
            reporter.events_for(worker).last(),
            Some(&Event::Exiting { worker })
        );
        assert!(other_thread_can_enter(&monitor));
    }

    #[test]
    fn test_reentry_inside_guarded_work() {
        let monitor = Monitor::new();
        let reporter = RecordingReporter::default();

        let outcome = run(&monitor, &reporter, quick(), |_| {
            assert!(monitor.try_acquire());
            assert_eq!(monitor.depth(), 2);
            monitor.release()
        });

        assert!(outcome.acquired);
        assert_eq!(outcome.failure, None);
        assert!(!monitor.is_locked());
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&42), "unknown panic");
    }

    #[test]
    fn test_worker_that_never_entered_never_releases() {
        let monitor = Monitor::new();
        let reporter = PollPanicReporter(RecordingReporter::default());
        assert!(monitor.try_acquire());

        let outcome = thread::scope(|s| {
            s.spawn(|| run(&monitor, &reporter, quick(), hold))
                .join()
                .unwrap()
        });

        let worker = outcome.worker;
        assert_ne!(worker, thread_token());
        assert!(!outcome.acquired);
        assert_eq!(outcome.retries, 0);
        assert_eq!(
            reporter.0.events(),
            vec![
                Event::Failed {
                    worker,
                    message: "reporter broke while polling".to_string()
                },
                Event::Exiting { worker },
            ]
        );
        // still held once by this thread, nothing was released on its behalf
        assert_eq!(monitor.depth(), 1);
        monitor.release().unwrap();
        assert!(!monitor.is_locked());
    }
}
