use std::fmt;

/// A status line emitted by a worker. `worker` is the thread token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Entered { worker: usize },
    Retrying { worker: usize },
    Failed { worker: usize, message: String },
    Exiting { worker: usize },
}

impl Event {
    pub fn worker(&self) -> usize {
        match self {
            Event::Entered { worker }
            | Event::Retrying { worker }
            | Event::Failed { worker, .. }
            | Event::Exiting { worker } => *worker,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Entered { worker } => {
                write!(f, "Thread [{}] has entered the Monitor.", worker)
            }
            Event::Retrying { worker } => write!(
                f,
                "Thread [{}] unable to enter Monitor. Trying again after 1 second.",
                worker
            ),
            Event::Failed { worker, message } => {
                write!(f, "Exception on Thread [{}] : [{}].", worker, message)
            }
            Event::Exiting { worker } => write!(f, "Exiting Thread [{}].", worker),
        }
    }
}

pub trait Reporter: Send + Sync {
    fn report(&self, event: Event);
}

/// Writes every event as one line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, event: Event) {
        println!("{}", event);
    }
}

/// Keeps every event in memory, in report order.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: std::sync::Mutex<Vec<Event>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, worker: usize) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| event.worker() == worker)
            .collect()
    }
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn report(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}
