/// Operator-facing progress messages for a job run.
///
/// The job never prints directly. The CLI hands in `StdoutProgress` and tests
/// record the messages instead.
pub trait ProgressReporter {
    fn message(&mut self, message: &str);
}

/// Prints each message on its own line on stdout.
pub struct StdoutProgress;

impl ProgressReporter for StdoutProgress {
    fn message(&mut self, message: &str) {
        println!("{}", message);
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub messages: Vec<String>,
}

#[cfg(test)]
impl RecordingProgress {
    /// Messages that begin with `prefix`, in the order they were reported
    pub fn starting_with(&self, prefix: &str) -> Vec<&str> {
        self.messages
            .iter()
            .map(String::as_str)
            .filter(|m| m.starts_with(prefix))
            .collect()
    }
}

#[cfg(test)]
impl ProgressReporter for RecordingProgress {
    fn message(&mut self, message: &str) {
        self.messages.push(message.to_owned());
    }
}
