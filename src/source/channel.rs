//! Channel-based line source.
//!
//! Receives rows via a tokio mpsc channel. This is useful when the producer
//! runs in the same process (or in tests) and rows are pushed rather than
//! appended to a file.

use tokio::sync::mpsc;

use super::LineSource;
use crate::error::EngineError;

/// A line source fed through an unbounded channel.
///
/// Each message is one complete row. Once every sender is dropped and the
/// queue is drained, polling returns [`EngineError::Closed`].
///
/// # Example
///
/// ```
/// use latency_watch::{ChannelLines, LineSource};
///
/// let (tx, mut source) = ChannelLines::create("in-process producer");
/// tx.send("1700000000,1700000005.020".to_string()).unwrap();
/// assert_eq!(source.poll_lines().unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct ChannelLines {
    receiver: mpsc::UnboundedReceiver<String>,
    description: String,
    header: Option<String>,
}

impl ChannelLines {
    /// Create a new channel source.
    ///
    /// # Arguments
    ///
    /// * `receiver` - The receiving end of an unbounded channel
    /// * `source_description` - Where the rows come from (e.g. "ib:SPY")
    pub fn new(receiver: mpsc::UnboundedReceiver<String>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
            header: None,
        }
    }

    /// Create a sender/source pair.
    pub fn create(source_description: &str) -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx, source_description))
    }

    /// Declare the column layout the producer writes.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

impl LineSource for ChannelLines {
    fn poll_lines(&mut self) -> Result<Vec<String>, EngineError> {
        let mut lines = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(line) => {
                    let line = line.trim_end_matches(['\r', '\n']);
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if lines.is_empty() {
                        return Err(EngineError::Closed);
                    }
                    break;
                }
            }
        }
        Ok(lines)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_drains_everything_queued() {
        let (tx, mut source) = ChannelLines::create("test");
        assert!(source.poll_lines().unwrap().is_empty());

        tx.send("1,2".to_string()).unwrap();
        tx.send("3,4\n".to_string()).unwrap();
        tx.send(String::new()).unwrap();
        assert_eq!(source.poll_lines().unwrap(), vec!["1,2", "3,4"]);
        assert!(source.poll_lines().unwrap().is_empty());
    }

    #[test]
    fn test_channel_closed_after_drain() {
        let (tx, mut source) = ChannelLines::create("test");
        tx.send("1,2".to_string()).unwrap();
        drop(tx);

        assert_eq!(source.poll_lines().unwrap(), vec!["1,2"]);
        assert!(matches!(source.poll_lines(), Err(EngineError::Closed)));
    }

    #[test]
    fn test_channel_description_and_header() {
        let (_tx, source) = ChannelLines::create("ib:SPY");
        let source = source.with_header("timestamp,ts_recv");
        assert_eq!(source.description(), "channel: ib:SPY");
        assert_eq!(source.header(), Some("timestamp,ts_recv"));
    }
}
