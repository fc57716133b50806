// ABOUTME: Reassembly of concatenated SMS fragments into complete messages
// ABOUTME: Wraps the event reader, keys partial messages by reference and evicts stale groups

use crate::at::{AtResult, ListedMessage, Response};
use crate::datatypes::{MessageStatus, Sms};
use crate::reader::{EventReader, LineSource};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A complete message, ready for the relay
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub date: DateTime<FixedOffset>,
    pub content: String,
}

impl Message {
    fn from_sms(sms: &Sms, content: String) -> Self {
        Message {
            from: sms.originating_address.to_string(),
            date: sms.service_centre_timestamp,
            content,
        }
    }
}

/// Renders the relay block: sender and date emphasised, then the text
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "*{}*\n*{}*\n{}",
            self.from,
            self.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.content
        )
    }
}

/// Events after reassembly; listings are replaced by complete messages
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    IncomingNotice {
        storage: Option<String>,
        index: Option<u32>,
    },
    Message(Message),
    Ok,
    Error(String),
}

/// Configuration for the reassembly engine
///
/// # Example
///
/// ```rust
/// use sms_bridge::reassembly::ReassemblyConfig;
/// use std::time::Duration;
///
/// let config = ReassemblyConfig::default().with_eviction_window(Duration::from_secs(120));
/// assert_eq!(config.eviction_window, Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct ReassemblyConfig {
    /// How long a partial message may wait for its missing fragments
    /// before it is flushed with what has arrived (default: 60 seconds)
    pub eviction_window: Duration,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            eviction_window: Duration::from_secs(60),
        }
    }
}

impl ReassemblyConfig {
    pub fn with_eviction_window(mut self, eviction_window: Duration) -> Self {
        self.eviction_window = eviction_window;
        self
    }
}

/// Fragments received so far for one concatenation reference
#[derive(Debug)]
struct PendingGroup {
    created_at: Instant,
    /// One slot per fragment; the length never changes
    slots: Vec<Option<Sms>>,
    /// Slot of the most recently stored fragment
    last_arrived: Option<usize>,
}

impl PendingGroup {
    fn new(total: u8, now: Instant) -> Self {
        Self {
            created_at: now,
            slots: vec![None; total as usize],
            last_arrived: None,
        }
    }

    fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Join the fragments present in slot order; `None` for an empty group
    fn into_message(self) -> Option<Message> {
        let last = self.slots.get(self.last_arrived?)?.as_ref()?;
        let content: String = self.slots.iter().flatten().map(|sms| sms.text.as_str()).collect();
        Some(Message::from_sms(last, content))
    }
}

/// Reassembly engine on top of an [`EventReader`]
///
/// Single-part messages pass straight through. Fragments are parked by
/// reference until every index has arrived. Two unrelated messages that
/// reuse a reference before either completes are not told apart.
#[derive(Debug)]
pub struct Reassembler<L> {
    reader: EventReader<L>,
    pending: HashMap<u8, PendingGroup>,
    config: ReassemblyConfig,
}

impl<L: LineSource> Reassembler<L> {
    pub fn new(reader: EventReader<L>) -> Self {
        Self::with_config(reader, ReassemblyConfig::default())
    }

    pub fn with_config(reader: EventReader<L>, config: ReassemblyConfig) -> Self {
        Self {
            reader,
            pending: HashMap::new(),
            config,
        }
    }

    /// Read the next event, swallowing listings that do not complete a message
    pub async fn next(&mut self) -> AtResult<Option<Event>> {
        loop {
            let Some(response) = self.reader.next().await? else {
                return Ok(None);
            };

            let event = match response {
                Response::IncomingNotice { storage, index } => {
                    Event::IncomingNotice { storage, index }
                }
                Response::Ok => Event::Ok,
                Response::Error(line) => Event::Error(line),
                Response::Listed { record, sms } => {
                    match self.accept_at(&record, sms, Instant::now()) {
                        Some(message) => Event::Message(message),
                        None => continue,
                    }
                }
            };
            return Ok(Some(event));
        }
    }

    /// Feed one listed message, returning a message if it completes one
    pub fn accept(&mut self, record: &ListedMessage, sms: Sms) -> Option<Message> {
        self.accept_at(record, sms, Instant::now())
    }

    pub fn accept_at(&mut self, record: &ListedMessage, sms: Sms, now: Instant) -> Option<Message> {
        if record.status != MessageStatus::ReceivedUnread {
            debug!("skipping message {} with status {:?}", record.index, record.status);
            return None;
        }

        let Some(concat) = sms.concatenation() else {
            let content = sms.text.clone();
            return Some(Message::from_sms(&sms, content));
        };

        if concat.index == 0 || concat.index > concat.total {
            warn!(
                "dropping fragment {}/{} of reference {}: index out of range",
                concat.index, concat.total, concat.reference
            );
            return None;
        }

        let group = self
            .pending
            .entry(concat.reference)
            .or_insert_with(|| PendingGroup::new(concat.total, now));

        if group.slots.len() != concat.total as usize {
            warn!(
                "dropping fragment {}/{} of reference {}: pending message has {} parts",
                concat.index,
                concat.total,
                concat.reference,
                group.slots.len()
            );
            return None;
        }

        let slot = (concat.index - 1) as usize;
        group.slots[slot] = Some(sms);
        group.last_arrived = Some(slot);

        if !group.is_complete() {
            debug!(
                "stored fragment {}/{} of reference {}",
                concat.index, concat.total, concat.reference
            );
            return None;
        }

        self.pending
            .remove(&concat.reference)
            .and_then(PendingGroup::into_message)
    }

    /// Flush partial messages older than the eviction window
    pub fn evict_expired(&mut self) -> Vec<Message> {
        self.evict_expired_at(Instant::now())
    }

    /// Flush partial messages that are at least `eviction_window` old at `now`
    ///
    /// Whatever fragments arrived are joined in slot order, oldest group
    /// first. Groups without fragments are dropped silently.
    pub fn evict_expired_at(&mut self, now: Instant) -> Vec<Message> {
        let window = self.config.eviction_window;
        let mut expired: Vec<(Instant, u8)> = self
            .pending
            .iter()
            .filter(|(_, group)| now.saturating_duration_since(group.created_at) >= window)
            .map(|(&reference, group)| (group.created_at, reference))
            .collect();
        expired.sort_unstable();

        expired
            .into_iter()
            .filter_map(|(_, reference)| {
                let group = self.pending.remove(&reference)?;
                let received = group.slots.iter().flatten().count();
                if received > 0 {
                    warn!(
                        "flushing reference {} with {} of {} parts",
                        reference,
                        received,
                        group.slots.len()
                    );
                }
                group.into_message()
            })
            .collect()
    }

    /// Number of partial messages waiting for fragments
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &ReassemblyConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &EventReader<L> {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut EventReader<L> {
        &mut self.reader
    }
}
