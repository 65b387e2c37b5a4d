//! In-flight QoS 1 publish tracking.
//!
//! Every QoS 1 publish stays in the [`Outbox`] from the moment it is sent
//! until its PUBACK arrives. Records that wait longer than the retry timeout
//! are handed back for retransmission with the DUP flag set; once the retry
//! budget is spent they are removed and reported as failed.
//!
//! The number of records is bounded by the smaller of the broker's receive
//! maximum and the outbox capacity `N`.

use super::OUTBOX_CAPACITY;
use super::error::Error;
use super::packet::Publish;
use super::time::{Duration, Instant};
use heapless::Vec;

/// A QoS 1 publish waiting for its PUBACK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// Packet id of the publish.
    pub packet_id: u16,
    /// The publish as last sent.
    pub publish: Publish,
    /// Retransmissions so far.
    pub retries: u8,
    /// When the record was tracked.
    pub enqueued_at: Instant,
    /// When the publish was last written.
    pub last_sent_at: Instant,
}

impl InFlight {
    /// Wrap a freshly sent publish. The publish must carry a packet id.
    pub fn new(publish: Publish, now: Instant) -> Result<Self, Error> {
        let packet_id = publish.packet_id.ok_or(Error::InvalidState)?;
        Ok(Self {
            packet_id,
            publish,
            retries: 0,
            enqueued_at: now,
            last_sent_at: now,
        })
    }
}

/// What [`Outbox::on_timeout_tick`] wants done with a timed-out record.
#[derive(Debug)]
pub enum Retry<'a> {
    /// Send this publish again. The DUP flag is already set.
    Resend(&'a Publish),
    /// The retry budget is spent; the record has been removed.
    Exhausted(InFlight),
}

/// Bounded store of in-flight QoS 1 publishes.
#[derive(Debug)]
pub struct Outbox<const N: usize = OUTBOX_CAPACITY> {
    records: Vec<InFlight, N>,
    limit: usize,
    retry_timeout: Duration,
    max_retries: u8,
}

impl<const N: usize> Outbox<N> {
    /// An empty outbox with the given retry policy.
    pub fn new(retry_timeout: Duration, max_retries: u8) -> Self {
        Self {
            records: Vec::new(),
            limit: N,
            retry_timeout,
            max_retries,
        }
    }

    /// Apply the broker's receive maximum. The effective bound never exceeds `N`.
    pub fn set_receive_maximum(&mut self, receive_maximum: u16) {
        self.limit = (receive_maximum as usize).clamp(1, N);
    }

    /// Current bound on in-flight records.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `true` if another record would exceed the bound.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.limit
    }

    /// `true` if `packet_id` is in flight.
    pub fn contains(&self, packet_id: u16) -> bool {
        self.records.iter().any(|r| r.packet_id == packet_id)
    }

    /// In-flight records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &InFlight> {
        self.records.iter()
    }

    /// Start tracking a record.
    ///
    /// Fails with [`Error::OutboxFull`] at the bound and with
    /// [`Error::InvalidState`] if the packet id is already in flight.
    pub fn track(&mut self, record: InFlight) -> Result<(), Error> {
        if self.is_full() {
            return Err(Error::OutboxFull);
        }
        if self.contains(record.packet_id) {
            return Err(Error::InvalidState);
        }
        self.records.push(record).map_err(|_| Error::OutboxFull)
    }

    /// Remove and return the record for `packet_id`, if any.
    pub fn acknowledge(&mut self, packet_id: u16) -> Option<InFlight> {
        let index = self.records.iter().position(|r| r.packet_id == packet_id)?;
        Some(self.records.remove(index))
    }

    /// Find records whose last send is at least one retry timeout old.
    ///
    /// Each is either offered for resending (`Retry::Resend`, with DUP set)
    /// or, once `max_retries` resends have happened, removed and passed on
    /// as `Retry::Exhausted`. `f` returns whether the resend was queued; the
    /// retry count and send time only advance when it was.
    pub fn on_timeout_tick(&mut self, now: Instant, mut f: impl FnMut(Retry<'_>) -> bool) {
        let mut i = 0;
        while i < self.records.len() {
            let record = &mut self.records[i];
            if now.duration_since(record.last_sent_at) < self.retry_timeout {
                i += 1;
                continue;
            }
            if record.retries >= self.max_retries {
                f(Retry::Exhausted(self.records.remove(i)));
                continue;
            }
            record.publish.dup = true;
            if f(Retry::Resend(&record.publish)) {
                record.retries += 1;
                record.last_sent_at = now;
            }
            i += 1;
        }
    }

    /// Remove every record, handing each to `f` together with `reason`.
    pub fn flush_all(&mut self, reason: Error, mut f: impl FnMut(InFlight, Error)) {
        let records = core::mem::take(&mut self.records);
        for record in records {
            f(record, reason);
        }
    }

    /// Earliest instant at which a record times out.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.records
            .iter()
            .map(|r| r.last_sent_at + self.retry_timeout)
            .min()
    }
}
