//! Streaming body processing.
//!
//! The save pipeline writes a body into the store by pulling from a
//! [`TeeReader`]: every chunk the store consumes is simultaneously fanned
//! out over a bounded channel to a blocking worker task, which decodes
//! entries, validates them against the structure's schema in batches, and
//! accumulates the derived fields (length, entries, depth, error count)
//! plus a small buffered copy of the body for diffing. The worker reports
//! through a one-shot completion channel which the pipeline awaits before
//! writing the commit.
//!
//! Backpressure is end to end: the tee reserves a channel slot before
//! reading, so a slow validator bounds how far the store read can run
//! ahead. If the worker stops (strict validation failure, malformed row),
//! the channel closes and further tee reads fail, aborting the store write.

use crate::config::Config;
use crate::error::Error;
use crate::stats::StatsAccumulator;
use bytes::{Buf, Bytes};
use dataset::Structure;
use delta::BodyAction;
use rows::{value_depth, Entry, Format};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::PollSender;

/// Chunks in flight between the tee and the validation worker.
const CHANNEL_CAPACITY: usize = 8;

/// Everything the worker derived from one pass over the body.
#[derive(Debug)]
pub(crate) struct BodyOutcome {
    /// Total bytes read.
    pub length: u64,
    /// Top-level entries decoded.
    pub entries: u64,
    /// Max nesting depth of entry values, plus one for the container.
    pub depth: u32,
    /// Schema violations across all batches.
    pub err_count: u64,
    /// `Default`, or `TooBig` once the diff threshold was crossed.
    pub action: BodyAction,
    /// Decoded body, present while under the diff threshold.
    pub small_body: Option<Value>,
    /// Column-level summary document.
    pub stats: Option<Value>,
}

/// Handle on the worker's single-shot completion signal.
pub(crate) struct BodyProcessor {
    done: oneshot::Receiver<Result<BodyOutcome, Error>>,
}

impl BodyProcessor {
    /// Wrap `reader` for a save of `structure`. Returns the tee the
    /// pipeline should store, plus the completion handle.
    pub fn spawn(
        structure: &Structure,
        reader: Box<dyn AsyncRead + Send + Unpin>,
        config: &Config,
    ) -> Result<(TeeReader, BodyProcessor), Error> {
        let format: Format = structure.format.parse()?;
        let format_config = structure.format_config.clone();
        let schema = structure.schema.clone();
        let strict = structure.strict;
        let batch_size = config.batch_size.max(1);
        let small_limit = config.body_size_small_enough_to_diff;

        let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            let result = run_worker(rx, format, format_config, schema, strict, batch_size, small_limit);
            // The pipeline may have bailed without awaiting completion.
            let _ = done_tx.send(result);
        });

        Ok((
            TeeReader {
                inner: reader,
                tx: PollSender::new(tx),
                eof: false,
            },
            BodyProcessor { done: done_rx },
        ))
    }

    /// Await the worker's completion signal.
    pub async fn finish(self) -> Result<BodyOutcome, Error> {
        match self.done.await {
            Ok(result) => result,
            Err(_) => Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "body processor terminated unexpectedly",
            ))),
        }
    }
}

/// `AsyncRead` over the body which forwards every chunk it yields to the
/// validation worker.
pub(crate) struct TeeReader {
    inner: Box<dyn AsyncRead + Send + Unpin>,
    tx: PollSender<Bytes>,
    eof: bool,
}

impl AsyncRead for TeeReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.eof {
            return Poll::Ready(Ok(()));
        }

        // Reserve a worker slot before reading, so every byte handed to the
        // store is also deliverable to the worker.
        if ready!(this.tx.poll_reserve(cx)).is_err() {
            return Poll::Ready(Err(processor_stopped()));
        }

        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        let filled = &buf.filled()[before..];

        if filled.is_empty() {
            this.eof = true;
            this.tx.close();
            return Poll::Ready(Ok(()));
        }
        if this.tx.send_item(Bytes::copy_from_slice(filled)).is_err() {
            return Poll::Ready(Err(processor_stopped()));
        }
        Poll::Ready(Ok(()))
    }
}

fn processor_stopped() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "body processor stopped")
}

/// Whether a failed store write was caused by the worker bailing out, in
/// which case the worker's completion error is the real cause.
pub(crate) fn caused_by_processor(err: &store::StoreError) -> bool {
    matches!(err, store::StoreError::Io(io) if io.kind() == io::ErrorKind::BrokenPipe)
}

/// Blocking `Read` over the chunk channel, counting consumed bytes.
struct ChannelRead {
    rx: mpsc::Receiver<Bytes>,
    current: Bytes,
    count: Arc<AtomicU64>,
}

impl io::Read for ChannelRead {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(chunk) => self.current = chunk,
                None => return Ok(0),
            }
        }
        let n = self.current.len().min(buf.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Decoded entries assembled back into a body document: a sequence for
/// indexed rows, a mapping for keyed rows.
#[derive(Default)]
pub(crate) struct BodyBuffer {
    seq: Vec<Value>,
    map: serde_json::Map<String, Value>,
}

impl BodyBuffer {
    pub fn push(&mut self, entry: &Entry) {
        match &entry.key {
            Some(key) => {
                self.map.insert(key.clone(), entry.value.clone());
            }
            None => self.seq.push(entry.value.clone()),
        }
    }

    pub fn clear(&mut self) {
        self.seq.clear();
        self.map.clear();
    }

    pub fn into_value(self) -> Value {
        if !self.map.is_empty() {
            Value::Object(self.map)
        } else {
            Value::Array(self.seq)
        }
    }
}

fn run_worker(
    rx: mpsc::Receiver<Bytes>,
    format: Format,
    format_config: BTreeMap<String, Value>,
    schema: Option<Value>,
    strict: bool,
    batch_size: usize,
    small_limit: u64,
) -> Result<BodyOutcome, Error> {
    let count = Arc::new(AtomicU64::new(0));
    let channel = ChannelRead {
        rx,
        current: Bytes::new(),
        count: count.clone(),
    };

    let validator = schema
        .as_ref()
        .map(jsonschema::validator_for)
        .transpose()
        .map_err(|err| Error::Schema(err.to_string()))?;

    let mut reader = rows::reader_for(format, &format_config, Box::new(channel))?;

    let mut entries: u64 = 0;
    let mut max_depth: u32 = 0;
    let mut err_count: u64 = 0;
    let mut action = BodyAction::Default;
    let mut buffer = BodyBuffer::default();
    let mut stats = StatsAccumulator::default();
    let mut batch: Vec<Value> = Vec::with_capacity(batch_size.min(1024));

    let flush = |batch: &mut Vec<Value>, err_count: &mut u64| -> Result<(), Error> {
        if batch.is_empty() {
            return Ok(());
        }
        if let Some(validator) = &validator {
            let instance = Value::Array(std::mem::take(batch));
            let violations = validator.iter_errors(&instance).count() as u64;
            if violations > 0 {
                *err_count += violations;
                if strict {
                    return Err(Error::StrictValidationFailed { count: *err_count });
                }
            }
        } else {
            batch.clear();
        }
        Ok(())
    };

    while let Some(entry) = reader.next_entry()? {
        entries += 1;
        max_depth = max_depth.max(value_depth(&entry.value));
        stats.observe(&entry.value);

        if action == BodyAction::Default {
            buffer.push(&entry);
        }

        batch.push(entry.value);
        if batch.len() >= batch_size {
            flush(&mut batch, &mut err_count)?;
        }

        // The moment total bytes read exceed the threshold, the buffered
        // copy is dropped and the body is summarized by checksum instead.
        if action == BodyAction::Default && count.load(Ordering::Relaxed) > small_limit {
            action = BodyAction::TooBig;
            buffer.clear();
        }
    }
    flush(&mut batch, &mut err_count)?;

    let small_body = match action {
        BodyAction::Default => Some(buffer.into_value()),
        _ => None,
    };

    Ok(BodyOutcome {
        length: count.load(Ordering::Relaxed),
        entries,
        depth: max_depth + 1,
        err_count,
        action,
        small_body,
        stats: Some(stats.into_value()),
    })
}

/// Decode a fully buffered body into its document form, for diffing a
/// previous snapshot's body against the candidate's.
pub(crate) fn decode_body_value(
    format: Format,
    format_config: &BTreeMap<String, Value>,
    data: Vec<u8>,
) -> Result<Value, Error> {
    let mut reader = rows::reader_for(format, format_config, Box::new(io::Cursor::new(data)))?;
    let mut buffer = BodyBuffer::default();
    while let Some(entry) = reader.next_entry()? {
        buffer.push(&entry);
    }
    Ok(buffer.into_value())
}
