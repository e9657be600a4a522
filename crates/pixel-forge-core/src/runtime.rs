use crate::config::PipelineConfig;
use crate::error::{PixelForgeError, Result};
use crate::overlay::ManualEdits;
use crate::pipeline::{PixelOutput, pixelate_cancellable};
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::debug;

/// Handle for one requested pipeline run.
///
/// Tickets are numbered in request order. Starting a newer run cancels every
/// older outstanding ticket.
#[derive(Debug, Clone)]
pub struct RunTicket {
    seq: u64,
    cancel: Arc<AtomicBool>,
}

impl RunTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

/// Output accepted by [`PixelSession::publish`].
#[derive(Debug, Clone)]
pub struct Published {
    pub seq: u64,
    pub output: Arc<PixelOutput>,
}

/// Interactive pipeline state for one source image: the source, its manual
/// edits and last-request-wins run coordination.
///
/// All methods take `&self`; a session can be shared across worker threads.
pub struct PixelSession {
    source: RwLock<Option<Arc<RgbaImage>>>,
    edits: RwLock<ManualEdits>,
    next_seq: AtomicU64,
    outstanding: Mutex<Vec<RunTicket>>,
    published: Mutex<Option<Published>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Default for PixelSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelSession {
    pub fn new() -> Self {
        Self {
            source: RwLock::new(None),
            edits: RwLock::new(ManualEdits::new()),
            next_seq: AtomicU64::new(0),
            outstanding: Mutex::new(Vec::new()),
            published: Mutex::new(None),
        }
    }

    /// Replace the source image. Clears manual edits and cancels pending runs.
    pub fn load_source(&self, img: RgbaImage) {
        // Held across the swap so runs and publishes see old or new state, never a mix.
        let mut pending = lock(&self.outstanding);
        *self.source.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(img));
        self.clear_edits();
        for t in pending.drain(..) {
            t.cancel.store(true, Ordering::Release);
        }
    }

    pub fn source(&self) -> Option<Arc<RgbaImage>> {
        self.source
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn paint(&self, x: u32, y: u32, color: Rgba<u8>) {
        self.edits
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .paint(x, y, color);
    }

    pub fn erase(&self, x: u32, y: u32) -> bool {
        self.edits
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .erase(x, y)
    }

    pub fn clear_edits(&self) {
        self.edits
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Snapshot of the current manual edits.
    pub fn edits(&self) -> ManualEdits {
        self.edits
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Register a new run request; every older outstanding run is cancelled.
    pub fn begin_run(&self) -> RunTicket {
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let ticket = RunTicket {
            seq,
            cancel: Arc::new(AtomicBool::new(false)),
        };
        let mut pending = lock(&self.outstanding);
        for t in pending.drain(..) {
            t.cancel.store(true, Ordering::Release);
        }
        pending.push(ticket.clone());
        ticket
    }

    /// Execute the pipeline for `ticket` against the current source and edits.
    pub fn run(&self, ticket: &RunTicket, cfg: &PipelineConfig) -> Result<PixelOutput> {
        let (source, edits) = {
            let _pending = lock(&self.outstanding);
            if ticket.is_cancelled() {
                return Err(PixelForgeError::Cancelled);
            }
            let source = self
                .source()
                .ok_or_else(|| PixelForgeError::InvalidInput("no source image loaded".into()))?;
            (source, self.edits())
        };
        pixelate_cancellable(&source, cfg, &edits, &ticket.cancel)
    }

    /// Store `output` unless its ticket was cancelled or a newer request has
    /// already been published. Returns whether the output was accepted.
    pub fn publish(&self, ticket: &RunTicket, output: PixelOutput) -> bool {
        let mut pending = lock(&self.outstanding);
        pending.retain(|t| t.seq != ticket.seq);
        if ticket.is_cancelled() {
            debug!(seq = ticket.seq, "discarding output of cancelled run");
            return false;
        }
        let mut slot = lock(&self.published);
        if let Some(p) = slot.as_ref() {
            if p.seq >= ticket.seq {
                debug!(seq = ticket.seq, latest = p.seq, "discarding stale output");
                return false;
            }
        }
        *slot = Some(Published {
            seq: ticket.seq,
            output: Arc::new(output),
        });
        true
    }

    /// Begin, run and publish in one call. `Ok(None)` means the result was
    /// superseded before it could be published.
    pub fn submit(&self, cfg: &PipelineConfig) -> Result<Option<Published>> {
        let ticket = self.begin_run();
        match self.run(&ticket, cfg) {
            Ok(out) => {
                if self.publish(&ticket, out) {
                    Ok(self.latest())
                } else {
                    Ok(None)
                }
            }
            Err(e) => {
                lock(&self.outstanding).retain(|t| t.seq != ticket.seq);
                match e {
                    PixelForgeError::Cancelled => Ok(None),
                    e => Err(e),
                }
            }
        }
    }

    /// The most recently published output.
    pub fn latest(&self) -> Option<Published> {
        lock(&self.published).clone()
    }
}
