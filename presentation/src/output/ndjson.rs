//! Newline-delimited JSON event output
//!
//! `council ask` prints every [`DeliberationEvent`] as one JSON object per
//! line on stdout, flushing after each so consumers can follow the run live.

use council_domain::DeliberationEvent;
use std::io::{self, Write};
use tokio::sync::mpsc;

pub struct NdjsonWriter<W: Write> {
    out: W,
    /// Suppress `stage_token` / `stage_thinking` deltas
    skip_deltas: bool,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            skip_deltas: false,
        }
    }

    pub fn without_deltas(mut self) -> Self {
        self.skip_deltas = true;
        self
    }

    pub fn write_event(&mut self, event: &DeliberationEvent) -> io::Result<()> {
        if self.skip_deltas && event.is_delta() {
            return Ok(());
        }
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    /// Write events until the sender side closes. Returns whether `done` was seen.
    pub async fn drain(&mut self, mut events: mpsc::Receiver<DeliberationEvent>) -> io::Result<bool> {
        let mut done = false;
        while let Some(event) = events.recv().await {
            done |= event.is_done();
            self.write_event(&event)?;
        }
        Ok(done)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
