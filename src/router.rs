//! Data Router (spec.md §4.2): a single worker thread draining one blocking
//! queue of raw frames, running them through the parser, and dispatching
//! decoded events to the right symbol's book.
//!
//! Grounded in `original_source/src/DataRouter.cpp`'s single-thread,
//! single-queue worker with an owned residual buffer, rendered with
//! `crossbeam::channel` + `std::thread` the way `book.rs`'s processing loop
//! is.

use crate::orderbook::manager::BookManager;
use crate::parser::{FeedKind, FrameParser};

use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

const QUEUE_CAPACITY: usize = 4_096;

struct RawFrame {
    feed: FeedKind,
    text: String,
}

/// Owns the router's inbound queue and worker thread. Feed adapters push
/// raw text chunks; the worker parses and routes them to `BookManager`.
pub struct DataRouter {
    tx: Option<Sender<RawFrame>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DataRouter {
    pub fn spawn(manager: Arc<Mutex<BookManager>>) -> Self {
        let (tx, rx) = bounded(QUEUE_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("data-router".to_string())
                .spawn(move || run(rx, manager, running))
                .expect("failed to spawn router worker thread")
        };

        Self {
            tx: Some(tx),
            running,
            worker: Some(worker),
        }
    }

    /// Feed adapters call this with a raw chunk of text from their socket.
    /// Returns `false` if the router has been shut down.
    pub fn push_frame(&self, feed: FeedKind, text: String) -> bool {
        match &self.tx {
            Some(tx) => tx.send(RawFrame { feed, text }).is_ok(),
            None => false,
        }
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        self.tx = None;
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DataRouter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(rx: Receiver<RawFrame>, manager: Arc<Mutex<BookManager>>, running: Arc<AtomicBool>) {
    let mut order_parser = FrameParser::new();
    let mut trade_parser = FrameParser::new();

    loop {
        if !running.load(Ordering::Acquire) {
            return;
        }
        let frame = match rx.recv() {
            Ok(frame) => frame,
            Err(_) => return,
        };

        let parser = match frame.feed {
            FeedKind::Order => &mut order_parser,
            FeedKind::Trade => &mut trade_parser,
        };
        let events = parser.feed(&frame.text, frame.feed);

        let manager = manager.lock().expect("book manager lock poisoned");
        for event in events {
            manager.push_live(event);
        }
    }
}
