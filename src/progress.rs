//! Progress bars (§10.5, carried from the teacher's `engine::progress`): a `kdam` bar behind
//! an `Arc<Mutex<_>>`, updated with `try_lock` so a contended bar never stalls a hashing
//! worker, plus a batched-counter helper for high-frequency callers like the hashing pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use kdam::{Bar, BarExt};

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a bar with a known total (e.g. file count from a completed walk).
pub fn create_progress_bar(total: usize, desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(total = total, desc = desc)))
}

/// Create a counter-style bar for an unknown total (shows a running count, no percentage).
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(total = 0, desc = desc, unit = " files")))
}

pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.update(n);
    }
}

pub fn set_bar_total(pb: &ProgressBar, total: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        bar.total = total;
        let _ = bar.refresh();
    }
}

/// Build an `on_progress` closure suitable for [`crate::pipeline::fill_hashes`]: batches
/// updates every `chunk_size` completions so parallel workers rarely contend on the bar's lock.
pub fn batched_callback(pb: ProgressBar, chunk_size: usize) -> impl FnMut(usize) {
    let counter = Arc::new(AtomicUsize::new(0));
    move |n: usize| {
        let prev = counter.fetch_add(n, Ordering::Relaxed);
        if (prev / chunk_size) != ((prev + n) / chunk_size) {
            update_progress_bar(&pb, chunk_size);
        }
    }
}
