//! Cooperative cancellation (§5 "Cancellation"), carried from the teacher's
//! `engine::tools::setup_ctrlc_handler` / `check_for_cancel`: a `Ctrl+C` handler flips a
//! shared flag; long-running loops check it between files, never mid-file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::HlsyncError;

pub fn setup_ctrlc_handler() -> anyhow::Result<Arc<AtomicBool>> {
    let cancel_requested = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })?;
    Ok(cancel_requested)
}

pub fn check_for_cancel(cancel_requested: &Arc<AtomicBool>) -> Result<(), HlsyncError> {
    if cancel_requested.load(Ordering::Relaxed) {
        return Err(HlsyncError::OperationCancelled);
    }
    Ok(())
}
