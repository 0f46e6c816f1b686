// src/lifecycle.rs
//
// Process-level shutdown plumbing shared by the listener thread and the
// signal handler.

use std::sync::mpsc::Sender;

use log::info;

use crate::error::SetupError;

/// Reason the control thread should stop.
#[derive(Debug)]
pub enum Shutdown {
    /// SIGINT / SIGTERM
    Signal,

    /// The key listener could not start or stopped with an error
    ListenerFailed(SetupError),
}

/// Route SIGINT and SIGTERM into `shutdown`.
///
/// Can only be installed once per process.
pub fn install_signal_handler(shutdown: Sender<Shutdown>) -> Result<(), SetupError> {
    ctrlc::set_handler(move || {
        info!("Termination signal received");
        let _ = shutdown.send(Shutdown::Signal);
    })?;
    Ok(())
}
