//! Terminal signal handling
//!
//! SIGINT and SIGTERM stop the recording, SIGTSTP (Ctrl+Z) toggles pause.
//! OS signals are forwarded into a channel that the recorder reads from.

use std::io;
use tokio::sync::mpsc;

/// What a received signal asks the recorder to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Stop,
    TogglePause,
}

/// Listens for control signals for the lifetime of a recording
pub struct SignalListener {
    rx: mpsc::Receiver<ControlSignal>,
}

impl SignalListener {
    /// Install the signal handlers
    ///
    /// Installing the SIGTSTP handler also replaces the default suspend
    /// action, so the process keeps running while paused.
    pub fn install() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(8);
        forward_os_signals(tx)?;
        Ok(Self::from_receiver(rx))
    }

    /// Listen on an existing channel instead of OS signals
    pub fn from_receiver(rx: mpsc::Receiver<ControlSignal>) -> Self {
        Self { rx }
    }

    /// Wait for the next control signal
    pub async fn recv(&mut self) -> ControlSignal {
        match self.rx.recv().await {
            Some(signal) => signal,
            // No sender left, so no signal will ever arrive
            None => std::future::pending().await,
        }
    }
}

#[cfg(unix)]
fn forward_os_signals(tx: mpsc::Sender<ControlSignal>) -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut suspend = signal(SignalKind::from_raw(libc::SIGTSTP))?;

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = interrupt.recv() => {
                    tracing::debug!("Received SIGINT");
                    ControlSignal::Stop
                }
                _ = terminate.recv() => {
                    tracing::debug!("Received SIGTERM");
                    ControlSignal::Stop
                }
                _ = suspend.recv() => {
                    tracing::debug!("Received SIGTSTP");
                    ControlSignal::TogglePause
                }
            };
            if tx.send(received).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn forward_os_signals(tx: mpsc::Sender<ControlSignal>) -> io::Result<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                break;
            }
            tracing::debug!("Received Ctrl+C");
            if tx.send(ControlSignal::Stop).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}
