use tokio::sync::watch;

/// Process-wide stop flag. Every long-running task holds a listener.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownListener) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, ShutdownListener { receiver })
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl ShutdownListener {
    /// Resolves once shutdown is requested, immediately if it already was.
    pub async fn notified(&mut self) {
        if *self.receiver.borrow_and_update() {
            return;
        }
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}

fn request_stop(shutdown: &Shutdown, signal: &'static str) {
    tracing::info!(
        target: "lifecycle",
        signal,
        "job radar stop requested; draining in-flight jobs"
    );
    shutdown.trigger();
}

/// SIGINT everywhere, SIGTERM on unix; either one flips the shutdown flag.
pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            request_stop(&ctrlc, "SIGINT");
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                if term.recv().await.is_some() {
                    request_stop(&shutdown, "SIGTERM");
                }
            }
            Err(err) => {
                tracing::warn!(target: "lifecycle", error = %err, "SIGTERM handler unavailable");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn listeners_see_trigger_before_and_after_subscribe() {
        let (shutdown, mut early) = Shutdown::new();
        assert!(!early.is_triggered());

        let waiter = tokio::spawn(async move {
            early.notified().await;
            early.is_triggered()
        });
        shutdown.trigger();
        let seen = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("listener woke up")
            .expect("task finished");
        assert!(seen);

        let mut late = shutdown.subscribe();
        tokio::time::timeout(Duration::from_millis(100), late.notified())
            .await
            .expect("already triggered");
    }

    #[tokio::test]
    async fn stop_request_reaches_every_listener() {
        let (shutdown, first) = Shutdown::new();
        let second = shutdown.subscribe();
        request_stop(&shutdown, "SIGTERM");
        assert!(first.is_triggered());
        assert!(second.is_triggered());
    }
}
