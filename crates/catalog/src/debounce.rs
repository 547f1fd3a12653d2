use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

enum Signal<T> {
    Value(T),
    Flush(oneshot::Sender<()>),
}

/// Forwards only the latest pushed value once `window` passes without a new one.
pub struct Debouncer<T> {
    tx: UnboundedSender<Signal<T>>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(window: Duration, apply: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, rx) = unbounded_channel();
        let task = tokio::spawn(debounce_loop(rx, window, apply));
        Self { tx, task }
    }

    pub fn push(&self, value: T) {
        if self.tx.send(Signal::Value(value)).is_err() {
            debug!("Debouncer closed; dropping value");
        }
    }

    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Signal::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce_loop<T, F>(mut rx: UnboundedReceiver<Signal<T>>, window: Duration, mut apply: F)
where
    F: FnMut(T),
{
    loop {
        let mut latest = match rx.recv().await {
            Some(Signal::Value(value)) => value,
            Some(Signal::Flush(done)) => {
                let _ = done.send(());
                continue;
            }
            None => return,
        };

        loop {
            tokio::select! {
                _ = tokio::time::sleep(window) => {
                    apply(latest);
                    break;
                }
                signal = rx.recv() => match signal {
                    Some(Signal::Value(value)) => latest = value,
                    Some(Signal::Flush(done)) => {
                        apply(latest);
                        let _ = done.send(());
                        break;
                    }
                    None => return,
                }
            }
        }
    }
}
