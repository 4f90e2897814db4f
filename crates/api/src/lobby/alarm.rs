use std::{future::Future, pin::Pin, time::Duration};
use tokio::{sync::oneshot, time};

pub type Callback = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runs a callback after a delay unless the handle is dropped first.
pub struct Alarm {
    _cancel: oneshot::Sender<()>,
}

impl Alarm {
    pub fn new(delay: Duration, callback: Callback) -> Self {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let fired = tokio::select! {
                biased;
                _ = rx => false,
                _ = time::sleep(delay) => true,
            };
            if fired {
                callback.await;
            }
        });
        Self { _cancel: tx }
    }
}

#[cfg(test)]
mod tests {
    use super::Alarm;
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };
    use tokio::time;

    fn flag() -> (Arc<AtomicBool>, super::Callback) {
        let flag = Arc::new(AtomicBool::new(false));
        let inner = flag.clone();
        (flag, Box::pin(async move { inner.store(true, Ordering::Release) }))
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn fires_after_delay() {
        let (fired, callback) = flag();
        let _alarm = Alarm::new(Duration::from_secs(16), callback);

        time::sleep(Duration::from_secs(15)).await;
        assert!(!fired.load(Ordering::Acquire));
        time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::Acquire));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn dropping_cancels() {
        let (fired, callback) = flag();
        let alarm = Alarm::new(Duration::from_secs(16), callback);
        time::sleep(Duration::from_secs(5)).await;
        drop(alarm);

        time::sleep(Duration::from_secs(60)).await;
        assert!(!fired.load(Ordering::Acquire));
    }
}
