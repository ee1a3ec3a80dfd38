use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::ClientError;

/// Runs requests so that starting a new one cancels the one still in flight.
///
/// With a non-zero `delay` each request first waits that long, so bursts of
/// input (typing) only reach the network once they settle.
#[derive(Clone, Default)]
pub struct Dispatcher {
    current: Arc<Mutex<Option<CancellationToken>>>,
    delay: Duration,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            current: Arc::default(),
            delay,
        }
    }

    /// Cancel whatever is in flight and hand out the token for the next request.
    pub fn supersede(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = match self.current.lock() {
            Ok(mut slot) => slot.replace(token.clone()),
            Err(poisoned) => poisoned.into_inner().replace(token.clone()),
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
        token
    }

    /// Cancel the in-flight request, if any, without starting another.
    pub fn cancel(&self) {
        let previous = match self.current.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    pub async fn run<F, T>(&self, request: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let token = self.supersede();
        let delay = self.delay;

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ClientError::Cancelled),
            result = async {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                request.await
            } => result,
        }
    }
}
