//! Rate-limited order submission queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use intraday_core::error::OrderError;
use intraday_core::{OrderApi, OrderPayload, OrderRequest};

struct Submission {
    payload: OrderPayload,
    done: oneshot::Sender<Result<String, OrderError>>,
}

/// Single-writer queue in front of the order placement endpoint.
///
/// Any number of callers may submit concurrently; the background worker
/// drains strictly FIFO, one submission at a time, and sleeps the
/// configured minimum delay after every attempt (successful or not)
/// before dequeuing the next. This is the only path to order placement,
/// so the brokerage calls-per-second ceiling cannot be bypassed.
pub struct OrderGateway {
    tx: mpsc::Sender<Submission>,
}

impl OrderGateway {
    /// Start the gateway with its background drain task.
    pub fn new(api: Arc<dyn OrderApi>, min_delay: Duration) -> Self {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(drain(api, rx, min_delay));
        Self { tx }
    }

    /// Validate, enqueue and wait for the brokerage order id.
    ///
    /// Validation failures ([`OrderError::InvalidOrder`]) fail fast and
    /// are never queued. Brokerage rejections resolve the waiting caller
    /// with the brokerage's error payload; deciding whether that is fatal
    /// is the caller's concern.
    pub async fn submit(&self, request: OrderRequest) -> Result<String, OrderError> {
        let payload = request.into_payload()?;
        let (done, wait) = oneshot::channel();

        self.tx
            .send(Submission { payload, done })
            .await
            .map_err(|_| OrderError::GatewayClosed)?;
        wait.await.map_err(|_| OrderError::GatewayClosed)?
    }
}

async fn drain(api: Arc<dyn OrderApi>, mut rx: mpsc::Receiver<Submission>, min_delay: Duration) {
    while let Some(Submission { payload, done }) = rx.recv().await {
        let result = api.place(&payload).await;
        match &result {
            Ok(order_id) => {
                info!(order_id = %order_id, tag = %payload.tag, "order submitted");
            }
            Err(e) => {
                warn!(tag = %payload.tag, error = %e, "order submission failed");
            }
        }
        // The caller may have given up; a dropped handle is not an error.
        let _ = done.send(result);
        tokio::time::sleep(min_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use intraday_core::{Instrument, OrderDetails, Side};
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct RecordingApi {
        places: Mutex<Vec<(String, Instant)>>,
    }

    impl RecordingApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                places: Mutex::new(Vec::new()),
            })
        }

        fn recorded(&self) -> Vec<(String, Instant)> {
            self.places.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OrderApi for RecordingApi {
        async fn place(&self, payload: &OrderPayload) -> Result<String, OrderError> {
            let mut places = self.places.lock().unwrap();
            places.push((payload.tag.clone(), Instant::now()));
            Ok(format!("ORD-{}", places.len()))
        }

        async fn status(&self, _order_id: &str) -> Result<OrderDetails, OrderError> {
            unimplemented!("not used by gateway tests")
        }

        async fn cancel(&self, _order_id: &str) -> Result<(), OrderError> {
            unimplemented!("not used by gateway tests")
        }
    }

    struct RejectingApi;

    #[async_trait]
    impl OrderApi for RejectingApi {
        async fn place(&self, _payload: &OrderPayload) -> Result<String, OrderError> {
            Err(OrderError::Rejected("insufficient funds".to_string()))
        }

        async fn status(&self, _order_id: &str) -> Result<OrderDetails, OrderError> {
            unimplemented!()
        }

        async fn cancel(&self, _order_id: &str) -> Result<(), OrderError> {
            unimplemented!()
        }
    }

    fn instrument() -> Instrument {
        Instrument::nse_eq("INE121J01017")
    }

    #[tokio::test]
    async fn test_invalid_order_is_never_queued() {
        let api = RecordingApi::new();
        let gateway = OrderGateway::new(api.clone(), Duration::from_millis(250));

        let request = OrderRequest::market(instrument(), Side::Buy, 0, "BAD");
        assert!(matches!(
            gateway.submit(request).await,
            Err(OrderError::InvalidOrder(_))
        ));
        assert!(api.recorded().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submissions_are_fifo_and_rate_limited() {
        let api = RecordingApi::new();
        let gateway = OrderGateway::new(api.clone(), Duration::from_millis(250));

        let (first, second, third) = tokio::join!(
            gateway.submit(OrderRequest::market(instrument(), Side::Buy, 1, "FIRST")),
            gateway.submit(OrderRequest::market(instrument(), Side::Buy, 1, "SECOND")),
            gateway.submit(OrderRequest::market(instrument(), Side::Buy, 1, "THIRD")),
        );
        assert_eq!(first.unwrap(), "ORD-1");
        assert_eq!(second.unwrap(), "ORD-2");
        assert_eq!(third.unwrap(), "ORD-3");

        let recorded = api.recorded();
        let tags: Vec<&str> = recorded.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tags, vec!["FIRST", "SECOND", "THIRD"]);

        for pair in recorded.windows(2) {
            let gap = pair[1].1 - pair[0].1;
            assert!(gap >= Duration::from_millis(250), "gap was {gap:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_resolves_caller_and_keeps_draining() {
        let api = Arc::new(RejectingApi);
        let gateway = OrderGateway::new(api, Duration::from_millis(250));

        let first = gateway
            .submit(OrderRequest::market(instrument(), Side::Buy, 1, "A"))
            .await;
        assert!(matches!(first, Err(OrderError::Rejected(_))));

        // The queue keeps serving after a failed submission
        let second = gateway
            .submit(OrderRequest::market(instrument(), Side::Buy, 1, "B"))
            .await;
        assert!(matches!(second, Err(OrderError::Rejected(_))));
    }
}
