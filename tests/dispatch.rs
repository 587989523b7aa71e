//! Driving batches of operations through the dispatcher's public API.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;

use courier::dispatch::{Callback, Operation};
use courier::response::{RawTransfer, Response};
use courier::Dispatcher;

/// Operation that tracks how many transfers run at once.
struct TrackedOperation {
    label: String,
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl TrackedOperation {
    fn new(label: impl Into<String>, current: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> Self {
        Self {
            label: label.into(),
            current: current.clone(),
            peak: peak.clone(),
        }
    }
}

impl Operation for TrackedOperation {
    fn begin(&mut self) -> BoxFuture<'static, RawTransfer> {
        let label = self.label.clone();
        let current = self.current.clone();
        let peak = self.peak.clone();
        Box::pin(async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            RawTransfer {
                url: format!("mock://{label}"),
                error: None,
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::new(),
            }
        })
    }
}

/// Operation translating its raw payload into a domain response.
struct ParsingOperation {
    url: &'static str,
    payload: &'static [u8],
}

impl Operation for ParsingOperation {
    fn begin(&mut self) -> BoxFuture<'static, RawTransfer> {
        let url = self.url;
        let payload = self.payload;
        Box::pin(async move {
            RawTransfer {
                url: url.to_owned(),
                error: None,
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::from_static(payload),
            }
        })
    }

    fn create_response(&self, raw: RawTransfer) -> Response {
        // A driver-level success can still be a domain-level failure.
        let error = raw
            .body
            .starts_with(b"ERR")
            .then(|| "upstream rejected the operation".to_owned());
        Response::new(raw.url, error, raw.status, raw.headers, raw.body)
    }
}

fn record(log: &Arc<Mutex<Vec<String>>>) -> Callback {
    let log = log.clone();
    Box::new(move |response: Response, _: &mut Dispatcher| {
        log.lock().push(response.url().to_owned());
        Ok(())
    })
}

#[tokio::test]
async fn a_batch_respects_the_parallel_limit() {
    let _ = tracing_subscriber::fmt::try_init();

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(Mutex::new(Vec::new()));

    let mut dispatcher = Dispatcher::with_parallel_limit(NonZeroUsize::new(2).unwrap());
    for index in 0..6 {
        dispatcher.enqueue(
            TrackedOperation::new(format!("op-{index}"), &current, &peak),
            Some(record(&completed)),
        );
    }

    dispatcher.run(Dispatcher::DEFAULT_TIMEOUT).await.unwrap();

    assert_eq!(dispatcher.count(), 0);
    assert_eq!(completed.lock().len(), 6);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn callbacks_chain_new_work_into_the_same_run() {
    let _ = tracing_subscriber::fmt::try_init();

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(Mutex::new(Vec::new()));

    let mut dispatcher = Dispatcher::new();
    let chain_current = current.clone();
    let chain_peak = peak.clone();
    let chain_completed = completed.clone();

    dispatcher.enqueue(
        TrackedOperation::new("page-1", &current, &peak),
        Some(Box::new(move |response: Response, dispatcher: &mut Dispatcher| {
            chain_completed.lock().push(response.url().to_owned());
            dispatcher.enqueue(
                TrackedOperation::new("page-2", &chain_current, &chain_peak),
                Some(record(&chain_completed)),
            );
            Ok(())
        })),
    );

    dispatcher.run(Dispatcher::DEFAULT_TIMEOUT).await.unwrap();

    assert_eq!(
        *completed.lock(),
        vec!["mock://page-1".to_owned(), "mock://page-2".to_owned()]
    );
}

#[tokio::test]
async fn operations_translate_their_own_payloads() {
    let _ = tracing_subscriber::fmt::try_init();

    let outcomes: Arc<Mutex<Vec<(String, bool)>>> = Arc::new(Mutex::new(Vec::new()));

    let mut dispatcher = Dispatcher::new();
    for (url, payload) in [
        ("mock://good", b"OK  done".as_slice()),
        ("mock://bad", b"ERR denied".as_slice()),
    ] {
        let outcomes = outcomes.clone();
        dispatcher.enqueue(
            ParsingOperation { url, payload },
            Some(Box::new(move |response: Response, _: &mut Dispatcher| {
                outcomes
                    .lock()
                    .push((response.url().to_owned(), response.has_error()));
                Ok(())
            })),
        );
    }

    dispatcher.run(Dispatcher::DEFAULT_TIMEOUT).await.unwrap();

    let mut outcomes = outcomes.lock().clone();
    outcomes.sort();
    assert_eq!(
        outcomes,
        vec![
            ("mock://bad".to_owned(), true),
            ("mock://good".to_owned(), false)
        ]
    );
}
