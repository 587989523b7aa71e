//! End-to-end wiring of the resilient client over a mock transport.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;

use courier::breaker::{CircuitBreaker, CircuitOpen};
use courier::client::{ApiConfig, BasicImplementor};
use courier::transport::mock::MockHandle;
use courier::transport::{TransportError, TransportRegistry};
use courier::{Client, Response};

/// Breaker that opens after a configurable number of reported failures.
#[derive(Debug)]
struct CountingBreaker {
    threshold: usize,
    failures: Mutex<usize>,
}

impl CountingBreaker {
    fn tripping_after(threshold: usize) -> Self {
        Self {
            threshold,
            failures: Mutex::new(0),
        }
    }
}

impl CircuitBreaker for CountingBreaker {
    fn check_available(&self, service: &str) -> Result<(), CircuitOpen> {
        if *self.failures.lock() >= self.threshold {
            Err(CircuitOpen {
                service: service.to_owned(),
            })
        } else {
            Ok(())
        }
    }

    fn report_success(&self, _service: &str) {
        *self.failures.lock() = 0;
    }

    fn report_failure(&self, _service: &str) {
        *self.failures.lock() += 1;
    }
}

fn harness() -> (Client, MockHandle, Arc<CountingBreaker>) {
    let registry = TransportRegistry::new();
    let mock = MockHandle::default();
    let handle = mock.clone();
    registry
        .register("mock", move |options| Box::new(handle.transport(options)))
        .unwrap();

    let breaker = Arc::new(CountingBreaker::tripping_after(1));
    let client = Client::new(
        ApiConfig::new("http://api.test")
            .with_transport("mock")
            .with_circuit_breaker("inventory"),
        BasicImplementor::new(Arc::new(registry)).with_circuit_breaker(breaker.clone()),
    );
    (client, mock, breaker)
}

#[tokio::test]
async fn calls_flow_until_the_breaker_trips() {
    let _ = tracing_subscriber::fmt::try_init();

    let (client, mock, _breaker) = harness();

    mock.push_response(Response::new(
        "http://api.test/items",
        None,
        StatusCode::OK,
        HeaderMap::new(),
        Bytes::from_static(b"[]"),
    ));
    mock.push_error(TransportError::Timeout);

    // Healthy call goes through.
    let first = client.get("/items", None, HeaderMap::new()).await.unwrap();
    assert!(!first.has_error());

    // The failure is intercepted and trips the breaker.
    let second = client.get("/items", None, HeaderMap::new()).await;
    assert!(matches!(
        second,
        Err(courier::client::Error::ServiceUnavailable { source: Some(_), .. })
    ));

    // The tripped breaker now refuses calls before they reach the wire.
    let sends_before = mock.send_count();
    let third = client.get("/items", None, HeaderMap::new()).await;
    assert!(matches!(
        third,
        Err(courier::client::Error::ServiceUnavailable { source: None, .. })
    ));
    assert_eq!(mock.send_count(), sends_before);
}

#[tokio::test]
async fn upstream_http_errors_are_data_not_errors() {
    let _ = tracing_subscriber::fmt::try_init();

    let registry = TransportRegistry::new();
    let mock = MockHandle::default();
    let handle = mock.clone();
    registry
        .register("mock", move |options| Box::new(handle.transport(options)))
        .unwrap();

    let client = Client::new(
        ApiConfig::new("http://api.test").with_transport("mock"),
        BasicImplementor::new(Arc::new(registry)),
    );

    mock.push_response(Response::new(
        "http://api.test/items/42",
        None,
        StatusCode::NOT_FOUND,
        HeaderMap::new(),
        Bytes::new(),
    ));

    let response = client
        .get("/items/42", None, HeaderMap::new())
        .await
        .unwrap();
    assert!(response.has_error());
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn every_verb_reaches_the_transport() {
    let _ = tracing_subscriber::fmt::try_init();

    let registry = TransportRegistry::new();
    let mock = MockHandle::default();
    let handle = mock.clone();
    registry
        .register("mock", move |options| Box::new(handle.transport(options)))
        .unwrap();

    let client = Client::new(
        ApiConfig::new("http://api.test").with_transport("mock"),
        BasicImplementor::new(Arc::new(registry)),
    );

    let headers = HeaderMap::new();
    client.get("/r", None, headers.clone()).await.unwrap();
    client
        .post("/r", Some("a=1".into()), headers.clone())
        .await
        .unwrap();
    client
        .put("/r", Some("a=2".into()), headers.clone())
        .await
        .unwrap();
    client
        .patch("/r", Some("a=3".into()), headers.clone())
        .await
        .unwrap();
    client.delete("/r", None, headers.clone()).await.unwrap();
    client
        .link("/r", vec!["http://api.test/t/1".to_owned()], headers.clone())
        .await
        .unwrap();
    client
        .unlink("/r", vec!["http://api.test/t/1".to_owned()], headers)
        .await
        .unwrap();

    let methods: Vec<String> = mock
        .calls()
        .into_iter()
        .map(|call| call.method.as_str().to_owned())
        .collect();
    assert_eq!(
        methods,
        vec!["GET", "POST", "PUT", "PATCH", "DELETE", "LINK", "UNLINK"]
    );
}
