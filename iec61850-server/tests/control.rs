mod common;

use common::{DIRECT, SBO, SBO_TIMEOUT_MS, associate, model, service_code};
use iec61850_core::{ErrorCode, Fc, ServiceError, Value};
use iec61850_server::{ServerEventListener, ServerSap, WriteValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_direct_control_operates_without_select() {
    let server = ServerSap::new(model());
    let (mut client, _events) = associate(&server).await;
    client.retrieve_model().await.unwrap();

    client.operate(DIRECT, &Value::Boolean(true)).await.unwrap();
    let error = client.select(DIRECT).await.unwrap_err();
    assert_eq!(service_code(error), ErrorCode::AccessViolation);
}

#[tokio::test]
async fn test_sbo_control_requires_selection() {
    let server = ServerSap::new(model());
    let (mut client, _events) = associate(&server).await;
    client.retrieve_model().await.unwrap();

    let error = client.operate(SBO, &Value::Boolean(true)).await.unwrap_err();
    assert_eq!(service_code(error), ErrorCode::AccessViolation);

    assert!(client.select(SBO).await.unwrap());
    client.operate(SBO, &Value::Boolean(true)).await.unwrap();
}

#[tokio::test]
async fn test_selection_is_exclusive() {
    let server = ServerSap::new(model());
    let (mut first, _first_events) = associate(&server).await;
    let (mut second, _second_events) = associate(&server).await;
    first.retrieve_model().await.unwrap();
    second.retrieve_model().await.unwrap();

    assert!(first.select(SBO).await.unwrap());
    assert!(!second.select(SBO).await.unwrap());
    let error = second.operate(SBO, &Value::Boolean(true)).await.unwrap_err();
    assert_eq!(service_code(error), ErrorCode::AccessViolation);
    first.operate(SBO, &Value::Boolean(true)).await.unwrap();
}

#[tokio::test]
async fn test_selection_times_out() {
    let server = ServerSap::new(model());
    let (mut client, _events) = associate(&server).await;
    client.retrieve_model().await.unwrap();

    assert!(client.select(SBO).await.unwrap());
    tokio::time::sleep(Duration::from_millis(SBO_TIMEOUT_MS * 3)).await;
    let error = client.operate(SBO, &Value::Boolean(true)).await.unwrap_err();
    assert_eq!(service_code(error), ErrorCode::AccessViolation);
}

#[tokio::test]
async fn test_selection_released_with_the_association() {
    let server = ServerSap::new(model());
    let (mut first, _first_events) = associate(&server).await;
    let (mut second, _second_events) = associate(&server).await;
    first.retrieve_model().await.unwrap();
    second.retrieve_model().await.unwrap();

    assert!(first.select(SBO).await.unwrap());
    first.disconnect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(second.select(SBO).await.unwrap());
}

/// Refuses every control value and records what it was asked
struct RefusingHost {
    seen: mpsc::UnboundedSender<WriteValue>,
}

impl ServerEventListener for RefusingHost {
    fn write(&self, values: &[WriteValue]) -> Vec<Result<(), ServiceError>> {
        values
            .iter()
            .map(|value| {
                let _ = self.seen.send(value.clone());
                Err(ServiceError::access_violation("interlocked"))
            })
            .collect()
    }

    fn server_stopped_listening(&self) {}
}

#[tokio::test]
async fn test_host_sees_only_the_control_value() {
    let server = ServerSap::new(model());
    let (seen, mut seen_rx) = mpsc::unbounded_channel();
    server.set_listener(Arc::new(RefusingHost { seen }));
    let (mut client, _events) = associate(&server).await;
    client.retrieve_model().await.unwrap();

    let error = client.operate(DIRECT, &Value::Boolean(true)).await.unwrap_err();
    assert_eq!(service_code(error), ErrorCode::AccessViolation);

    let value = seen_rx.recv().await.unwrap();
    assert_eq!(value.reference.as_str(), "LD0/CSWI1.Pos.Oper.ctlVal");
    assert_eq!(value.fc, Fc::CO);
    assert_eq!(value.value, Value::Boolean(true));
    assert!(seen_rx.try_recv().is_err());
}
