mod common;

use common::{DATA_SET, URCB, associate, model, service_code, set_indication};
use iec61850_client::{ClientSap, RcbUpdate};
use iec61850_core::{ErrorCode, Fc, Iec61850Error, ServiceError, Value};
use iec61850_server::{ServerConfig, ServerEventListener, ServerSap, WriteValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_retrieve_model() {
    let server = ServerSap::new(model());
    let (mut client, _events) = associate(&server).await;
    let retrieved = client.retrieve_model().await.unwrap();

    let ld = retrieved.tree().logical_device("LD0").expect("LD0");
    let mut names: Vec<&str> = retrieved
        .tree()
        .node(ld)
        .children()
        .iter()
        .map(|ln| retrieved.tree().node(*ln).name())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["CSWI1", "CSWI2", "GGIO1"]);
    let data_set = retrieved.data_set(DATA_SET).expect("events");
    assert_eq!(data_set.len(), 2);
    assert!(retrieved.rcb_by_reference("LD0/GGIO1.urcb01").is_some());
}

#[tokio::test]
async fn test_read_follows_host_values() {
    let server = ServerSap::new(model());
    let (mut client, _events) = associate(&server).await;
    client.retrieve_model().await.unwrap();

    set_indication(&server, "Ind1", true);
    let copy = client
        .get_data_values("LD0/GGIO1.Ind1.stVal", Fc::ST)
        .await
        .unwrap();
    assert_eq!(copy.leaf_value(), Some(&Value::Boolean(true)));

    let error = client
        .set_data_values("LD0/GGIO1.Ind1.stVal", Fc::ST, &Value::Boolean(false))
        .await
        .unwrap_err();
    assert_eq!(service_code(error), ErrorCode::AccessViolation);
}

#[tokio::test]
async fn test_data_set_lifecycle() {
    let server = ServerSap::new(model());
    let (mut client, _events) = associate(&server).await;
    client.retrieve_model().await.unwrap();

    let members = [("LD0/GGIO1.Ind1", Fc::ST), ("LD0/GGIO1.Ind2.stVal", Fc::ST)];
    client
        .create_data_set("LD0/GGIO1.dynamic", &members)
        .await
        .unwrap();
    client.create_data_set("@temp", &members).await.unwrap();

    set_indication(&server, "Ind2", true);
    let results = client
        .get_data_set_values("LD0/GGIO1.dynamic")
        .await
        .unwrap();
    assert!(results.iter().all(Result::is_ok));
    let stored = client
        .get_data_values("LD0/GGIO1.Ind2.stVal", Fc::ST)
        .await
        .unwrap();
    assert_eq!(stored.leaf_value(), Some(&Value::Boolean(true)));
    let results = client.get_data_set_values("@temp").await.unwrap();
    assert_eq!(results.len(), 2);

    assert!(client.delete_data_set("LD0/GGIO1.dynamic").await.unwrap());
    assert!(!client.delete_data_set(DATA_SET).await.unwrap());
    assert!(server.model_copy().data_set(DATA_SET).is_some());
    assert!(server.model_copy().data_set("LD0/GGIO1.dynamic").is_none());
}

#[tokio::test]
async fn test_association_data_set_deleted_while_reported() {
    let server = ServerSap::new(model());
    let (mut client, mut events) = associate(&server).await;
    client.retrieve_model().await.unwrap();

    let members = [("LD0/GGIO1.Ind2", Fc::ST)];
    client.create_data_set("@temp", &members).await.unwrap();
    let update = RcbUpdate {
        dat_set: Some("@temp".to_string()),
        ..RcbUpdate::default()
    };
    let results = client.set_rcb_values(URCB, &update).await.unwrap();
    assert!(results.iter().all(Result::is_ok));
    client.enable_reporting(URCB).await.unwrap();

    assert!(client.delete_data_set("@temp").await.unwrap());
    let rcb = client.get_rcb_values(URCB).await.unwrap();
    let enabled = rcb.find("RptEna").and_then(|node| node.leaf_value()).cloned();
    assert_eq!(enabled, Some(Value::Boolean(true)));

    // the client needs the set again to decode what the RCB still reports
    client.create_data_set("@temp", &members).await.unwrap();
    set_indication(&server, "Ind2", true);
    let report = events
        .next_report(Duration::from_secs(2))
        .await
        .expect("report of the deleted set");
    assert_eq!(report.inclusion.num_bits(), 1);
    assert!(report.inclusion.bit(0));
}

#[tokio::test]
async fn test_association_limit() {
    let config = ServerConfig::default().with_max_associations(1);
    let server = ServerSap::with_config(model(), config);
    let (_client, _events) = associate(&server).await;

    let (_client_end, server_end) = tokio::io::duplex(1024);
    assert!(server.serve_connection(server_end).is_none());
    assert_eq!(server.association_count(), 1);
}

#[tokio::test]
async fn test_server_stop_closes_associations_once() {
    let server = ServerSap::new(model());
    let (client, mut events) = associate(&server).await;

    server.stop();
    let error = tokio::time::timeout(Duration::from_secs(2), events.closed.recv())
        .await
        .expect("association closed in time")
        .expect("closed error");
    assert!(error.is_fatal());
    assert!(!client.is_open());
    assert!(
        tokio::time::timeout(Duration::from_millis(200), events.closed.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_requests_after_disconnect_fail() {
    let server = ServerSap::new(model());
    let (mut client, _events) = associate(&server).await;
    client.disconnect().await.unwrap();

    let error = client
        .get_data_values("LD0/GGIO1.Ind1.stVal", Fc::ST)
        .await
        .unwrap_err();
    assert!(!matches!(error, Iec61850Error::Service(_)));
}

#[tokio::test]
async fn test_file_services() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("comtrade.cfg"), b"station,1\n").unwrap();
    std::fs::write(root.path().join("comtrade.dat"), vec![7u8; 20_000]).unwrap();
    let config = ServerConfig::default().with_file_root(root.path());
    let server = ServerSap::with_config(model(), config);
    let (mut client, _events) = associate(&server).await;

    let entries = client.get_file_directory(None).await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.file_name.as_str()).collect();
    assert_eq!(names, vec!["comtrade.cfg", "comtrade.dat"]);

    let mut content = Vec::new();
    client
        .get_file("comtrade.dat", |block| {
            content.extend_from_slice(block);
            true
        })
        .await
        .unwrap();
    assert_eq!(content.len(), 20_000);

    client.delete_file("comtrade.cfg").await.unwrap();
    assert!(!root.path().join("comtrade.cfg").exists());
    let error = client.get_file("comtrade.cfg", |_| true).await.unwrap_err();
    assert_eq!(service_code(error), ErrorCode::FileNoneExistent);
}

struct StopSignal(mpsc::UnboundedSender<()>);

impl ServerEventListener for StopSignal {
    fn write(&self, _values: &[WriteValue]) -> Vec<Result<(), ServiceError>> {
        Vec::new()
    }

    fn server_stopped_listening(&self) {
        let _ = self.0.send(());
    }
}

#[tokio::test]
async fn test_serve_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = Arc::new(ServerSap::new(model()));
    let (stopped, mut stopped_rx) = mpsc::unbounded_channel();
    server.set_listener(Arc::new(StopSignal(stopped)));
    let serving = tokio::spawn({
        let server = server.clone();
        async move { server.serve(listener).await }
    });

    let mut client = ClientSap::new().associate(address, None).await.unwrap();
    client.retrieve_model().await.unwrap();
    client.operate("LD0/CSWI1.Pos", &Value::Boolean(true)).await.unwrap();
    client.disconnect().await.unwrap();

    server.stop();
    serving.await.unwrap().unwrap();
    assert_eq!(stopped_rx.recv().await, Some(()));
}
