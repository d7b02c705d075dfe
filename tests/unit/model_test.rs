//! Tests for the catalog and record models

use jobico_executor::core::{
    JobExecution, JobResult, JobResultKind, Package, PackageUpdate, QueueItem, UpdateKind,
};

#[test]
fn test_update_kind_wire_names() {
    let update = PackageUpdate {
        kind: UpdateKind::Delete,
        package: Package {
            id: "p1".to_string(),
            tenant: "t1".to_string(),
            name: "billing".to_string(),
            queues: vec![],
            jobs: vec![],
            runtimes: vec![],
        },
    };
    let json = serde_json::to_value(&update).expect("json");
    assert_eq!(json["kind"], "delete");
    let back: PackageUpdate = serde_json::from_value(json).expect("update");
    assert_eq!(back, update);
}

#[test]
fn test_execution_record_shape() {
    let ex = JobExecution {
        event: "e1".to_string(),
        tenant: "t1".to_string(),
        queue: "q1".to_string(),
        date: jobico_executor::util::clock::now(),
        server: "node-a".to_string(),
        result: JobResult {
            kind: JobResultKind::Log,
            code: 2,
            message: "warned".to_string(),
        },
    };
    let json = serde_json::to_value(&ex).expect("json");
    assert_eq!(json["result"]["type"], "log");
    assert_eq!(json["result"]["code"], 2);
    assert_eq!(json["server"], "node-a");
    assert!(json["date"].is_string());
}

#[test]
fn test_result_kind_descriptions() {
    assert_eq!(JobResultKind::Log.description(), "log");
    assert_eq!(JobResultKind::Result.description(), "result");
}

#[test]
fn test_queue_item_from_str() {
    let item = QueueItem::new("e1", "{}");
    assert_eq!(item.event, "e1");
    assert_eq!(item.data, b"{}".to_vec());
}
