use super::record::{Record, log_lines, to_log};
use super::sweep::{CompactionTrigger, sweep};
use super::topic::FolderName;
use super::{Broker, RetentionPolicy};
use crate::persistence::FolderStore;
use crate::utils::error::BrokerError;

use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::{TempDir, tempdir};

const NOW: i64 = 1_000_000;

fn create_test_broker(policy: RetentionPolicy) -> (TempDir, Broker) {
    let dir = tempdir().unwrap();
    let broker = Broker::new(FolderStore::new(dir.path().join("data")), policy);
    (dir, broker)
}

fn last_record_policy() -> RetentionPolicy {
    RetentionPolicy {
        trigger: CompactionTrigger::LastRecord,
        ..RetentionPolicy::default()
    }
}

fn write_log(broker: &Broker, folder: &str, contents: &str) {
    let path = broker.store().path_for(&FolderName::parse(folder).unwrap());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn read_log(broker: &Broker, folder: &str) -> Option<String> {
    broker
        .store()
        .read(&FolderName::parse(folder).unwrap())
        .unwrap()
}

fn rendered(records: &[Record]) -> Vec<String> {
    records.iter().map(Record::to_string).collect()
}

#[test]
fn test_record_parse_splits_on_first_dash() {
    let record = Record::parse("1725000000-a-b-c").unwrap();
    assert_eq!(record.timestamp, 1_725_000_000);
    assert_eq!(record.payload, "a-b-c");
    assert_eq!(record.to_string(), "1725000000-a-b-c");
}

#[test]
fn test_record_parse_allows_empty_payload() {
    assert_eq!(Record::parse("42-"), Some(Record::new(42, "")));
}

#[test]
fn test_record_parse_rejects_malformed_lines() {
    assert_eq!(Record::parse("no separator"), None);
    assert_eq!(Record::parse("abc-payload"), None);
    assert_eq!(Record::parse("-5-payload"), None);
    assert_eq!(Record::parse(""), None);
}

#[test]
fn test_record_roundtrip_through_log() {
    let records = vec![Record::new(1, "x"), Record::new(2, "y-z"), Record::new(3, "")];
    let log = to_log(&records);
    assert_eq!(log, "1-x\n2-y-z\n3-\n");

    let parsed: Vec<Record> = log_lines(&log).filter_map(Record::parse).collect();
    assert_eq!(parsed, records);
}

#[test]
fn test_folder_name_validation() {
    for valid in ["chat", "_hidden", "9lives", "a.b", "a-b", "x y", "Z$"] {
        assert!(FolderName::parse(valid).is_some(), "{valid} should be valid");
    }
    for invalid in ["", "-1", ".hidden", " chat", "é", "a/b", "a\\b", "a\0b", "/etc"] {
        assert!(
            FolderName::parse(invalid).is_none(),
            "{invalid:?} should be invalid"
        );
    }
}

#[test]
fn test_sweep_partitions_by_freshness_and_cursor() {
    let log = format!("100-a\n200-b\n{}-c\n", NOW - 250);
    let swept = sweep(&log, NOW, 300, 0, CompactionTrigger::AnyStale);

    assert_eq!(rendered(&swept.matched).len(), 3);
    assert_eq!(swept.retained, vec![Record::new(NOW - 250, "c")]);
    assert!(swept.compact);
}

#[test]
fn test_sweep_window_boundary_is_stale() {
    let log = format!("{}-edge\n{}-inside\n", NOW - 300, NOW - 299);
    let swept = sweep(&log, NOW, 300, 0, CompactionTrigger::AnyStale);

    assert_eq!(swept.retained, vec![Record::new(NOW - 299, "inside")]);
    assert!(swept.compact);
}

#[test]
fn test_sweep_last_record_trigger_ignores_stale_head() {
    let log = format!("100-a\n200-b\n{}-c\n", NOW - 250);
    let swept = sweep(&log, NOW, 300, 0, CompactionTrigger::LastRecord);
    assert!(!swept.compact);

    let log = format!("{}-c\n100-a\n", NOW - 250);
    let swept = sweep(&log, NOW, 300, 0, CompactionTrigger::LastRecord);
    assert!(swept.compact);
}

#[test]
fn test_sweep_malformed_lines_are_stale_and_hidden() {
    let log = format!("garbage\n{}-ok\n", NOW - 10);
    let swept = sweep(&log, NOW, 300, 0, CompactionTrigger::AnyStale);

    assert_eq!(rendered(&swept.matched), vec![format!("{}-ok", NOW - 10)]);
    assert_eq!(swept.retained.len(), 1);
    assert!(swept.compact);
}

#[test]
fn test_sweep_empty_log() {
    let swept = sweep("", NOW, 300, 0, CompactionTrigger::AnyStale);
    assert!(swept.matched.is_empty());
    assert!(swept.retained.is_empty());
    assert!(!swept.compact);
}

#[test]
fn test_fetch_invalid_folder_does_no_io() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());

    for name in ["", "-x", ".", "../etc/passwd", "/abs"] {
        let err = broker.fetch_at(name, 0, NOW).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidFolder(_)));
    }
    assert!(!broker.store().data_dir().exists());
}

#[test]
fn test_fetch_nonexistent_folder_is_empty_and_creates_nothing() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());

    let records = broker.fetch_at("nobody", 0, NOW).unwrap();
    assert!(records.is_empty());
    assert!(!broker.store().data_dir().exists());
}

#[test]
fn test_fetch_returns_stale_records_and_compacts() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());
    write_log(&broker, "chat", &format!("100-a\n200-b\n{}-c\n", NOW - 250));

    let records = broker.fetch_at("chat", 0, NOW).unwrap();
    assert_eq!(
        rendered(&records),
        vec![
            "100-a".to_string(),
            "200-b".to_string(),
            format!("{}-c", NOW - 250)
        ]
    );
    assert_eq!(read_log(&broker, "chat"), Some(format!("{}-c\n", NOW - 250)));
}

#[test]
fn test_fetch_last_record_trigger_keeps_stale_head_behind_fresh_tail() {
    let (_dir, broker) = create_test_broker(last_record_policy());
    let log = format!("100-a\n200-b\n{}-c\n", NOW - 250);
    write_log(&broker, "chat", &log);

    let records = broker.fetch_at("chat", 0, NOW).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(read_log(&broker, "chat"), Some(log));
}

#[test]
fn test_fetch_last_record_trigger_compacts_when_tail_is_stale() {
    let (_dir, broker) = create_test_broker(last_record_policy());
    write_log(&broker, "chat", &format!("{}-c\n100-a\n", NOW - 250));

    broker.fetch_at("chat", 0, NOW).unwrap();
    assert_eq!(read_log(&broker, "chat"), Some(format!("{}-c\n", NOW - 250)));
}

#[test]
fn test_fetch_deletes_log_when_nothing_is_fresh() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());
    write_log(&broker, "chat", "100-a\n200-b\n");

    let records = broker.fetch_at("chat", 0, NOW).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(read_log(&broker, "chat"), None);

    assert!(broker.fetch_at("chat", 0, NOW).unwrap().is_empty());
}

#[test]
fn test_fetch_is_idempotent_on_fresh_log() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());
    let log = format!("{}-x\n{}-y\n", NOW - 20, NOW - 10);
    write_log(&broker, "chat", &log);

    let first = broker.fetch_at("chat", NOW - 15, NOW).unwrap();
    let second = broker.fetch_at("chat", NOW - 15, NOW).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec![Record::new(NOW - 10, "y")]);
    assert_eq!(read_log(&broker, "chat"), Some(log));
}

#[test]
fn test_rewritten_records_read_back_in_order() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());
    write_log(
        &broker,
        "chat",
        &format!("1-old\n{}-p\n2-old\n{}-q\n{}-r\n", NOW - 3, NOW - 2, NOW - 1),
    );

    broker.fetch_at("chat", NOW, NOW).unwrap();
    let records = broker.fetch_at("chat", 0, NOW).unwrap();
    assert_eq!(
        records,
        vec![
            Record::new(NOW - 3, "p"),
            Record::new(NOW - 2, "q"),
            Record::new(NOW - 1, "r"),
        ]
    );
}

#[test]
fn test_fetch_cursor_filters_regardless_of_freshness() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());
    write_log(&broker, "chat", &format!("100-a\n200-b\n{}-c\n", NOW - 5));

    let records = broker.fetch_at("chat", 150, NOW).unwrap();
    assert_eq!(
        rendered(&records),
        vec!["200-b".to_string(), format!("{}-c", NOW - 5)]
    );

    let records = broker.fetch_at("chat", NOW, NOW).unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_post_appends_record() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());

    let first = broker.post_at("chat", "hello", NOW).unwrap();
    let second = broker.post_at("chat", "a-b", NOW + 1).unwrap();

    assert_eq!(first, Record::new(NOW, "hello"));
    assert_eq!(second.timestamp, NOW + 1);
    assert_eq!(
        read_log(&broker, "chat"),
        Some(format!("{NOW}-hello\n{}-a-b\n", NOW + 1))
    );
}

#[test]
fn test_post_rejects_bad_input() {
    let (_dir, broker) = create_test_broker(RetentionPolicy {
        max_payload_bytes: 8,
        ..RetentionPolicy::default()
    });

    assert!(matches!(
        broker.post_at("-bad", "hi", NOW),
        Err(BrokerError::InvalidFolder(_))
    ));
    for payload in ["", "two\nlines", "cr\r", "far too long"] {
        assert!(matches!(
            broker.post_at("chat", payload, NOW),
            Err(BrokerError::InvalidPayload(_))
        ));
    }
    assert!(!broker.store().data_dir().exists());
}

#[test]
fn test_post_enforces_record_cap() {
    let (_dir, broker) = create_test_broker(RetentionPolicy {
        max_records: Some(3),
        ..RetentionPolicy::default()
    });

    for i in 0..5 {
        broker.post_at("chat", &format!("msg{i}"), NOW + i).unwrap();
    }

    let payloads: Vec<String> = broker
        .fetch_at("chat", 0, NOW)
        .unwrap()
        .into_iter()
        .map(|r| r.payload)
        .collect();
    assert_eq!(payloads, vec!["msg2", "msg3", "msg4"]);
}

#[test]
fn test_post_then_fetch_uses_wall_clock() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());

    let record = broker.post("chat", "now").unwrap();
    let records = broker.fetch("chat", record.timestamp).unwrap();
    assert_eq!(records, vec![record]);
}

#[test]
fn test_concurrent_posts_are_not_lost() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());
    let broker = Arc::new(broker);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let broker = broker.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    broker
                        .post_at("busy", &format!("t{t}-{i}"), NOW)
                        .unwrap();
                    broker.fetch_at("busy", 0, NOW).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(broker.fetch_at("busy", 0, NOW).unwrap().len(), 200);
}

#[test]
fn test_broker_from_settings() {
    let settings = crate::config::StoreSettings {
        data_dir: "somewhere".to_string(),
        retention_secs: 60,
        compaction: CompactionTrigger::LastRecord,
        max_payload_bytes: 16,
        max_records_per_folder: Some(10),
    };
    let broker = Broker::from_settings(&settings);

    assert_eq!(broker.store().data_dir(), std::path::Path::new("somewhere"));
    assert_eq!(
        broker.policy(),
        &RetentionPolicy {
            window_secs: 60,
            trigger: CompactionTrigger::LastRecord,
            max_payload_bytes: 16,
            max_records: Some(10),
        }
    );
}

#[test]
fn test_post_rejects_record_separator() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());

    for payload in ["a|b", "a|5-b", "|"] {
        assert!(matches!(
            broker.post_at("chat", payload, NOW),
            Err(BrokerError::InvalidPayload(_))
        ));
    }
    assert_eq!(read_log(&broker, "chat"), None);
}

#[test]
fn test_lock_entries_are_released_after_use() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());

    for i in 0..10_000 {
        broker.fetch_at(&format!("ghost{i}"), 0, NOW).unwrap();
    }
    assert_eq!(broker.active_folders(), 0);

    broker.post_at("chat", "hello", NOW).unwrap();
    broker.fetch_at("chat", 0, NOW).unwrap();
    assert_eq!(broker.active_folders(), 0);
}

#[test]
fn test_lock_entries_are_released_after_concurrent_use() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());
    let broker = Arc::new(broker);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let broker = broker.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let folder = format!("room{}", (t + i) % 3);
                    broker.post_at(&folder, "x", NOW).unwrap();
                    broker.fetch_at(&folder, 0, NOW).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(broker.active_folders(), 0);
    let total: usize = (0..3)
        .map(|r| broker.fetch_at(&format!("room{r}"), 0, NOW).unwrap().len())
        .sum();
    assert_eq!(total, 400);
}

// The temp file used by a rewrite is named `.{folder}.{uuid}.tmp`, 42 bytes
// longer than `{folder}.txt`. With a 230-byte name the log fits under the
// 255-byte file name limit but the temp file does not, so every rewrite fails.
fn unrewritable_folder() -> String {
    "w".repeat(230)
}

#[test]
fn test_post_succeeds_when_record_cap_cannot_be_applied() {
    let (_dir, broker) = create_test_broker(RetentionPolicy {
        max_records: Some(1),
        ..RetentionPolicy::default()
    });
    let folder = unrewritable_folder();

    let first = broker.post_at(&folder, "one", NOW).unwrap();
    let second = broker.post_at(&folder, "two", NOW + 1).unwrap();

    assert_eq!(second, Record::new(NOW + 1, "two"));
    assert_eq!(
        read_log(&broker, &folder),
        Some(format!("{first}\n{second}\n"))
    );
}

#[test]
fn test_fetch_treats_unreadable_log_as_empty() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());
    let path = broker.store().path_for(&FolderName::parse("chat").unwrap());
    fs::create_dir_all(&path).unwrap();

    let records = broker.fetch_at("chat", 0, NOW).unwrap();
    assert!(records.is_empty());
    assert!(path.is_dir());
}

#[test]
fn test_fetch_returns_records_when_compaction_fails() {
    let (_dir, broker) = create_test_broker(RetentionPolicy::default());
    let folder = unrewritable_folder();
    let log = format!("100-a\n{}-b\n", NOW - 5);
    write_log(&broker, &folder, &log);

    let records = broker.fetch_at(&folder, 0, NOW).unwrap();
    assert_eq!(
        records,
        vec![Record::new(100, "a"), Record::new(NOW - 5, "b")]
    );
    assert_eq!(read_log(&broker, &folder), Some(log));
}
