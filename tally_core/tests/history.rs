use tally_core::history::{HistoryBuffer, HistoryCfg, HistoryEntry};

fn entry(device_id: &str, item_count: u32, at_ms: u64) -> HistoryEntry {
    HistoryEntry {
        device_id: device_id.to_string(),
        weight_kg: 10.0,
        item_count,
        at_ms,
    }
}

#[test]
fn appending_past_the_cap_drops_the_oldest() {
    let mut buf = HistoryBuffer::new(HistoryCfg {
        retention_ms: 5 * 60 * 1000,
        max_entries: 300,
    });
    for i in 0..301u64 {
        buf.push(i, entry("SCALE_A", i as u32, i));
    }
    assert_eq!(buf.len(), 300);
    let snap = buf.snapshot(301, None);
    // Entry 0 was evicted; arrival order preserved.
    assert_eq!(snap.first().map(|e| e.at_ms), Some(1));
    assert_eq!(snap.last().map(|e| e.at_ms), Some(300));
}

#[test]
fn entries_expire_after_the_retention_window() {
    let mut buf = HistoryBuffer::new(HistoryCfg {
        retention_ms: 5 * 60 * 1000,
        max_entries: 300,
    });
    buf.push(1000, entry("SCALE_A", 1, 1000));

    // Within the window the entry is served.
    assert_eq!(buf.snapshot(1000 + 300_000, None).len(), 1);
    // Once the window has fully passed with no new appends, reads are empty.
    assert!(buf.snapshot(1000 + 300_001, None).is_empty());
    assert!(buf.is_empty());
}

#[test]
fn reads_are_idempotent() {
    let mut buf = HistoryBuffer::new(HistoryCfg::default());
    buf.push(0, entry("SCALE_A", 1, 0));
    buf.push(10, entry("SCALE_A", 2, 10));

    let first = buf.snapshot(20, None);
    let second = buf.snapshot(20, None);
    assert_eq!(first, second);
}

#[test]
fn snapshot_filters_by_device_but_stores_one_shared_feed() {
    let mut buf = HistoryBuffer::new(HistoryCfg::default());
    buf.push(0, entry("SCALE_A", 1, 0));
    buf.push(10, entry("SCALE_B", 5, 10));
    buf.push(20, entry("SCALE_A", 2, 20));

    let all = buf.snapshot(30, None);
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].device_id, "SCALE_B");

    let only_a = buf.snapshot(30, Some("SCALE_A"));
    assert_eq!(only_a.len(), 2);
    assert!(only_a.iter().all(|e| e.device_id == "SCALE_A"));
}

#[test]
fn append_also_runs_the_age_sweep() {
    let mut buf = HistoryBuffer::new(HistoryCfg {
        retention_ms: 1000,
        max_entries: 300,
    });
    buf.push(0, entry("SCALE_A", 1, 0));
    buf.push(2000, entry("SCALE_A", 2, 2000));
    // The first entry aged out during the second append.
    assert_eq!(buf.len(), 1);
}
