use std::net::SocketAddr;

use crate::model::RoomType;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: successful allocations. Labels: room_type.
pub const ALLOCATIONS_TOTAL: &str = "slotdesk_allocations_total";

/// Counter: allocations rejected (policy, conflict, validation). Labels: room_type.
pub const ALLOCATIONS_REJECTED_TOTAL: &str = "slotdesk_allocations_rejected_total";

/// Counter: cancellations applied (full or partial).
pub const CANCELLATIONS_TOTAL: &str = "slotdesk_cancellations_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: slots with at least one live booking.
pub const SLOTS_ACTIVE: &str = "slotdesk_slots_active";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "slotdesk_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "slotdesk_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Short label for a room type, for metric labels.
pub fn room_type_label(room_type: RoomType) -> &'static str {
    room_type.as_str()
}
