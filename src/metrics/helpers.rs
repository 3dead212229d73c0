//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CHAT_EVENTS_TOTAL, CHAT_REJECTIONS_TOTAL, MESSAGES_DELIVERED_TOTAL, MESSAGES_DROPPED_TOTAL,
    WS_MESSAGES_RECEIVED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording chat event metrics
pub struct ChatMetrics;

impl ChatMetrics {
    pub fn record_join() {
        CHAT_EVENTS_TOTAL.with_label_values(&["join"]).inc();
    }

    pub fn record_message() {
        CHAT_EVENTS_TOTAL.with_label_values(&["message"]).inc();
    }

    pub fn record_location() {
        CHAT_EVENTS_TOTAL.with_label_values(&["location"]).inc();
    }

    pub fn record_leave() {
        CHAT_EVENTS_TOTAL.with_label_values(&["leave"]).inc();
    }

    /// Record a rejected event, labelled by error code
    pub fn record_rejected(reason: &str) {
        CHAT_REJECTIONS_TOTAL.with_label_values(&[reason]).inc();
    }
}

/// Helper struct for recording delivery metrics
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    pub fn record_delivered(count: u64) {
        MESSAGES_DELIVERED_TOTAL.inc_by(count);
    }

    pub fn record_dropped(count: u64) {
        MESSAGES_DROPPED_TOTAL.inc_by(count);
    }
}

/// Helper struct for recording inbound WebSocket frames
pub struct WsMessageMetrics;

impl WsMessageMetrics {
    pub fn record_event(event: &str) {
        WS_MESSAGES_RECEIVED.with_label_values(&[event]).inc();
    }

    pub fn record_invalid() {
        WS_MESSAGES_RECEIVED.with_label_values(&["invalid"]).inc();
    }
}
