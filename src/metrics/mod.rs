//! Prometheus metrics for the chat relay.
//!
//! - Connection metrics (open sockets, joined sessions, rooms)
//! - Chat event metrics (joins, messages, locations, leaves, rejections)
//! - Delivery metrics (frames enqueued and dropped)

mod helpers;

pub use helpers::{encode_metrics, ChatMetrics, DeliveryMetrics, WsMessageMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "chat";

lazy_static! {
    // ============================================================================
    // Connection Metrics
    // ============================================================================

    /// Total number of open WebSocket connections
    pub static ref CONNECTIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_connections_total", METRIC_PREFIX),
        "Total number of open WebSocket connections"
    ).unwrap();

    /// Number of connections that have joined a room
    pub static ref SESSIONS_JOINED: IntGauge = register_int_gauge!(
        format!("{}_sessions_joined", METRIC_PREFIX),
        "Number of connections that have joined a room"
    ).unwrap();

    /// Rooms with at least one member
    pub static ref ROOMS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_rooms_active", METRIC_PREFIX),
        "Total number of rooms with at least one member"
    ).unwrap();

    /// WebSocket connections opened
    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_opened_total", METRIC_PREFIX),
        "Total WebSocket connections opened"
    ).unwrap();

    /// WebSocket connections closed
    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "Total WebSocket connections closed"
    ).unwrap();

    /// WebSocket connection duration
    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_ws_connection_duration_seconds", METRIC_PREFIX),
        "WebSocket connection duration in seconds",
        vec![1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0]
    ).unwrap();

    /// Frames received from clients by event name
    pub static ref WS_MESSAGES_RECEIVED: IntCounterVec = register_int_counter_vec!(
        format!("{}_ws_messages_received_total", METRIC_PREFIX),
        "Total WebSocket frames received from clients",
        &["event"]
    ).unwrap();

    // ============================================================================
    // Chat Metrics
    // ============================================================================

    /// Chat events handled by kind (join, message, location, leave)
    pub static ref CHAT_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_total", METRIC_PREFIX),
        "Total chat events handled",
        &["event"]
    ).unwrap();

    /// Chat events rejected by reason
    pub static ref CHAT_REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_rejections_total", METRIC_PREFIX),
        "Total chat events rejected",
        &["reason"]
    ).unwrap();

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Frames enqueued to connections
    pub static ref MESSAGES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_delivered_total", METRIC_PREFIX),
        "Total frames enqueued to connections"
    ).unwrap();

    /// Frames dropped because the connection was gone or its queue was full
    pub static ref MESSAGES_DROPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_dropped_total", METRIC_PREFIX),
        "Total frames dropped before reaching a connection"
    ).unwrap();
}
