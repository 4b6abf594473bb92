/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use once_cell::sync::Lazy;
use prometheus::{
    opts, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge, Histogram, HistogramVec, IntCounter,
    IntCounterVec, IntGauge,
};

pub static INCOMING_API: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        opts!("http_request_duration_seconds", "Incoming API requests").into(),
        &["method", "handler", "status_code", "code", "version"]
    )
    .expect("Failed to register incoming API metrics")
});

pub static TOTAL_LOCATION_UPDATES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("total_location_updates", "Total Location Updates")
        .expect("Failed to register total location updates metrics")
});

pub static TOTAL_RIDE_REQUESTS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("total_ride_requests", "Total Ride Requests")
        .expect("Failed to register total ride requests metrics")
});

pub static MATCHED_DRIVERS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "matched_drivers_per_request",
        "Drivers within radius per ride request",
        vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .expect("Failed to register matched drivers metrics")
});

pub static DISPATCH_DELIVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("dispatch_deliveries", "Ride request deliveries by outcome"),
        &["status"]
    )
    .expect("Failed to register dispatch deliveries metrics")
});

pub static STORAGE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("storage_errors", "Location storage failures by operation"),
        &["operation"]
    )
    .expect("Failed to register storage errors metrics")
});

pub static LIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("live_connections", "Open websocket connections")
        .expect("Failed to register live connections metrics")
});

/// Observes the duration of an incoming API request into `INCOMING_API`.
#[macro_export]
macro_rules! incoming_api {
    ($method:expr, $endpoint:expr, $status:expr, $code:expr, $start:expr) => {
        let duration = $start.elapsed().as_secs_f64();
        let version = std::env::var("DEPLOYMENT_VERSION").unwrap_or("DEV".to_string());
        INCOMING_API
            .with_label_values(&[$method, $endpoint, $status, $code, version.as_str()])
            .observe(duration);
    };
}

/// Builds the `/metrics` endpoint middleware with every service metric registered.
///
/// # Panics
///
/// * If the exporter cannot be built or a metric is registered twice.
pub fn prometheus_metrics() -> PrometheusMetrics {
    let prometheus = PrometheusMetricsBuilder::new("ride_dispatch")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus Metrics");

    prometheus
        .registry
        .register(Box::new(INCOMING_API.to_owned()))
        .expect("Failed to register incoming API metrics");

    prometheus
        .registry
        .register(Box::new(TOTAL_LOCATION_UPDATES.to_owned()))
        .expect("Failed to register total location updates metrics");

    prometheus
        .registry
        .register(Box::new(TOTAL_RIDE_REQUESTS.to_owned()))
        .expect("Failed to register total ride requests metrics");

    prometheus
        .registry
        .register(Box::new(MATCHED_DRIVERS.to_owned()))
        .expect("Failed to register matched drivers metrics");

    prometheus
        .registry
        .register(Box::new(DISPATCH_DELIVERIES.to_owned()))
        .expect("Failed to register dispatch deliveries metrics");

    prometheus
        .registry
        .register(Box::new(STORAGE_ERRORS.to_owned()))
        .expect("Failed to register storage errors metrics");

    prometheus
        .registry
        .register(Box::new(LIVE_CONNECTIONS.to_owned()))
        .expect("Failed to register live connections metrics");

    prometheus
}
