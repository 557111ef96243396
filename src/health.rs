use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn root(state: web::Data<AppState>) -> HttpResponse {
    let config = state.config();

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "message": "Voice detection API running",
        "endpoint": "/api/voice-detection",
        "accepted_formats": config.detection.accepted_formats
    }))
}

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.config();
    let uptime_seconds = state.get_uptime_seconds();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": "voice-detection-backend",
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "active_detections": metrics.active_detections,
            "detections": {
                "ai_generated": metrics.ai_detections,
                "human": metrics.human_detections
            }
        },
        "detection": {
            "accepted_formats": config.detection.accepted_formats,
            "centroid_variance_threshold": config.detection.centroid_variance_threshold,
            "fft_size": config.detection.fft_size,
            "hop_size": config.detection.hop_size
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
            "total_duration_ms": metric.total_duration_ms
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "active_detections": metrics.active_detections,
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "detections": {
            "ai_generated": metrics.ai_detections,
            "human": metrics.human_detections
        },
        "endpoints": endpoint_stats
    }))
}
