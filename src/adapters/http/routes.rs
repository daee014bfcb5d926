use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::adapters::http::state::HttpState;
use crate::adapters::render::{encode_jpeg, render_overlay};
use crate::application::dto::{CameraEntry, CaptureRequest, DisplayQuery, SubmitResponse};
use crate::domain::{camera::CameraId, errors::DomainError};

const JPEG_QUALITY: u8 = 85;

fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: DomainError) -> Response {
    (status_for(&e), Json(json!({ "error": e.to_string() }))).into_response()
}

fn jpeg_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()
}

pub async fn get_config(State(st): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "config": st.config.as_ref(),
        "detection_available": st.detection.is_available(),
    }))
}

pub async fn list_cameras(State(st): State<HttpState>) -> Response {
    match st.camera.list_cameras().await {
        Ok(cameras) => {
            let res: Vec<CameraEntry> = cameras.into_iter().map(CameraEntry::from).collect();
            Json(res).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn submit_image(State(st): State<HttpState>, body: Bytes) -> Response {
    match st.detection.submit_upload(body.to_vec()).await {
        Ok(generation) => Json(SubmitResponse { ok: true, generation }).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn capture(State(st): State<HttpState>, Json(req): Json<CaptureRequest>) -> Response {
    match st.detection.capture_from(CameraId::from_index(req.camera_index)).await {
        Ok(generation) => Json(SubmitResponse { ok: true, generation }).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_results(State(st): State<HttpState>, Query(q): Query<DisplayQuery>) -> impl IntoResponse {
    Json(st.detection.store().snapshot().view(q.size()))
}

pub async fn get_image(State(st): State<HttpState>) -> Response {
    let Some(image) = st.detection.store().current().image else {
        return error_response(DomainError::NotFound("no image submitted".into()));
    };
    let encoded = tokio::task::spawn_blocking(move || encode_jpeg(&image, JPEG_QUALITY)).await;
    match encoded {
        Ok(Ok(bytes)) => jpeg_response(bytes),
        Ok(Err(e)) => error_response(DomainError::OperationFailed(format!("{e:#}"))),
        Err(e) => error_response(DomainError::OperationFailed(e.to_string())),
    }
}

/// Current image letterboxed into the display area with its boxes drawn.
pub async fn get_overlay(State(st): State<HttpState>, Query(q): Query<DisplayQuery>) -> Response {
    let (w, h) = match q.canvas((st.config.display_width, st.config.display_height)) {
        Ok(canvas) => canvas,
        Err(e) => return error_response(e),
    };
    let state = st.detection.store().current();
    let Some(image) = state.image else {
        return error_response(DomainError::NotFound("no image submitted".into()));
    };
    let detections = state.snapshot.detections;

    let encoded = tokio::task::spawn_blocking(move || {
        let canvas = render_overlay(&image, &detections, w, h);
        encode_jpeg(&canvas, JPEG_QUALITY)
    })
    .await;
    match encoded {
        Ok(Ok(bytes)) => jpeg_response(bytes),
        Ok(Err(e)) => error_response(DomainError::OperationFailed(format!("{e:#}"))),
        Err(e) => error_response(DomainError::OperationFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use serde_json::Value;

    use crate::application::testing::{Call, FakeEngine};
    use crate::domain::{
        detection::Detection,
        geometry::NormalizedRect,
        snapshot::{DetectionStatus, ImageSource},
    };

    fn dog() -> Detection {
        Detection {
            label: "dog".into(),
            class_id: 16,
            confidence: 0.9,
            bounding_box: NormalizedRect::new(0.25, 0.35, 0.5, 0.55),
        }
    }

    fn display(w: f32, h: f32) -> Query<DisplayQuery> {
        Query(DisplayQuery { display_width: Some(w), display_height: Some(h) })
    }

    async fn body(resp: Response) -> Vec<u8> {
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec()
    }

    async fn body_json(resp: Response) -> Value {
        serde_json::from_slice(&body(resp).await).expect("json body")
    }

    /// Submits a 1000x500 image with one dog and waits for the batch.
    async fn state_with_dog() -> HttpState {
        let st = HttpState::in_memory(Some(FakeEngine::new(vec![(1000, Call::ok(vec![dog()]))])));
        let g = st.detection.submit(RgbImage::new(1000, 500), ImageSource::Upload);
        let mut rx = st.detection.store().subscribe();
        rx.wait_for(|s| s.snapshot.generation == g && s.snapshot.status == DetectionStatus::Ready)
            .await
            .expect("store alive");
        st
    }

    #[test]
    fn domain_errors_map_to_http_status() {
        assert_eq!(status_for(&DomainError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&DomainError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&DomainError::Unavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&DomainError::OperationFailed("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn results_carry_mapped_display_rects() {
        let st = state_with_dog().await;

        let resp = get_results(State(st), display(500.0, 500.0)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;

        assert_eq!(v["status"], "ready");
        assert_eq!(v["summary"], "1 dog");
        assert_eq!(v["letterbox"]["offset_y"], 125.0);
        let d = &v["detections"][0];
        assert_eq!(d["label"], "dog");
        let r = &d["display_rect"];
        let close = |key: &str, want: f64| (r[key].as_f64().expect(key) - want).abs() < 1e-3;
        assert!(close("x", 125.0) && close("y", 150.0), "rect {r}");
        assert!(close("width", 250.0) && close("height", 275.0), "rect {r}");
    }

    #[tokio::test]
    async fn results_without_display_have_no_rects() {
        let st = state_with_dog().await;
        let v = body_json(get_results(State(st), Query(DisplayQuery::default())).await.into_response()).await;
        assert!(v["detections"][0]["display_rect"].is_null());
        assert!(v["letterbox"].is_null());
    }

    #[tokio::test]
    async fn image_is_not_found_until_submitted() {
        let st = HttpState::in_memory(None);
        assert_eq!(get_image(State(st.clone())).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            get_overlay(State(st.clone()), Query(DisplayQuery::default())).await.status(),
            StatusCode::NOT_FOUND
        );

        st.detection.submit(RgbImage::new(8, 4), ImageSource::Upload);
        let resp = get_image(State(st)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/jpeg");
        let decoded = image::load_from_memory(&body(resp).await).expect("jpeg");
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[tokio::test]
    async fn overlay_is_rendered_at_requested_size() {
        let st = state_with_dog().await;

        let resp = get_overlay(State(st.clone()), display(300.0, 200.0)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let decoded = image::load_from_memory(&body(resp).await).expect("jpeg");
        assert_eq!((decoded.width(), decoded.height()), (300, 200));

        let resp = get_overlay(State(st), Query(DisplayQuery::default())).await;
        let decoded = image::load_from_memory(&body(resp).await).expect("jpeg");
        assert_eq!((decoded.width(), decoded.height()), (640, 480));
    }

    #[tokio::test]
    async fn oversized_overlay_is_rejected() {
        let st = state_with_dog().await;
        let resp = get_overlay(State(st.clone()), display(1e12, 1e12)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = get_overlay(State(st), display(100_000.0, 10.0)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn submit_and_capture_report_source_errors() {
        let st = HttpState::in_memory(None);

        let resp = submit_image(State(st.clone()), Bytes::new()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = capture(State(st.clone()), Json(CaptureRequest { camera_index: 5 })).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(st.detection.store().snapshot().generation, 0);

        let resp = submit_image(State(st.clone()), Bytes::from_static(b"jpeg")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["ok"], true);
        assert_eq!(v["generation"], 1);

        let v = body_json(capture(State(st), Json(CaptureRequest { camera_index: 0 })).await).await;
        assert_eq!(v["generation"], 2);
    }

    #[tokio::test]
    async fn config_and_cameras_are_listed() {
        let st = HttpState::in_memory(None);

        let v = body_json(get_config(State(st.clone())).await.into_response()).await;
        assert_eq!(v["detection_available"], false);
        assert_eq!(v["config"]["display_width"], 640);

        let v = body_json(list_cameras(State(st)).await).await;
        assert_eq!(v[0]["index"], 0);
        assert_eq!(v[0]["path"], "/dev/video0");
    }
}
