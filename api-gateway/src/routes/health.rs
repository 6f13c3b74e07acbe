//! `GET /health`.

use lambda_http::http::Method;
use lambda_http::{Body, Request, Response};
use serde_json::json;
use shared::{error_response, json_response, ApiRequest, Pipeline};

use crate::router::{match_route, normalize_path, route_not_found};
use crate::schemas;

pub async fn handle(event: Request) -> Response<Body> {
    let path = normalize_path(event.uri().path()).to_string();

    match match_route("/health", &path) {
        Some(params) if *event.method() == Method::GET => {
            let request = ApiRequest::from_lambda(&event, params);
            Pipeline::builder()
                .validate(schemas::health())
                .run(request, |_| async {
                    json_response(200, &json!({ "ok": true, "service": "api" }))
                })
                .await
        }
        _ => error_response(&route_not_found()),
    }
}
