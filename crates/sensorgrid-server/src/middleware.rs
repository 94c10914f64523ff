use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Tags every request with an `x-request-id` and mirrors it on the
/// response. A client-supplied id wins so traces can span services;
/// otherwise one is minted here. The id also lands in the request
/// extensions, where the trace span picks it up.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let id = match req.headers().get(&REQUEST_ID) {
        Some(incoming) => incoming.clone(),
        None => HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
    };
    req.extensions_mut().insert(id.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(REQUEST_ID.clone(), id);
    res
}
