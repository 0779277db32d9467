use actix_web::http::header;
use actix_web::{HttpResponse, Responder, get, web};
use heartcheck::Report;

use crate::state::AppState;

macros_utils::routes! {
    route bleed_route,
}

/// Check a host (or a URL naming one).
///
/// Always answers 200: the verdict lives in the JSON `code`, failures in
/// its `error` field.
#[get("/bleed/{target:.*}")]
pub async fn bleed_route(state: web::Data<AppState>, target: web::Path<String>) -> impl Responder {
    let verdict = state.orchestrator.check_within(&target, state.request_timeout).await;

    HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .json(Report::from(verdict))
}
