use actix_web::{HttpResponse, Responder, get};

macros_utils::routes! {
    route status_route,
}

/// Liveness probe.
#[get("/status")]
pub async fn status_route() -> impl Responder {
    HttpResponse::Ok().body("OK")
}
