use actix_web::http::header;
use actix_web::{HttpResponse, web};

use crate::state::AppState;

/// Everything without a route of its own lands on the configured page.
pub async fn redirect(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Found().insert_header((header::LOCATION, state.redirect_url.as_str())).finish()
}
