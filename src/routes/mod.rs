// Route exports
pub mod venues;

use actix_web::web;

pub use venues::{local_clock, AppState, Clock};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(venues::configure),
    );
}
