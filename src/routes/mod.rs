//!
//! Documentation of the routes module.
//! The HTTP surface of RidePool, every route is a thin call into the engine.
//!

pub mod get_routes;
pub mod post_routes;
pub mod routes_utils;

use rocket::serde::json::{Json, Value};
use rocket::{Catcher, Request, Route};
use rocket::http::Status;

pub use routes_utils::*;

use log::warn;

use get_routes::get_routes;
use post_routes::post_routes;

pub fn routes() -> Vec<Route> {
    let mut routes = get_routes();
    routes.append(&mut post_routes());
    routes
}

/// JSON bodies for the errors rocket answers by itself
#[catch(default)]
fn default_catcher(status: Status, request: &Request<'_>) -> (Status, Json<Value>) {
    warn!("{}", format!("Server>>Client:\t{} for {} {}", status, request.method(), request.uri()));
    (status, error_body(status.reason().unwrap_or("unknown error")))
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}
