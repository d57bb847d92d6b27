use super::*;
use crate::engine::{RideEngine, RideError};

use rocket::serde::{Deserialize, Serialize};
use rocket::serde::json::Error as JsonError;
use std::sync::{Mutex, MutexGuard};

use log::{error, info, warn};

/// The response of every route: a status and a JSON body
pub type ApiResponse = (Status, Json<Value>);

// Models for Input Check
#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct UserDoc {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub car_plate: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct RideDoc {
    #[serde(default)]
    pub ride_date_and_time: Option<String>,
    #[serde(default)]
    pub final_address: Option<String>,
    #[serde(default)]
    pub allowed_spaces: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct JoinDoc {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default = "default_spaces")]
    pub occupied_spaces: i64,
}

fn default_spaces() -> i64 {
    1
}

/// Confirmed passengers who showed up at departure
#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct StartDoc {
    #[serde(default)]
    pub present: Vec<String>,
}

// Util struct for rocket::manage, one lock around the whole engine
pub struct EngineState {
    pub engine: Mutex<RideEngine>,
}

impl EngineState {
    pub fn new(engine: RideEngine) -> Self {
        EngineState { engine: Mutex::new(engine) }
    }
}

///
///Lock the engine for one operation
///
///OUTPUT: the guard, or a ready 500 if a previous holder panicked
///
pub fn lock_engine<'a>(state: &'a EngineState, route: &Route) -> Result<MutexGuard<'a, RideEngine>, ApiResponse> {
    state.engine.lock().map_err(|_| {
        error!("{}", format!("Engine lock poisoned while serving {}", route));
        (Status::InternalServerError, error_body("engine unavailable"))
    })
}

pub fn error_body(message: &str) -> Json<Value> {
    Json(serde_json::json!({ "error": message }))
}

/// Protocol code of an engine failure
pub fn error_status(err: &RideError) -> Status {
    match err {
        RideError::NotFound(_) => Status::NotFound,
        RideError::BusinessRuleViolation(_) => Status::UnprocessableEntity,
        RideError::InvalidInput(_) => Status::BadRequest,
        RideError::Storage(_) => Status::InternalServerError,
    }
}

///
///Turn an engine result into a response
///
///INPUT:  the result, the status on success, the route and who asked
///OUTPUT: the status and the serialized entity or `{"error": ...}`
///
pub fn respond<T: Serialize>(result: Result<T, RideError>, success: Status, route: &Route, actor: &str) -> ApiResponse {
    let value = match result {
        Err(e) => {
            let status = error_status(&e);
            if status == Status::InternalServerError {
                error!("{}", format!("Server>>Client:\tFailing action {} for {}: {}", route, actor, e));
            } else {
                warn!("{}", format!("Server>>Client:\tRefusing action {} for {}: {}", route, actor, e));
            }
            return (status, error_body(&e.to_string()));
        },
        Ok(value) => value,
    };

    match serde_json::to_value(value) {
        Err(e) => {
            error!("{}", format!("Could not serialize the answer of {}: {}", route, e));
            (Status::InternalServerError, error_body("could not serialize response"))
        },
        Ok(body) => {
            info!("{}", format!("Server>>Client:\tApproving action {} for {}", route, actor));
            (success, Json(body))
        },
    }
}

/// A body rocket could not parse is a 400 like any other bad input
pub fn bad_body(e: JsonError<'_>, route: &Route, actor: &str) -> ApiResponse {
    warn!("{}", format!("Server>>Client:\tUnreadable body for {} from {}: {}", route, actor, e));
    (Status::BadRequest, error_body(&format!("invalid input: {}", e)))
}
