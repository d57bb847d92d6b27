use super::*;

use rocket::State;

use log::info;

pub fn get_routes() -> Vec<Route> {
    routes![
        get_users,
        get_user,
        get_user_stats,
        get_driver_rides,
        get_ride_detail,
    ]
}

///
///All users
///
#[get("/users")]
async fn get_users(state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\tlisting users via {}", route));
    let engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.list_users(), Status::Ok, route, "anyone")
}

#[get("/users/<alias>")]
async fn get_user(alias: &str, state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.get_user(alias), Status::Ok, route, alias)
}

///
///Participation history of a rider, all zeros for an unknown alias
///
#[get("/users/<alias>/stats")]
async fn get_user_stats(alias: &str, state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.compute_participant_stats(alias), Status::Ok, route, alias)
}

///
///Rides published by a driver
///
#[get("/users/<alias>/rides")]
async fn get_driver_rides(alias: &str, state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.list_rides_for_driver(alias), Status::Ok, route, alias)
}

///
///One ride of a driver, each participant with their history
///
#[get("/users/<alias>/rides/<ride_id>")]
async fn get_ride_detail(alias: &str, ride_id: u64, state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.get_ride_detail(alias, ride_id), Status::Ok, route, alias)
}
