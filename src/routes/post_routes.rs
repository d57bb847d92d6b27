use super::*;

use rocket::serde::json::Error as JsonError;
use rocket::State;
use std::collections::HashSet;

use log::info;

pub fn post_routes() -> Vec<Route> {
    routes![
        post_user,
        post_ride,
        post_request_to_join,
        post_accept,
        post_reject,
        post_start,
        post_end,
        post_unload,
    ]
}

///
///Register a user
///
///INPUT:  `{alias, name, car_plate?}`
///OUTPUT: 201 and the user / 400 / 422 alias taken
///
#[post("/users", data = "<data>")]
async fn post_user(data: Result<Json<UserDoc>, JsonError<'_>>, state: &State<EngineState>, route: &Route) -> ApiResponse {
    let data = match data {
        Err(e) => return bad_body(e, route, "anyone"),
        Ok(value) => value.into_inner(),
    };
    let alias = data.alias.unwrap_or_default();
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", &alias, route));

    let mut engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    let result = engine.create_user(&alias, &data.name.unwrap_or_default(), data.car_plate);
    respond(result, Status::Created, route, &alias)
}

///
///Publish a ride
///
///INPUT:  driver alias, `{rideDateAndTime, finalAddress, allowedSpaces}`
///OUTPUT: 201 and the ride / 400 / 404 driver missing
///
#[post("/users/<alias>/rides", data = "<data>")]
async fn post_ride(alias: &str, data: Result<Json<RideDoc>, JsonError<'_>>, state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let data = match data {
        Err(e) => return bad_body(e, route, alias),
        Ok(value) => value.into_inner(),
    };

    let mut engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    let result = engine.create_ride(
        &data.ride_date_and_time.unwrap_or_default(),
        &data.final_address.unwrap_or_default(),
        data.allowed_spaces.unwrap_or_default(),
        alias,
    );
    respond(result, Status::Created, route, alias)
}

///
///Ask for a seat
///
///INPUT:  driver alias, ride ID, participant alias, `{destination, occupiedSpaces?}`
///OUTPUT: 201 and the waiting participation / 400 / 404 / 422
///
#[post("/users/<alias>/rides/<ride_id>/requestToJoin/<participant>", data = "<data>")]
async fn post_request_to_join(
    alias: &str,
    ride_id: u64,
    participant: &str,
    data: Result<Json<JoinDoc>, JsonError<'_>>,
    state: &State<EngineState>,
    route: &Route,
) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", participant, route));
    let data = match data {
        Err(e) => return bad_body(e, route, participant),
        Ok(value) => value.into_inner(),
    };

    let mut engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    let result = engine.request_to_join(
        alias,
        ride_id,
        participant,
        &data.destination.unwrap_or_default(),
        data.occupied_spaces,
    );
    respond(result, Status::Created, route, participant)
}

#[post("/users/<alias>/rides/<ride_id>/accept/<participant>")]
async fn post_accept(alias: &str, ride_id: u64, participant: &str, state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let mut engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.accept_participant(alias, ride_id, participant), Status::Ok, route, alias)
}

#[post("/users/<alias>/rides/<ride_id>/reject/<participant>")]
async fn post_reject(alias: &str, ride_id: u64, participant: &str, state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let mut engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.reject_participant(alias, ride_id, participant), Status::Ok, route, alias)
}

///
///Start a ride
///
///INPUT:  driver alias, ride ID, `{present: [alias, ...]}`
///OUTPUT: 200 and the ride / 404 / 422 requests still waiting
///
#[post("/users/<alias>/rides/<ride_id>/start", data = "<data>")]
async fn post_start(
    alias: &str,
    ride_id: u64,
    data: Result<Json<StartDoc>, JsonError<'_>>,
    state: &State<EngineState>,
    route: &Route,
) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let data = match data {
        Err(e) => return bad_body(e, route, alias),
        Ok(value) => value.into_inner(),
    };
    let present: HashSet<String> = data.present.into_iter().collect();

    let mut engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.start_ride(alias, ride_id, &present), Status::Ok, route, alias)
}

#[post("/users/<alias>/rides/<ride_id>/end")]
async fn post_end(alias: &str, ride_id: u64, state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let mut engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.end_ride(alias, ride_id), Status::Ok, route, alias)
}

///
///Confirm a drop-off
///
#[post("/users/<alias>/rides/<ride_id>/unloadParticipant/<participant>")]
async fn post_unload(alias: &str, ride_id: u64, participant: &str, state: &State<EngineState>, route: &Route) -> ApiResponse {
    info!("{}", format!("Client>>Server:\t{} is trying to access route: {}", alias, route));
    let mut engine = match lock_engine(state, route) {
        Err(response) => return response,
        Ok(value) => value,
    };
    respond(engine.unload_participant(alias, ride_id, participant), Status::Ok, route, alias)
}
