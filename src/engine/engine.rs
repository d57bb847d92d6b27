//!
//! Documentation of the engine.
//! Resolves every ride operation against the entity store.
//!
//! Each mutating operation reads the records it needs, validates against
//! the state machine on a typed copy, writes the copy back and persists.
//! When persisting fails the store is put back the way it was and the
//! operation reports `Storage`, as if it never happened.
//!

use super::errors::RideError;
use super::lifecycle::{parse_timestamp, positive_spaces, required_text};
use super::stats::{ParticipantStats, RideDetail};
use crate::store::models::{Participation, Ride, User, RIDE, USER};
use crate::store::store_utils::{by_field, from_record, next_id, to_record};
use crate::store::{EntityStore, Record};

use chrono::Local;
use std::collections::HashSet;

use log::{debug, error, info, warn};

pub struct RideEngine {
    store: EntityStore,
}

impl RideEngine {
    pub fn new(store: EntityStore) -> Self {
        RideEngine { store }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    //
    // LOOKUPS
    //

    fn find_user(&self, alias: &str) -> Result<Option<User>, RideError> {
        match self.store.get_filtered(USER, &by_field("alias", alias)).first() {
            None => Ok(None),
            Some(record) => Ok(Some(from_record(record)?)),
        }
    }

    fn require_user(&self, alias: &str, role: &str) -> Result<User, RideError> {
        self.find_user(alias)?
            .ok_or_else(|| RideError::not_found(format!("{} '{}'", role, alias)))
    }

    fn all_rides(&self) -> Result<Vec<Ride>, RideError> {
        let records = self.store.get(RIDE).unwrap_or_default();
        let mut rides = Vec::with_capacity(records.len());
        for record in records {
            rides.push(from_record(record)?);
        }
        Ok(rides)
    }

    /// The ride `ride_id`, which has to be driven by `driver_alias`
    fn ride_for_driver(&self, driver_alias: &str, ride_id: u64) -> Result<Ride, RideError> {
        self.require_user(driver_alias, "driver")?;

        let ride: Ride = match self.store.get_filtered(RIDE, &by_field("id", ride_id)).first() {
            None => return Err(RideError::not_found(format!("ride {}", ride_id))),
            Some(record) => from_record(record)?,
        };
        if !ride.is_driven_by(driver_alias) {
            return Err(RideError::not_found(format!(
                "ride {} for driver '{}'",
                ride_id, driver_alias
            )));
        }
        Ok(ride)
    }

    //
    // COMMITS
    //

    /// Append a record and persist, dropping it again if the disk refuses
    fn commit_new(&mut self, entity: &str, record: Record, key: Record) -> Result<(), RideError> {
        self.store.add(entity, record);
        if let Err(e) = self.store.persist() {
            error!("{}", format!("Rolling back new {} record: {}", entity, e));
            self.store.delete_filtered(entity, &key);
            return Err(e.into());
        }
        Ok(())
    }

    /// Replace a ride and persist, restoring `previous` if the disk refuses
    fn commit_ride(&mut self, previous: &Ride, updated: &Ride) -> Result<(), RideError> {
        let key = by_field("id", updated.id);
        let restore = to_record(RIDE, previous)?;
        let patch = to_record(RIDE, updated)?;

        self.store.update_filtered(RIDE, &key, &patch);
        if let Err(e) = self.store.persist() {
            error!("{}", format!("Rolling back ride {}: {}", updated.id, e));
            self.store.update_filtered(RIDE, &key, &restore);
            return Err(e.into());
        }
        Ok(())
    }

    /// Load a driver's ride, run one transition on a copy and commit it
    fn transition<T, F>(&mut self, driver_alias: &str, ride_id: u64, action: &str, step: F) -> Result<(Ride, T), RideError>
    where
        F: FnOnce(&mut Ride) -> Result<T, RideError>,
    {
        let previous = self.ride_for_driver(driver_alias, ride_id)?;
        let mut ride = previous.clone();

        let outcome = match step(&mut ride) {
            Ok(value) => value,
            Err(e) => {
                warn!("{}", format!("Refused {} on ride {}: {}", action, ride_id, e));
                return Err(e);
            },
        };

        self.commit_ride(&previous, &ride)?;
        Ok((ride, outcome))
    }

    //
    // USER ACTIONS
    //

    ///
    /// Register a user
    ///
    /// # Output
    ///
    /// * Err(InvalidInput) - alias or name is blank
    /// * Err(BusinessRuleViolation) - the alias is taken
    /// * Ok(user) - the stored user
    ///
    pub fn create_user(&mut self, alias: &str, name: &str, car_plate: Option<String>) -> Result<User, RideError> {
        let alias = required_text(alias, "alias")?;
        let name = required_text(name, "name")?;
        let car_plate = car_plate
            .map(|plate| plate.trim().to_string())
            .filter(|plate| !plate.is_empty());

        if self.find_user(&alias)?.is_some() {
            return Err(RideError::rule(format!("alias '{}' is already registered", alias)));
        }

        let user = User { alias, name, car_plate };
        self.commit_new(USER, to_record(USER, &user)?, by_field("alias", user.alias.as_str()))?;

        info!("{}", format!("User '{}' registered", user.alias));
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>, RideError> {
        let records = self.store.get(USER).unwrap_or_default();
        let mut users = Vec::with_capacity(records.len());
        for record in records {
            users.push(from_record(record)?);
        }
        Ok(users)
    }

    pub fn get_user(&self, alias: &str) -> Result<User, RideError> {
        self.require_user(alias, "user")
    }

    //
    // RIDE ACTIONS
    //

    ///
    /// Publish a ride for a driver
    ///
    /// # Arguments
    ///
    /// * `date_time` - ISO-8601 timestamp of departure
    /// * `final_address` - Where the ride ends
    /// * `allowed_spaces` - Seat capacity, at least 1
    /// * `driver_alias` - An existing user
    ///
    /// # Log
    ///
    /// * `info` - "Ride {id} published ...", indicating success
    ///
    pub fn create_ride(
        &mut self,
        date_time: &str,
        final_address: &str,
        allowed_spaces: i64,
        driver_alias: &str,
    ) -> Result<Ride, RideError> {
        let ride_date_and_time = parse_timestamp(date_time)?;
        let final_address = required_text(final_address, "finalAddress")?;
        let allowed_spaces = positive_spaces(allowed_spaces, "allowedSpaces")?;
        let driver = self.require_user(driver_alias, "driver")?;

        let id = next_id(self.store.get(RIDE).unwrap_or_default());
        let ride = Ride::publish(id, ride_date_and_time, final_address, allowed_spaces, driver);
        self.commit_new(RIDE, to_record(RIDE, &ride)?, by_field("id", id))?;

        info!("{}", format!("Ride {} published by '{}' with {} spaces", id, driver_alias, allowed_spaces));
        Ok(ride)
    }

    /// Rides published by `alias`, empty when there are none
    pub fn list_rides_for_driver(&self, alias: &str) -> Result<Vec<Ride>, RideError> {
        Ok(self
            .all_rides()?
            .into_iter()
            .filter(|ride| ride.is_driven_by(alias))
            .collect())
    }

    /// A driver's ride with each participant's history attached
    pub fn get_ride_detail(&self, driver_alias: &str, ride_id: u64) -> Result<RideDetail, RideError> {
        let ride = self.ride_for_driver(driver_alias, ride_id)?;
        let history = self.all_rides()?;
        Ok(RideDetail::build(&ride, &history))
    }

    ///
    /// Ask for a seat on a ride
    ///
    /// # Output
    ///
    /// * Err(InvalidInput) - blank destination or `occupied_spaces` below 1
    /// * Err(NotFound) - driver, ride or participant missing
    /// * Err(BusinessRuleViolation) - ride not ready, duplicate request, no room
    /// * Ok(participation) - the new `waiting` participation
    ///
    pub fn request_to_join(
        &mut self,
        driver_alias: &str,
        ride_id: u64,
        participant_alias: &str,
        destination: &str,
        occupied_spaces: i64,
    ) -> Result<Participation, RideError> {
        let destination = required_text(destination, "destination")?;
        let occupied_spaces = positive_spaces(occupied_spaces, "occupiedSpaces")?;
        // fail fast on the ride before looking at the participant
        self.ride_for_driver(driver_alias, ride_id)?;
        let participant = self.require_user(participant_alias, "participant")?;

        let (_, participation) = self.transition(driver_alias, ride_id, "requestToJoin", |ride| {
            ride.request_seat(participant, destination, occupied_spaces)
        })?;

        info!("{}", format!("'{}' asked for {} space(s) on ride {}", participant_alias, occupied_spaces, ride_id));
        Ok(participation)
    }

    pub fn accept_participant(&mut self, driver_alias: &str, ride_id: u64, participant_alias: &str) -> Result<Participation, RideError> {
        let now = Local::now().naive_local();
        let (_, participation) = self.transition(driver_alias, ride_id, "accept", |ride| {
            ride.accept(participant_alias, now)
        })?;

        info!("{}", format!("'{}' confirmed on ride {}", participant_alias, ride_id));
        Ok(participation)
    }

    pub fn reject_participant(&mut self, driver_alias: &str, ride_id: u64, participant_alias: &str) -> Result<Participation, RideError> {
        let (_, participation) = self.transition(driver_alias, ride_id, "reject", |ride| {
            ride.reject(participant_alias)
        })?;

        info!("{}", format!("'{}' rejected on ride {}", participant_alias, ride_id));
        Ok(participation)
    }

    ///
    /// Start a ride
    ///
    /// # Arguments
    ///
    /// * `present_aliases` - Confirmed passengers who showed up, everyone else confirmed is `missing`
    ///
    pub fn start_ride(&mut self, driver_alias: &str, ride_id: u64, present_aliases: &HashSet<String>) -> Result<Ride, RideError> {
        let (ride, _) = self.transition(driver_alias, ride_id, "start", |ride| ride.start(present_aliases))?;

        info!("{}", format!("Ride {} started with {} space(s) aboard", ride_id, ride.held_spaces()));
        Ok(ride)
    }

    pub fn end_ride(&mut self, driver_alias: &str, ride_id: u64) -> Result<Ride, RideError> {
        let (ride, _) = self.transition(driver_alias, ride_id, "end", |ride| ride.end())?;

        info!("{}", format!("Ride {} completed", ride_id));
        Ok(ride)
    }

    pub fn unload_participant(&mut self, driver_alias: &str, ride_id: u64, participant_alias: &str) -> Result<Participation, RideError> {
        let (_, participation) = self.transition(driver_alias, ride_id, "unload", |ride| {
            ride.unload(participant_alias)
        })?;

        info!("{}", format!("'{}' dropped off from ride {}", participant_alias, ride_id));
        Ok(participation)
    }

    /// Count how every participation of `alias` ended up, all zeros for a stranger
    pub fn compute_participant_stats(&self, alias: &str) -> Result<ParticipantStats, RideError> {
        let stats = ParticipantStats::collect(&self.all_rides()?, alias);
        debug!("{}", format!("Stats for '{}': {:?}", alias, stats));
        Ok(stats)
    }
}
