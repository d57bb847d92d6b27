//!
//! The ride and participation state machines.
//!
//! Every transition validates first and mutates only once all of its
//! checks pass, so a refused transition leaves the ride untouched.
//!

use super::errors::RideError;
use crate::store::models::{Participation, ParticipationStatus, Ride, RideStatus, User};
use crate::store::store_utils::parse_iso_timestamp;

use chrono::NaiveDateTime;
use std::collections::HashSet;

/// Parses an ISO-8601 timestamp, with or without offset, or a bare date
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, RideError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RideError::invalid("rideDateAndTime is required"));
    }
    parse_iso_timestamp(value)
        .ok_or_else(|| RideError::invalid(format!("'{}' is not an ISO-8601 timestamp", value)))
}

/// A positive seat count
pub fn positive_spaces(value: i64, field: &str) -> Result<u32, RideError> {
    if value < 1 {
        return Err(RideError::invalid(format!("{} must be at least 1, got {}", field, value)));
    }
    u32::try_from(value).map_err(|_| RideError::invalid(format!("{} is too large: {}", field, value)))
}

/// A non-blank text field, trimmed
pub fn required_text(value: &str, field: &str) -> Result<String, RideError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RideError::invalid(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

impl Ride {
    /// A freshly published ride, always `ready` with no participants
    pub fn publish(
        id: u64,
        ride_date_and_time: NaiveDateTime,
        final_address: String,
        allowed_spaces: u32,
        ride_driver: User,
    ) -> Self {
        Ride {
            id,
            ride_date_and_time,
            final_address,
            allowed_spaces,
            ride_driver,
            status: RideStatus::Ready,
            participants: Vec::new(),
        }
    }

    fn require_status(&self, expected: RideStatus) -> Result<(), RideError> {
        if self.status.is_terminal() {
            return Err(RideError::rule(format!("ride {} is {} and can no longer change", self.id, self.status)));
        }
        if self.status != expected {
            return Err(RideError::rule(format!(
                "ride {} is {}, expected {}",
                self.id, self.status, expected
            )));
        }
        Ok(())
    }

    fn participation_in(
        &mut self,
        alias: &str,
        expected: ParticipationStatus,
    ) -> Result<&mut Participation, RideError> {
        let ride_id = self.id;
        let participation = self.participation_mut(alias).ok_or_else(|| {
            RideError::not_found(format!("participant '{}' on ride {}", alias, ride_id))
        })?;
        if participation.status.is_terminal() {
            return Err(RideError::rule(format!(
                "participant '{}' on ride {} is {} and can no longer change",
                alias, ride_id, participation.status
            )));
        }
        if participation.status != expected {
            return Err(RideError::rule(format!(
                "participant '{}' on ride {} is {}, expected {}",
                alias, ride_id, participation.status, expected
            )));
        }
        Ok(participation)
    }

    ///
    /// Queue a join request
    ///
    /// Every existing request counts against the capacity here, whatever
    /// its status.
    ///
    pub fn request_seat(
        &mut self,
        participant: User,
        destination: String,
        occupied_spaces: u32,
    ) -> Result<Participation, RideError> {
        self.require_status(RideStatus::Ready)?;

        if self.participation(&participant.alias).is_some() {
            return Err(RideError::rule(format!(
                "'{}' already requested to join ride {}",
                participant.alias, self.id
            )));
        }

        let requested = self.requested_spaces();
        if requested.saturating_add(occupied_spaces) > self.allowed_spaces {
            return Err(RideError::rule(format!(
                "ride {} has {} of {} spaces requested, cannot fit {} more",
                self.id, requested, self.allowed_spaces, occupied_spaces
            )));
        }

        let participation = Participation {
            confirmation: None,
            destination,
            occupied_spaces,
            participant,
            status: ParticipationStatus::Waiting,
        };
        self.participants.push(participation.clone());
        Ok(participation)
    }

    /// Accept a waiting request, first confirmed wins the seats
    pub fn accept(&mut self, alias: &str, now: NaiveDateTime) -> Result<Participation, RideError> {
        let confirmed = self.confirmed_spaces_except(alias);
        let allowed = self.allowed_spaces;
        let ride_id = self.id;

        let participation = self.participation_in(alias, ParticipationStatus::Waiting)?;
        if confirmed.saturating_add(participation.occupied_spaces) > allowed {
            return Err(RideError::rule(format!(
                "ride {} has {} of {} spaces confirmed, cannot confirm {} more for '{}'",
                ride_id, confirmed, allowed, participation.occupied_spaces, alias
            )));
        }

        participation.status = ParticipationStatus::Confirmed;
        participation.confirmation = Some(now);
        Ok(participation.clone())
    }

    pub fn reject(&mut self, alias: &str) -> Result<Participation, RideError> {
        let participation = self.participation_in(alias, ParticipationStatus::Waiting)?;
        participation.status = ParticipationStatus::Rejected;
        Ok(participation.clone())
    }

    ///
    /// Start the ride, recording who showed up
    ///
    /// Confirmed passengers in `present` board, the others are `missing`.
    /// Refused while any request is still `waiting`.
    ///
    pub fn start(&mut self, present: &HashSet<String>) -> Result<(), RideError> {
        self.require_status(RideStatus::Ready)?;

        let unresolved: Vec<&str> = self
            .participants
            .iter()
            .filter(|p| !matches!(p.status, ParticipationStatus::Confirmed | ParticipationStatus::Rejected))
            .map(|p| p.participant.alias.as_str())
            .collect();
        if !unresolved.is_empty() {
            return Err(RideError::rule(format!(
                "ride {} still has unresolved requests from: {}",
                self.id,
                unresolved.join(", ")
            )));
        }

        for participation in self.participants.iter_mut() {
            if participation.status != ParticipationStatus::Confirmed {
                continue;
            }
            participation.status = if present.contains(&participation.participant.alias) {
                ParticipationStatus::InProgress
            } else {
                ParticipationStatus::Missing
            };
        }
        self.status = RideStatus::InProgress;
        Ok(())
    }

    /// End the ride, anyone still aboard becomes `notmarked`
    pub fn end(&mut self) -> Result<(), RideError> {
        self.require_status(RideStatus::InProgress)?;

        for participation in self.participants.iter_mut() {
            if participation.status == ParticipationStatus::InProgress {
                participation.status = ParticipationStatus::NotMarked;
            }
        }
        self.status = RideStatus::Completed;
        Ok(())
    }

    /// Confirm the drop-off of one passenger
    pub fn unload(&mut self, alias: &str) -> Result<Participation, RideError> {
        self.require_status(RideStatus::InProgress)?;
        let participation = self.participation_in(alias, ParticipationStatus::InProgress)?;
        participation.status = ParticipationStatus::Completed;
        Ok(participation.clone())
    }
}
