//!
//! Documentation of the Models module.
//! Contains all the models kept by the entity store and sent over the wire.
//!

use super::store_utils::{deserialize_optional_timestamp, deserialize_timestamp};

use chrono::NaiveDateTime;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Collection name of the users
pub const USER: &str = "User";
/// Collection name of the rides
pub const RIDE: &str = "Ride";
/// Collections that always exist, even on a fresh store
pub const KNOWN_ENTITIES: [&str; 2] = [USER, RIDE];

/// The lifecycle of a ride, only ever moves forward
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    /// Published, accepting join requests
    Ready,
    /// Started by the driver
    InProgress,
    /// Ended by the driver (terminal)
    #[serde(alias = "done")]
    Completed,
}

impl RideStatus {
    /// Nothing moves a ride out of this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ready => "ready",
            Self::InProgress => "inprogress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// The status of one passenger on one ride
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    /// Requested, the driver has not answered yet
    Waiting,
    /// Accepted by the driver
    Confirmed,
    /// Refused by the driver (terminal)
    Rejected,
    /// On board
    InProgress,
    /// Not present when the ride started (terminal)
    Missing,
    /// Dropped off by the driver (terminal)
    #[serde(alias = "done")]
    Completed,
    /// Still on board when the ride ended, drop-off never confirmed (terminal)
    #[serde(alias = "not_marked")]
    NotMarked,
}

impl ParticipationStatus {
    /// Nothing moves a participation out of this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Missing | Self::Completed | Self::NotMarked)
    }

    /// Statuses whose seats count against the capacity of a ride
    pub fn holds_seat(&self) -> bool {
        matches!(self, Self::Confirmed | Self::InProgress)
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::InProgress => "inprogress",
            Self::Missing => "missing",
            Self::Completed => "completed",
            Self::NotMarked => "notmarked",
        };
        f.write_str(s)
    }
}

/*
Models for the entity store
*/
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    /// The unique, immutable alias
    pub alias: String,
    /// The name of the user
    pub name: String,
    /// The plate of the user's car, drivers only
    #[serde(default)]
    pub car_plate: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
    /// When the driver accepted, null until then
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub confirmation: Option<NaiveDateTime>,
    pub destination: String,
    #[serde(default = "default_occupied_spaces")]
    pub occupied_spaces: u32,
    /// Snapshot of the passenger at request time
    pub participant: User,
    pub status: ParticipationStatus,
}

fn default_occupied_spaces() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    /// Store-wide sequential id
    pub id: u64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub ride_date_and_time: NaiveDateTime,
    pub final_address: String,
    /// Seat capacity
    pub allowed_spaces: u32,
    /// Snapshot of the driver at creation time
    pub ride_driver: User,
    pub status: RideStatus,
    /// Join requests, in request order
    #[serde(default)]
    pub participants: Vec<Participation>,
}

impl Ride {
    /// Find the participation of an alias
    pub fn participation(&self, alias: &str) -> Option<&Participation> {
        self.participants.iter().find(|p| p.participant.alias == alias)
    }

    pub fn participation_mut(&mut self, alias: &str) -> Option<&mut Participation> {
        self.participants.iter_mut().find(|p| p.participant.alias == alias)
    }

    /// Seats asked for by every participation, whatever its status
    pub fn requested_spaces(&self) -> u32 {
        self.participants.iter().map(|p| p.occupied_spaces).sum()
    }

    /// Seats held by confirmed and on-board passengers
    pub fn held_spaces(&self) -> u32 {
        self.participants
            .iter()
            .filter(|p| p.status.holds_seat())
            .map(|p| p.occupied_spaces)
            .sum()
    }

    /// Seats held by confirmed passengers other than `alias`
    pub fn confirmed_spaces_except(&self, alias: &str) -> u32 {
        self.participants
            .iter()
            .filter(|p| p.status == ParticipationStatus::Confirmed && p.participant.alias != alias)
            .map(|p| p.occupied_spaces)
            .sum()
    }

    /// Whether `alias` drives this ride
    pub fn is_driven_by(&self, alias: &str) -> bool {
        self.ride_driver.alias == alias
    }
}
