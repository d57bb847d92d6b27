//!
//! Rider statistics and the driver's ride view.
//!

use crate::store::models::{Participation, ParticipationStatus, Ride, RideStatus, User};

use chrono::NaiveDateTime;
use serde::{Serialize, Deserialize};

/// How a rider's participations ended up, across every ride
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticipantStats {
    pub total: u32,
    pub completed: u32,
    pub missing: u32,
    pub notmarked: u32,
    pub rejected: u32,
}

impl ParticipantStats {
    /// Count every participation of `alias` over `rides`
    pub fn collect(rides: &[Ride], alias: &str) -> Self {
        let mut stats = ParticipantStats::default();
        for participation in rides
            .iter()
            .flat_map(|ride| ride.participants.iter())
            .filter(|p| p.participant.alias == alias)
        {
            stats.record(participation.status);
        }
        stats
    }

    fn record(&mut self, status: ParticipationStatus) {
        self.total += 1;
        match status {
            ParticipationStatus::Completed => self.completed += 1,
            ParticipationStatus::Missing => self.missing += 1,
            ParticipationStatus::NotMarked => self.notmarked += 1,
            ParticipationStatus::Rejected => self.rejected += 1,
            _ => {},
        }
    }
}

/// A participant snapshot annotated with the rider's history
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    #[serde(flatten)]
    pub user: User,
    pub previous_rides_total: u32,
    pub previous_rides_completed: u32,
    pub previous_rides_missing: u32,
    pub previous_rides_not_marked: u32,
    pub previous_rides_rejected: u32,
}

impl ParticipantSummary {
    fn new(user: User, stats: ParticipantStats) -> Self {
        ParticipantSummary {
            user,
            previous_rides_total: stats.total,
            previous_rides_completed: stats.completed,
            previous_rides_missing: stats.missing,
            previous_rides_not_marked: stats.notmarked,
            previous_rides_rejected: stats.rejected,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationDetail {
    pub confirmation: Option<NaiveDateTime>,
    pub destination: String,
    pub occupied_spaces: u32,
    pub participant: ParticipantSummary,
    pub status: ParticipationStatus,
}

/// What a driver sees of one of their rides
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RideDetail {
    pub id: u64,
    pub ride_date_and_time: NaiveDateTime,
    pub final_address: String,
    pub allowed_spaces: u32,
    /// The driver's alias
    pub driver: String,
    pub status: RideStatus,
    pub participants: Vec<ParticipationDetail>,
}

impl RideDetail {
    /// Build the view of `ride`, `history` being every ride in the store
    pub fn build(ride: &Ride, history: &[Ride]) -> Self {
        let participants = ride
            .participants
            .iter()
            .map(|p: &Participation| ParticipationDetail {
                confirmation: p.confirmation,
                destination: p.destination.clone(),
                occupied_spaces: p.occupied_spaces,
                participant: ParticipantSummary::new(
                    p.participant.clone(),
                    ParticipantStats::collect(history, &p.participant.alias),
                ),
                status: p.status,
            })
            .collect();

        RideDetail {
            id: ride.id,
            ride_date_and_time: ride.ride_date_and_time,
            final_address: ride.final_address.clone(),
            allowed_spaces: ride.allowed_spaces,
            driver: ride.ride_driver.alias.clone(),
            status: ride.status,
            participants,
        }
    }
}
