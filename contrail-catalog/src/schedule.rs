use crate::fleet::{Airplane, AirplaneId, FleetRegistry};
use chrono::{DateTime, Utc};
use contrail_core::{IdAllocator, LedgerError, LedgerResult};
use contrail_shared::{Amount, SeatClass};
use serde::{Deserialize, Serialize};

pub type FlightId = u64;

/// A scheduled flight.
///
/// `airplane` is a value copy taken at scheduling time. Its seat counters are
/// the remaining seats of this flight; changes to the fleet record after
/// scheduling never reach it, and selling seats never touches the fleet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub airplane_id: AirplaneId,
    pub airplane: Airplane,
    pub capacity_first: u32,
    pub capacity_economy: u32,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub price_first: Amount,
    pub price_economy: Amount,
}

impl Flight {
    pub fn remaining(&self, class: SeatClass) -> u32 {
        match class {
            SeatClass::First => self.airplane.seats_first,
            SeatClass::Economy => self.airplane.seats_economy,
        }
    }

    pub fn remaining_total(&self) -> u64 {
        self.airplane.total_seats()
    }

    pub fn capacity(&self, class: SeatClass) -> u32 {
        match class {
            SeatClass::First => self.capacity_first,
            SeatClass::Economy => self.capacity_economy,
        }
    }

    pub fn price(&self, class: SeatClass) -> Amount {
        match class {
            SeatClass::First => self.price_first,
            SeatClass::Economy => self.price_economy,
        }
    }

    pub fn sold(&self, class: SeatClass) -> u32 {
        self.capacity(class).saturating_sub(self.remaining(class))
    }

    /// True from the departure instant onwards.
    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        now >= self.departure_time
    }

    /// A canceled flight is cleared to the zero value.
    pub fn is_cleared(&self) -> bool {
        *self == Flight::default()
    }

    pub fn take_seat(&mut self, class: SeatClass) -> LedgerResult<()> {
        let counter = self.counter_mut(class);
        *counter = counter
            .checked_sub(1)
            .ok_or_else(|| LedgerError::InvariantViolation(format!("no {} seats left", class)))?;
        Ok(())
    }

    pub fn release_seat(&mut self, class: SeatClass) -> LedgerResult<()> {
        if self.remaining(class) >= self.capacity(class) {
            return Err(LedgerError::InvariantViolation(format!(
                "{} seats already at capacity {}",
                class,
                self.capacity(class)
            )));
        }
        *self.counter_mut(class) += 1;
        Ok(())
    }

    fn counter_mut(&mut self, class: SeatClass) -> &mut u32 {
        match class {
            SeatClass::First => &mut self.airplane.seats_first,
            SeatClass::Economy => &mut self.airplane.seats_economy,
        }
    }
}

/// Scheduled flights plus the high-water mark of departure times.
#[derive(Debug, Clone)]
pub struct FlightSchedule {
    flights: Vec<Flight>,
    ids: IdAllocator,
    latest_departure: DateTime<Utc>,
}

impl FlightSchedule {
    /// `start` seeds the departure high-water mark.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            flights: Vec::new(),
            ids: IdAllocator::new("flight"),
            latest_departure: start,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn schedule(
        &mut self,
        fleet: &mut FleetRegistry,
        airplane_id: AirplaneId,
        destination: &str,
        departure_time: DateTime<Utc>,
        price_first: Amount,
        price_economy: Amount,
        now: DateTime<Utc>,
    ) -> LedgerResult<FlightId> {
        if departure_time <= now {
            return Err(LedgerError::InvalidArgument(format!(
                "departure {} is not in the future",
                departure_time.to_rfc3339()
            )));
        }
        if destination.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("destination is empty".to_string()));
        }

        let airplane = fleet.get_mut(airplane_id)?;
        if airplane.is_cleared() {
            return Err(LedgerError::NotFound(format!("airplane {} was deleted", airplane_id)));
        }
        if airplane.on_hold {
            return Err(LedgerError::InvariantViolation(format!(
                "airplane {} is on hold",
                airplane_id
            )));
        }

        let id = self.ids.allocate();
        let snapshot = airplane.clone();
        airplane.flight_history.push(format!(
            "flight {} to {} departing {}",
            id,
            destination,
            departure_time.to_rfc3339()
        ));

        self.flights.push(Flight {
            airplane_id,
            capacity_first: snapshot.seats_first,
            capacity_economy: snapshot.seats_economy,
            airplane: snapshot,
            destination: destination.to_string(),
            departure_time,
            price_first,
            price_economy,
        });

        if departure_time > self.latest_departure {
            tracing::debug!("Withdrawal lock extended to {}", departure_time.to_rfc3339());
            self.latest_departure = departure_time;
        }

        Ok(id)
    }

    /// Clear a flight that has not departed yet.
    ///
    /// Outstanding tickets are left in place; they now point at a zero-valued
    /// flight whose departure is the epoch.
    pub fn cancel(&mut self, id: FlightId, now: DateTime<Utc>) -> LedgerResult<()> {
        let flight = self.get_mut(id)?;
        if flight.has_departed(now) {
            return Err(LedgerError::AlreadyDeparted(format!(
                "flight {} departed at {}",
                id,
                flight.departure_time.to_rfc3339()
            )));
        }

        *flight = Flight::default();
        Ok(())
    }

    pub fn get(&self, id: FlightId) -> LedgerResult<&Flight> {
        self.ids.ensure_issued(id)?;
        self.flights
            .get(slot(id))
            .ok_or_else(|| LedgerError::NotFound(format!("flight {}", id)))
    }

    pub fn get_mut(&mut self, id: FlightId) -> LedgerResult<&mut Flight> {
        self.ids.ensure_issued(id)?;
        self.flights
            .get_mut(slot(id))
            .ok_or_else(|| LedgerError::NotFound(format!("flight {}", id)))
    }

    pub fn count(&self) -> u64 {
        self.ids.count()
    }

    pub fn latest_departure(&self) -> DateTime<Utc> {
        self.latest_departure
    }
}

fn slot(id: u64) -> usize {
    usize::try_from(id).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn setup() -> (FleetRegistry, FlightSchedule, AirplaneId) {
        let mut fleet = FleetRegistry::new();
        let airplane_id = fleet.register(2, 3).unwrap();
        (fleet, FlightSchedule::new(now()), airplane_id)
    }

    #[test]
    fn test_schedule_takes_snapshot() {
        let (mut fleet, mut schedule, airplane_id) = setup();
        let departure = now() + Duration::hours(72);

        let id = schedule
            .schedule(&mut fleet, airplane_id, "LIS", departure, 100, 50, now())
            .unwrap();
        assert_eq!(id, 0);

        let flight = schedule.get(id).unwrap();
        assert_eq!(flight.remaining(SeatClass::First), 2);
        assert_eq!(flight.remaining(SeatClass::Economy), 3);
        assert_eq!(flight.price(SeatClass::First), 100);
        assert_eq!(flight.price(SeatClass::Economy), 50);
        assert_eq!(schedule.latest_departure(), departure);

        let history = &fleet.get(airplane_id).unwrap().flight_history;
        assert_eq!(history.len(), 1);
        assert!(history[0].contains("LIS"));
    }

    #[test]
    fn test_departure_must_be_in_future() {
        let (mut fleet, mut schedule, airplane_id) = setup();

        let at_now = schedule.schedule(&mut fleet, airplane_id, "LIS", now(), 100, 50, now());
        assert!(matches!(at_now, Err(LedgerError::InvalidArgument(_))));

        let past = now() - Duration::minutes(1);
        let in_past = schedule.schedule(&mut fleet, airplane_id, "LIS", past, 100, 50, now());
        assert!(matches!(in_past, Err(LedgerError::InvalidArgument(_))));
        assert_eq!(schedule.count(), 0);
    }

    #[test]
    fn test_airplane_on_hold_rejected() {
        let (mut fleet, mut schedule, airplane_id) = setup();
        fleet.put_on_hold(airplane_id).unwrap();

        let result = schedule.schedule(
            &mut fleet,
            airplane_id,
            "LIS",
            now() + Duration::hours(5),
            100,
            50,
            now(),
        );
        assert!(matches!(result, Err(LedgerError::InvariantViolation(_))));
        assert!(fleet.get(airplane_id).unwrap().flight_history.is_empty());
    }

    #[test]
    fn test_deleting_airplane_keeps_flight_snapshot() {
        let (mut fleet, mut schedule, airplane_id) = setup();
        let id = schedule
            .schedule(&mut fleet, airplane_id, "LIS", now() + Duration::hours(10), 100, 50, now())
            .unwrap();
        let before = schedule.get(id).unwrap().clone();

        fleet.delete(airplane_id).unwrap();

        assert_eq!(schedule.get(id).unwrap(), &before);
        let again = schedule.schedule(
            &mut fleet,
            airplane_id,
            "LIS",
            now() + Duration::hours(10),
            100,
            50,
            now(),
        );
        assert!(matches!(again, Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_high_water_mark_only_rises() {
        let (mut fleet, mut schedule, airplane_id) = setup();
        let late = now() + Duration::days(10);
        let early = now() + Duration::days(2);

        schedule.schedule(&mut fleet, airplane_id, "LIS", late, 1, 1, now()).unwrap();
        schedule.schedule(&mut fleet, airplane_id, "OPO", early, 1, 1, now()).unwrap();
        assert_eq!(schedule.latest_departure(), late);
    }

    #[test]
    fn test_cancel_before_departure_clears_flight() {
        let (mut fleet, mut schedule, airplane_id) = setup();
        let id = schedule
            .schedule(&mut fleet, airplane_id, "LIS", now() + Duration::hours(3), 100, 50, now())
            .unwrap();

        schedule.cancel(id, now()).unwrap();
        let flight = schedule.get(id).unwrap();
        assert!(flight.is_cleared());
        assert_eq!(flight.remaining_total(), 0);
        assert_eq!(flight.departure_time, DateTime::<Utc>::default());
    }

    #[test]
    fn test_cancel_at_or_after_departure_fails() {
        let (mut fleet, mut schedule, airplane_id) = setup();
        let departure = now() + Duration::hours(3);
        let id = schedule
            .schedule(&mut fleet, airplane_id, "LIS", departure, 100, 50, now())
            .unwrap();

        assert!(matches!(schedule.cancel(id, departure), Err(LedgerError::AlreadyDeparted(_))));
        assert!(matches!(
            schedule.cancel(id, departure + Duration::seconds(1)),
            Err(LedgerError::AlreadyDeparted(_))
        ));
        assert!(matches!(schedule.cancel(1, now()), Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_seat_counters_are_bounded() {
        let (mut fleet, mut schedule, airplane_id) = setup();
        let id = schedule
            .schedule(&mut fleet, airplane_id, "LIS", now() + Duration::hours(3), 100, 50, now())
            .unwrap();
        let flight = schedule.get_mut(id).unwrap();

        assert!(matches!(
            flight.release_seat(SeatClass::First),
            Err(LedgerError::InvariantViolation(_))
        ));
        flight.take_seat(SeatClass::First).unwrap();
        flight.take_seat(SeatClass::First).unwrap();
        assert!(matches!(
            flight.take_seat(SeatClass::First),
            Err(LedgerError::InvariantViolation(_))
        ));
        assert_eq!(flight.sold(SeatClass::First), 2);

        flight.release_seat(SeatClass::First).unwrap();
        assert_eq!(flight.remaining(SeatClass::First), 1);
        // Selling on the flight never touches the fleet record.
        assert_eq!(fleet.get(airplane_id).unwrap().seats_first, 2);
    }
}
