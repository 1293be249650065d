use contrail_core::{IdAllocator, LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};

pub type AirplaneId = u64;

/// An airplane of the fleet. Seat counters are class capacities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airplane {
    pub seats_first: u32,
    pub seats_economy: u32,
    pub on_hold: bool,
    /// One formatted line per flight scheduled on this airplane. Informational only.
    pub flight_history: Vec<String>,
}

impl Airplane {
    pub fn new(seats_first: u32, seats_economy: u32) -> Self {
        Self {
            seats_first,
            seats_economy,
            on_hold: false,
            flight_history: Vec::new(),
        }
    }

    pub fn total_seats(&self) -> u64 {
        u64::from(self.seats_first) + u64::from(self.seats_economy)
    }

    /// A deleted airplane is cleared to the zero value.
    pub fn is_cleared(&self) -> bool {
        *self == Airplane::default()
    }
}

/// Airplane records, addressed by sequential id.
#[derive(Debug, Clone)]
pub struct FleetRegistry {
    airplanes: Vec<Airplane>,
    ids: IdAllocator,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self {
            airplanes: Vec::new(),
            ids: IdAllocator::new("airplane"),
        }
    }

    /// Register an airplane. The id is the count before registration.
    pub fn register(&mut self, seats_first: u32, seats_economy: u32) -> LedgerResult<AirplaneId> {
        let airplane = Airplane::new(seats_first, seats_economy);
        if airplane.total_seats() == 0 {
            return Err(LedgerError::InvalidArgument(
                "an airplane needs at least one seat".to_string(),
            ));
        }

        let id = self.ids.allocate();
        self.airplanes.push(airplane);
        Ok(id)
    }

    pub fn put_on_hold(&mut self, id: AirplaneId) -> LedgerResult<()> {
        self.get_mut(id)?.on_hold = true;
        Ok(())
    }

    pub fn put_available(&mut self, id: AirplaneId) -> LedgerResult<()> {
        self.get_mut(id)?.on_hold = false;
        Ok(())
    }

    /// Clear the record. Flights already scheduled keep their own copy.
    pub fn delete(&mut self, id: AirplaneId) -> LedgerResult<()> {
        *self.get_mut(id)? = Airplane::default();
        Ok(())
    }

    pub fn get(&self, id: AirplaneId) -> LedgerResult<&Airplane> {
        self.ids.ensure_issued(id)?;
        self.airplanes
            .get(slot(id))
            .ok_or_else(|| LedgerError::NotFound(format!("airplane {}", id)))
    }

    pub(crate) fn get_mut(&mut self, id: AirplaneId) -> LedgerResult<&mut Airplane> {
        self.ids.ensure_issued(id)?;
        self.airplanes
            .get_mut(slot(id))
            .ok_or_else(|| LedgerError::NotFound(format!("airplane {}", id)))
    }

    pub fn count(&self) -> u64 {
        self.ids.count()
    }
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn slot(id: u64) -> usize {
    usize::try_from(id).unwrap_or(usize::MAX)
}
