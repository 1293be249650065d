pub mod fleet;
pub mod schedule;

pub use fleet::{Airplane, AirplaneId, FleetRegistry};
pub use schedule::{Flight, FlightId, FlightSchedule};
