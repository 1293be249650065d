pub mod models;

pub use models::address::{Address, Amount};
pub use models::events::{EventRecord, LedgerEvent};
pub use models::seat::SeatClass;
