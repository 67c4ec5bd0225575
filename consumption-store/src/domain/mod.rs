pub mod community;
pub mod reading;
pub mod unit;

pub use community::Community;
pub use reading::Reading;
pub use unit::{Unit, UnitDetails};
