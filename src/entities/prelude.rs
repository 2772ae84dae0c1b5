pub use super::alerts::Entity as Alerts;
pub use super::tvl_points::Entity as TvlPoints;
