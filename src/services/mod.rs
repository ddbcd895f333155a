pub mod ai;
pub mod geocode;
pub mod routing;
