pub mod group;
pub mod place;
pub mod trip;
