//! Domain model: aggregates, value objects, validators and events.
pub mod aggregates;
pub mod events;
pub mod validators;
pub mod value_objects;
