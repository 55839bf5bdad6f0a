pub mod config;
pub mod form;
pub mod geocoding;
pub mod location;

#[cfg(test)]
mod test_support;

pub use form::{FieldWriter, FormRequest, Hooks, Notifier, fill_location_form};
pub use geocoding::{GeocodingClient, Place};
pub use location::{Coordinates, LocateError, LocationProvider, PositionOptions, locate_device};
