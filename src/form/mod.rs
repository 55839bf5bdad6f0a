use tracing::{debug, info};

use crate::geocoding::GeocodingClient;
use crate::location::{Coordinates, LocateError, LocationProvider, PositionOptions, locate_device};

pub mod json;

pub use json::JsonForm;

/// Shown when locating fails and the caller did not install an error hook.
pub const GENERIC_LOCATION_FAILURE: &str =
    "Unable to get your location. Please enter it manually.";

/// Writes values into named form fields.
pub trait FieldWriter {
    fn write_number(&mut self, field: &str, value: f64);
    fn write_text(&mut self, field: &str, value: &str);
}

/// Blocking, user-facing notice.
pub trait Notifier {
    fn alert(&self, message: &str);
}

/// Which fields receive the results.
#[derive(Debug, Clone)]
pub struct FormRequest {
    pub latitude_field: String,
    pub longitude_field: String,
    pub address_field: Option<String>,
}

impl FormRequest {
    pub fn new(latitude_field: impl Into<String>, longitude_field: impl Into<String>) -> Self {
        Self {
            latitude_field: latitude_field.into(),
            longitude_field: longitude_field.into(),
            address_field: None,
        }
    }

    pub fn with_address_field(mut self, field: impl Into<String>) -> Self {
        self.address_field = Some(field.into());
        self
    }
}

type SuccessHook<'a> = Box<dyn FnOnce(&Coordinates) + 'a>;
type ErrorHook<'a> = Box<dyn FnOnce(LocateError) + 'a>;

/// Optional completion callbacks for [`fill_location_form`].
#[derive(Default)]
pub struct Hooks<'a> {
    on_success: Option<SuccessHook<'a>>,
    on_error: Option<ErrorHook<'a>>,
}

impl<'a> Hooks<'a> {
    pub fn on_success(mut self, hook: impl FnOnce(&Coordinates) + 'a) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl FnOnce(LocateError) + 'a) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }
}

/// Locates the device and fills the requested fields.
///
/// Coordinates are written as soon as they are known; the address lookup only
/// starts afterwards and a missing address does not count as a failure. When
/// locating fails nothing is written, and the error goes to the error hook or,
/// without one, to the notifier.
pub async fn fill_location_form<P, G, W, N>(
    provider: Option<&P>,
    geocoder: &G,
    writer: &mut W,
    notifier: &N,
    request: &FormRequest,
    hooks: Hooks<'_>,
) where
    P: LocationProvider,
    G: GeocodingClient,
    W: FieldWriter,
    N: Notifier,
{
    let coords = match locate_device(provider, &PositionOptions::default()).await {
        Ok(coords) => coords,
        Err(err) => {
            info!("Could not locate device: {}", err);
            match hooks.on_error {
                Some(on_error) => on_error(err),
                None => notifier.alert(GENERIC_LOCATION_FAILURE),
            }
            return;
        }
    };

    writer.write_number(&request.latitude_field, coords.latitude);
    writer.write_number(&request.longitude_field, coords.longitude);

    if let Some(address_field) = &request.address_field {
        match geocoder.reverse_geocode(coords.latitude, coords.longitude).await {
            Some(address) => writer.write_text(address_field, &address),
            None => debug!("No address for {}, {}", coords.latitude, coords.longitude),
        }
    }

    if let Some(on_success) = hooks.on_success {
        on_success(&coords);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::Place;
    use crate::location::{FixedLocationProvider, PERMISSION_DENIED, PositionError};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq)]
    enum Value {
        Number(f64),
        Text(String),
    }

    #[derive(Default)]
    struct RecordingForm {
        fields: HashMap<String, Value>,
        log: Vec<String>,
    }

    impl FieldWriter for RecordingForm {
        fn write_number(&mut self, field: &str, value: f64) {
            self.log.push(field.to_owned());
            self.fields.insert(field.to_owned(), Value::Number(value));
        }

        fn write_text(&mut self, field: &str, value: &str) {
            self.log.push(field.to_owned());
            self.fields.insert(field.to_owned(), Value::Text(value.to_owned()));
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        alerts: RefCell<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn alert(&self, message: &str) {
            self.alerts.borrow_mut().push(message.to_owned());
        }
    }

    struct FailingProvider(u16);

    impl LocationProvider for FailingProvider {
        async fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> Result<Coordinates, PositionError> {
            Err(PositionError::new(self.0, "nope"))
        }
    }

    struct StubGeocoder {
        address: Option<&'static str>,
        calls: Cell<u32>,
    }

    impl StubGeocoder {
        fn returning(address: Option<&'static str>) -> Self {
            Self {
                address,
                calls: Cell::new(0),
            }
        }
    }

    impl GeocodingClient for StubGeocoder {
        async fn reverse_geocode(&self, _latitude: f64, _longitude: f64) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            self.address.map(str::to_owned)
        }

        async fn search(&self, _query: &str) -> Option<Place> {
            None
        }
    }

    fn request() -> FormRequest {
        FormRequest::new("latitude", "longitude").with_address_field("location")
    }

    #[tokio::test]
    async fn test_fill_all_fields() {
        let provider = FixedLocationProvider::new(48.8566, 2.3522);
        let geocoder = StubGeocoder::returning(Some("Paris, France"));
        let mut form = RecordingForm::default();
        let notifier = RecordingNotifier::default();
        let succeeded = Cell::new(None);

        fill_location_form(
            Some(&provider),
            &geocoder,
            &mut form,
            &notifier,
            &request(),
            Hooks::default().on_success(|c| succeeded.set(Some(*c))),
        )
        .await;

        assert_eq!(form.fields["latitude"], Value::Number(48.8566));
        assert_eq!(form.fields["longitude"], Value::Number(2.3522));
        assert_eq!(form.fields["location"], Value::Text("Paris, France".into()));
        assert_eq!(form.log, vec!["latitude", "longitude", "location"]);
        assert_eq!(succeeded.get().map(|c| c.latitude), Some(48.8566));
        assert!(notifier.alerts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_fill_without_address_field() {
        let provider = FixedLocationProvider::new(1.0, 2.0);
        let geocoder = StubGeocoder::returning(Some("unused"));
        let mut form = RecordingForm::default();

        fill_location_form(
            Some(&provider),
            &geocoder,
            &mut form,
            &RecordingNotifier::default(),
            &FormRequest::new("lat", "lon"),
            Hooks::default(),
        )
        .await;

        assert_eq!(form.fields.len(), 2);
        assert_eq!(geocoder.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_fill_geocoding_failure_still_succeeds() {
        let provider = FixedLocationProvider::new(10.5, -20.25);
        let geocoder = StubGeocoder::returning(None);
        let mut form = RecordingForm::default();
        let notifier = RecordingNotifier::default();
        let succeeded = Cell::new(false);

        fill_location_form(
            Some(&provider),
            &geocoder,
            &mut form,
            &notifier,
            &request(),
            Hooks::default()
                .on_success(|_| succeeded.set(true))
                .on_error(|_| panic!("locating did not fail")),
        )
        .await;

        assert_eq!(form.fields["latitude"], Value::Number(10.5));
        assert_eq!(form.fields["longitude"], Value::Number(-20.25));
        assert!(!form.fields.contains_key("location"));
        assert_eq!(geocoder.calls.get(), 1);
        assert!(succeeded.get());
        assert!(notifier.alerts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_fill_keeps_stale_address_unwritten() {
        let path = camino::Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .unwrap()
            .join(format!("geofill-{}-stale.json", std::process::id()));
        std::fs::write(&path, r#"{"location": "Old Town, Nowhere"}"#).unwrap();

        let provider = FixedLocationProvider::new(48.8566, 2.3522);
        let geocoder = StubGeocoder::returning(None);
        let mut form = JsonForm::load(&path).unwrap();
        let succeeded = Cell::new(false);

        fill_location_form(
            Some(&provider),
            &geocoder,
            &mut form,
            &RecordingNotifier::default(),
            &request(),
            Hooks::default().on_success(|_| succeeded.set(true)),
        )
        .await;

        assert!(succeeded.get());
        assert_eq!(form.written("latitude"), Some(&serde_json::json!(48.8566)));
        assert_eq!(form.written("location"), None);
        assert_eq!(
            form.get("location"),
            Some(&serde_json::json!("Old Town, Nowhere"))
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_fill_failure_without_hook_alerts() {
        let geocoder = StubGeocoder::returning(Some("unused"));
        let mut form = RecordingForm::default();
        let notifier = RecordingNotifier::default();
        let succeeded = Cell::new(false);

        fill_location_form(
            Some(&FailingProvider(PERMISSION_DENIED)),
            &geocoder,
            &mut form,
            &notifier,
            &request(),
            Hooks::default().on_success(|_| succeeded.set(true)),
        )
        .await;

        assert!(form.fields.is_empty());
        assert_eq!(*notifier.alerts.borrow(), vec![GENERIC_LOCATION_FAILURE]);
        assert_eq!(geocoder.calls.get(), 0);
        assert!(!succeeded.get());
    }

    #[tokio::test]
    async fn test_fill_failure_goes_to_hook() {
        let geocoder = StubGeocoder::returning(None);
        let mut form = RecordingForm::default();
        let notifier = RecordingNotifier::default();
        let failure = RefCell::new(None);

        fill_location_form(
            Some(&FailingProvider(7)),
            &geocoder,
            &mut form,
            &notifier,
            &request(),
            Hooks::default().on_error(|err| *failure.borrow_mut() = Some(err)),
        )
        .await;

        assert!(form.fields.is_empty());
        assert!(notifier.alerts.borrow().is_empty());
        assert_eq!(*failure.borrow(), Some(LocateError::Unknown("nope".into())));
    }

    #[tokio::test]
    async fn test_fill_unsupported_platform() {
        let geocoder = StubGeocoder::returning(None);
        let mut form = RecordingForm::default();
        let failure = RefCell::new(None);

        fill_location_form::<FixedLocationProvider, _, _, _>(
            None,
            &geocoder,
            &mut form,
            &RecordingNotifier::default(),
            &request(),
            Hooks::default().on_error(|err| *failure.borrow_mut() = Some(err)),
        )
        .await;

        assert!(form.fields.is_empty());
        assert_eq!(*failure.borrow(), Some(LocateError::UnsupportedPlatform));
    }
}
