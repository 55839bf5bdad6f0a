use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::form::FormRequest;
use crate::geocoding::nominatim::{NOMINATIM_URL, USER_AGENT};
use crate::geocoding::{ConfiguredGeocoder, NominatimClient, OfflineGeocoder};
use crate::location::ip::IP_API_URL;
use crate::location::{
    ConfiguredProvider, FixedLocationProvider, HistoryLocationProvider, IpLocationProvider,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub geocoder: GeocoderConfig,
    pub form: FormConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ip {
        #[serde(default = "default_ip_api_url")]
        url: String,
        /// Address to look up instead of the caller's own.
        #[serde(default)]
        address: Option<String>,
    },
    Fixed {
        latitude: f64,
        longitude: f64,
    },
    History {
        path: Utf8PathBuf,
    },
    /// No location capability at all.
    None,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Ip {
            url: default_ip_api_url(),
            address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GeocoderConfig {
    Nominatim {
        #[serde(default = "default_nominatim_url")]
        base_url: String,
        #[serde(default = "default_user_agent")]
        user_agent: String,
    },
    Offline,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        GeocoderConfig::Nominatim {
            base_url: default_nominatim_url(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub path: Utf8PathBuf,
    pub latitude_field: String,
    pub longitude_field: String,
    pub address_field: Option<String>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from("form.json"),
            latitude_field: "latitude".into(),
            longitude_field: "longitude".into(),
            address_field: Some("location".into()),
        }
    }
}

fn default_ip_api_url() -> String {
    IP_API_URL.into()
}

fn default_nominatim_url() -> String {
    NOMINATIM_URL.into()
}

fn default_user_agent() -> String {
    USER_AGENT.into()
}

impl Config {
    /// Reads the YAML config at `path`. A missing file means defaults unless
    /// `required` is set.
    pub fn load(path: &Utf8Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration: {path}"))
    }

    pub fn build_provider(&self) -> Result<Option<ConfiguredProvider>> {
        let provider = match &self.provider {
            ProviderConfig::Ip { url, address } => {
                let provider = IpLocationProvider::new(url);
                ConfiguredProvider::Ip(match address {
                    Some(address) => provider.for_address(address),
                    None => provider,
                })
            }
            ProviderConfig::Fixed {
                latitude,
                longitude,
            } => ConfiguredProvider::Fixed(FixedLocationProvider::new(*latitude, *longitude)),
            ProviderConfig::History { path } => {
                ConfiguredProvider::History(HistoryLocationProvider::from_json_file(path)?)
            }
            ProviderConfig::None => return Ok(None),
        };
        Ok(Some(provider))
    }

    pub fn build_geocoder(&self) -> Result<ConfiguredGeocoder> {
        Ok(match &self.geocoder {
            GeocoderConfig::Nominatim {
                base_url,
                user_agent,
            } => ConfiguredGeocoder::Nominatim(
                NominatimClient::new(base_url.as_str(), user_agent)
                    .context("Failed to build geocoding client")?,
            ),
            GeocoderConfig::Offline => ConfiguredGeocoder::Offline(OfflineGeocoder),
        })
    }

    pub fn form_request(&self) -> FormRequest {
        let request = FormRequest::new(&self.form.latitude_field, &self.form.longitude_field);
        match &self.form.address_field {
            Some(field) => request.with_address_field(field),
            None => request,
        }
    }
}
