//! Supply-chain entities and their `(id, type)` identity.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::risk::Severity;

/// Opaque key-value payload attached to an entity.
///
/// Risk predicates read well-known keys from it by contract (for example
/// `protected_area_overlap` or `deforestation_alerts`).
pub type EntityData = BTreeMap<String, Value>;

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// The kind of supply-chain entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A production plot (farm, plantation block).
    Plot,
    /// A collection point, mill, refinery, or other processing site.
    Facility,
    /// A delivery of material between two sites.
    Delivery,
    /// An outbound shipment.
    Shipment,
}

impl EntityType {
    /// All entity types, in declaration order.
    pub const ALL: [EntityType; 4] = [Self::Plot, Self::Facility, Self::Delivery, Self::Shipment];

    /// The canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plot => "plot",
            Self::Facility => "facility",
            Self::Delivery => "delivery",
            Self::Shipment => "shipment",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plot" => Ok(Self::Plot),
            "facility" => Ok(Self::Facility),
            "delivery" | "custody_event" => Ok(Self::Delivery),
            "shipment" => Ok(Self::Shipment),
            other => Err(TypeError::UnknownEntityType(other.to_string())),
        }
    }
}

/// The identity of an entity: `(id, type)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id: id.into(),
            entity_type,
        }
    }

    pub fn plot(id: impl Into<String>) -> Self {
        Self::new(id, EntityType::Plot)
    }

    pub fn facility(id: impl Into<String>) -> Self {
        Self::new(id, EntityType::Facility)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// A WGS84 position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Create validated coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, TypeError> {
        let coords = Self {
            latitude,
            longitude,
        };
        coords.validate()?;
        Ok(coords)
    }

    /// Check that latitude and longitude are finite and in range.
    pub fn validate(&self) -> Result<(), TypeError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(TypeError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// Great-circle (haversine) distance in kilometres.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

/// A supply-chain entity as held by the graph data source.
///
/// Identity is `(id, entity_type)`. Everything except `risk_level` and the
/// monitoring keys inside `data` is immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub certifications: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<Severity>,
    #[serde(default)]
    pub data: EntityData,
}

impl Entity {
    /// Create an entity with no coordinates, certifications, or data.
    pub fn new(id: impl Into<String>, entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type,
            name: name.into(),
            coordinates: None,
            certifications: BTreeSet::new(),
            risk_level: None,
            data: EntityData::new(),
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        self
    }

    pub fn with_certification(mut self, certification: impl Into<String>) -> Self {
        self.certifications.insert(certification.into());
        self
    }

    pub fn with_risk_level(mut self, level: Severity) -> Self {
        self.risk_level = Some(level);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// The `(id, type)` identity of this entity.
    pub fn reference(&self) -> EntityRef {
        EntityRef::new(self.id.clone(), self.entity_type)
    }

    /// Returns `true` if the entity holds the certification (case-insensitive).
    pub fn has_certification(&self, certification: &str) -> bool {
        self.certifications
            .iter()
            .any(|c| c.eq_ignore_ascii_case(certification))
    }

    /// Read a boolean data key. Missing keys read as `None`.
    pub fn data_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    /// Read a numeric data key. Missing keys read as `None`.
    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    /// Read a string data key. Missing keys read as `None`.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}
