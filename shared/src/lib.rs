use std::fmt;

use serde::{Deserialize, Serialize};

/// WGS-84 position in degrees, longitude first (GeoJSON order).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn offset(self, delta_lon: f64, delta_lat: f64) -> Self {
        Self {
            lon: self.lon + delta_lon,
            lat: self.lat + delta_lat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceProduct {
    Asphalt,
    Park,
    Trail,
    Embankment,
}

impl SurfaceProduct {
    /// Presentation order of the surface choices.
    pub const ALL: [SurfaceProduct; 4] = [
        SurfaceProduct::Asphalt,
        SurfaceProduct::Park,
        SurfaceProduct::Trail,
        SurfaceProduct::Embankment,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Asphalt => "asphalt",
            Self::Park => "park",
            Self::Trail => "trail",
            Self::Embankment => "embankment",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Asphalt => "Асфальт",
            Self::Park => "Парк",
            Self::Trail => "Трейл",
            Self::Embankment => "Набережная",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|product| product.id() == id)
    }
}

impl fmt::Display for SurfaceProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub city: String,
    pub name: String,
    pub distance_km: f64,
    pub surface_type: SurfaceProduct,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub city: String,
    pub distance_km: f64,
    pub surface_type: SurfaceProduct,
}

/// Inbound chat event as delivered by the messaging collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub user_id: i64,
    pub event: ChatEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Command name without the leading slash, e.g. `find`.
    Command(String),
    Text(String),
    /// Opaque data of a selected choice, e.g. `city:Москва`.
    Choice(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
        }
    }

    pub fn with_choices(text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            text: text.into(),
            choices,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
