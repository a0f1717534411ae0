//! Trip energy and cost estimate

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::NavError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyUnit {
    Litre,
    KilowattHour,
}

impl fmt::Display for EnergyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnergyUnit::Litre => write!(f, "L"),
            EnergyUnit::KilowattHour => write!(f, "kWh"),
        }
    }
}

/// Average consumption and unit price of a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub label: String,
    /// Units per 100 km
    pub consumption_per_100km: f64,
    /// Euros per unit
    pub unit_price: f64,
    pub unit: EnergyUnit,
}

impl VehicleProfile {
    pub fn petrol() -> Self {
        Self::litres("Petrol", 7.0, 1.55)
    }

    pub fn diesel() -> Self {
        Self::litres("Diesel", 5.5, 1.45)
    }

    pub fn electric() -> Self {
        Self {
            label: "Electric".into(),
            consumption_per_100km: 16.0,
            unit_price: 0.15,
            unit: EnergyUnit::KilowattHour,
        }
    }

    pub fn hybrid() -> Self {
        Self::litres("Hybrid", 4.5, 1.55)
    }

    fn litres(label: &str, consumption_per_100km: f64, unit_price: f64) -> Self {
        Self {
            label: label.into(),
            consumption_per_100km,
            unit_price,
            unit: EnergyUnit::Litre,
        }
    }

    /// Estimate for a route length; `None` for a non-positive distance
    pub fn estimate(&self, distance_m: f64) -> Option<TripCost> {
        if !(distance_m > 0.0) {
            return None;
        }
        let distance_km = distance_m / 1000.0;
        let consumed = self.consumption_per_100km / 100.0 * distance_km;
        Some(TripCost {
            distance_km,
            consumed,
            unit: self.unit,
            cost_eur: consumed * self.unit_price,
        })
    }
}

impl FromStr for VehicleProfile {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "petrol" | "gasolina" => Ok(Self::petrol()),
            "diesel" => Ok(Self::diesel()),
            "electric" | "electrico" => Ok(Self::electric()),
            "hybrid" | "hibrido" => Ok(Self::hybrid()),
            other => Err(NavError::InvalidInput(format!("unknown vehicle profile {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TripCost {
    pub distance_km: f64,
    pub consumed: f64,
    pub unit: EnergyUnit,
    pub cost_eur: f64,
}

impl fmt::Display for TripCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} € ({:.1} {} · {:.1} km)",
            self.cost_eur, self.consumed, self.unit, self.distance_km
        )
    }
}
