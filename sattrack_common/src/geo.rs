/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::fmt;
use serde::{Serialize,Deserialize};
use crate::angle::normalize_lon;

/// a plain 2D map position in degrees.
/// This is the value type we hand to rendering layers, which all expect (lat,lon) order
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct LatLon {
    #[serde(alias="latitude")]
    pub lat: f64,

    #[serde(alias="longitude")]
    pub lon: f64,
}

impl LatLon {
    pub fn new (lat: f64, lon: f64)->Self {
        LatLon { lat, lon }
    }

    /// create from radians, normalizing the longitude into `[-180,180)`
    pub fn from_radians (lat: f64, lon: f64)->Self {
        LatLon { lat: lat.to_degrees(), lon: normalize_lon( lon.to_degrees()) }
    }

    pub fn is_finite (&self)->bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn to_tuple (&self)->(f64,f64) {
        (self.lat, self.lon)
    }
}

impl From<(f64,f64)> for LatLon {
    fn from (p: (f64,f64))->Self { LatLon::new( p.0, p.1) }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4},{:.4})", self.lat, self.lon)
    }
}

/// a polyline of map positions
pub type Polyline = Vec<LatLon>;
