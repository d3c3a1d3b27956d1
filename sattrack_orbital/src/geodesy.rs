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

//! the seam to orbit propagation. We do not implement SGP4 ourselves, a [`Propagator`] provides
//! inertial (TEME) state vectors which we turn into geodetic positions using Greenwich mean
//! sidereal time and an iterative WGS84 latitude solution

use chrono::{DateTime, Utc};
use nalgebra::{Rotation3, Vector3};
use sattrack_common::{geo::LatLon, angle::normalize_two_pi, sqrt, pow2, sin, atan2, cos, TWO_PI};
use crate::element_set::ElementSet;
use crate::errors::{OrbitalError, Result};

/// WGS84 equatorial radius [km]
pub const EARTH_RADIUS_A: f64 = 6378.137;
/// WGS84 polar radius [km]
pub const EARTH_RADIUS_B: f64 = 6356.7523142;

const JD_UNIX_EPOCH: f64 = 2440587.5;
const JD_J2000: f64 = 2451545.0;
const MAX_LAT_ITERATIONS: usize = 20;

/// inertial position [km] and velocity [km/s] of an orbital object
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct EciState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl EciState {
    pub fn is_finite (&self)->bool {
        self.position.iter().all( |v| v.is_finite()) && self.velocity.iter().all( |v| v.is_finite())
    }
}

/// geodetic latitude/longitude in degrees plus height above the WGS84 ellipsoid in km
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Geodetic {
    pub lat_lon: LatLon,
    pub height: f64,
}

pub fn julian_date (t: DateTime<Utc>)->f64 {
    t.timestamp_millis() as f64 / 86_400_000.0 + JD_UNIX_EPOCH
}

/// Greenwich mean sidereal time in radians [0..2π) (IAU 1982 model)
pub fn gmst (t: DateTime<Utc>)->f64 {
    let tut1 = (julian_date(t) - JD_J2000) / 36525.0;
    let secs = -6.2e-6 * tut1 * tut1 * tut1
        + 0.093104 * tut1 * tut1
        + (876600.0 * 3600.0 + 8640184.812866) * tut1
        + 67310.54841;

    normalize_two_pi( (secs / 240.0).to_radians() % TWO_PI)
}

/// convert an inertial position [km] into geodetic coordinates, given the sidereal time [rad]
pub fn eci_to_geodetic_height (position: &Vector3<f64>, sidereal_time: f64)->Geodetic {
    // inertial -> earth fixed
    let ecef = Rotation3::from_axis_angle( &Vector3::z_axis(), -sidereal_time) * position;
    let (x,y,z) = (ecef.x, ecef.y, ecef.z);

    let r = sqrt( pow2(x) + pow2(y));
    let f = (EARTH_RADIUS_A - EARTH_RADIUS_B) / EARTH_RADIUS_A;
    let e2 = 2.0 * f - f * f;

    let mut lat = atan2( z, r);
    let mut c = 1.0;
    for _ in 0..MAX_LAT_ITERATIONS {
        c = 1.0 / sqrt( 1.0 - e2 * pow2( sin(lat)));
        lat = atan2( z + EARTH_RADIUS_A * c * e2 * sin(lat), r);
    }

    let height = r / cos(lat) - EARTH_RADIUS_A * c;
    Geodetic { lat_lon: LatLon::from_radians( lat, atan2( y, x)), height }
}

pub fn eci_to_geodetic (position: &Vector3<f64>, sidereal_time: f64)->LatLon {
    eci_to_geodetic_height( position, sidereal_time).lat_lon
}

/// the external propagation capability. Implementations return None if the model cannot produce a
/// state for the requested time (decayed orbit, invalid elements etc.)
pub trait Propagator: Send + Sync {
    fn propagate (&self, element_set: &ElementSet, t: DateTime<Utc>)->Option<EciState>;

    fn sidereal_time (&self, t: DateTime<Utc>)->f64 {
        gmst(t)
    }

    fn to_geodetic (&self, position: &Vector3<f64>, sidereal_time: f64)->LatLon {
        eci_to_geodetic( position, sidereal_time)
    }

    /// propagate and convert. Non-finite results count as failed propagation
    fn position_at (&self, element_set: &ElementSet, t: DateTime<Utc>)->Option<LatLon> {
        let state = self.propagate( element_set, t)?;
        if !state.position.iter().all( |v| v.is_finite()) {
            return None
        }
        let p = self.to_geodetic( &state.position, self.sidereal_time(t));
        p.is_finite().then_some(p)
    }

    fn checked_position_at (&self, element_set: &ElementSet, t: DateTime<Utc>)->Result<LatLon> {
        self.position_at( element_set, t)
            .ok_or_else( || OrbitalError::PropagationUnavailable( format!("{} at {}", element_set.name, t)))
    }
}

#[cfg(feature = "satkit")]
pub use sgp4_propagator::SatkitPropagator;

#[cfg(feature = "satkit")]
mod sgp4_propagator {
    use std::{collections::HashMap, sync::Mutex};
    use chrono::{DateTime, Utc};
    use nalgebra::Vector3;
    use satkit::{Instant, TLE, sgp4::sgp4};
    use tracing::warn;
    use crate::element_set::ElementSet;
    use super::{EciState, Propagator};

    /// SGP4/SDP4 through satkit. Parsed TLEs are cached by their orbital lines
    #[derive(Default)]
    pub struct SatkitPropagator {
        cache: Mutex<HashMap<(String,String),Option<TLE>>>
    }

    impl SatkitPropagator {
        pub fn new ()->Self { Self::default() }

        fn tle_for (&self, es: &ElementSet)->Option<TLE> {
            let mut cache = self.cache.lock().unwrap_or_else( |e| e.into_inner());
            let key = (es.line1.clone(), es.line2.clone());
            cache.entry(key).or_insert_with( || {
                match TLE::load_2line( &es.line1, &es.line2) {
                    Ok(tle) => Some(tle),
                    Err(e) => {
                        warn!("invalid TLE for {}: {:?}", es.name, e);
                        None
                    }
                }
            }).clone()
        }
    }

    impl Propagator for SatkitPropagator {
        fn propagate (&self, es: &ElementSet, t: DateTime<Utc>)->Option<EciState> {
            let mut tle = self.tle_for(es)?;
            let tv = [ Instant::from_unixtime( t.timestamp_millis() as f64 / 1000.0) ];
            let (pteme, vteme, _errs) = sgp4( &mut tle, &tv);

            // satkit works in meters
            let p = pteme.column(0);
            let v = vteme.column(0);
            let state = EciState {
                position: Vector3::new( p[0], p[1], p[2]) / 1000.0,
                velocity: Vector3::new( v[0], v[1], v[2]) / 1000.0,
            };

            state.is_finite().then_some(state)
        }
    }
}
