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

use crate::TWO_PI;

/// map longitude degrees into the half-open interval `[-180,180)`.
/// This is `((lon + 540) mod 360) - 180` with a Euclidean (always positive) modulo, i.e. `180` maps to `-180`
/// and `normalize_lon(x + 360) == normalize_lon(x)` holds for all finite inputs
#[inline]
pub fn normalize_lon (lon: f64) -> f64 {
    let x = (lon + 540.0).rem_euclid(360.0) - 180.0;
    if x >= 180.0 { x - 360.0 } else { x } // rem_euclid can round up to the modulus for tiny negative inputs
}

/// map radians into `[0,2π)`
#[inline]
pub fn normalize_two_pi (r: f64) -> f64 {
    r.rem_euclid(TWO_PI)
}

/// absolute (not wrapped) difference between two longitudes in degrees.
/// This is what we use to detect antimeridian crossings - a wrapped difference would never exceed 180
#[inline]
pub fn abs_lon_delta (lon1: f64, lon2: f64) -> f64 {
    (lon2 - lon1).abs()
}
