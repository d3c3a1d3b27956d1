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

//! ground track trails. A trail is built in three stages:
//!
//! 1. sample geodetic positions at a fixed step over the look-ahead horizon, skipping times for
//!    which the propagator has no valid state
//! 2. split the samples into segments wherever the longitude jumps by more than the antimeridian
//!    threshold, so that renderers never draw lines across the whole map
//! 3. smooth each segment of at least four points with a uniform Catmull-Rom spline
//!
//! All positions are in degrees with longitudes normalized into `[-180,180)`

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use sattrack_common::{angle::{abs_lon_delta, normalize_lon}, geo::{LatLon, Polyline}};
use crate::{element_set::ElementSet, geodesy::Propagator};

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// how far ahead of "now" the trail reaches
    pub horizon_secs: u64,
    pub step_secs: u64,
    /// longitude delta between consecutive samples above which we start a new segment
    pub antimeridian_threshold_deg: f64,
    /// number of interpolated points per spline window
    pub spline_resolution: usize,
}

impl Default for TrailConfig {
    fn default()->Self {
        TrailConfig { horizon_secs: 7200, step_secs: 60, antimeridian_threshold_deg: 180.0, spline_resolution: 8 }
    }
}

impl TrailConfig {
    /// the sample times `now, now+step, .. now+horizon`
    pub fn sample_times (&self, now: DateTime<Utc>)->impl Iterator<Item=DateTime<Utc>> {
        let step = self.step_secs.max(1) as usize;
        (0..=self.horizon_secs).step_by(step).map( move |dt| now + TimeDelta::seconds( dt as i64))
    }
}

/// current position and smoothed trail segments of an object
#[derive(Debug,Clone,PartialEq,Default,Serialize)]
pub struct Trail {
    pub position: Option<LatLon>,
    pub segments: Vec<Polyline>,
}

impl Trail {
    pub fn empty ()->Self { Self::default() }

    pub fn is_empty (&self)->bool {
        self.position.is_none() && self.segments.is_empty()
    }

    pub fn n_points (&self)->usize {
        self.segments.iter().map( |s| s.len()).sum()
    }
}

/// propagate `es` at all sample times of `config`. Failed or non-finite samples are skipped
pub fn sample_track (propagator: &dyn Propagator, es: &ElementSet, now: DateTime<Utc>, config: &TrailConfig)->Vec<LatLon> {
    config.sample_times(now)
        .filter_map( |t| propagator.position_at( es, t))
        .filter( |p| p.is_finite())
        .map( |p| LatLon::new( p.lat, normalize_lon( p.lon)))
        .collect()
}

/// start a new segment whenever the absolute longitude delta to the previous point exceeds `threshold_deg`
pub fn split_at_antimeridian (points: &[LatLon], threshold_deg: f64)->Vec<Polyline> {
    let mut segments: Vec<Polyline> = Vec::new();
    let mut segment: Polyline = Vec::new();

    for p in points {
        if let Some(prev) = segment.last() {
            if abs_lon_delta( prev.lon, p.lon) > threshold_deg {
                segments.push( std::mem::take( &mut segment));
            }
        }
        segment.push(*p);
    }

    if !segment.is_empty() {
        segments.push( segment);
    }
    segments
}

#[inline]
fn catmull_rom_coord (c0: f64, c1: f64, c2: f64, c3: f64, t: f64)->f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * c1
        + (-c0 + c2) * t
        + (2.0 * c0 - 5.0 * c1 + 4.0 * c2 - c3) * t2
        + (-c0 + 3.0 * c1 - 3.0 * c2 + c3) * t3)
}

/// the point at parameter `t` in [0,1] of the uniform Catmull-Rom curve between `p1` and `p2`
pub fn catmull_rom_point (p0: &LatLon, p1: &LatLon, p2: &LatLon, p3: &LatLon, t: f64)->LatLon {
    LatLon::new(
        catmull_rom_coord( p0.lat, p1.lat, p2.lat, p3.lat, t),
        catmull_rom_coord( p0.lon, p1.lon, p2.lon, p3.lon, t)
    )
}

/// interpolate `resolution` points (at `t = k/resolution`) for every window of four consecutive points.
/// Inputs with less than four points (or a zero resolution) are returned unchanged
pub fn catmull_rom (points: &[LatLon], resolution: usize)->Polyline {
    if points.len() < 4 || resolution == 0 {
        return points.to_vec()
    }

    let mut smoothed = Vec::with_capacity( (points.len() - 3) * resolution);
    for w in points.windows(4) {
        for k in 0..resolution {
            let t = k as f64 / resolution as f64;
            smoothed.push( catmull_rom_point( &w[0], &w[1], &w[2], &w[3], t));
        }
    }
    smoothed
}

pub fn smooth_segments (segments: Vec<Polyline>, resolution: usize)->Vec<Polyline> {
    segments.into_iter().map( |seg| {
        if seg.len() >= 4 { catmull_rom( &seg, resolution) } else { seg }
    }).collect()
}

/// builds [`Trail`]s for a fixed [`TrailConfig`]
#[derive(Debug,Clone,Default)]
pub struct TrailBuilder {
    config: TrailConfig
}

impl TrailBuilder {
    pub fn new (config: TrailConfig)->Self { TrailBuilder { config } }

    pub fn config (&self)->&TrailConfig { &self.config }

    /// position at `now` plus smoothed segments up to the horizon. If there is no valid state
    /// at `now` the result is empty
    pub fn build (&self, propagator: &dyn Propagator, es: &ElementSet, now: DateTime<Utc>)->Trail {
        let first = match propagator.checked_position_at( es, now) {
            Ok(p) => p,
            Err(e) => {
                debug!("{e}");
                return Trail::empty()
            }
        };
        let position = LatLon::new( first.lat, normalize_lon( first.lon));

        let samples = sample_track( propagator, es, now, &self.config);
        let segments = split_at_antimeridian( &samples, self.config.antimeridian_threshold_deg);
        let segments = smooth_segments( segments, self.config.spline_resolution);

        Trail { position: Some(position), segments }
    }
}
