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

mod fakes;

use sattrack_common::geo::LatLon;
use sattrack_orbital::{
    element_set::{ElementSet, ElementSetId},
    errors::OrbitalError,
    geodesy::Propagator,
    trail::{catmull_rom, sample_track, smooth_segments, split_at_antimeridian, TrailBuilder, TrailConfig},
};
use fakes::{entry, t0, LinearTrack, OLD_LINE1, OLD_LINE2};

fn pts (coords: &[(f64,f64)])->Vec<LatLon> {
    coords.iter().map( |c| LatLon::from(*c)).collect()
}

fn test_set (name: &str)->ElementSet {
    ElementSet::from_entry( ElementSetId::new(1), entry( name, OLD_LINE1, OLD_LINE2))
}

#[test]
fn test_split_at_antimeridian() {
    let segs = split_at_antimeridian( &pts( &[(0.0,170.0), (0.0,-170.0)]), 180.0);
    assert_eq!( segs.len(), 2);
    assert_eq!( segs[0].len(), 1);
    assert_eq!( segs[1].len(), 1);

    let segs = split_at_antimeridian( &pts( &[(0.0,170.0), (1.0,175.0), (2.0,179.5), (3.0,-179.0), (4.0,-175.0)]), 180.0);
    assert_eq!( segs.len(), 2);
    assert_eq!( segs[0].len(), 3);
    assert_eq!( segs[1].len(), 2);

    // a delta of exactly the threshold does not split
    let segs = split_at_antimeridian( &pts( &[(0.0,-90.0), (0.0,90.0)]), 180.0);
    assert_eq!( segs.len(), 1);

    assert!( split_at_antimeridian( &[], 180.0).is_empty());
}

#[test]
fn test_catmull_rom_endpoints() {
    let control = pts( &[(0.0,0.0), (1.0,2.0), (2.0,3.0), (4.0,5.0)]);
    let smoothed = catmull_rom( &control, 8);
    println!("{:?}", smoothed);

    assert!( smoothed.len() >= 8);
    assert!( (smoothed[0].lat - 1.0).abs() < 1e-12);
    assert!( (smoothed[0].lon - 2.0).abs() < 1e-12);
}

#[test]
fn test_catmull_rom_linear() {
    // evenly spaced collinear points are reproduced exactly
    let control = pts( &[(0.0,10.0), (1.0,12.0), (2.0,14.0), (3.0,16.0), (4.0,18.0)]);
    let smoothed = catmull_rom( &control, 4);
    assert_eq!( smoothed.len(), 2 * 4);

    for (i,p) in smoothed.iter().enumerate() {
        let t = 1.0 + i as f64 / 4.0;
        assert!( (p.lat - t).abs() < 1e-9, "{i}: {p}");
        assert!( (p.lon - (10.0 + 2.0 * t)).abs() < 1e-9, "{i}: {p}");
    }
}

#[test]
fn test_short_segments_pass_through() {
    let short = pts( &[(0.0,0.0), (1.0,1.0), (2.0,2.0)]);
    assert_eq!( catmull_rom( &short, 8), short);

    let segs = smooth_segments( vec![ short.clone(), pts( &[(0.0,0.0), (1.0,1.0), (2.0,2.0), (3.0,3.0)])], 8);
    assert_eq!( segs[0], short);
    assert_eq!( segs[1].len(), 8);
}

#[test]
fn test_sample_track() {
    let config = TrailConfig::default();
    let prop = LinearTrack::new( 0.0, 0.001);
    let samples = sample_track( &prop, &test_set("SAT"), t0(), &config);
    assert_eq!( samples.len(), 121);
    assert!( samples.iter().all( |p| p.lon >= -180.0 && p.lon < 180.0));

    // every other sample fails, and one is not finite
    let prop = LinearTrack::new( 0.0, 0.001).failing_at( |dt| (dt / 60) % 2 == 1).nan_at( |dt| dt == 120);
    let samples = sample_track( &prop, &test_set("SAT"), t0(), &config);
    assert_eq!( samples.len(), 60);
}

// run with "cargo test test_trail_across_dateline -- --nocapture"
#[test]
fn test_trail_across_dateline() {
    // 3 deg per step, crossing the antimeridian between the 4th and 5th sample
    let prop = LinearTrack::new( 170.0, 0.05);
    let builder = TrailBuilder::new( TrailConfig::default());
    let trail = builder.build( &prop, &test_set("SAT"), t0());

    let pos = trail.position.expect("no position");
    assert_eq!( pos.lon, 170.0);

    for s in &trail.segments {
        println!("segment with {} points: {} .. {}", s.len(), s[0], s[s.len()-1]);
    }
    assert_eq!( trail.segments.len(), 2);
    assert_eq!( trail.segments[0].len(), (4 - 3) * 8);
    assert_eq!( trail.segments[1].len(), (117 - 3) * 8);
    assert!( trail.segments[1][0].lon < 0.0);
}

#[test]
fn test_trail_without_initial_state() {
    let builder = TrailBuilder::new( TrailConfig::default());

    let prop = LinearTrack::new( 0.0, 0.01).failing_at( |dt| dt == 0);
    let trail = builder.build( &prop, &test_set("SAT"), t0());
    assert!( trail.is_empty());

    let res = prop.checked_position_at( &test_set("SAT"), t0());
    assert!( matches!( res, Err(OrbitalError::PropagationUnavailable(_))));

    let trail = builder.build( &prop, &test_set("DECAYED"), t0());
    assert!( trail.position.is_none());
    assert!( trail.segments.is_empty());
}

#[test]
fn test_trail_config() {
    let config: TrailConfig = ron::from_str( "(horizon_secs: 600, step_secs: 120)").unwrap();
    assert_eq!( config.horizon_secs, 600);
    assert_eq!( config.step_secs, 120);
    assert_eq!( config.spline_resolution, 8);
    assert_eq!( config.sample_times( t0()).count(), 6);
}
