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

use std::{fmt, sync::Arc};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use sattrack_common::datetime::utc_now;

/// the offset change for a single keyboard step
pub const STEP_SECS: i64 = 60;

/// offsets are clamped to +/- 10000 years, which keeps `now()` well inside the chrono date range
pub const MAX_OFFSET_SECS: i64 = 10_000 * 366 * 86_400;

pub type ReferenceClock = Arc<dyn Fn()->DateTime<Utc> + Send + Sync>;

/// the time offsets offered as quick selections
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ClockPreset {
    Now,
    MinusOneHour,
    PlusOneHour,
    PlusSixHours,
    PlusTwelveHours,
    PlusOneDay,
}

impl ClockPreset {
    pub const ALL: [ClockPreset;6] = [
        ClockPreset::MinusOneHour, ClockPreset::Now, ClockPreset::PlusOneHour,
        ClockPreset::PlusSixHours, ClockPreset::PlusTwelveHours, ClockPreset::PlusOneDay
    ];

    pub fn offset_seconds (&self)->i64 {
        match self {
            ClockPreset::Now => 0,
            ClockPreset::MinusOneHour => -3600,
            ClockPreset::PlusOneHour => 3600,
            ClockPreset::PlusSixHours => 6 * 3600,
            ClockPreset::PlusTwelveHours => 12 * 3600,
            ClockPreset::PlusOneDay => 24 * 3600,
        }
    }

    pub fn label (&self)->&'static str {
        match self {
            ClockPreset::Now => "Now",
            ClockPreset::MinusOneHour => "-1h",
            ClockPreset::PlusOneHour => "+1h",
            ClockPreset::PlusSixHours => "+6h",
            ClockPreset::PlusTwelveHours => "+12h",
            ClockPreset::PlusOneDay => "+24h",
        }
    }

    /// the preset that corresponds to an offset, if any
    pub fn for_offset (offset_seconds: i64)->Option<ClockPreset> {
        Self::ALL.into_iter().find( |p| p.offset_seconds() == offset_seconds)
    }
}

impl fmt::Display for ClockPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// simulated time, which is a reference (wall) clock shifted by a signed number of seconds.
///
/// Every mutation of the offset is published to [`subscribe`](Self::subscribe) receivers, even
/// if the value did not change, so that observers can use it as a recompute trigger. The offset is
/// never persisted. Clones share the same offset
#[derive(Clone)]
pub struct SimClock {
    offset: Arc<watch::Sender<i64>>,
    reference: ReferenceClock,
}

impl SimClock {
    pub fn new ()->Self {
        Self::with_reference( Arc::new( utc_now))
    }

    pub fn with_reference (reference: ReferenceClock)->Self {
        let (tx,_) = watch::channel(0);
        SimClock { offset: Arc::new(tx), reference }
    }

    /// a clock with a reference that never advances
    pub fn fixed (t: DateTime<Utc>)->Self {
        Self::with_reference( Arc::new( move || t))
    }

    pub fn now (&self)->DateTime<Utc> {
        let reference = (self.reference)();
        let offset = self.offset_seconds();
        TimeDelta::try_seconds( offset)
            .and_then( |dt| reference.checked_add_signed( dt))
            .unwrap_or( if offset < 0 { DateTime::<Utc>::MIN_UTC } else { DateTime::<Utc>::MAX_UTC })
    }

    pub fn offset_seconds (&self)->i64 {
        *self.offset.borrow()
    }

    /// set the offset, clamped to [`MAX_OFFSET_SECS`]
    pub fn set_offset_seconds (&self, offset_seconds: i64) {
        self.offset.send_replace( clamp_offset( offset_seconds));
    }

    pub fn step_seconds (&self, delta: i64) {
        self.offset.send_modify( |v| *v = clamp_offset( v.saturating_add(delta)));
    }

    pub fn step_forward (&self) { self.step_seconds( STEP_SECS) }
    pub fn step_back (&self) { self.step_seconds( -STEP_SECS) }

    pub fn set_offset_from_preset (&self, seconds: i64) {
        self.set_offset_seconds( seconds)
    }

    pub fn apply_preset (&self, preset: ClockPreset) {
        self.set_offset_from_preset( preset.offset_seconds())
    }

    /// the preset matching the current offset (if any), e.g. to highlight the active selection
    pub fn active_preset (&self)->Option<ClockPreset> {
        ClockPreset::for_offset( self.offset_seconds())
    }

    /// the displayed clock text, e.g. "Time: Tue, 05 Nov 2024 13:22:04 GMT"
    pub fn label (&self)->String {
        format!("Time: {}", self.now().format("%a, %d %b %Y %H:%M:%S GMT"))
    }

    /// receives the new offset on every mutation
    pub fn subscribe (&self)->watch::Receiver<i64> {
        self.offset.subscribe()
    }
}

fn clamp_offset (offset_seconds: i64)->i64 {
    offset_seconds.clamp( -MAX_OFFSET_SECS, MAX_OFFSET_SECS)
}

impl Default for SimClock {
    fn default()->Self { Self::new() }
}

impl fmt::Debug for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimClock( offset:{}s)", self.offset_seconds())
    }
}
