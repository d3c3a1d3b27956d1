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

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize,Serializer,Deserializer,de::{Error as DeError}};
use std::time::Duration;
use parse_duration::parse;

// simple std Duration ctors that do not require nightly features
#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn minutes (n: u64)->Duration { Duration::from_secs(n * 60) }
#[inline] pub fn hours (n: u64)->Duration { Duration::from_secs(n * 3600) }
#[inline] pub fn days (n: u64)->Duration { Duration::from_secs(n * 86400) }

/// the wall clock. Code that might have to run against a simulated clock should not call this directly
/// but get a reference clock function injected
#[inline]
pub fn utc_now()->DateTime<Utc> {
    Utc::now()
}

/// convert a std Duration into a chrono TimeDelta, saturating at TimeDelta::MAX
pub fn to_time_delta (dur: Duration)->TimeDelta {
    TimeDelta::from_std(dur).unwrap_or(TimeDelta::MAX)
}

/// std Duration between two dates, ZERO if `dt_later` is before `dt_earlier`
pub fn duration_since (dt_later: &DateTime<Utc>, dt_earlier: &DateTime<Utc>)->Duration {
    (*dt_later - *dt_earlier).to_std().unwrap_or(Duration::ZERO)
}

//--- support for serde

/// serializes None as null (not 0) so that we can distinguish "never" from the epoch
pub fn ser_epoch_millis_option<S: Serializer> (opt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>  {
    match opt {
        Some(dt) => s.serialize_some( &dt.timestamp_millis()),
        None => s.serialize_none()
    }
}

pub fn de_from_epoch_millis_option <'a,D>(deserializer: D) -> Result<Option<DateTime<Utc>>,D::Error> where D: Deserializer<'a> {
    match Option::<i64>::deserialize(deserializer)? {
        Some(millis) => DateTime::from_timestamp_millis(millis).map(Some).ok_or( DeError::custom("invalid timestamp value")),
        None => Ok(None)
    }
}

/// deserialize human readable durations such as "1s", "5min" or "2h"
pub fn deserialize_duration <'a,D>(deserializer: D) -> Result<Duration,D::Error>
    where D: Deserializer<'a>
{
    String::deserialize(deserializer).and_then( |string| {
        parse(string.as_str())
            .map_err( |e| DeError::custom(format!("{:?}",e)))
    })
}

pub fn serialize_duration<S: Serializer> (dur: &Duration, s: S) -> Result<S::Ok, S::Error>  {
    let dfm = format!("{}s", dur.as_secs_f64());
    s.serialize_str(&dfm)
}
