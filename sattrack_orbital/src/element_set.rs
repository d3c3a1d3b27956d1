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
use chrono::{DateTime, Utc};
use serde::{Serialize,Deserialize,Serializer,Deserializer};
use tracing::debug;
use sattrack_common::datetime::utc_now;
use crate::errors::{OrbitalError, Result};

/// opaque element set identifier. These are assigned by the storage backend, never by us.
/// Backends use either numbers or strings, we store both as strings
#[derive(Debug,Clone,PartialEq,Eq,Hash,PartialOrd,Ord)]
pub struct ElementSetId(String);

impl ElementSetId {
    pub fn new (id: impl ToString)->Self { ElementSetId(id.to_string()) }
    pub fn as_str (&self)->&str { self.0.as_str() }
}

impl fmt::Display for ElementSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ElementSetId {
    fn serialize<S: Serializer> (&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str( &self.0)
    }
}

impl<'de> Deserialize<'de> for ElementSetId {
    fn deserialize<D> (deserializer: D) -> std::result::Result<Self, D::Error> where D: Deserializer<'de> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId { Num(u64), Str(String) }

        Ok( match RawId::deserialize(deserializer)? {
            RawId::Num(n) => ElementSetId(n.to_string()),
            RawId::Str(s) => ElementSetId(s)
        })
    }
}

/// the name based key we use to match element sets from different sources
#[inline]
pub fn merge_key (name: &str)->String {
    name.trim().to_lowercase()
}

/// a named two line element set as stored by the storage backend
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct ElementSet {
    pub id: ElementSetId,
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub last_updated: DateTime<Utc>,
    pub description: Option<String>,
}

impl ElementSet {
    pub fn from_entry (id: ElementSetId, entry: ElementSetEntry)->Self {
        ElementSet {
            id,
            name: entry.name,
            line1: entry.line1,
            line2: entry.line2,
            last_updated: entry.last_updated,
            description: entry.description
        }
    }

    pub fn merge_key (&self)->String {
        merge_key( &self.name)
    }

    /// the two orbital lines joined by a newline, which is how feeds and devices exchange them
    pub fn tle_text (&self)->String {
        format!("{}\n{}", self.line1, self.line2)
    }

    /// byte-for-byte comparison of the orbital lines
    pub fn has_lines (&self, line1: &str, line2: &str)->bool {
        self.line1 == line1 && self.line2 == line2
    }

    pub fn to_entry (&self)->ElementSetEntry {
        ElementSetEntry {
            name: self.name.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            last_updated: self.last_updated,
            description: self.description.clone()
        }
    }
}

impl fmt::Display for ElementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementSet( id:{}, name:'{}', last_updated:{})", self.id, self.name, self.last_updated)
    }
}

/// the id-less element set data we send to storage for create and update requests
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct ElementSetEntry {
    pub name: String,
    pub line1: String,
    pub line2: String,

    #[serde(default="utc_now")]
    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub description: Option<String>,
}

impl ElementSetEntry {
    pub fn new (name: impl ToString, line1: impl ToString, line2: impl ToString)->Self {
        ElementSetEntry {
            name: name.to_string(),
            line1: line1.to_string(),
            line2: line2.to_string(),
            last_updated: utc_now(),
            description: None
        }
    }

    pub fn with_description (mut self, description: impl ToString)->Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_last_updated (mut self, last_updated: DateTime<Utc>)->Self {
        self.last_updated = last_updated;
        self
    }
}

/* #region device wire format ****************************************************************************/

/// split a `tleData` text block into its two orbital lines. Leading/trailing whitespace of the block
/// and of each line is ignored, but the result has to consist of exactly two non-empty lines
pub fn split_tle_data (tle_data: &str)->Option<(String,String)> {
    let lines: Vec<&str> = tle_data.trim().lines().map( |l| l.trim()).filter( |l| !l.is_empty()).collect();
    if lines.len() == 2 {
        Some( (lines[0].to_string(), lines[1].to_string()) )
    } else {
        None
    }
}

/// the JSON record format of the device element set API:
/// `{ "id": 3, "name": "NOAA 15", "tleData": "1 25338U..\n2 25338..", "description": "..", "lastUpdated": ".." }`
#[derive(Debug,Clone,Serialize,Deserialize)]
#[serde(rename_all="camelCase")]
pub struct ElementSetRecord {
    #[serde(default, skip_serializing_if="sattrack_common::is_none")]
    pub id: Option<ElementSetId>,

    pub name: String,
    pub tle_data: String,

    #[serde(default, skip_serializing_if="sattrack_common::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if="sattrack_common::is_none")]
    pub last_updated: Option<String>,
}

impl From<&ElementSetEntry> for ElementSetRecord {
    fn from (e: &ElementSetEntry)->Self {
        ElementSetRecord {
            id: None,
            name: e.name.clone(),
            tle_data: format!("{}\n{}", e.line1, e.line2),
            description: e.description.clone(),
            last_updated: Some( e.last_updated.to_rfc3339())
        }
    }
}

impl TryFrom<ElementSetRecord> for ElementSet {
    type Error = OrbitalError;

    fn try_from (rec: ElementSetRecord)->Result<Self> {
        let id = rec.id.ok_or_else( || OrbitalError::ParseError( format!("element set '{}' has no id", rec.name)))?;
        let (line1, line2) = split_tle_data( &rec.tle_data)
            .ok_or_else( || OrbitalError::ParseError( format!("element set '{}' does not have two TLE lines", rec.name)))?;
        let last_updated = rec.last_updated.as_deref().map( parse_last_updated).unwrap_or( DateTime::UNIX_EPOCH);

        Ok( ElementSet { id, name: rec.name, line1, line2, last_updated, description: rec.description } )
    }
}

/// devices written by other clients might store arbitrary (locale specific) date strings. We only
/// understand RFC 3339 and fall back to the epoch for anything else
fn parse_last_updated (s: &str)->DateTime<Utc> {
    match DateTime::parse_from_rfc3339(s.trim()) {
        Ok(dt) => dt.to_utc(),
        Err(_) => {
            debug!("unrecognized lastUpdated value '{}'", s);
            DateTime::UNIX_EPOCH
        }
    }
}

/* #endregion device wire format */
