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

//! retrieval and parsing of remote element set feeds. We understand the CelesTrak style text
//! format (name line followed by the two orbital lines) and space-track GP JSON

use std::{collections::HashMap, sync::LazyLock};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use sattrack_common::net::get_text;
use crate::element_set::merge_key;
use crate::errors::{OrbitalError, Result, malformed_feed};

pub static TLE_LINES_RE: LazyLock<Regex> = LazyLock::new(||
    Regex::new( r#""TLE_LINE0": *"(.+?)",\s*"TLE_LINE1": *"(.+?)",\s*"TLE_LINE2": *"(.+?)""#).unwrap()
);

/// a named element set as received from a remote feed
#[derive(Debug,Clone,PartialEq)]
pub struct RemoteElementSet {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

/// parse feed text into element sets. Text feeds are grouped into consecutive triples of trimmed
/// lines, triples with a blank component and a trailing partial triple are dropped. Markup and
/// JSON without any TLE lines are rejected as malformed
pub fn parse_feed (text: &str)->Result<Vec<RemoteElementSet>> {
    let text = text.trim();

    if text.starts_with('<') {
        Err( malformed_feed!("markup instead of element sets"))
    } else if text.starts_with('[') || text.starts_with('{') {
        parse_gp_json( text)
    } else {
        Ok( parse_triples( text))
    }
}

fn parse_triples (text: &str)->Vec<RemoteElementSet> {
    if text.is_empty() {
        return Vec::new()
    }

    let lines: Vec<&str> = text.split('\n').map( |l| l.trim()).collect();
    let mut sets = Vec::with_capacity( lines.len() / 3);

    for chunk in lines.chunks(3) {
        if let [name, line1, line2] = chunk {
            if !name.is_empty() && !line1.is_empty() && !line2.is_empty() {
                sets.push( RemoteElementSet { name: name.to_string(), line1: line1.to_string(), line2: line2.to_string() });
            }
        } else {
            debug!("dropping trailing partial element set {:?}", chunk);
        }
    }

    sets
}

fn parse_gp_json (text: &str)->Result<Vec<RemoteElementSet>> {
    let sets: Vec<RemoteElementSet> = TLE_LINES_RE.captures_iter( text).map( |cap| {
        let name = cap[1].trim();
        let name = name.strip_prefix("0 ").unwrap_or(name).trim();
        RemoteElementSet { name: name.to_string(), line1: cap[2].trim().to_string(), line2: cap[3].trim().to_string() }
    }).collect();

    if sets.is_empty() {
        Err( malformed_feed!("JSON response without TLE lines"))
    } else {
        Ok(sets)
    }
}

/// map remote sets by their lowercase name. Later entries replace earlier ones with the same key
pub fn feed_map (sets: Vec<RemoteElementSet>)->HashMap<String,RemoteElementSet> {
    sets.into_iter().map( |r| (merge_key( &r.name), r)).collect()
}

/// the transport for remote feeds
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    async fn fetch_text (&self, url: &str)->Result<String>;

    async fn fetch_feed (&self, url: &str)->Result<HashMap<String,RemoteElementSet>> {
        let text = self.fetch_text( url).await?;
        Ok( feed_map( parse_feed( &text)?))
    }
}

pub struct HttpFeedSource {
    client: Client
}

impl HttpFeedSource {
    pub fn new ()->Self { HttpFeedSource { client: Client::new() } }
    pub fn with_client (client: Client)->Self { HttpFeedSource { client } }
}

impl Default for HttpFeedSource {
    fn default()->Self { Self::new() }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_text (&self, url: &str)->Result<String> {
        debug!("fetching element sets from {url}");
        get_text( &self.client, url).await.map_err( OrbitalError::from)
    }
}
