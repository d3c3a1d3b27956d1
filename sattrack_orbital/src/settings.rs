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

//! string key/value user preferences with change notification. Values can be persisted as
//! a flat JSON object

use std::{collections::HashMap, path::Path, sync::{Arc,RwLock,RwLockReadGuard,RwLockWriteGuard}};
use tokio::sync::broadcast;
use tracing::debug;

use sattrack_common::fs::{filepath_contents_as_string, set_filepath_contents_atomically};
use crate::errors::Result;

pub const TLE_FREQUENCY: &str = "tleFrequency";
pub const TLE_SOURCE: &str = "tleSource";
pub const TLE_CUSTOM_URL: &str = "tleCustomURL";

/// the keys a [`crate::sync::SyncScheduler`] reacts to
pub const SYNC_KEYS: [&str;3] = [TLE_FREQUENCY, TLE_SOURCE, TLE_CUSTOM_URL];

const CHANGE_QUEUE_LEN: usize = 64;

/// notification about a changed value. `value` is `None` if the key was removed
#[derive(Debug,Clone,PartialEq)]
pub struct SettingChange {
    pub key: String,
    pub value: Option<String>,
}

struct SettingsInner {
    values: RwLock<HashMap<String,String>>,
    changes: broadcast::Sender<SettingChange>,
}

#[derive(Clone)]
pub struct Settings {
    inner: Arc<SettingsInner>
}

impl Settings {
    pub fn new ()->Self {
        Self::from_map( HashMap::new())
    }

    pub fn from_map (values: HashMap<String,String>)->Self {
        let (changes,_) = broadcast::channel( CHANGE_QUEUE_LEN);
        Settings { inner: Arc::new( SettingsInner { values: RwLock::new(values), changes }) }
    }

    /// read settings from a JSON object file. A missing file yields empty settings
    pub fn from_json_file (path: impl AsRef<Path>)->Result<Self> {
        let path = path.as_ref();
        if path.is_file() {
            let values: HashMap<String,String> = serde_json::from_str( &filepath_contents_as_string( &path)?)?;
            Ok( Self::from_map( values))
        } else {
            debug!("no settings file {:?}, using defaults", path);
            Ok( Self::new())
        }
    }

    pub fn save_json_file (&self, path: impl AsRef<Path>)->Result<()> {
        let json = serde_json::to_vec_pretty( &*self.read_values())?;
        Ok( set_filepath_contents_atomically( &path.as_ref(), &json)? )
    }

    fn read_values (&self)->RwLockReadGuard<'_,HashMap<String,String>> {
        self.inner.values.read().unwrap_or_else( |e| e.into_inner())
    }

    fn write_values (&self)->RwLockWriteGuard<'_,HashMap<String,String>> {
        self.inner.values.write().unwrap_or_else( |e| e.into_inner())
    }

    fn notify (&self, key: &str, value: Option<String>) {
        // no receivers is not an error
        let _ = self.inner.changes.send( SettingChange{ key: key.to_string(), value });
    }

    pub fn get (&self, key: &str)->Option<String> {
        self.read_values().get(key).cloned()
    }

    pub fn get_or (&self, key: &str, default: &str)->String {
        self.get(key).unwrap_or_else( || default.to_string())
    }

    /// set a value, notifying subscribers only if it differs from the current one
    pub fn set (&self, key: &str, value: impl ToString) {
        let value = value.to_string();
        let changed = {
            let mut values = self.write_values();
            if values.get(key) == Some(&value) {
                false
            } else {
                values.insert( key.to_string(), value.clone());
                true
            }
        };
        if changed { self.notify( key, Some(value)) }
    }

    pub fn remove (&self, key: &str) {
        let removed = self.write_values().remove(key).is_some();
        if removed { self.notify( key, None) }
    }

    /// drop all values (restoring defaults), notifying about each removed key
    pub fn clear (&self) {
        let keys: Vec<String> = self.write_values().drain().map( |(k,_)| k).collect();
        for k in keys { self.notify( &k, None) }
    }

    pub fn snapshot (&self)->HashMap<String,String> {
        self.read_values().clone()
    }

    pub fn subscribe (&self)->broadcast::Receiver<SettingChange> {
        self.inner.changes.subscribe()
    }
}

impl Default for Settings {
    fn default()->Self { Self::new() }
}
