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

//! loading of serde configuration structs from RON (default) or JSON files

use std::path::Path;
use serde::de::DeserializeOwned;
use tracing::debug;
use crate::{define_error, fs::{extension, filepath_contents}};

define_error!{ pub ConfigError =
    IOError(#[from] std::io::Error) : "config IO error: {0}",
    RonError(#[from] ron::error::SpannedError) : "RON config error: {0}",
    JsonError(#[from] serde_json::Error) : "JSON config error: {0}"
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub fn load_config_path<C,P> (path: P) -> Result<C> where C: DeserializeOwned, P: AsRef<Path> {
    let path = path.as_ref();
    debug!("loading config {:?}", path);

    let data = filepath_contents( &path)?;
    match extension( &path) {
        Some("json") => Ok( serde_json::from_slice( data.as_slice())? ),
        _ => Ok( ron::de::from_bytes( data.as_slice())? )
    }
}

pub fn parse_config_str<C> (s: &str) -> Result<C> where C: DeserializeOwned {
    Ok( ron::de::from_str(s)? )
}
