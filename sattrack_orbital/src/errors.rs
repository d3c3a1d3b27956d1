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

use thiserror::Error;
use sattrack_common::{net::NetError, config::ConfigError as LoadConfigError, map_to_opaque_error};

pub type Result<T> = std::result::Result<T, OrbitalError>;

#[derive(Error,Debug)]
pub enum OrbitalError {

    /// remote feed or device storage unreachable, or non-success status
    #[error("network error {msg}")]
    NetworkError { status: Option<u16>, msg: String },

    /// feed text that does not contain element set triples
    #[error("malformed feed {0}")]
    MalformedFeedError( String ),

    /// the propagator has no valid state for an element set at a given time. This is never fatal
    #[error("no propagation state for {0}")]
    PropagationUnavailable( String ),

    #[error("config error {0}")]
    ConfigError( String ),

    #[error("storage error {0}")]
    StorageError( String ),

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("parse error {0}")]
    ParseError( String ),
}

impl OrbitalError {
    /// the HTTP status of network errors, if the server did respond
    pub fn status (&self)->Option<u16> {
        match self {
            OrbitalError::NetworkError{status,..} => *status,
            _ => None
        }
    }

    pub fn is_network_error (&self)->bool {
        matches!( self, OrbitalError::NetworkError{..})
    }
}

impl From<NetError> for OrbitalError {
    fn from (e: NetError)->Self {
        match e {
            NetError::ParseError(msg) => OrbitalError::ParseError(msg),
            NetError::IOError(e) => OrbitalError::IOError(e),
            e => OrbitalError::NetworkError{ status: e.status(), msg: e.to_string() }
        }
    }
}

impl From<serde_json::Error> for OrbitalError {
    fn from (e: serde_json::Error)->Self { OrbitalError::ParseError( e.to_string()) }
}

map_to_opaque_error!( LoadConfigError => OrbitalError::ConfigError);

macro_rules! storage_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OrbitalError::StorageError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use storage_error;

macro_rules! malformed_feed {
    ($fmt:literal $(, $arg:expr )* ) => {
        OrbitalError::MalformedFeedError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use malformed_feed;
