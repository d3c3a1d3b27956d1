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

//! common utility functions for network operations.
//! All functions map non-success HTTP status codes into [`NetError::StatusError`] so that callers
//! can report the status without having to inspect responses themselves

use reqwest::{header::{HeaderMap,HeaderValue,CONTENT_TYPE}, Client, Response, StatusCode};
use serde::{de::DeserializeOwned,Serialize};

use crate::define_error;

define_error!{ pub NetError =
    IOError(#[from] std::io::Error) : "IO error: {0}",
    HttpError(#[from] reqwest::Error) : "http error: {0}",
    StatusError { status: u16, url: String } : "request {url} failed with status {status}",
    ParseError(String) : "parse error: {0}",
    OpFailed(String) : "operation failed: {0}"
}

pub type Result<T> = std::result::Result<T, NetError>;

impl NetError {
    /// the HTTP status code associated with this error, if there is one
    pub fn status (&self)->Option<u16> {
        match self {
            NetError::StatusError{status,..} => Some(*status),
            NetError::HttpError(e) => e.status().map( |s| s.as_u16()),
            _ => None
        }
    }

    pub fn is_not_found (&self)->bool {
        self.status() == Some( StatusCode::NOT_FOUND.as_u16())
    }
}

fn json_headers ()->HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn check_status (response: Response, url: &str)->Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err( NetError::StatusError{ status: status.as_u16(), url: url.to_string() })
    }
}

/// GET the response body of the provided URL as text
pub async fn get_text (client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let response = check_status( response, url)?;
    Ok( response.text().await? )
}

pub async fn get_json<T> (client: &Client, url: &str) -> Result<T> where T: DeserializeOwned {
    let response = client.get(url).send().await?;
    let response = check_status( response, url)?;
    from_json( response).await
}

/// POST `data` as JSON and return the response body text, which might be empty
pub async fn post_json<T> (client: &Client, url: &str, data: &T) -> Result<String> where T: Serialize {
    let response = client.post(url).headers( json_headers()).json(data).send().await?;
    let response = check_status( response, url)?;
    Ok( response.text().await? )
}

/// PUT `data` as JSON and return the response body text, which might be empty
pub async fn put_json<T> (client: &Client, url: &str, data: &T) -> Result<String> where T: Serialize {
    let response = client.put(url).headers( json_headers()).json(data).send().await?;
    let response = check_status( response, url)?;
    Ok( response.text().await? )
}

pub async fn delete (client: &Client, url: &str) -> Result<()> {
    let response = client.delete(url).send().await?;
    check_status( response, url)?;
    Ok(())
}

pub async fn from_json<T> (response: Response)->Result<T> where T: DeserializeOwned {
    let bytes = response.bytes().await?;
    serde_json::from_slice( &bytes).map_err(|e| NetError::ParseError(e.to_string()))
}
