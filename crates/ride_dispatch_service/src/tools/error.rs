/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_message: String,
    pub error_code: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    #[error("STORAGE_UNAVAILABLE")]
    StorageUnavailable(String),
    #[error("CONNECTION_GONE")]
    ConnectionGone(String),
    #[error("MALFORMED_INPUT")]
    MalformedInput(String),
    #[error("INVALID_REQUEST")]
    InvalidRequest(String),
    #[error("INTERNAL_ERROR")]
    InternalError(String),
    #[error("SERIALIZATION_ERROR")]
    SerializationError(String),
    #[error("INVALID_CONFIGURATION")]
    InvalidConfiguration(String),
}

impl AppError {
    pub fn error_message(&self) -> ErrorBody {
        ErrorBody {
            error_message: self.message(),
            error_code: self.code(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::StorageUnavailable(reason) => {
                format!("Location storage unavailable : {reason}")
            }
            AppError::ConnectionGone(connection_id) => {
                format!("Connection is no longer live : {connection_id}")
            }
            AppError::MalformedInput(err) => format!("Malformed input : {err}"),
            AppError::InvalidRequest(err) => err.to_string(),
            AppError::InternalError(err) => err.to_string(),
            AppError::SerializationError(err) => err.to_string(),
            AppError::InvalidConfiguration(err) => format!("Invalid configuration : {err}"),
        }
    }

    pub fn code(&self) -> String {
        self.to_string()
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(self.error_message())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ConnectionGone(_) => StatusCode::GONE,
            AppError::MalformedInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<fred::error::RedisError> for AppError {
    fn from(error: fred::error::RedisError) -> Self {
        AppError::StorageUnavailable(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::SerializationError(error.to_string())
    }
}
