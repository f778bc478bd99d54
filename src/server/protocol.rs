//! Websocket message envelopes.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`.
//!
//! | direction | event               | data                                     |
//! |-----------|---------------------|------------------------------------------|
//! | in        | `requestLiveData`   | `{variableGroup}`                        |
//! | in        | `stopLiveData`      | none                                     |
//! | in        | `historical-chart`  | `{variableGroup, startDate, startTime, endDate, endTime}` |
//! | in        | `relative-chart`    | `{variableGroup, searchType}`            |
//! | out       | `liveDataUpdate`    | `[{variableName, time, value}]`          |
//! | out       | `liveDataError`     | `{message}`                              |
//! | out       | `historical-data`   | chart document                           |
//! | out       | `relative-data`     | chart document                           |
//! | out       | `error`             | `{message}`                              |

use plcwatch_types::{ChartDocument, SampleRow};
use serde::{Deserialize, Serialize};

use crate::live::LiveUpdate;
use crate::service::{HistoricalChartRequest, RelativeChartRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDataRequest {
    pub variable_group: String,
}

/// Messages sent by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "requestLiveData")]
    RequestLiveData(LiveDataRequest),
    #[serde(rename = "stopLiveData")]
    StopLiveData,
    #[serde(rename = "historical-chart")]
    HistoricalChart(HistoricalChartRequest),
    #[serde(rename = "relative-chart")]
    RelativeChart(RelativeChartRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// Messages sent to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "liveDataUpdate")]
    LiveDataUpdate(Vec<SampleRow>),
    #[serde(rename = "liveDataError")]
    LiveDataError(ErrorMessage),
    #[serde(rename = "historical-data")]
    HistoricalData(ChartDocument),
    #[serde(rename = "relative-data")]
    RelativeData(ChartDocument),
    #[serde(rename = "error")]
    Error(ErrorMessage),
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorMessage {
            message: message.into(),
        })
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::LiveDataUpdate(_) => "liveDataUpdate",
            ServerEvent::LiveDataError(_) => "liveDataError",
            ServerEvent::HistoricalData(_) => "historical-data",
            ServerEvent::RelativeData(_) => "relative-data",
            ServerEvent::Error(_) => "error",
        }
    }
}

impl From<LiveUpdate> for ServerEvent {
    fn from(update: LiveUpdate) -> Self {
        match update {
            LiveUpdate::Rows { rows, .. } => ServerEvent::LiveDataUpdate(rows),
            LiveUpdate::Failed { message, .. } => {
                ServerEvent::LiveDataError(ErrorMessage { message })
            }
        }
    }
}
