//! Decoding of Flux CSV responses.
//!
//! A response is a sequence of tables separated by blank lines. Each table
//! starts with a header row (optionally preceded by `#` annotation rows), and
//! tables with different schemas repeat the header. Errors raised while the
//! query runs arrive in-band as a table with `error` and `reference` columns.

use std::collections::BTreeMap;

use csv::ReaderBuilder;

use super::{FluxRecord, StoreError};

/// Decode a CSV response body into records.
pub fn decode_csv(body: &str) -> Result<Vec<FluxRecord>, StoreError> {
    let mut records = Vec::new();

    for table in split_tables(body) {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(table.as_bytes());

        let headers = reader.headers()?.clone();
        let error_column = headers.iter().position(|h| h == "error");

        for row in reader.records() {
            let row = row?;

            if let Some(idx) = error_column {
                let message = row.get(idx).unwrap_or_default();
                if !message.is_empty() {
                    return Err(StoreError::Query(message.to_string()));
                }
            }

            let columns: BTreeMap<String, String> = headers
                .iter()
                .zip(row.iter())
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            records.push(FluxRecord::new(columns));
        }
    }

    Ok(records)
}

/// Split a body into tables at blank lines.
fn split_tables(body: &str) -> Vec<String> {
    let mut tables = Vec::new();
    let mut current = String::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                tables.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.is_empty() {
        tables.push(current);
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_table() {
        let body = ",result,table,_time,_value,_field,_measurement,VariableName\r\n\
                    ,mean,0,2023-01-01T00:00:03Z,21.5,value,plc_data,Temp\r\n\
                    ,mean,0,2023-01-01T00:00:06Z,22,value,plc_data,Temp\r\n\
                    \r\n";
        let records = decode_csv(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("VariableName"), Some("Temp"));
        assert_eq!(records[1].f64("_value"), Some(22.0));
        assert_eq!(records[0].get(""), None);
    }

    #[test]
    fn test_decode_multiple_tables_with_different_headers() {
        let body = ",result,table,_time,_value,VariableName\n\
                    ,_result,0,2023-01-01T00:00:03Z,1,Temp\n\
                    \n\
                    ,result,table,min,max\n\
                    ,_result,1,0.5,99.5\n";
        let records = decode_csv(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("VariableName"), Some("Temp"));
        assert_eq!(records[1].f64("min"), Some(0.5));
        assert_eq!(records[1].f64("max"), Some(99.5));
    }

    #[test]
    fn test_decode_skips_annotations() {
        let body = "#datatype,string,long,double\n\
                    #group,false,false,false\n\
                    ,result,table,_value\n\
                    ,_result,0,3.5\n";
        let records = decode_csv(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].f64("_value"), Some(3.5));
    }

    #[test]
    fn test_decode_in_band_error() {
        let body = "error,reference\n\
                    \"runtime error: bucket not found\",897\n";
        let err = decode_csv(body).unwrap_err();
        assert_eq!(err, StoreError::Query("runtime error: bucket not found".to_string()));
    }

    #[test]
    fn test_decode_empty_body() {
        assert!(decode_csv("").unwrap().is_empty());
        assert!(decode_csv("\r\n\r\n").unwrap().is_empty());
    }
}
