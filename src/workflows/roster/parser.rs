use std::io::Read;

use serde::{Deserialize, Deserializer};
use tracing::warn;

/// One room line from an inventory export. Rooms belonging to the same
/// dormitory carry the same dormitory name.
#[derive(Debug, Deserialize)]
pub(crate) struct RoomRow {
    #[serde(rename = "Dormitory")]
    pub(crate) dormitory: String,
    #[serde(rename = "Room")]
    pub(crate) room: String,
    #[serde(rename = "Capacity")]
    pub(crate) capacity: u32,
    #[serde(rename = "Occupied", default)]
    pub(crate) occupied: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentRow {
    #[serde(rename = "First Name")]
    pub(crate) first_name: String,
    #[serde(rename = "Last Name")]
    pub(crate) last_name: String,
    #[serde(rename = "Email")]
    pub(crate) email: String,
    #[serde(
        rename = "Study Program",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) study_program: Option<String>,
    #[serde(rename = "Year")]
    pub(crate) year_of_study: u8,
    #[serde(rename = "Grade Average", default)]
    pub(crate) grade_average: Option<f64>,
    #[serde(rename = "Distance Km", default)]
    pub(crate) distance_km: Option<f64>,
    #[serde(rename = "Household Income", default)]
    pub(crate) household_income: Option<f64>,
    #[serde(rename = "Household Size", default)]
    pub(crate) household_size: Option<u32>,
    #[serde(
        rename = "Disability",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) disability: Option<String>,
    #[serde(
        rename = "Social Situation",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) social_situation: Option<String>,
}

impl StudentRow {
    pub(crate) fn has_disability(&self) -> bool {
        matches!(
            self.disability
                .as_deref()
                .map(str::trim)
                .map(str::to_ascii_lowercase)
                .as_deref(),
            Some("yes") | Some("true") | Some("1")
        )
    }
}

pub(crate) struct ParsedRows<T> {
    pub(crate) rows: Vec<T>,
    pub(crate) skipped: usize,
}

pub(crate) fn parse_rooms<R: Read>(reader: R) -> Result<ParsedRows<RoomRow>, csv::Error> {
    parse_rows(reader, "skipping malformed inventory row")
}

pub(crate) fn parse_students<R: Read>(reader: R) -> Result<ParsedRows<StudentRow>, csv::Error> {
    parse_rows(reader, "skipping malformed student row")
}

/// Rows that fail to deserialize are logged and counted, only hard I/O
/// failures abort the whole parse.
fn parse_rows<R, T>(reader: R, skip_message: &'static str) -> Result<ParsedRows<T>, csv::Error>
where
    R: Read,
    T: serde::de::DeserializeOwned,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut parsed = ParsedRows {
        rows: Vec::new(),
        skipped: 0,
    };

    for record in csv_reader.deserialize::<T>() {
        match record {
            Ok(row) => parsed.rows.push(row),
            Err(error) if matches!(error.kind(), csv::ErrorKind::Io(_)) => return Err(error),
            Err(error) => {
                warn!(error = %error, "{skip_message}");
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|text| !text.trim().is_empty()))
}
