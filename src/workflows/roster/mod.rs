//! CSV roster importer seeding dormitory inventory and the student roster
//! from registrar exports.

mod parser;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::workflows::housing::store::{
    HousingStore, NewDormitory, NewRoom, NewStudent, StoreError,
};

use parser::RoomRow;

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Store(StoreError),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster export: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::Store(err) => {
                write!(f, "could not write roster data to the store: {}", err)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<StoreError> for RosterImportError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Counters from one import pass. Inventory seeding fills the first two,
/// student seeding the third; skipped covers rows dropped by either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterSummary {
    pub dormitories: usize,
    pub rooms: usize,
    pub students: usize,
    pub skipped: usize,
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn inventory_from_path<P, S>(path: P, store: &S) -> Result<RosterSummary, RosterImportError>
    where
        P: AsRef<Path>,
        S: HousingStore,
    {
        let file = std::fs::File::open(path)?;
        Self::inventory_from_reader(file, store)
    }

    /// Seed dormitories and rooms from an inventory export. Rooms sharing a
    /// dormitory name are grouped under one dormitory whose aggregate
    /// capacity is the sum of its rooms.
    pub fn inventory_from_reader<R, S>(
        reader: R,
        store: &S,
    ) -> Result<RosterSummary, RosterImportError>
    where
        R: Read,
        S: HousingStore,
    {
        let parsed = parser::parse_rooms(reader)?;
        let mut summary = RosterSummary {
            skipped: parsed.skipped,
            ..RosterSummary::default()
        };

        let mut groups: BTreeMap<String, Vec<RoomRow>> = BTreeMap::new();
        for row in parsed.rows {
            if row.dormitory.is_empty() || row.room.is_empty() {
                warn!("skipping inventory row with missing dormitory or room number");
                summary.skipped += 1;
                continue;
            }
            groups.entry(row.dormitory.clone()).or_default().push(row);
        }

        for (name, rows) in groups {
            let capacity: u32 = rows.iter().map(|row| row.capacity).sum();
            let occupied: u32 = rows.iter().map(|row| row.occupied.unwrap_or(0)).sum();
            let dormitory = store.insert_dormitory(NewDormitory {
                name,
                capacity,
                free_capacity: capacity.saturating_sub(occupied),
            })?;
            summary.dormitories += 1;

            for row in rows {
                store.insert_room(NewRoom {
                    dormitory_id: dormitory.id,
                    number: row.room,
                    capacity: row.capacity,
                    occupied: row.occupied.unwrap_or(0),
                })?;
                summary.rooms += 1;
            }
        }

        Ok(summary)
    }

    pub fn students_from_path<P, S>(path: P, store: &S) -> Result<RosterSummary, RosterImportError>
    where
        P: AsRef<Path>,
        S: HousingStore,
    {
        let file = std::fs::File::open(path)?;
        Self::students_from_reader(file, store)
    }

    /// Seed the student roster. Rows missing a name or email are dropped.
    pub fn students_from_reader<R, S>(
        reader: R,
        store: &S,
    ) -> Result<RosterSummary, RosterImportError>
    where
        R: Read,
        S: HousingStore,
    {
        let parsed = parser::parse_students(reader)?;
        let mut summary = RosterSummary {
            skipped: parsed.skipped,
            ..RosterSummary::default()
        };

        for row in parsed.rows {
            if row.first_name.is_empty() || row.last_name.is_empty() || row.email.is_empty() {
                warn!("skipping student row with missing name or email");
                summary.skipped += 1;
                continue;
            }
            let disability = row.has_disability();
            store.insert_student(NewStudent {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                study_program: row.study_program.unwrap_or_default(),
                year_of_study: row.year_of_study,
                grade_average: row.grade_average,
                distance_km: row.distance_km,
                household_income: row.household_income,
                household_size: row.household_size.unwrap_or(0),
                disability,
                social_situation: row.social_situation,
            })?;
            summary.students += 1;
        }

        Ok(summary)
    }
}
