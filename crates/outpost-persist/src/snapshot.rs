//! The save stream: section order, encode, and decode.
//!
//! Sections are written sequentially into one gzip stream as independent
//! binary frames. The order is part of the format contract and mirrors
//! the load order exactly:
//!
//! 1. listener roster (rebind metadata)
//! 2. malfunction registry
//! 3. environment
//! 4. missions
//! 5. event log
//! 6. crew
//! 7. settlement
//! 8. clock

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use outpost_agents::Crew;
use outpost_missions::MissionRoster;
use outpost_types::{EventLog, SimTime};
use outpost_world::{EnvironmentModel, MalfunctionRegistry, Settlement};

use crate::error::PersistError;

/// Leading bytes identifying a save stream.
const SAVE_MAGIC: &[u8; 8] = b"OUTPOST\0";

/// Current save format version. Bump when the section layout changes.
pub const SAVE_VERSION: u32 = 1;

/// Portable snapshot of the pulse clock's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    /// Simulated time at the moment of the save.
    pub now: SimTime,
    /// The clock's base step.
    pub base_step: SimTime,
    /// The clock's time ratio.
    pub time_ratio: Decimal,
    /// Pulses emitted so far.
    pub pulse_count: u64,
}

/// Everything a save stream holds, in section order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    /// Names of the registered pulse listeners, in registration order.
    /// Rebind must re-attach exactly this roster.
    pub listener_roster: Vec<String>,
    /// Active malfunctions.
    pub malfunctions: MalfunctionRegistry,
    /// Exterior environment state.
    pub environment: EnvironmentModel,
    /// All missions, running and finished.
    pub missions: MissionRoster,
    /// The historical event log.
    pub events: EventLog,
    /// The crew roster with task managers.
    pub crew: Crew,
    /// Facilities and vehicles.
    pub settlement: Settlement,
    /// The pulse clock.
    pub clock: ClockSnapshot,
}

/// Write a save stream.
pub fn save_to_writer<W: Write>(writer: W, data: &SaveData) -> Result<(), PersistError> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    encoder.write_all(SAVE_MAGIC)?;
    encoder.write_all(&SAVE_VERSION.to_le_bytes())?;

    write_section(&mut encoder, &data.listener_roster)?;
    write_section(&mut encoder, &data.malfunctions)?;
    write_section(&mut encoder, &data.environment)?;
    write_section(&mut encoder, &data.missions)?;
    write_section(&mut encoder, &data.events)?;
    write_section(&mut encoder, &data.crew)?;
    write_section(&mut encoder, &data.settlement)?;
    write_section(&mut encoder, &data.clock)?;

    encoder.finish()?;
    Ok(())
}

/// Read a save stream, validating magic and version first.
pub fn load_from_reader<R: Read>(reader: R) -> Result<SaveData, PersistError> {
    let mut decoder = GzDecoder::new(reader);

    let mut magic = [0_u8; 8];
    read_header(&mut decoder, &mut magic)?;
    if &magic != SAVE_MAGIC {
        return Err(PersistError::BadMagic);
    }

    let mut version_bytes = [0_u8; 4];
    read_header(&mut decoder, &mut version_bytes)?;
    let found = u32::from_le_bytes(version_bytes);
    if found != SAVE_VERSION {
        return Err(PersistError::VersionMismatch {
            found,
            expected: SAVE_VERSION,
        });
    }

    Ok(SaveData {
        listener_roster: read_section(&mut decoder, "listener roster")?,
        malfunctions: read_section(&mut decoder, "malfunction registry")?,
        environment: read_section(&mut decoder, "environment")?,
        missions: read_section(&mut decoder, "missions")?,
        events: read_section(&mut decoder, "event log")?,
        crew: read_section(&mut decoder, "crew")?,
        settlement: read_section(&mut decoder, "settlement")?,
        clock: read_section(&mut decoder, "clock")?,
    })
}

/// Write a save stream to a file.
pub fn save_to_path(path: &Path, data: &SaveData) -> Result<(), PersistError> {
    let file = File::create(path)?;
    save_to_writer(BufWriter::new(file), data)?;
    info!(path = %path.display(), "simulation saved");
    Ok(())
}

/// Read a save stream from a file.
pub fn load_from_path(path: &Path) -> Result<SaveData, PersistError> {
    let file = File::open(path)?;
    let data = load_from_reader(BufReader::new(file))?;
    info!(path = %path.display(), "simulation loaded");
    Ok(data)
}

/// Encode one section frame.
fn write_section<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<(), PersistError> {
    bincode::serialize_into(writer, value).map_err(|source| PersistError::Encode { source })
}

/// Decode one section frame.
fn read_section<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    section: &'static str,
) -> Result<T, PersistError> {
    bincode::deserialize_from(reader).map_err(|source| PersistError::Decode { section, source })
}

/// Read a fixed-size header field, mapping EOF to a truncation error.
fn read_header<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), PersistError> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            PersistError::Truncated
        } else {
            PersistError::Io { source: err }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use outpost_types::{AgentKind, Colonist, EventCategory, JobKind};
    use outpost_world::{Facility, FacilityKind};

    fn sample_data() -> SaveData {
        let mut settlement = Settlement::new("Base Alpha");
        let _ = settlement.add_facility(Facility::new(
            "airlock A",
            FacilityKind::Airlock,
            SimTime::from_whole(50),
        ));
        let _ = settlement.add_vehicle("rover 1", SimTime::from_whole(20));

        let mut crew = Crew::new();
        let _ = crew.enroll(Colonist::new("Ada", AgentKind::Person, JobKind::Engineer));
        let _ = crew.enroll(Colonist::new(
            "R-7",
            AgentKind::Robot { battery_pct: 80 },
            JobKind::Technician,
        ));

        let mut events = EventLog::default();
        events.record(SimTime::from_whole(3), 1, EventCategory::Clock, "started");

        SaveData {
            listener_roster: vec![
                String::from("environment"),
                String::from("population"),
                String::from("missions"),
            ],
            malfunctions: MalfunctionRegistry::default(),
            environment: EnvironmentModel::new(42),
            missions: MissionRoster::new(),
            events,
            crew,
            settlement,
            clock: ClockSnapshot {
                now: SimTime::from_whole(30),
                base_step: SimTime::from_whole(3),
                time_ratio: Decimal::new(2, 0),
                pulse_count: 10,
            },
        }
    }

    #[test]
    fn roundtrip_preserves_every_section() {
        let data = sample_data();
        let mut buffer = Vec::new();
        save_to_writer(&mut buffer, &data).unwrap();

        let loaded = load_from_reader(buffer.as_slice()).unwrap();
        assert_eq!(loaded.listener_roster, data.listener_roster);
        assert_eq!(loaded.environment, data.environment);
        assert_eq!(loaded.events.len(), data.events.len());
        assert_eq!(loaded.crew.len(), data.crew.len());
        assert_eq!(loaded.settlement.facility_count(), data.settlement.facility_count());
        assert_eq!(loaded.clock, data.clock);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut raw = Vec::new();
        {
            let mut encoder = GzEncoder::new(&mut raw, Compression::default());
            encoder.write_all(b"NOTASAVE").unwrap();
            encoder.write_all(&SAVE_VERSION.to_le_bytes()).unwrap();
            let _ = encoder.finish().unwrap();
        }
        let err = load_from_reader(raw.as_slice()).unwrap_err();
        assert!(matches!(err, PersistError::BadMagic));
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let mut raw = Vec::new();
        {
            let mut encoder = GzEncoder::new(&mut raw, Compression::default());
            encoder.write_all(SAVE_MAGIC).unwrap();
            encoder
                .write_all(&SAVE_VERSION.wrapping_add(7).to_le_bytes())
                .unwrap();
            let _ = encoder.finish().unwrap();
        }
        let err = load_from_reader(raw.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::VersionMismatch { found, expected }
                if found == SAVE_VERSION.wrapping_add(7) && expected == SAVE_VERSION
        ));
    }

    #[test]
    fn truncated_stream_is_fatal() {
        let data = sample_data();
        let mut buffer = Vec::new();
        save_to_writer(&mut buffer, &data).unwrap();
        buffer.truncate(buffer.len() / 2);

        assert!(load_from_reader(buffer.as_slice()).is_err());
    }

    #[test]
    fn empty_stream_reports_truncation() {
        let mut raw = Vec::new();
        {
            let encoder = GzEncoder::new(&mut raw, Compression::default());
            let _ = encoder.finish().unwrap();
        }
        let err = load_from_reader(raw.as_slice()).unwrap_err();
        assert!(matches!(err, PersistError::Truncated));
    }
}
