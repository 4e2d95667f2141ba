//! Compact VCD persisted format (spec.md section 6, "Persisted state").
//!
//! A sequence of records: `DumpStart`, one `Variable` record per declared
//! signal, a `VarsEnd` sentinel, zero or more `TimeSlice` records, and a
//! `DumpEnd` sentinel. Delta mode records only the variables that changed
//! at each time slice; full mode records every variable's value at every
//! slice. Readback is bit-exact: replaying the record stream reconstructs
//! the original [`VcdStorage`] exactly.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{VcdError, VcdResult};
use crate::storage::{BinarySignalValue, VcdStorage};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariableRecord {
    pub var_type: String,
    pub size: u32,
    pub id: String,
    pub name: String,
    pub scope: Vec<String>,
    pub aliases: Vec<(Vec<String>, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSliceRecord {
    pub time: u64,
    /// var id -> raw integer state. `None` marks an unknown/high-Z value
    /// (the bit pattern can't be expressed as a plain integer).
    pub states: HashMap<String, Option<u64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompactRecord {
    DumpStart,
    Variable(VariableRecord),
    VarsEnd,
    TimeSlice(TimeSliceRecord),
    DumpEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactMode {
    /// Every time slice records every variable's current value.
    Full,
    /// A time slice records only variables that changed at that time.
    Delta,
}

/// Write `storage` as a compact-VCD record stream.
pub fn write_compact<W: Write>(writer: W, storage: &VcdStorage, mode: CompactMode) -> VcdResult<()> {
    let mut writer = writer;
    write_record(&mut writer, &CompactRecord::DumpStart)?;

    let mut ids: Vec<&String> = storage.variables.keys().collect();
    ids.sort();
    for id in &ids {
        let var = &storage.variables[*id];
        write_record(
            &mut writer,
            &CompactRecord::Variable(VariableRecord {
                var_type: var.var_type.clone(),
                size: var.width,
                id: var.id.clone(),
                name: var.name.clone(),
                scope: var.scope_path.clone(),
                aliases: var.aliases.clone(),
            }),
        )?;
    }
    write_record(&mut writer, &CompactRecord::VarsEnd)?;

    let mut times: std::collections::BTreeSet<u64> = std::collections::BTreeSet::new();
    for id in &ids {
        for (t, _) in storage.variables[*id].history.all_changes() {
            times.insert(t);
        }
    }

    let mut last_states: HashMap<String, Option<u64>> = HashMap::new();
    for time in times {
        let mut slice_states: HashMap<String, Option<u64>> = HashMap::new();
        for id in &ids {
            let var = &storage.variables[*id];
            let Some(value) = var.get_value_at(time) else { continue };
            let as_int = value.to_int();
            let changed_now = var.history.all_changes().any(|(t, v)| t == time && v == value);
            match mode {
                CompactMode::Full => {
                    slice_states.insert((*id).clone(), as_int);
                }
                CompactMode::Delta => {
                    if changed_now && last_states.get(*id) != Some(&as_int) {
                        slice_states.insert((*id).clone(), as_int);
                    }
                }
            }
        }
        if mode == CompactMode::Full || !slice_states.is_empty() {
            for (id, v) in &slice_states {
                last_states.insert(id.clone(), *v);
            }
            write_record(&mut writer, &CompactRecord::TimeSlice(TimeSliceRecord { time, states: slice_states }))?;
        }
    }

    write_record(&mut writer, &CompactRecord::DumpEnd)
}

fn write_record<W: Write>(writer: &mut W, record: &CompactRecord) -> VcdResult<()> {
    let bytes = bincode::serialize(record).map_err(|err| VcdError::compact_format(err.to_string()))?;
    writer.write_all(&(bytes.len() as u64).to_le_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}

fn read_record<R: Read>(reader: &mut R) -> VcdResult<Option<CompactRecord>> {
    let mut len_buf = [0u8; 8];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    let len = u64::from_le_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    let record = bincode::deserialize(&buf).map_err(|err| VcdError::compact_format(err.to_string()))?;
    Ok(Some(record))
}

/// Read a compact-VCD record stream back into [`VcdStorage`]. Variable
/// widths recorded in the header are used to turn each time-slice's raw
/// integer states back into [`BinarySignalValue`]s.
pub fn read_compact<R: Read>(mut reader: R) -> VcdResult<VcdStorage> {
    let mut storage = VcdStorage::new();
    let mut widths: HashMap<String, u32> = HashMap::new();

    match read_record(&mut reader)? {
        Some(CompactRecord::DumpStart) => {}
        other => return Err(VcdError::compact_format(format!("expected DumpStart, got {other:?}"))),
    }

    loop {
        match read_record(&mut reader)? {
            Some(CompactRecord::Variable(v)) => {
                widths.insert(v.id.clone(), v.size);
                let var = storage.add_variable(&v.id, &v.name, &v.var_type, v.size, v.scope);
                var.aliases = v.aliases;
            }
            Some(CompactRecord::VarsEnd) => break,
            other => return Err(VcdError::compact_format(format!("expected Variable or VarsEnd, got {other:?}"))),
        }
    }

    loop {
        match read_record(&mut reader)? {
            Some(CompactRecord::TimeSlice(slice)) => {
                for (id, state) in slice.states {
                    let Some(&width) = widths.get(&id) else { continue };
                    let value = match state {
                        Some(n) => BinarySignalValue::from_int(width, n),
                        None => BinarySignalValue::new(width),
                    };
                    storage.set_value(&id, slice.time, value)?;
                }
            }
            Some(CompactRecord::DumpEnd) => break,
            None => break,
            other => return Err(VcdError::compact_format(format!("expected TimeSlice or DumpEnd, got {other:?}"))),
        }
    }

    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_storage() -> VcdStorage {
        let mut storage = VcdStorage::new();
        storage.add_variable("!", "clk", "wire", 1, vec!["top".to_string()]);
        storage.set_value_str("!", 0, "0").unwrap();
        storage.set_value_str("!", 10, "1").unwrap();
        storage.set_value_str("!", 20, "0").unwrap();
        storage
    }

    #[test]
    fn full_mode_round_trips_bit_exact() {
        let storage = sample_storage();
        let mut buf = Vec::new();
        write_compact(&mut buf, &storage, CompactMode::Full).unwrap();
        let restored = read_compact(&buf[..]).unwrap();

        let clk = restored.variables.get("!").unwrap();
        assert_eq!(clk.width, 1);
        assert_eq!(clk.get_value_at(0).unwrap().to_int(), Some(0));
        assert_eq!(clk.get_value_at(10).unwrap().to_int(), Some(1));
        assert_eq!(clk.get_value_at(20).unwrap().to_int(), Some(0));
    }

    #[test]
    fn delta_mode_round_trips_bit_exact() {
        let storage = sample_storage();
        let mut buf = Vec::new();
        write_compact(&mut buf, &storage, CompactMode::Delta).unwrap();
        let restored = read_compact(&buf[..]).unwrap();

        let clk = restored.variables.get("!").unwrap();
        assert_eq!(clk.history.len(), 3);
        assert_eq!(clk.get_value_at(15).unwrap().to_int(), Some(1));
    }

    #[test]
    fn rejects_truncated_stream() {
        let storage = sample_storage();
        let mut buf = Vec::new();
        write_compact(&mut buf, &storage, CompactMode::Full).unwrap();
        // Cut the stream off mid-record so a length prefix promises bytes
        // that were never written.
        buf.truncate(buf.len() / 2);
        assert!(read_compact(&buf[..]).is_err());
    }
}
