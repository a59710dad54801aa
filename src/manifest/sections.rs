//! Serialization of one manifest group into the `[RUNVALUES]`, `[SETTINGS]`
//! and `[SAMPLES]` sections.

use serde::Serialize;

use crate::core::sample::{GroupKey, SampleRow};
use crate::manifest::{ManifestError, RunHeader};

#[derive(Serialize)]
struct SampleRecord<'r> {
    #[serde(rename = "SampleName")]
    sample_name: &'r str,
    #[serde(rename = "Index1")]
    index1: &'r str,
    #[serde(rename = "Index2")]
    index2: &'r str,
    #[serde(rename = "Lane")]
    lane: &'r str,
    #[serde(rename = "Project")]
    project: &'r str,
    #[serde(rename = "Recipe")]
    recipe: &'r str,
}

impl<'r> From<&'r SampleRow> for SampleRecord<'r> {
    fn from(row: &'r SampleRow) -> Self {
        Self {
            sample_name: &row.sample_name,
            index1: &row.index.index1,
            index2: &row.index.index2,
            lane: &row.lane,
            project: &row.project,
            recipe: &row.recipe,
        }
    }
}

/// `[RUNVALUES]` block: step metadata, group index and grouping key
#[must_use]
pub fn run_values(
    header: &RunHeader,
    file_name: &str,
    group: usize,
    total: usize,
    key: &GroupKey,
) -> String {
    [
        "[RUNVALUES]".to_string(),
        "KeyName, Value".to_string(),
        format!("lims_step_name, \"{}\"", header.step_name),
        format!("lims_step_id, \"{}\"", header.step_id),
        format!("manifest_file, \"{file_name}\""),
        format!("manifest_group, {}/{total}", group + 1),
        format!("grouped_by, {key}"),
    ]
    .join("\n")
}

/// `[SETTINGS]` block, intentionally empty
#[must_use]
pub fn settings() -> String {
    "[SETTINGS]\nSettingName, Value".to_string()
}

/// `[SAMPLES]` block: CSV with header row, values containing commas are quoted
///
/// # Errors
///
/// Returns an error if the CSV writer fails.
pub fn samples(rows: &[SampleRow]) -> Result<String, ManifestError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(SampleRecord::from(row))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ManifestError::Io(e.into_error()))?;
    let table = String::from_utf8_lossy(&bytes);
    Ok(format!("[SAMPLES]\n{table}"))
}

/// Render the complete content of manifest `group` (0-based) out of `total`
///
/// # Errors
///
/// Returns an error if the sample table cannot be serialized.
pub fn render_manifest(
    header: &RunHeader,
    file_name: &str,
    group: usize,
    total: usize,
    key: &GroupKey,
    rows: &[SampleRow],
) -> Result<String, ManifestError> {
    Ok([
        run_values(header, file_name, group, total, key),
        settings(),
        samples(rows)?,
    ]
    .join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index::IndexPair;

    #[test]
    fn test_render_manifest_layout() {
        let header = RunHeader {
            step_name: "Load to Flowcell (AVITI)".to_string(),
            step_id: "24-1234".to_string(),
            root_name: "root".to_string(),
        };
        let rows = vec![
            SampleRow::new("S1", IndexPair::dual("ACGT", "TTTT"), "1", "P__1", "151-151"),
            SampleRow::new("S,2", IndexPair::single("GGGG"), "1", "P__1", "151-151"),
        ];
        let key = rows[0].group_key();

        let content = render_manifest(&header, "root_0.csv", 0, 2, &key, &rows).unwrap();
        let expected = "[RUNVALUES]\n\
                        KeyName, Value\n\
                        lims_step_name, \"Load to Flowcell (AVITI)\"\n\
                        lims_step_id, \"24-1234\"\n\
                        manifest_file, \"root_0.csv\"\n\
                        manifest_group, 1/2\n\
                        grouped_by, len_idx1:4 len_idx2:4 lane:1\n\
                        \n\
                        [SETTINGS]\n\
                        SettingName, Value\n\
                        \n\
                        [SAMPLES]\n\
                        SampleName,Index1,Index2,Lane,Project,Recipe\n\
                        S1,ACGT,TTTT,1,P__1,151-151\n\
                        \"S,2\",GGGG,,1,P__1,151-151\n";
        assert_eq!(content, expected);
    }
}
