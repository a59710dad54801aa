//! Worklist row annotation and serialization.

use std::fs;
use std::path::Path;

use crate::core::plate::Deck;
use crate::core::transfer::{PlacedTransfer, SourceKind, TipStrategy, WorklistRow};
use crate::utils::validation::sanitize_csv_field;
use crate::worklist::SPLIT_NL;

/// Tip handling options for [`build_rows`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowOptions {
    /// Draw buffer and sample into one tip when they go to the same well
    pub multi_aspirate: bool,
    /// Keep tips across consecutive buffer transfers to the same well
    pub keep_buffer_tips: bool,
}

fn copy_row(t: &PlacedTransfer, tips: TipStrategy) -> WorklistRow {
    WorklistRow::Copy {
        src_pos: t.src_pos,
        src_well: t.src_well,
        dst_pos: t.dst_pos,
        dst_well: t.dst_well,
        volume_nl: t.volume_nl,
        tips,
    }
}

/// Annotate ordered transfers with transfer types and tip strategies.
///
/// A buffer draw directly followed by a sample transfer into the same well, with
/// at most [`SPLIT_NL`] combined, becomes a `MULTI_ASPIRATE` and the sample `COPY`
/// dispenses both. With kept tips, the transfer ending a run of kept tips also
/// keeps its tip and is followed by `CHANGE_PIPETTES`.
#[must_use]
pub fn build_rows(transfers: &[PlacedTransfer], options: RowOptions) -> Vec<WorklistRow> {
    let mut rows = Vec::with_capacity(transfers.len());
    let mut tips_kept = false;

    for (i, t) in transfers.iter().enumerate() {
        let next = transfers.get(i + 1).filter(|n| n.same_destination(t));
        let is_buffer = t.kind == SourceKind::Buffer;

        let aspirate_only = options.multi_aspirate
            && is_buffer
            && next.is_some_and(|n| n.kind != SourceKind::Buffer && t.volume_nl + n.volume_nl <= SPLIT_NL);
        if aspirate_only {
            rows.push(WorklistRow::MultiAspirate {
                src_pos: t.src_pos,
                src_well: t.src_well,
                volume_nl: t.volume_nl,
            });
            tips_kept |= options.keep_buffer_tips;
            continue;
        }

        if options.keep_buffer_tips && is_buffer && next.is_some() {
            rows.push(copy_row(t, TipStrategy::Never));
            tips_kept = true;
        } else if tips_kept {
            rows.push(copy_row(t, TipStrategy::Never));
            rows.push(WorklistRow::ChangePipettes);
            tips_kept = false;
        } else {
            rows.push(copy_row(t, TipStrategy::Always));
        }
    }

    rows
}

/// `[VAR1]TipChangeStrategy,always,...` for the strategies the rows use
fn variable_definitions(rows: &[WorklistRow]) -> String {
    let used: Vec<TipStrategy> = [TipStrategy::Always, TipStrategy::Never]
        .into_iter()
        .filter(|s| rows.iter().any(|r| r.tips() == Some(*s)))
        .collect();
    let used = if used.is_empty() {
        vec![TipStrategy::Always]
    } else {
        used
    };
    used.iter()
        .map(|s| format!("{}TipChangeStrategy,{}", s.variable(), s.keyword()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Serialize a Mosquito advanced worklist
#[must_use]
pub fn render_worklist(filename: &str, rows: &[WorklistRow], deck: &Deck, comments: &[String]) -> String {
    let mut text = String::from("worklist,\n");
    text.push_str(&variable_definitions(rows));
    text.push('\n');
    text.push_str(&format!("COMMENT, This is the worklist {filename}\n"));
    for comment in comments {
        text.push_str(&format!("COMMENT, {}\n", sanitize_csv_field(comment)));
    }
    text.push_str(&deck.layout_comment());
    text.push('\n');
    for row in rows {
        text.push_str(&row.to_string());
        text.push('\n');
    }
    text.push_str("COMMENT, Done");
    text
}

/// Render and write a worklist into `dir`
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_worklist(
    dir: &Path,
    filename: &str,
    rows: &[WorklistRow],
    deck: &Deck,
    comments: &[String],
) -> std::io::Result<std::path::PathBuf> {
    let path = dir.join(filename);
    fs::write(&path, render_worklist(filename, rows, deck, comments))?;
    Ok(path)
}

/// Worklist and log filenames: `zika_worklist_<method>_<pid>_<timestamp>.csv`
#[must_use]
pub fn worklist_filenames(method: &str, process_id: &str, timestamp: &str) -> (String, String) {
    (
        format!("zika_worklist_{method}_{process_id}_{timestamp}.csv"),
        format!("zika_log_{method}_{process_id}_{timestamp}.log"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plate::{Well, BUFFER_PLATE};

    fn transfer(kind: SourceKind, dst: &str, volume_nl: u32) -> PlacedTransfer {
        let (src_plate, src_pos) = match kind {
            SourceKind::Buffer => (BUFFER_PLATE, 2),
            SourceKind::Sample => ("Src", 3),
        };
        PlacedTransfer {
            kind,
            src_plate: src_plate.to_string(),
            src_pos,
            src_well: Well::parse("B:1").unwrap(),
            dst_plate: "Dst".to_string(),
            dst_pos: 4,
            dst_well: Well::parse(dst).unwrap(),
            volume_nl,
        }
    }

    fn types(rows: &[WorklistRow]) -> Vec<&'static str> {
        rows.iter().map(WorklistRow::transfer_type).collect()
    }

    #[test]
    fn test_plain_copies_change_tips() {
        let transfers = vec![
            transfer(SourceKind::Buffer, "A:1", 3000),
            transfer(SourceKind::Sample, "A:1", 1000),
        ];
        let rows = build_rows(&transfers, RowOptions::default());
        assert_eq!(types(&rows), ["COPY", "COPY"]);
        assert!(rows.iter().all(|r| r.tips() == Some(TipStrategy::Always)));
    }

    #[test]
    fn test_multi_aspirate() {
        let transfers = vec![
            transfer(SourceKind::Buffer, "A:1", 3000),
            transfer(SourceKind::Sample, "A:1", 1000),
            transfer(SourceKind::Buffer, "B:1", 4500),
            transfer(SourceKind::Sample, "B:1", 1000),
        ];
        let options = RowOptions {
            multi_aspirate: true,
            keep_buffer_tips: false,
        };
        let rows = build_rows(&transfers, options);
        assert_eq!(types(&rows), ["MULTI_ASPIRATE", "COPY", "COPY", "COPY"]);
        assert_eq!(rows[0].to_string(), "MULTI_ASPIRATE,2,1,2,1,3000");
        assert_eq!(rows[1].to_string(), "COPY,3,1,1,2,4,1,1,1000,[VAR1]");
    }

    #[test]
    fn test_keep_buffer_tips() {
        let transfers = vec![
            transfer(SourceKind::Buffer, "A:1", 5000),
            transfer(SourceKind::Buffer, "A:1", 2000),
            transfer(SourceKind::Sample, "A:1", 1000),
            transfer(SourceKind::Sample, "B:1", 1000),
        ];
        let options = RowOptions {
            multi_aspirate: true,
            keep_buffer_tips: true,
        };
        let rows = build_rows(&transfers, options);
        assert_eq!(
            types(&rows),
            ["COPY", "MULTI_ASPIRATE", "COPY", "CHANGE_PIPETTES", "COPY"]
        );
        assert_eq!(rows[0].tips(), Some(TipStrategy::Never));
        assert_eq!(rows[2].tips(), Some(TipStrategy::Never));
        assert_eq!(rows[4].tips(), Some(TipStrategy::Always));
    }

    #[test]
    fn test_render_worklist() {
        let mut deck = Deck::new();
        deck.place(BUFFER_PLATE, 2).unwrap();
        deck.place("Src", 3).unwrap();
        deck.place("Dst", 4).unwrap();
        let rows = build_rows(
            &[transfer(SourceKind::Sample, "C:2", 1500)],
            RowOptions::default(),
        );
        let comments = vec!["This worklist will enact normalization of 1 samples, today".to_string()];
        let text = render_worklist("wl.csv", &rows, &deck, &comments);
        assert_eq!(
            text,
            "worklist,\n\
             [VAR1]TipChangeStrategy,always\n\
             COMMENT, This is the worklist wl.csv\n\
             COMMENT, This worklist will enact normalization of 1 samples; today\n\
             COMMENT, Set up layout:    [Empty]     buffer_plate     Src     Dst     [Empty]\n\
             COPY,3,1,1,2,4,2,3,1500,[VAR1]\n\
             COMMENT, Done"
        );
    }

    #[test]
    fn test_variables_list_both_strategies() {
        let rows = vec![
            WorklistRow::ChangePipettes,
            copy_row(&transfer(SourceKind::Buffer, "A:1", 10), TipStrategy::Never),
            copy_row(&transfer(SourceKind::Buffer, "A:1", 10), TipStrategy::Always),
        ];
        assert_eq!(
            variable_definitions(&rows),
            "[VAR1]TipChangeStrategy,always,[VAR2]TipChangeStrategy,never"
        );
    }

    #[test]
    fn test_filenames() {
        let (wl, log) = worklist_filenames("norm", "24-123", "240101_120000");
        assert_eq!(wl, "zika_worklist_norm_24-123_240101_120000.csv");
        assert_eq!(log, "zika_log_norm_24-123_240101_120000.log");
    }
}
