//! Normalization solver: dilute each sample to a target amount in a target volume.

use serde::Serialize;

use crate::core::plate::Well;
use crate::core::transfer::{SourceKind, TransferRow};
use crate::lims::records::TransferRecord;
use crate::lims::Field;
use crate::report::RunLog;
use crate::volume::{accessible_volume, NormConfig, UdfWrite, VolumeError};
use crate::worklist::WorklistError;

/// Relative deviation from the target amount that is flagged
pub const AMOUNT_DEVIATION: f64 = 0.01;

/// Units every normalization input must be given in
pub const NORM_CONC_UNITS: &str = "ng/ul";

/// One sample to normalize
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormSample {
    pub name: String,
    /// LIMS id of the output artifact receiving write-backs
    pub output_id: String,
    /// ng/ul
    pub conc: f64,
    /// Source volume minus dead volume, ul
    pub accessible_vol: f64,
    /// ng
    pub target_amt: f64,
    /// ul
    pub target_vol: f64,
    pub src_plate: String,
    pub src_well: String,
    pub dst_plate: String,
    pub dst_well: String,
}

impl NormSample {
    /// Read a sample from a transfer record
    ///
    /// # Errors
    ///
    /// Returns an error if a field is missing, in the wrong units or out of range.
    pub fn from_record(record: &TransferRecord, config: &NormConfig) -> Result<Self, VolumeError> {
        let name = record.sample_name().to_string();
        let input = |field: Field| {
            record.input.udf.number(field).ok_or_else(|| VolumeError::MissingField {
                entity: name.clone(),
                field,
            })
        };
        let output = |field: Field| {
            record.output.udf.number(field).ok_or_else(|| VolumeError::MissingField {
                entity: record.output.name.clone(),
                field,
            })
        };

        if let Some(units) = record.input.udf.text(Field::ConcUnits) {
            if units != NORM_CONC_UNITS {
                return Err(VolumeError::ConcUnits {
                    sample: name.clone(),
                    units,
                });
            }
        }

        let target_amt = output(Field::TargetAmount)?;
        if target_amt <= 0.0 {
            return Err(VolumeError::TargetAmount(name.clone()));
        }

        Ok(Self {
            conc: input(Field::Concentration)?,
            accessible_vol: accessible_volume(&name, input(Field::Volume)?, config.dead_vol)?,
            target_amt,
            target_vol: output(Field::TargetTotalVolume)?,
            output_id: record.output.id.clone(),
            src_plate: record.input.container.clone(),
            src_well: record.input.well.clone(),
            dst_plate: record.output.container.clone(),
            dst_well: record.output.well.clone(),
            name,
        })
    }

    #[must_use]
    pub fn target_conc(&self) -> f64 {
        self.target_amt / self.target_vol
    }
}

/// Which constraint decided the volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NormCase {
    /// Not enough sample to reach the target amount
    Insufficient,
    /// Target amount reachable within the target volume
    Ideal,
    /// Minimum pipettable volume already exceeds the target amount
    Concentrated { expanded: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormSolution {
    pub sample: NormSample,
    pub case: NormCase,
    pub sample_vol: f64,
    pub buffer_vol: f64,
    pub tot_vol: f64,
    pub final_amt: f64,
    pub final_conc: f64,
}

impl NormSolution {
    /// Delivered / target amount
    #[must_use]
    pub fn amount_fraction(&self) -> f64 {
        self.final_amt / self.sample.target_amt
    }

    #[must_use]
    pub fn deviates(&self) -> bool {
        (self.amount_fraction() - 1.0).abs() >= AMOUNT_DEVIATION
    }

    /// Values to write back to the output artifact
    #[must_use]
    pub fn writes(&self) -> Vec<UdfWrite> {
        let id = &self.sample.output_id;
        let mut writes = vec![
            UdfWrite::rounded(id, Field::AmountTaken, self.final_amt),
            UdfWrite::rounded(id, Field::TotalVolume, self.tot_vol),
        ];
        if self.final_amt < self.sample.target_amt {
            writes.push(UdfWrite::rounded(id, Field::TargetAmount, self.final_amt));
        }
        writes
    }

    /// Sample and buffer transfers into the destination well; buffer is drawn
    /// from the sample's source well until a buffer well is assigned
    ///
    /// # Errors
    ///
    /// Returns an error if a well cannot be parsed.
    pub fn transfer_rows(&self) -> Result<[TransferRow; 2], WorklistError> {
        let s = &self.sample;
        let src_well = Well::parse(&s.src_well)?;
        let dst_well = Well::parse(&s.dst_well)?;
        let row = |kind, volume_ul| TransferRow {
            name: s.name.clone(),
            kind,
            src_plate: s.src_plate.clone(),
            src_well,
            dst_plate: s.dst_plate.clone(),
            dst_well,
            volume_ul,
        };
        Ok([
            row(SourceKind::Sample, self.sample_vol),
            row(SourceKind::Buffer, self.buffer_vol),
        ])
    }
}

/// Solve one sample
///
/// # Errors
///
/// Returns `VolumeError::TargetVolume` if the target volume does not fit the destination
/// well, or `VolumeError::DilutionRequired` if volume expansion would overflow it.
pub fn solve_sample(sample: &NormSample, config: &NormConfig) -> Result<NormSolution, VolumeError> {
    if !(sample.target_vol > 0.0 && sample.target_vol <= config.well_max_vol) {
        return Err(VolumeError::TargetVolume {
            entity: sample.name.clone(),
            vol: sample.target_vol,
            max: config.well_max_vol,
        });
    }

    let min_transfer_amt = sample.accessible_vol.min(config.min_pipette_vol) * sample.conc;
    let max_transfer_amt = sample.accessible_vol.min(sample.target_vol) * sample.conc;

    let (case, sample_vol, tot_vol) = if max_transfer_amt < sample.target_amt {
        (
            NormCase::Insufficient,
            sample.target_vol.min(sample.accessible_vol),
            sample.target_vol,
        )
    } else if min_transfer_amt <= sample.target_amt {
        (NormCase::Ideal, sample.target_amt / sample.conc, sample.target_vol)
    } else {
        let sample_vol = sample.accessible_vol.min(config.min_pipette_vol);
        if config.volume_expansion {
            let increased_vol = min_transfer_amt / sample.target_conc();
            if increased_vol > config.well_max_vol {
                return Err(VolumeError::DilutionRequired {
                    sample: sample.name.clone(),
                    conc: sample.conc,
                });
            }
            (NormCase::Concentrated { expanded: true }, sample_vol, increased_vol)
        } else {
            (NormCase::Concentrated { expanded: false }, sample_vol, sample.target_vol)
        }
    };

    let final_amt = sample_vol * sample.conc;
    Ok(NormSolution {
        sample: sample.clone(),
        case,
        sample_vol,
        buffer_vol: tot_vol - sample_vol,
        tot_vol,
        final_amt,
        final_conc: final_amt / tot_vol,
    })
}

/// Log header describing the normalization constraints
pub fn log_header(config: &NormConfig, log: &mut RunLog) {
    log.info(format!("Expand volume to obtain target conc: {}", config.volume_expansion));
    log.info(format!("Multi-aspirate buffer-sample: {}", config.multi_aspirate));
    log.info(format!("Minimum pipetting volume: {} ul", config.min_pipette_vol));
    log.info(format!("Applied dead volume: {} ul", config.dead_vol));
    log.info(format!("Maximum allowed dst well volume: {} ul", config.well_max_vol));
}

/// Solve every sample; any infeasible sample fails the whole batch
///
/// # Errors
///
/// Returns the first `DilutionRequired`, or `UnderDelivered` when a minimum
/// delivered fraction is configured.
pub fn solve_norm(
    samples: &[NormSample],
    config: &NormConfig,
    log: &mut RunLog,
) -> Result<Vec<NormSolution>, VolumeError> {
    let mut solutions = Vec::with_capacity(samples.len());

    for sample in samples {
        let solution = solve_sample(sample, config)?;

        if solution.deviates() {
            log.warning(format!(
                "Sample {} ({:.2} ng/ul in {:.2} ul accessible volume)",
                sample.name, sample.conc, sample.accessible_vol
            ));
            log.info(format!(
                "\t--> Transferring {:.2} ul, resulting in {:.2} ng in {:.2} ul ({:.2} ng/ul)",
                solution.sample_vol, solution.final_amt, solution.tot_vol, solution.final_conc
            ));
        } else {
            log.info(format!(
                "Sample {} normalized to {:.2} ng in {:.2} ul ({:.2} ng/ul)",
                sample.name, solution.final_amt, solution.tot_vol, solution.final_conc
            ));
        }

        if let Some(min) = config.min_delivered_fraction {
            let fraction = solution.amount_fraction();
            if fraction < min {
                return Err(VolumeError::UnderDelivered {
                    sample: sample.name.clone(),
                    fraction,
                    min,
                });
            }
        }

        solutions.push(solution);
    }

    log.info("Done.");
    Ok(solutions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(conc: f64, accessible_vol: f64, target_amt: f64, target_vol: f64) -> NormSample {
        NormSample {
            name: "P1_101".to_string(),
            output_id: "2-101".to_string(),
            conc,
            accessible_vol,
            target_amt,
            target_vol,
            src_plate: "Src".to_string(),
            src_well: "B:2".to_string(),
            dst_plate: "Dst".to_string(),
            dst_well: "C:3".to_string(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn wide_wells() -> NormConfig {
        NormConfig {
            well_max_vol: 20.0,
            ..NormConfig::default()
        }
    }

    #[test]
    fn test_ideal_case() {
        let solution = solve_sample(&sample(10.0, 25.0, 100.0, 20.0), &wide_wells()).unwrap();
        assert_eq!(solution.case, NormCase::Ideal);
        assert!(close(solution.sample_vol, 10.0));
        assert!(close(solution.buffer_vol, 10.0));
        assert!(close(solution.tot_vol, 20.0));
        assert!(!solution.deviates());
    }

    #[test]
    fn test_concentrated_without_expansion() {
        let config = NormConfig {
            min_pipette_vol: 0.5,
            volume_expansion: false,
            ..NormConfig::default()
        };
        let solution = solve_sample(&sample(100.0, 25.0, 10.0, 5.0), &config).unwrap();
        assert_eq!(solution.case, NormCase::Concentrated { expanded: false });
        assert!(close(solution.sample_vol, 0.5));
        assert!(close(solution.final_amt, 50.0));
        assert!(close(solution.tot_vol, 5.0));
        assert!(solution.deviates());
    }

    #[test]
    fn test_concentrated_with_expansion() {
        // min amount 0.1 * 100 = 10 ng at target conc 1 ng/ul -> 10 ul
        let solution = solve_sample(&sample(100.0, 25.0, 5.0, 5.0), &NormConfig::default()).unwrap();
        assert_eq!(solution.case, NormCase::Concentrated { expanded: true });
        assert!(close(solution.sample_vol, 0.1));
        assert!(close(solution.tot_vol, 10.0));
        assert!(close(solution.final_conc, 1.0));
    }

    #[test]
    fn test_expansion_overflow_requires_dilution() {
        let config = NormConfig {
            min_pipette_vol: 0.5,
            ..NormConfig::default()
        };
        let err = solve_sample(&sample(100.0, 25.0, 10.0, 5.0), &config).unwrap_err();
        assert!(matches!(err, VolumeError::DilutionRequired { .. }));
    }

    #[test]
    fn test_insufficient_sample() {
        let solution = solve_sample(&sample(2.0, 5.0, 100.0, 10.0), &NormConfig::default()).unwrap();
        assert_eq!(solution.case, NormCase::Insufficient);
        assert!(close(solution.sample_vol, 5.0));
        assert!(close(solution.buffer_vol, 5.0));
        assert!(close(solution.final_amt, 10.0));

        let writes = solution.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[2].field, Field::TargetAmount);
    }

    #[test]
    fn test_min_delivered_fraction() {
        let samples = vec![sample(2.0, 5.0, 100.0, 10.0)];
        let mut log = RunLog::new();
        assert!(solve_norm(&samples, &NormConfig::default(), &mut log).is_ok());
        assert!(log.has_warnings());

        let strict = NormConfig {
            min_delivered_fraction: Some(0.5),
            ..NormConfig::default()
        };
        let err = solve_norm(&samples, &strict, &mut RunLog::new()).unwrap_err();
        assert!(matches!(err, VolumeError::UnderDelivered { .. }));
    }

    #[test]
    fn test_target_volume_must_fit_the_well() {
        for target_vol in [0.0, -1.0, 40.0, f64::NAN] {
            let err = solve_sample(&sample(10.0, 25.0, 100.0, target_vol), &NormConfig::default()).unwrap_err();
            assert!(matches!(err, VolumeError::TargetVolume { .. }), "target {target_vol}");
        }
        assert!(solve_sample(&sample(10.0, 25.0, 100.0, 15.0), &NormConfig::default()).is_ok());
    }

    #[test]
    fn test_transfer_rows() {
        let solution = solve_sample(&sample(10.0, 25.0, 100.0, 20.0), &wide_wells()).unwrap();
        let [sample_row, buffer_row] = solution.transfer_rows().unwrap();
        assert_eq!(sample_row.kind, SourceKind::Sample);
        assert_eq!(buffer_row.kind, SourceKind::Buffer);
        assert_eq!(buffer_row.dst_well.to_string(), "C:3");
        assert!(close(buffer_row.volume_ul, 10.0));
    }
}
