//! Pool solver: equal representation of every sample in a pool.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::plate::Well;
use crate::core::transfer::{SourceKind, TransferRow};
use crate::lims::records::TransferRecord;
use crate::lims::Field;
use crate::report::RunLog;
use crate::volume::{accessible_volume, round_to, PoolConfig, UdfWrite, VolumeError, MIN_CONCENTRATION};
use crate::worklist::WorklistError;

/// Realized fractions outside this band are reported
const FRACTION_TOLERANCE: (f64, f64) = (0.995, 1.005);

/// Buffer shortfalls above this volume (ul) are reported as a manual step
pub const BUFFER_NOTICE_VOL: f64 = 0.5;

/// What the pool is specified by
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PoolTarget {
    /// Pool concentration in nM; amounts are in fmol
    Molar { pool_conc: f64 },
    /// Amount taken per sample in ng; concentrations are in ng/ul
    Mass { amount_per_sample: f64 },
}

impl PoolTarget {
    #[must_use]
    pub fn conc_unit(&self) -> &'static str {
        match self {
            Self::Molar { .. } => "nM",
            Self::Mass { .. } => "ng/ul",
        }
    }

    #[must_use]
    pub fn amount_unit(&self) -> &'static str {
        match self {
            Self::Molar { .. } => "fmol",
            Self::Mass { .. } => "ng",
        }
    }
}

/// One output pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSpec {
    pub id: String,
    pub name: String,
    pub plate: String,
    pub well: String,
    pub target: PoolTarget,
    /// Target pool volume, ul
    pub target_vol: f64,
}

/// One input sample of a pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolMember {
    pub name: String,
    pub conc: f64,
    /// Source volume minus dead volume, ul
    pub accessible_vol: f64,
    pub src_plate: String,
    pub src_well: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberTransfer {
    pub member: PoolMember,
    pub transfer_vol: f64,
    pub transfer_amt: f64,
    /// Realized / intended concentration contribution, rounded to 2 places
    pub conc_fraction: f64,
    /// Realized / target amount, rounded to 2 places
    pub amt_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSolution {
    pub spec: PoolSpec,
    pub pool_conc: f64,
    pub pool_vol: f64,
    /// False when samples could not be pooled evenly
    pub even: bool,
    pub transfers: Vec<MemberTransfer>,
    /// Pool volume not covered by sample transfers, ul
    pub buffer_vol: f64,
    pub writes: Vec<UdfWrite>,
}

impl PoolSolution {
    /// Operator instruction for topping up the pool, if needed
    #[must_use]
    pub fn buffer_instruction(&self) -> Option<String> {
        (self.buffer_vol > BUFFER_NOTICE_VOL).then(|| {
            format!(
                "Add {:.1} ul buffer to pool {} (well {})",
                self.buffer_vol, self.spec.name, self.spec.well
            )
        })
    }

    /// Sample transfers into the pool well
    ///
    /// # Errors
    ///
    /// Returns an error if a well cannot be parsed.
    pub fn transfer_rows(&self) -> Result<Vec<TransferRow>, WorklistError> {
        let dst_well = Well::parse(&self.spec.well)?;
        self.transfers
            .iter()
            .map(|t| {
                Ok(TransferRow {
                    name: t.member.name.clone(),
                    kind: SourceKind::Sample,
                    src_plate: t.member.src_plate.clone(),
                    src_well: Well::parse(&t.member.src_well)?,
                    dst_plate: self.spec.plate.clone(),
                    dst_well,
                    volume_ul: t.transfer_vol,
                })
            })
            .collect()
    }
}

fn require(record: &TransferRecord, value: Option<f64>, field: Field, input: bool) -> Result<f64, VolumeError> {
    value.ok_or_else(|| VolumeError::MissingField {
        entity: if input {
            record.sample_name().to_string()
        } else {
            record.output.name.clone()
        },
        field,
    })
}

/// Group transfer records into pools, sorted by pool name; commas in names become `;`
///
/// # Errors
///
/// Returns an error if a required field is missing or a source well holds no
/// more than the dead volume.
pub fn pools_from_records(
    records: &[TransferRecord],
    config: &PoolConfig,
) -> Result<Vec<(PoolSpec, Vec<PoolMember>)>, VolumeError> {
    let mut pools: BTreeMap<String, (PoolSpec, Vec<PoolMember>)> = BTreeMap::new();

    for record in records {
        let out = &record.output;
        let conc = require(record, record.input.udf.number(Field::Concentration), Field::Concentration, true)?;
        let vol = require(record, record.input.udf.number(Field::Volume), Field::Volume, true)?;
        let member = PoolMember {
            name: record.sample_name().to_string(),
            conc,
            accessible_vol: accessible_volume(record.sample_name(), vol, config.dead_vol)?,
            src_plate: record.input.container.clone(),
            src_well: record.input.well.clone(),
        };

        if let Some((_, members)) = pools.get_mut(&out.id) {
            members.push(member);
            continue;
        }

        let target_vol = require(record, out.udf.number(Field::FinalVolume), Field::FinalVolume, false)?;
        let target = match (out.udf.number(Field::PoolConc), out.udf.number(Field::AmountTaken)) {
            (Some(pool_conc), _) => PoolTarget::Molar { pool_conc },
            (None, Some(amount_per_sample)) => PoolTarget::Mass { amount_per_sample },
            (None, None) => {
                return Err(VolumeError::MissingField {
                    entity: out.name.clone(),
                    field: Field::PoolConc,
                })
            }
        };
        let spec = PoolSpec {
            id: out.id.clone(),
            name: out.name.replace(',', ";"),
            plate: out.container.clone(),
            well: out.well.clone(),
            target,
            target_vol,
        };
        pools.insert(out.id.clone(), (spec, vec![member]));
    }

    let mut pools: Vec<_> = pools.into_values().collect();
    pools.sort_by(|a, b| a.0.name.cmp(&b.0.name));
    Ok(pools)
}

/// Log header describing the pooling constraints
pub fn log_header(config: &PoolConfig, log: &mut RunLog) {
    log.info(format!("Minimum pipetting volume: {} ul", config.min_pipette_vol));
    log.info(format!("Applied dead volume: {} ul", config.dead_vol));
    log.info(format!("Maximum allowed pool volume: {} ul", config.well_max_vol));
}

/// Solve one pool.
///
/// # Errors
///
/// Returns an error if the pool is empty or its targets are out of range.
pub fn solve_pool(
    spec: &PoolSpec,
    members: &[PoolMember],
    config: &PoolConfig,
    log: &mut RunLog,
) -> Result<PoolSolution, VolumeError> {
    if members.is_empty() {
        return Err(VolumeError::EmptyPool(spec.name.clone()));
    }
    #[allow(clippy::cast_precision_loss)]
    let n = members.len() as f64;
    let conc_unit = spec.target.conc_unit();
    let amt_unit = spec.target.amount_unit();

    let target_vol = spec.target_vol;
    let (target_conc, target_amt) = match spec.target {
        PoolTarget::Molar { pool_conc } => (pool_conc, pool_conc * target_vol / n),
        PoolTarget::Mass { amount_per_sample } => (amount_per_sample * n / target_vol, amount_per_sample),
    };

    if !(target_vol > 0.0 && target_vol <= config.well_max_vol) {
        return Err(VolumeError::TargetVolume {
            entity: spec.name.clone(),
            vol: target_vol,
            max: config.well_max_vol,
        });
    }
    if target_amt <= 0.0 {
        return Err(VolumeError::TargetAmount(spec.name.clone()));
    }

    log.info(format!("Pooling {} samples into {}...", members.len(), spec.name));
    log.info(format!(
        "Target conc: {target_conc:.2} {conc_unit} ({target_amt:.2} {amt_unit} per sample), Target vol: {target_vol} ul"
    ));

    let mut members = members.to_vec();
    let mut clamped: Vec<String> = members
        .iter_mut()
        .filter(|m| m.conc < MIN_CONCENTRATION)
        .map(|m| {
            m.conc = MIN_CONCENTRATION;
            m.name.clone()
        })
        .collect();
    if !clamped.is_empty() {
        clamped.sort();
        log.warning(format!(
            "The following {} sample(s) fell short of, and will be treated as, {MIN_CONCENTRATION} {conc_unit}: {}",
            clamped.len(),
            clamped.join(", ")
        ));
    }

    // Transferable amount range of each sample
    let min_amounts = members.iter().map(|m| config.min_pipette_vol * m.conc);
    let max_amounts = members.iter().map(|m| m.accessible_vol * m.conc);
    let highest_min_amount = min_amounts.fold(f64::MIN, f64::max);
    let lowest_max_amount = max_amounts.fold(f64::MAX, f64::min);
    let even = highest_min_amount < lowest_max_amount;

    let pool_min_amt = highest_min_amount * n;
    let pool_min_sample_vol: f64 = members.iter().map(|m| highest_min_amount / m.conc).sum();
    let pool_min_conc = pool_min_amt / config.well_max_vol;
    let pool_max_conc = pool_min_amt / pool_min_sample_vol;
    log.info(format!(
        "Pool can be created for conc {pool_min_conc:.2}-{pool_max_conc:.2} {conc_unit} and vol {pool_min_sample_vol:.2}-{:.2} ul",
        config.well_max_vol
    ));

    let pool_conc = if target_conc > pool_max_conc {
        pool_max_conc
    } else if target_conc < pool_min_conc {
        pool_min_conc
    } else {
        target_conc
    };

    let pool_min_vol_given_conc = (pool_min_amt / pool_conc).min(config.well_max_vol);
    let pool_vol = if even {
        let pool_max_vol_given_conc = (lowest_max_amount * n / pool_conc).min(config.well_max_vol);
        if target_vol < pool_min_vol_given_conc {
            pool_min_vol_given_conc
        } else if target_vol > pool_max_vol_given_conc {
            pool_max_vol_given_conc
        } else {
            target_vol
        }
    } else {
        let richest = members
            .iter()
            .max_by(|a, b| a.conc.total_cmp(&b.conc))
            .map_or_else(String::new, |m| format!("{} ({} {conc_unit})", m.name, m.conc));
        log.warning(format!(
            "Some samples will be depleted and under-represented in the final pool. \
             The minimum transfer amount of the highest concentrated sample {richest} will dictate the common transfer amount."
        ));
        pool_min_vol_given_conc
    };

    #[allow(clippy::float_cmp)] // unchanged targets are passed through untouched
    let (conc_kept, vol_kept) = (target_conc == pool_conc, target_vol == pool_vol);
    if !conc_kept {
        log.warning(format!("Target pool conc is adjusted to {pool_conc:.2} {conc_unit}"));
    }
    if !vol_kept {
        log.warning(format!("Target pool vol is adjusted to {pool_vol:.2} ul"));
    }
    if conc_kept && vol_kept {
        log.info("Pooling OK");
    }

    let mut writes = vec![UdfWrite::rounded(&spec.id, Field::FinalVolume, pool_vol)];
    match spec.target {
        PoolTarget::Molar { .. } => writes.push(UdfWrite::rounded(&spec.id, Field::PoolConc, pool_conc)),
        PoolTarget::Mass { .. } => writes.push(UdfWrite::rounded(
            &spec.id,
            Field::AmountTaken,
            pool_conc * pool_vol / n,
        )),
    }

    let sample_transfer_amt = pool_conc * pool_vol / n;
    let transfers: Vec<MemberTransfer> = members
        .into_iter()
        .map(|member| {
            let transfer_vol = (sample_transfer_amt / member.conc).min(member.accessible_vol);
            let transfer_amt = transfer_vol * member.conc;
            MemberTransfer {
                conc_fraction: round_to((transfer_amt / pool_vol) / (pool_conc / n), 2),
                amt_fraction: round_to(transfer_amt / target_amt, 2),
                transfer_vol,
                transfer_amt,
                member,
            }
        })
        .collect();

    let total_sample_vol: f64 = transfers.iter().map(|t| t.transfer_vol).sum();
    report_outliers(&transfers, |t| t.conc_fraction, "concentration", log);
    report_outliers(&transfers, |t| t.amt_fraction, "amount", log);

    Ok(PoolSolution {
        spec: spec.clone(),
        pool_conc,
        pool_vol,
        even,
        transfers,
        buffer_vol: pool_vol - total_sample_vol,
        writes,
    })
}

fn report_outliers(
    transfers: &[MemberTransfer],
    fraction: impl Fn(&MemberTransfer) -> f64,
    what: &str,
    log: &mut RunLog,
) {
    let (low, high) = FRACTION_TOLERANCE;
    let mut outliers: Vec<(&str, f64)> = transfers
        .iter()
        .map(|t| (t.member.name.as_str(), fraction(t)))
        .filter(|(_, f)| *f < low || *f > high)
        .collect();
    if outliers.is_empty() {
        return;
    }
    outliers.sort_by(|a, b| a.0.cmp(b.0));

    log.info(format!("The following samples deviate from the target {what}:"));
    log.info("Sample\tFraction");
    for (name, f) in outliers {
        log.info(format!("{name}\t{f:.2}"));
    }
}
