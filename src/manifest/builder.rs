use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::catalog::store::IndexCatalog;
use crate::core::index::{IndexPair, PhixSet};
use crate::core::sample::{
    sanitize_project_name, GroupKey, SampleRow, CONTROL_PROJECT, DEFAULT_RECIPE,
};
use crate::lims::records::LanePool;
use crate::lims::Field;
use crate::manifest::sections::render_manifest;
use crate::manifest::{ManifestError, RunHeader};
use crate::matching::collision::{check_lanes, CollisionConfig, CollisionWarning};
use crate::parsing::label::IndexResolver;

/// One serialized manifest file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub name: String,
    pub content: String,
    pub key: GroupKey,
    pub samples: usize,
    pub controls: usize,
}

/// All manifests of one run plus the near-collisions found while building them
#[derive(Debug, Clone, Default)]
pub struct ManifestSet {
    pub files: Vec<ManifestFile>,
    pub warnings: Vec<CollisionWarning>,
}

/// Rows of one manifest group: samples first, then injected PhiX controls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestGroup {
    pub samples: Vec<SampleRow>,
    pub controls: Vec<SampleRow>,
}

impl ManifestGroup {
    pub fn rows(&self) -> impl Iterator<Item = &SampleRow> {
        self.samples.iter().chain(&self.controls)
    }
}

/// Fit a sequence to `length` by truncating, or by appending from `extension`.
///
/// # Errors
///
/// Returns `ManifestError::Extension` if the sequence or extension is not ASCII, or if
/// the sequence is too short and no (or too short an) extension is supplied.
pub fn fit_seq(seq: &str, length: usize, extension: Option<&str>) -> Result<String, ManifestError> {
    if !(seq.is_ascii() && extension.map_or(true, str::is_ascii)) {
        return Err(ManifestError::Extension {
            seq: seq.to_string(),
            length,
            reason: "sequences must be ASCII".to_string(),
        });
    }
    if seq.len() >= length {
        return Ok(seq[..length].to_string());
    }

    let missing = length - seq.len();
    match extension {
        None => Err(ManifestError::Extension {
            seq: seq.to_string(),
            length,
            reason: "no extension string supplied".to_string(),
        }),
        Some(ext) if ext.len() < missing => Err(ManifestError::Extension {
            seq: seq.to_string(),
            length,
            reason: format!("extension string '{ext}' too short"),
        }),
        Some(ext) => Ok(format!("{seq}{}", &ext[..missing])),
    }
}

/// Group rows by (len Index1, len Index2, lane), preserving input order within groups
#[must_use]
pub fn group_rows(rows: Vec<SampleRow>) -> BTreeMap<GroupKey, Vec<SampleRow>> {
    let mut groups: BTreeMap<GroupKey, Vec<SampleRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.group_key()).or_default().push(row);
    }
    groups
}

/// The four PhiX rows of a set, fitted to the lengths of a group
///
/// # Errors
///
/// Returns `ManifestError::Extension` if a PhiX index is shorter than the group's.
pub fn phix_rows(set: &PhixSet, key: &GroupKey) -> Result<Vec<SampleRow>, ManifestError> {
    set.pairs()
        .map(|pair| {
            let index = IndexPair::dual(
                fit_seq(&pair.index1, key.len_index1, None)?,
                fit_seq(&pair.index2, key.len_index2, None)?,
            );
            Ok(SampleRow::new(
                set.nickname.clone(),
                index,
                key.lane.clone(),
                CONTROL_PROJECT,
                DEFAULT_RECIPE,
            ))
        })
        .collect()
}

/// The flowcell id shared by all lane pools
///
/// # Errors
///
/// Returns `ManifestError::Flowcell` unless exactly one container is used.
pub fn flowcell_id(pools: &[LanePool]) -> Result<String, ManifestError> {
    let ids: BTreeSet<&str> = pools.iter().map(|p| p.container.as_str()).collect();
    let mut iter = ids.iter();
    match (iter.next(), iter.next()) {
        (Some(id), None) => Ok((*id).to_string()),
        _ => Err(ManifestError::Flowcell(
            ids.iter().map(ToString::to_string).collect(),
        )),
    }
}

/// Builds AVITI run manifests from the lane pools of a sequencing step
pub struct ManifestBuilder<'a> {
    catalog: &'a IndexCatalog,
    resolver: IndexResolver<'a>,
    collision: CollisionConfig,
}

impl<'a> ManifestBuilder<'a> {
    /// # Errors
    ///
    /// Returns an error if the label grammars fail to compile.
    pub fn new(catalog: &'a IndexCatalog, collision: CollisionConfig) -> Result<Self, ManifestError> {
        Ok(Self {
            catalog,
            resolver: IndexResolver::new(catalog)?,
            collision,
        })
    }

    /// Check lane cardinality before anything is resolved
    ///
    /// # Errors
    ///
    /// Returns an error unless there are one or two pools on lanes `{1}` or `{1, 2}`.
    pub fn validate_lanes(pools: &[LanePool]) -> Result<(), ManifestError> {
        if !(1..=2).contains(&pools.len()) {
            return Err(ManifestError::PoolCount(pools.len()));
        }

        let lanes: BTreeSet<&str> = pools.iter().map(LanePool::lane).collect();
        let single: BTreeSet<&str> = ["1"].into_iter().collect();
        let dual: BTreeSet<&str> = ["1", "2"].into_iter().collect();
        if lanes != single && lanes != dual {
            return Err(ManifestError::Lanes(
                lanes.into_iter().collect::<Vec<_>>().join(", "),
            ));
        }
        Ok(())
    }

    /// PhiX kit selected for a pool, `None` when no PhiX is loaded
    ///
    /// # Errors
    ///
    /// Returns an error if the PhiX fields are missing, inconsistent or name an unknown kit.
    pub fn phix_selection(&self, pool: &LanePool) -> Result<Option<&'a PhixSet>, ManifestError> {
        let percent = pool
            .udf
            .number(Field::PhixPercent)
            .ok_or_else(|| ManifestError::MissingField {
                entity: pool.name.clone(),
                field: Field::PhixPercent,
            })?;
        let kit = pool.udf.text(Field::PhixSet).filter(|k| !k.is_empty());

        match (percent != 0.0, kit) {
            (true, None) => Err(ManifestError::PhixWithoutKit(pool.name.clone())),
            (false, Some(_)) => Err(ManifestError::KitWithoutPhix(pool.name.clone())),
            (false, None) => Ok(None),
            (true, Some(kit)) => self
                .catalog
                .phix_set(&kit)
                .map(Some)
                .ok_or(ManifestError::UnknownPhixSet(kit)),
        }
    }

    /// Expand every sample of every pool into manifest rows
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate labels, PhiX inconsistencies or unresolvable labels.
    pub fn sample_rows(&self, pools: &[LanePool]) -> Result<Vec<SampleRow>, ManifestError> {
        let mut rows = Vec::new();

        for pool in pools {
            let labels: BTreeSet<&str> = pool.samples.iter().map(|s| s.label.as_str()).collect();
            if labels.len() != pool.samples.len() {
                return Err(ManifestError::DuplicateLabels(pool.name.clone()));
            }

            let phix = self.phix_selection(pool)?.map(|set| set.name.clone());
            let lane = pool.lane();

            for sample in &pool.samples {
                let (project, recipe) = match &sample.project {
                    Some(project) => (
                        sanitize_project_name(project),
                        sample
                            .project_udf
                            .text(Field::SequencingSetup)
                            .unwrap_or_else(|| DEFAULT_RECIPE.to_string()),
                    ),
                    None => (CONTROL_PROJECT.to_string(), DEFAULT_RECIPE.to_string()),
                };

                let pairs = self.resolver.resolve(&sample.label).map_err(|source| {
                    ManifestError::Label {
                        sample: sample.name.clone(),
                        source,
                    }
                })?;

                for index in pairs {
                    rows.push(
                        SampleRow::new(&sample.name, index, lane, &project, &recipe)
                            .with_phix(phix.clone()),
                    );
                }
            }
        }

        let sample_count: usize = pools.iter().map(|p| p.samples.len()).sum();
        debug!("Expanded {sample_count} samples into {} manifest rows", rows.len());
        Ok(rows)
    }

    /// Group rows and inject PhiX controls into every group with PhiX loaded
    ///
    /// # Errors
    ///
    /// Returns an error if a PhiX kit is unknown or cannot be fitted to a group.
    pub fn groups(
        &self,
        rows: Vec<SampleRow>,
    ) -> Result<BTreeMap<GroupKey, ManifestGroup>, ManifestError> {
        let mut groups = BTreeMap::new();

        for (key, samples) in group_rows(rows) {
            let phix_name = samples
                .iter()
                .find(|row| row.phix_loaded)
                .and_then(|row| row.phix_set.clone());

            let controls = match phix_name {
                Some(name) => {
                    let set = self
                        .catalog
                        .phix_set(&name)
                        .ok_or(ManifestError::UnknownPhixSet(name))?;
                    phix_rows(set, &key)?
                }
                None => Vec::new(),
            };

            groups.insert(key, ManifestGroup { samples, controls });
        }

        Ok(groups)
    }

    /// Resolve, group, collision-check and serialize all manifests of a run.
    ///
    /// Nothing is returned unless every pool validates and no identical indices exist.
    ///
    /// # Errors
    ///
    /// Returns the first validation, resolution, fitting or collision error.
    pub fn build(&self, pools: &[LanePool], header: &RunHeader) -> Result<ManifestSet, ManifestError> {
        Self::validate_lanes(pools)?;
        let rows = self.sample_rows(pools)?;
        let groups = self.groups(rows)?;

        let all_rows: Vec<SampleRow> = groups.values().flat_map(|g| g.rows().cloned()).collect();
        let warnings = check_lanes(&all_rows, &self.collision)?;

        let total = groups.len();
        let mut files = Vec::with_capacity(total);
        for (k, (key, group)) in groups.iter().enumerate() {
            let name = format!("{}_{k}.csv", header.root_name);
            let rows: Vec<SampleRow> = group.rows().cloned().collect();
            let content = render_manifest(header, &name, k, total, key, &rows)?;
            info!(
                "Manifest {name}: {} sample rows, {} controls ({key})",
                group.samples.len(),
                group.controls.len()
            );
            files.push(ManifestFile {
                name,
                content,
                key: key.clone(),
                samples: group.samples.len(),
                controls: group.controls.len(),
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ManifestSet { files, warnings })
    }
}
