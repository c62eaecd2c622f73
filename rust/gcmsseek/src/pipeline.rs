use gcmsquery::errors::InsufficientDataError;
use gcmsquery::{
    build_intensity_matrix,
    trough_noise,
    IntensityMatrix,
    Scan,
};
use tracing::{
    debug,
    info,
};

use crate::alignment::{
    align_pair,
    align_with_tree,
    guide_tree,
    Alignment,
    AlignmentConfig,
    GuideTree,
};
use crate::area::estimate_peak_areas;
use crate::config::PipelineConfig;
use crate::detection::biller_biemann;
use crate::errors::Result;
use crate::filters::{
    num_ions_threshold,
    rel_threshold,
    IonCutoff,
};
use crate::models::Experiment;

/// Bins the scans of one run and turns them into an experiment.
///
/// See [process_matrix] for the stages after binning.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip(scans, config), level = "debug")
)]
pub fn process_run(name: &str, scans: &[Scan], config: &PipelineConfig) -> Result<Experiment> {
    let mut im = build_intensity_matrix(scans, &config.binning)
        .map_err(|e| e.append_to_context(&format!("run {}", name)))?;
    if let Some((low, high)) = config.matrix.mass_range {
        im.crop_mass(low, high)?;
    }
    for mass in config.matrix.null_masses.iter() {
        im.null_mass(*mass)?;
    }
    process_matrix(name, &im, config)
}

/// Peak picking, filtering and area estimation on an already prepared
/// (e.g. smoothed and baseline corrected) matrix.
///
/// Stages: Biller-Biemann detection, relative intensity threshold, ion
/// count threshold, areas, then the optional retention time window.
pub fn process_matrix(name: &str, im: &IntensityMatrix, config: &PipelineConfig) -> Result<Experiment> {
    let cutoff = match config.filter.cutoff {
        IonCutoff::Absolute(x) => x,
        IonCutoff::NoiseMultiple(_) => {
            let noise = trough_noise(&im.tic()?, &config.noise)
                .map_err(|e| e.append_to_context(&format!("run {}", name)))?;
            debug!("Noise level of {}: {:.2}", name, noise);
            config.filter.cutoff.resolve(noise)
        }
    };

    let mut peaks = biller_biemann(im, &config.detection)?;
    let n_detected = peaks.len();
    rel_threshold(&mut peaks, config.filter.relative_percent)?;
    let mut peaks = num_ions_threshold(&peaks, config.filter.min_ions, cutoff)?;
    estimate_peak_areas(im, &mut peaks, &config.area)?;

    let mut experiment = Experiment::new(name, peaks);
    if let Some((start, end)) = config.rt_range {
        experiment.select_rt_range(start, end)?;
    }
    info!(
        "Run {}: {} peaks detected, {} kept",
        name,
        n_detected,
        experiment.len()
    );
    Ok(experiment)
}

/// Aligns the experiments of one state: each is lifted to an alignment,
/// merged along the average linkage guide tree and the columns with
/// fewer than `min_peaks` peaks dropped.
pub fn align_experiments(experiments: &[Experiment], config: &AlignmentConfig) -> Result<Alignment> {
    config.validate()?;
    if experiments.is_empty() {
        return Err(InsufficientDataError::NoUsableValues {
            context: "align_experiments with no experiments".to_string(),
        }
        .into());
    }
    let alignments: Vec<Alignment> = experiments.iter().map(Alignment::from_experiment).collect();
    let tree = if alignments.len() > 1 {
        guide_tree(&alignments, config.rt_width, config.gap_penalty)?
    } else {
        GuideTree {
            n_leaves: 1,
            nodes: vec![],
        }
    };
    align_with_tree(
        &alignments,
        &tree,
        config.rt_width,
        config.gap_penalty,
        config.min_peaks,
    )
}

/// Aligns two already merged states with the between-state width and gap
/// penalty.
pub fn align_between_states(
    first: &Alignment,
    second: &Alignment,
    config: &AlignmentConfig,
) -> Result<Alignment> {
    config.validate()?;
    let mut out = align_pair(
        first,
        second,
        config.between_state_rt_width,
        config.between_state_gap_penalty,
    )?;
    out.filter_min_peaks(config.min_peaks);
    info!(
        "Between-state alignment: {} + {} columns into {}",
        first.len(),
        second.len(),
        out.len()
    );
    Ok(out)
}
