//! Metric batching: grouping and merging same-named metrics.
//!
//! Multiple same-kind measurements taken over a flush interval (e.g. ten
//! CPU samples) collapse into one [`Metric`] with ten points in its time
//! series, keeping upload payloads compact instead of one request per
//! sample.
//!
//! Merging is a pure reducer over immutable values: lists deep-append,
//! non-empty scalar descriptor fields overwrite, and label keys are
//! flattened to the set of distinct key strings afterwards.

use std::collections::HashSet;

use crate::models::{LabelKey, Metric};

/// Merges `incoming` into `acc`.
///
/// Scalar descriptor fields follow merge-from semantics: a non-empty
/// incoming value overwrites. `label_keys` and `time_series` concatenate;
/// duplicate label keys are left in place and removed by
/// [`flatten_label_keys`] at the end of a batch.
#[must_use]
pub fn merge(mut acc: Metric, incoming: &Metric) -> Metric {
    if !incoming.descriptor_name.is_empty() {
        acc.descriptor_name = incoming.descriptor_name.clone();
    }
    if !incoming.description.is_empty() {
        acc.description = incoming.description.clone();
    }
    if !incoming.unit.is_empty() {
        acc.unit = incoming.unit.clone();
    }
    acc.metric_type = incoming.metric_type;
    acc.label_keys.extend(incoming.label_keys.iter().cloned());
    acc.time_series.extend(incoming.time_series.iter().cloned());
    acc
}

/// Reduces `label_keys` to the distinct key strings.
///
/// Uniqueness is judged on the key string alone; when two keys share a
/// string but differ in description, the first-encountered key survives.
/// Callers must not rely on which description wins.
#[must_use]
pub fn flatten_label_keys(keys: Vec<LabelKey>) -> Vec<LabelKey> {
    let mut seen = HashSet::new();
    keys.into_iter()
        .filter(|k| seen.insert(k.key.clone()))
        .collect()
}

/// Partitions metrics by descriptor name.
///
/// Group order follows first encounter of each name, and metrics keep
/// their encounter order within a group.
#[must_use]
pub fn group_metrics(metrics: &[Metric]) -> Vec<(String, Vec<&Metric>)> {
    let mut groups: Vec<(String, Vec<&Metric>)> = Vec::new();
    for metric in metrics {
        match groups.iter_mut().find(|(name, _)| *name == metric.descriptor_name) {
            Some((_, members)) => members.push(metric),
            None => groups.push((metric.descriptor_name.clone(), vec![metric])),
        }
    }
    groups
}

/// Merges every metric in `metrics` whose descriptor name equals `name`.
///
/// Returns the empty-[`Metric`] sentinel when no input matched; callers
/// filter it out rather than treating it as an error.
#[must_use]
pub fn batch_metrics_with_name(name: &str, metrics: &[Metric]) -> Metric {
    let mut merged = metrics
        .iter()
        .filter(|m| m.descriptor_name == name)
        .fold(Metric::empty(), merge);

    merged.label_keys = flatten_label_keys(std::mem::take(&mut merged.label_keys));
    merged
}

/// Groups all metrics by name and batches each group.
///
/// Empty-sentinel results are filtered from the output.
#[must_use]
pub fn batch_metrics(metrics: &[Metric]) -> Vec<Metric> {
    group_metrics(metrics)
        .into_iter()
        .map(|(name, members)| {
            let owned: Vec<Metric> = members.into_iter().cloned().collect();
            batch_metrics_with_name(&name, &owned)
        })
        .filter(|m| !m.is_empty())
        .collect()
}
