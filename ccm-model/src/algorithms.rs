//! Higher-level queries built on top of [`crate::Object`] and
//! [`crate::structure::structure`]: comparing two project structures,
//! walking a successor chain between two timestamps, and picking the
//! version of an object current at a point in time (spec.md §4.8).
//!
//! Grounded on `diff_project_structure`, `versions_between_objects`,
//! `version_at_timestamp` and `expand_directory_changes` in
//! `attempt_2_project_diff.py`.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::error::Error;
use crate::object::{CvType, Object};
use crate::structure::{structure, ProjectStructure};

/// The result of comparing two [`ProjectStructure`]s by each object's
/// `part_name` (subsystem/cvtype/name, ignoring version).
pub struct ProjectStructureDiff<'ctx> {
    /// `(from, to)` pairs sharing a `part_name` but naming different
    /// revisions.
    pub updated: Vec<(Object<'ctx>, Object<'ctx>)>,
    /// Objects present in `to` whose `part_name` has no match in `from`.
    pub added: Vec<Object<'ctx>>,
    /// Objects present in `from` whose `part_name` has no match in `to`.
    pub removed: Vec<Object<'ctx>>,
    /// Objects identical (same id) in both structures.
    pub unchanged: Vec<Object<'ctx>>,
}

/// Compares the structures of two projects, matching entries by
/// `part_name` rather than full identity so a revision bump shows up as
/// `updated` instead of one `added` plus one `removed`.
pub fn diff_project_structure<'ctx>(
    project_a: &Object<'ctx>,
    project_b: &Object<'ctx>,
) -> Result<ProjectStructureDiff<'ctx>, Error> {
    let structure_a = structure(project_a)?;
    let structure_b = structure(project_b)?;

    let by_part_name = |s: &ProjectStructure<'ctx>| -> Result<HashMap<String, Object<'ctx>>, Error> {
        s.keys().map(|obj| Ok((obj.part_name()?, *obj))).collect()
    };
    let a_by_part_name = by_part_name(&structure_a)?;
    let b_by_part_name = by_part_name(&structure_b)?;

    let a_names: HashSet<&String> = a_by_part_name.keys().collect();
    let b_names: HashSet<&String> = b_by_part_name.keys().collect();

    let updated = a_names
        .intersection(&b_names)
        .filter_map(|name| {
            let from = a_by_part_name[*name];
            let to = b_by_part_name[*name];
            (from != to).then_some((from, to))
        })
        .collect();

    let added = b_names
        .difference(&a_names)
        .map(|name| b_by_part_name[*name])
        .collect();

    let removed = a_names
        .difference(&b_names)
        .map(|name| a_by_part_name[*name])
        .collect();

    let objects_a: HashSet<Object<'ctx>> = structure_a.keys().copied().collect();
    let objects_b: HashSet<Object<'ctx>> = structure_b.keys().copied().collect();
    let unchanged = objects_a.intersection(&objects_b).copied().collect();

    Ok(ProjectStructureDiff {
        updated,
        added,
        removed,
        unchanged,
    })
}

/// Walks `object_from`'s successor chain, returning every integrated
/// revision whose integrate time falls strictly between `object_from` and
/// `object_to`'s integrate times. Excludes both endpoints.
pub fn versions_between_objects<'ctx>(
    object_from: &Object<'ctx>,
    object_to: &Object<'ctx>,
) -> Result<Vec<Object<'ctx>>, Error> {
    let timestamp_from = object_from.integrate_time()?;
    let timestamp_to = object_to.integrate_time()?;

    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut work = object_from.successors()?;

    while let Some(obj) = work.pop() {
        if !seen.insert(obj) {
            continue;
        }
        work.extend(obj.successors()?);

        if obj.status().ok().as_deref() != Some("integrate") {
            continue;
        }
        let integrate_time = obj.integrate_time()?;
        if let (Some(from), Some(to), Some(when)) = (timestamp_from, timestamp_to, integrate_time)
        {
            if from < when && when < to {
                found.push(obj);
            }
        }
    }

    Ok(found)
}

/// Picks the revision among `objects` whose status is `integrate` or
/// `released` that was current at `timestamp`: the nearest one at or
/// before `timestamp`, falling back to the nearest one after it.
pub fn version_at_timestamp<'ctx>(
    timestamp: NaiveDateTime,
    objects: &[Object<'ctx>],
) -> Result<Option<Object<'ctx>>, Error> {
    let mut candidates: Vec<(Object<'ctx>, NaiveDateTime)> = Vec::new();
    for obj in objects {
        let status = obj.status().ok();
        if status.as_deref() != Some("integrate") && status.as_deref() != Some("released") {
            continue;
        }
        if let Some(when) = obj.integrate_time()? {
            candidates.push((*obj, when));
        }
    }
    candidates.sort_by_key(|(_, when)| *when);

    if let Some((obj, _)) = candidates.iter().find(|(_, when)| *when == timestamp) {
        return Ok(Some(*obj));
    }

    let before = candidates.iter().rev().find(|(_, when)| *when < timestamp);
    if let Some((obj, _)) = before {
        return Ok(Some(*obj));
    }

    let after = candidates.iter().find(|(_, when)| *when > timestamp);
    Ok(after.map(|(obj, _)| *obj))
}

/// Given a `dir` object's contents before (`old_dir`) and after
/// (`new_dir`) a change, finds the revision of each added/removed entry
/// current at `src_object`'s integrate time, recursing into any of those
/// entries that are themselves directories.
pub fn expand_directory_changes<'ctx>(
    ctx: &'ctx crate::LookupContext,
    src_object: &Object<'ctx>,
    old_dir: Option<&Object<'ctx>>,
    new_dir: Option<&Object<'ctx>>,
) -> Result<Vec<Object<'ctx>>, Error> {
    let old_contents: HashSet<String> = match old_dir {
        Some(dir) => dir.contents()?.into_iter().collect(),
        None => HashSet::new(),
    };
    let new_contents: HashSet<String> = match new_dir {
        Some(dir) => dir.contents()?.into_iter().collect(),
        None => HashSet::new(),
    };

    let timestamp = src_object.integrate_time()?.ok_or_else(|| Error::MissingAttribute {
        attribute: "status_log".to_string(),
    })?;

    let mut objects = Vec::new();

    for added_name in new_contents.difference(&old_contents) {
        let potentials = ctx.objects_by_partial_name(added_name)?;
        match version_at_timestamp(timestamp, &potentials)? {
            Some(version) => {
                if version.cvtype() == CvType::Dir {
                    objects.extend(expand_directory_changes(ctx, src_object, None, Some(&version))?);
                }
                objects.push(version);
            }
            None => log::warn!("no satisfying version for added entry '{added_name}'"),
        }
    }

    for removed_name in old_contents.difference(&new_contents) {
        let potentials = ctx.objects_by_partial_name(removed_name)?;
        match version_at_timestamp(timestamp, &potentials)? {
            Some(version) => {
                if version.cvtype() == CvType::Dir {
                    objects.extend(expand_directory_changes(ctx, src_object, Some(&version), None)?);
                }
                objects.push(version);
            }
            None => log::warn!("no satisfying version for removed entry '{removed_name}'"),
        }
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[test]
    fn versions_between_objects_finds_the_middle_revision() {
        let fx = fixture::build();
        let v1 = fx.ctx.object_by_id(fixture::FILE_ID).unwrap().unwrap();
        let v3 = fx.ctx.object_by_id(fixture::FILE_V3_ID).unwrap().unwrap();

        let between = versions_between_objects(&v1, &v3).unwrap();
        assert_eq!(between.len(), 1);
        assert_eq!(between[0].id().0, fixture::FILE_V2_ID);
    }

    #[test]
    fn versions_between_objects_excludes_endpoints() {
        let fx = fixture::build();
        let v1 = fx.ctx.object_by_id(fixture::FILE_ID).unwrap().unwrap();
        let v2 = fx.ctx.object_by_id(fixture::FILE_V2_ID).unwrap().unwrap();

        let between = versions_between_objects(&v1, &v2).unwrap();
        assert!(between.is_empty());
    }

    #[test]
    fn version_at_timestamp_picks_nearest_before_then_falls_back_to_after() {
        let fx = fixture::build();
        let v1 = fx.ctx.object_by_id(fixture::FILE_ID).unwrap().unwrap();
        let v2 = fx.ctx.object_by_id(fixture::FILE_V2_ID).unwrap().unwrap();
        let v3 = fx.ctx.object_by_id(fixture::FILE_V3_ID).unwrap().unwrap();
        let objects = [v1, v2, v3];

        let july = chrono::NaiveDate::from_ymd_opt(2020, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let picked = version_at_timestamp(july, &objects).unwrap().unwrap();
        assert_eq!(picked.id().0, fixture::FILE_V2_ID);

        let before_all = chrono::NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let picked = version_at_timestamp(before_all, &objects).unwrap().unwrap();
        assert_eq!(picked.id().0, fixture::FILE_ID, "falls back to nearest-after when nothing precedes the timestamp");
    }

    #[test]
    fn version_at_timestamp_matches_exact_integrate_time() {
        let fx = fixture::build();
        let v2 = fx.ctx.object_by_id(fixture::FILE_V2_ID).unwrap().unwrap();
        let objects = [v2];
        let when = v2.integrate_time().unwrap().unwrap();
        let picked = version_at_timestamp(when, &objects).unwrap().unwrap();
        assert_eq!(picked.id(), v2.id());
    }
}
