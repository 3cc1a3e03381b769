//! `Project::structure`: the full set of objects bound (directly or
//! transitively, through `dir` objects) under a project, each mapped to
//! its path within that project (spec.md §4.8).
//!
//! Grounded on `CcmProject.structure`, which walks `bind` with an explicit
//! work-list rather than recursion so a deeply nested tree doesn't blow the
//! call stack.

use std::collections::HashMap;

use crate::error::Error;
use crate::object::{CvType, Object};

pub type ProjectStructure<'ctx> = HashMap<Object<'ctx>, String>;

/// One `(object, path)` pair from a [`ProjectStructure`], used by callers
/// that want the entries sorted rather than hashed.
#[derive(Debug, Clone)]
pub struct StructureEntry<'ctx> {
    pub object: Object<'ctx>,
    pub path: String,
}

/// Computes `project`'s structure: every object bound under it, directly
/// or via a chain of `dir` objects, each mapped to its project-relative
/// path (`/name/name/...`).
pub fn structure<'ctx>(project: &Object<'ctx>) -> Result<ProjectStructure<'ctx>, Error> {
    let mut paths = HashMap::new();

    let top = project.bound_children(project)?;
    let mut work: Vec<Object<'ctx>> = Vec::with_capacity(top.len());
    for child in &top {
        paths.insert(*child, format!("/{}", child.name()?));
        work.push(*child);
    }

    while let Some(current) = work.pop() {
        if current.cvtype() != CvType::Dir {
            continue;
        }

        let parent_path = paths
            .get(&current)
            .cloned()
            .expect("every queued object was inserted into paths before being queued");
        let children = project.bound_children(&current)?;
        for child in &children {
            paths.insert(*child, format!("{}/{}", parent_path, child.name()?));
            work.push(*child);
        }
    }

    Ok(paths)
}

/// Sorted view of a [`ProjectStructure`], convenient for display or
/// deterministic diffing.
pub fn sorted_entries<'ctx>(structure: &ProjectStructure<'ctx>) -> Vec<StructureEntry<'ctx>> {
    let mut entries: Vec<StructureEntry<'ctx>> = structure
        .iter()
        .map(|(object, path)| StructureEntry {
            object: *object,
            path: path.clone(),
        })
        .collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}
