//! Lazy typed wrappers over `compver` rows (spec.md §4.7).
//!
//! Rather than a class hierarchy per `cvtype` (the original's
//! `CcmProject`/`CcmFolder`/`CcmFile`/...), every object is the same
//! [`Object`] value; capability methods are gated on its [`CvType`] tag and
//! return `Option`/`Result` instead of being dispatched through a trait
//! object hierarchy (spec.md §9).

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::LookupContext;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub i64);

/// `compver.cvtype`; everything not in the enumerated set is a file
/// (spec.md §3, "Kinds").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CvType {
    Project,
    Baseline,
    Folder,
    FolderTemplate,
    Task,
    Dir,
    Problem,
    ReleaseDef,
    ProcessRule,
    ProjectGrouping,
    File,
}

impl CvType {
    pub fn from_str(s: &str) -> CvType {
        match s {
            "project" => CvType::Project,
            "baseline" => CvType::Baseline,
            "folder" => CvType::Folder,
            "folder_temp" => CvType::FolderTemplate,
            "task" => CvType::Task,
            "dir" => CvType::Dir,
            "problem" => CvType::Problem,
            "releasedef" => CvType::ReleaseDef,
            "process_rule" => CvType::ProcessRule,
            "project_grouping" => CvType::ProjectGrouping,
            _ => CvType::File,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CvType::Project => "project",
            CvType::Baseline => "baseline",
            CvType::Folder => "folder",
            CvType::FolderTemplate => "folder_temp",
            CvType::Task => "task",
            CvType::Dir => "dir",
            CvType::Problem => "problem",
            CvType::ReleaseDef => "releasedef",
            CvType::ProcessRule => "process_rule",
            CvType::ProjectGrouping => "project_grouping",
            CvType::File => "file",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Relations touching one object, partitioned by direction then relation
/// name (spec.md §4.7's `related_all`).
#[derive(Debug, Default)]
pub struct RelatedAll<'ctx> {
    pub from: HashMap<String, Vec<Object<'ctx>>>,
    pub to: HashMap<String, Vec<Object<'ctx>>>,
}

/// A `Day Mon DD HH:MM:SS YYYY`-style status transition read from a
/// `status_log` attribute (spec.md §3).
static STATUS_LOG_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*): Status set to '(\w+)' by").unwrap());

#[derive(Debug, Clone, Copy)]
pub struct Object<'ctx> {
    ctx: &'ctx LookupContext,
    id: ObjectId,
    cvtype: CvType,
}

impl<'ctx> PartialEq for Object<'ctx> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<'ctx> Eq for Object<'ctx> {}
impl<'ctx> Hash for Object<'ctx> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<'ctx> Object<'ctx> {
    pub(crate) fn new(ctx: &'ctx LookupContext, id: ObjectId, cvtype: CvType) -> Self {
        Object { ctx, id, cvtype }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn backup_root(&self) -> &'ctx std::path::Path {
        LookupContext::backup_root(self.ctx)
    }

    pub fn cvtype(&self) -> CvType {
        self.cvtype
    }

    /// `(name, version, cvtype, subsystem)`.
    pub fn fpn(&self) -> Result<(String, String, String, String), Error> {
        self.ctx.fpn_of(self.id)
    }

    pub fn name(&self) -> Result<String, Error> {
        Ok(self.fpn()?.0)
    }

    pub fn version(&self) -> Result<String, Error> {
        Ok(self.fpn()?.1)
    }

    pub fn subsystem(&self) -> Result<String, Error> {
        Ok(self.fpn()?.3)
    }

    /// `name<delim>version:cvtype:subsystem`.
    pub fn four_part_name(&self) -> Result<String, Error> {
        let (name, version, cvtype, subsystem) = self.fpn()?;
        let delim = self.ctx.delim()?;
        Ok(format!("{name}{delim}{version}:{cvtype}:{subsystem}"))
    }

    /// `subsystem/cvtype/name/version`.
    pub fn full_name(&self) -> Result<String, Error> {
        let (name, version, cvtype, subsystem) = self.fpn()?;
        Ok(format!("{subsystem}/{cvtype}/{name}/{version}"))
    }

    /// `subsystem/cvtype/name` (no version) — matches across an object's
    /// revisions.
    pub fn part_name(&self) -> Result<String, Error> {
        let (name, _version, cvtype, subsystem) = self.fpn()?;
        Ok(format!("{subsystem}/{cvtype}/{name}"))
    }

    /// Merges `attrib` rows with the fixed `compver` column set and a
    /// synthesised `release` attribute (spec.md §4.7).
    ///
    /// `attributes()["status"]` is the raw `compver.status` column,
    /// distinct from [`Self::status`], which recomputes the current status
    /// from `status_log` text; see `DESIGN.md`.
    pub fn attributes(&self) -> Result<HashMap<String, AttributeValue>, Error> {
        let mut attrs: HashMap<String, AttributeValue> = self
            .ctx
            .attrib_rows(self.id)?
            .into_iter()
            .map(|(name, value)| {
                (
                    name,
                    value.map(AttributeValue::Text).unwrap_or(AttributeValue::Null),
                )
            })
            .collect();

        attrs.extend(self.ctx.compver_fixed_attrs(self.id)?);

        let release = self
            .ctx
            .release_of(self.id)?
            .map(|(_id, name)| AttributeValue::Text(name))
            .unwrap_or(AttributeValue::Null);
        attrs.insert("release".to_string(), release);

        Ok(attrs)
    }

    pub fn attribute(&self, name: &str) -> Result<Option<AttributeValue>, Error> {
        Ok(self.attributes()?.remove(name))
    }

    pub fn related_from(&self, relation_name: &str) -> Result<Vec<Object<'ctx>>, Error> {
        self.ctx.related_from(self.id, relation_name)
    }

    pub fn related_to(&self, relation_name: &str) -> Result<Vec<Object<'ctx>>, Error> {
        self.ctx.related_to(self.id, relation_name)
    }

    pub fn related_all(&self) -> Result<RelatedAll<'ctx>, Error> {
        self.ctx.related_all(self.id)
    }

    pub fn successors(&self) -> Result<Vec<Object<'ctx>>, Error> {
        self.related_to("successor")
    }

    pub fn predecessors(&self) -> Result<Vec<Object<'ctx>>, Error> {
        self.related_from("successor")
    }

    fn status_log(&self) -> Result<String, Error> {
        self.ctx
            .attrib(self.id, "status_log")?
            .ok_or_else(|| Error::MissingAttribute {
                attribute: "status_log".to_string(),
            })
    }

    /// The current status: the last `status_log` entry's status name.
    pub fn status(&self) -> Result<String, Error> {
        let log = self.status_log()?;
        let last = log.lines().last().unwrap_or("");
        let captures = STATUS_LOG_ENTRY
            .captures(last)
            .ok_or_else(|| Error::MalformedStatusLogEntry(last.to_string()))?;
        Ok(captures[2].to_string())
    }

    /// The timestamp of the most recent `status_log` transition into
    /// `status`, walking entries newest-first.
    pub fn status_time(&self, status: &str) -> Result<Option<chrono::NaiveDateTime>, Error> {
        let log = self.status_log()?;
        for entry in log.lines().rev() {
            let captures = match STATUS_LOG_ENTRY.captures(entry) {
                Some(c) => c,
                None => continue,
            };
            if &captures[2] == status {
                let time =
                    chrono::NaiveDateTime::parse_from_str(&captures[1], "%a %b %d %H:%M:%S %Y")
                        .map_err(|_| Error::MalformedStatusLogEntry(entry.to_string()))?;
                return Ok(Some(time));
            }
        }
        Ok(None)
    }

    /// `status_time(self, "integrate")`, the timestamp used throughout
    /// §4.8's ordering of file/dir revisions.
    pub fn integrate_time(&self) -> Result<Option<chrono::NaiveDateTime>, Error> {
        self.status_time("integrate")
    }

    pub fn baseline_project(&self) -> Result<Option<Object<'ctx>>, Error> {
        Ok(self.related_to("baseline_project")?.into_iter().next())
    }

    pub fn baseline(&self) -> Result<Option<Object<'ctx>>, Error> {
        Ok(self.related_from("project_in_baseline")?.into_iter().next())
    }

    pub fn tasks(&self) -> Result<Vec<Object<'ctx>>, Error> {
        match self.cvtype {
            CvType::Baseline => self.related_to("task_in_baseline"),
            CvType::Project => self.related_to("task_in_rp"),
            CvType::Folder => self.related_to("task_in_folder"),
            CvType::Dir | CvType::File => self.related_from("associated_cv"),
            _ => Ok(Vec::new()),
        }
    }

    pub fn folders(&self) -> Result<Vec<Object<'ctx>>, Error> {
        self.related_to("folder_in_rp")
    }

    pub fn projects(&self) -> Result<Vec<Object<'ctx>>, Error> {
        self.related_from("folder_in_rp")
    }

    /// Completion time used to order tasks (spec.md §3's completeness
    /// invariant on `associated_cv`).
    pub fn completed_time(&self) -> Result<Option<chrono::NaiveDateTime>, Error> {
        self.status_time("completed")
    }

    pub fn associated_objects(&self) -> Result<Vec<Object<'ctx>>, Error> {
        self.related_to("associated_cv")
    }

    /// Directory-listing entry names, ordered by `bsite.info`.
    pub fn contents(&self) -> Result<Vec<String>, Error> {
        self.ctx.contents_dir(self.id)
    }

    /// Children bound directly under `parent` within this object's own
    /// assembly (used by `structure::structure`).
    pub fn bound_children(&self, parent: &Object<'ctx>) -> Result<Vec<Object<'ctx>>, Error> {
        self.ctx.bound_children(self.id, parent.id)
    }

    /// A `dir`/`file` object's revision content, via its `source`
    /// attribute (spec.md §4.8). Delegates to `rcs` for anything not
    /// stored in the XDELTA archive tree.
    pub fn data(&self, rcs: &dyn crate::data::ExternalRcs) -> Result<Vec<u8>, Error> {
        crate::data::data(self, rcs)
    }
}
