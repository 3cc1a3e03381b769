//! The shared, read-only handle every [`crate::Object`] uses to resolve
//! relations against the relational image (spec.md §9, "cyclic reference
//! between object and ORM").

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;

use crate::error::Error;
use crate::object::{CvType, Object, ObjectId};

/// Opens the relational image and the backup's file tree, and caches the
/// process-wide four-part-name delimiter on first lookup.
pub struct LookupContext {
    store: ccm_store::Connection,
    backup_root: PathBuf,
    delim: OnceCell<String>,
}

impl LookupContext {
    pub fn open(store: ccm_store::Connection, backup_root: impl Into<PathBuf>) -> Self {
        LookupContext {
            store,
            backup_root: backup_root.into(),
            delim: OnceCell::new(),
        }
    }

    /// The underlying relational image connection, for callers that need to
    /// run raw compiled SQL (e.g. `ccm-query`'s output) rather than go
    /// through an `Object` accessor.
    pub fn store(&self) -> &ccm_store::Connection {
        &self.store
    }

    pub(crate) fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// The four-part-name delimiter, stored as the `delimiter` attribute on
    /// the distinguished object `base~1:model:base`.
    pub fn delim(&self) -> Result<&str, Error> {
        self.delim
            .get_or_try_init(|| {
                let rows = self.store.query(
                    "SELECT attrib.strval \
                     FROM compver INNER JOIN attrib ON (compver.id = attrib.is_attr_of) \
                     WHERE compver.name = 'base' AND compver.version = '1' AND \
                           compver.cvtype = 'model' AND compver.subsystem = 'base' AND \
                           attrib.name = 'delimiter'",
                    &[],
                )?;
                let delim = rows
                    .first()
                    .and_then(|row| row.get(0).as_str())
                    .ok_or_else(|| Error::MissingAttribute {
                        attribute: "delimiter".to_string(),
                    })?
                    .to_string();
                Ok(delim)
            })
            .map(String::as_str)
    }

    pub fn object_by_id(&self, id: i64) -> Result<Option<Object<'_>>, Error> {
        let rows = self.store.query(
            "SELECT cv.id, cv.cvtype FROM compver cv WHERE cv.id = ?1",
            &[&id],
        )?;
        Ok(row_to_object(self, rows.first()))
    }

    pub fn object_by_fpn(&self, four_part_name: &str) -> Result<Option<Object<'_>>, Error> {
        let fpn = ccm_query::parse_fpn(four_part_name, self.delim()?)
            .map_err(|_| Error::MalformedFpn(four_part_name.to_string()))?;
        let rows = self.store.query(
            "SELECT cv.id, cv.cvtype FROM compver cv \
             WHERE cv.name = ?1 AND cv.version = ?2 AND cv.cvtype = ?3 AND cv.subsystem = ?4",
            &[&fpn.name, &fpn.version, &fpn.cvtype, &fpn.subsystem],
        )?;
        Ok(row_to_object(self, rows.first()))
    }

    /// Parses `subsystem/cvtype/name/version` and resolves it the same way
    /// as [`Self::object_by_fpn`].
    pub fn object_by_full_name(&self, full_name: &str) -> Result<Option<Object<'_>>, Error> {
        let mut parts = full_name.splitn(4, '/');
        let (subsystem, cvtype, name, version) = match (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) {
            (Some(subsystem), Some(cvtype), Some(name), Some(version)) => {
                (subsystem, cvtype, name, version)
            }
            _ => return Err(Error::MalformedFullName(full_name.to_string())),
        };
        let rows = self.store.query(
            "SELECT cv.id, cv.cvtype FROM compver cv \
             WHERE cv.name = ?1 AND cv.version = ?2 AND cv.cvtype = ?3 AND cv.subsystem = ?4",
            &[&name, &version, &cvtype, &subsystem],
        )?;
        Ok(row_to_object(self, rows.first()))
    }

    /// Parses `subsystem/cvtype/name` (no version) and returns every
    /// matching object across versions.
    pub fn objects_by_partial_name(&self, partial_name: &str) -> Result<Vec<Object<'_>>, Error> {
        let mut parts = partial_name.splitn(3, '/');
        let (subsystem, cvtype, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(subsystem), Some(cvtype), Some(name)) => (subsystem, cvtype, name),
            _ => return Err(Error::MalformedFullName(partial_name.to_string())),
        };
        let rows = self.store.query(
            "SELECT cv.id, cv.cvtype FROM compver cv \
             WHERE cv.name = ?1 AND cv.cvtype = ?2 AND cv.subsystem = ?3",
            &[&name, &cvtype, &subsystem],
        )?;
        Ok(rows
            .iter()
            .filter_map(|row| row_to_object(self, Some(row)))
            .collect())
    }

    /// The fixed four-part-name tuple of one `compver` row.
    pub(crate) fn fpn_of(&self, id: ObjectId) -> Result<(String, String, String, String), Error> {
        let rows = self.store.query(
            "SELECT cv.name, cv.version, cv.cvtype, cv.subsystem FROM compver cv WHERE cv.id = ?1",
            &[&id.0],
        )?;
        let row = rows.first().expect("object id came from a compver row");
        Ok((
            row.get(0).as_str().unwrap_or("").to_string(),
            row.get(1).as_str().unwrap_or("").to_string(),
            row.get(2).as_str().unwrap_or("").to_string(),
            row.get(3).as_str().unwrap_or("").to_string(),
        ))
    }

    /// Every `attrib` row attached to `id`, as `(name, textval)`.
    pub(crate) fn attrib_rows(&self, id: ObjectId) -> Result<Vec<(String, Option<String>)>, Error> {
        let rows = self.store.query(
            "SELECT attrib.name, attrib.textval FROM attrib WHERE attrib.is_attr_of = ?1",
            &[&id.0],
        )?;
        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get(0).as_str().unwrap_or("").to_string(),
                    row.get(1).as_str().map(str::to_string),
                )
            })
            .collect())
    }

    /// A single named `attrib` row's `textval`, if one exists.
    pub(crate) fn attrib(&self, id: ObjectId, name: &str) -> Result<Option<String>, Error> {
        let rows = self.store.query(
            "SELECT attrib.textval FROM attrib WHERE attrib.is_attr_of = ?1 AND attrib.name = ?2",
            &[&id.0, &name],
        )?;
        Ok(rows.first().and_then(|row| row.get(0).as_str().map(str::to_string)))
    }

    pub(crate) fn related_from(
        &self,
        id: ObjectId,
        relation_name: &str,
    ) -> Result<Vec<Object<'_>>, Error> {
        let rows = self.store.query(
            "SELECT cv.id, cv.cvtype FROM relate rel INNER JOIN compver cv ON (rel.from_cv = cv.id) \
             WHERE rel.to_cv = ?1 AND rel.name = ?2",
            &[&id.0, &relation_name],
        )?;
        Ok(rows.iter().filter_map(|row| row_to_object(self, Some(row))).collect())
    }

    pub(crate) fn related_to(
        &self,
        id: ObjectId,
        relation_name: &str,
    ) -> Result<Vec<Object<'_>>, Error> {
        let rows = self.store.query(
            "SELECT cv.id, cv.cvtype FROM relate rel INNER JOIN compver cv ON (rel.to_cv = cv.id) \
             WHERE rel.from_cv = ?1 AND rel.name = ?2",
            &[&id.0, &relation_name],
        )?;
        Ok(rows.iter().filter_map(|row| row_to_object(self, Some(row))).collect())
    }

    /// Edges touching `id` in either direction, partitioned by direction
    /// then relation name.
    pub(crate) fn related_all(
        &self,
        id: ObjectId,
    ) -> Result<crate::object::RelatedAll<'_>, Error> {
        let rows = self.store.query(
            "SELECT 'to', rel.name, cv.id, cv.cvtype \
             FROM relate rel INNER JOIN compver cv ON (rel.to_cv = cv.id) WHERE rel.from_cv = ?1 \
             UNION \
             SELECT 'from', rel.name, cv.id, cv.cvtype \
             FROM relate rel INNER JOIN compver cv ON (rel.from_cv = cv.id) WHERE rel.to_cv = ?1",
            &[&id.0],
        )?;

        let mut related = crate::object::RelatedAll::default();
        for row in &rows {
            let direction = row.get(0).as_str().unwrap_or("");
            let relation_name = row.get(1).as_str().unwrap_or("").to_string();
            let obj = row_to_object(self, Some(row)).expect("row came from compver join");
            let bucket = match direction {
                "to" => &mut related.to,
                _ => &mut related.from,
            };
            bucket.entry(relation_name).or_default().push(obj);
        }
        Ok(related)
    }

    pub(crate) fn bound_children(
        &self,
        asm: ObjectId,
        parent: ObjectId,
    ) -> Result<Vec<Object<'_>>, Error> {
        let rows = self.store.query(
            "SELECT cv.id, cv.cvtype FROM bind INNER JOIN compver cv ON (bind.has_child = cv.id) \
             WHERE bind.has_asm = ?1 AND bind.has_parent = ?2",
            &[&asm.0, &parent.0],
        )?;
        Ok(rows.iter().filter_map(|row| row_to_object(self, Some(row))).collect())
    }

    /// Directory-listing entries for a `dir` object, ordered by `bsite.info`
    /// (spec.md §3's "ordered by info").
    pub(crate) fn contents_dir(&self, dir: ObjectId) -> Result<Vec<String>, Error> {
        let rows = self.store.query(
            "SELECT bsite.info FROM bsite WHERE bsite.is_bsite_of = ?1 ORDER BY bsite.info",
            &[&dir.0],
        )?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(0).as_str().map(str::to_string))
            .collect())
    }

    /// The fixed `compver` columns exposed through `Object::attributes`
    /// (spec.md §4.7). `status` here is the raw `compver.status` column,
    /// not the `status_log`-derived value `Object::status` computes.
    pub(crate) fn compver_fixed_attrs(
        &self,
        id: ObjectId,
    ) -> Result<std::collections::HashMap<String, crate::object::AttributeValue>, Error> {
        use crate::object::AttributeValue;

        let rows = self.store.query(
            "SELECT create_time, cvtype, is_asm, is_model, modify_time, name, owner, status, \
                    subsystem, version FROM compver WHERE id = ?1",
            &[&id.0],
        )?;
        let row = rows.first().expect("object id came from a compver row");

        let mut attrs = std::collections::HashMap::new();
        attrs.insert(
            "create_time".to_string(),
            row.get(0)
                .as_i64()
                .map(AttributeValue::Int)
                .unwrap_or(AttributeValue::Null),
        );
        attrs.insert(
            "cvtype".to_string(),
            AttributeValue::Text(row.get(1).as_str().unwrap_or("").to_string()),
        );
        attrs.insert(
            "is_asm".to_string(),
            AttributeValue::Bool(row.get(2).as_i64().unwrap_or(0) != 0),
        );
        attrs.insert(
            "is_model".to_string(),
            AttributeValue::Bool(row.get(3).as_i64().unwrap_or(0) != 0),
        );
        attrs.insert(
            "modify_time".to_string(),
            row.get(4)
                .as_i64()
                .map(AttributeValue::Int)
                .unwrap_or(AttributeValue::Null),
        );
        attrs.insert(
            "name".to_string(),
            AttributeValue::Text(row.get(5).as_str().unwrap_or("").to_string()),
        );
        attrs.insert(
            "owner".to_string(),
            AttributeValue::Text(row.get(6).as_str().unwrap_or("").to_string()),
        );
        attrs.insert(
            "status".to_string(),
            row.get(7)
                .as_str()
                .map(|s| AttributeValue::Text(s.to_string()))
                .unwrap_or(AttributeValue::Null),
        );
        attrs.insert(
            "subsystem".to_string(),
            AttributeValue::Text(row.get(8).as_str().unwrap_or("").to_string()),
        );
        attrs.insert(
            "version".to_string(),
            AttributeValue::Text(row.get(9).as_str().unwrap_or("").to_string()),
        );
        Ok(attrs)
    }

    /// The release a `compver` row belongs to, via `compver.is_product`.
    pub(crate) fn release_of(&self, id: ObjectId) -> Result<Option<(i64, String)>, Error> {
        let rows = self.store.query(
            "SELECT r.id, r.name FROM compver cv INNER JOIN \"release\" r ON (cv.is_product = r.id) \
             WHERE cv.id = ?1",
            &[&id.0],
        )?;
        Ok(rows.first().map(|row| {
            (
                row.get(0).as_i64().unwrap_or_default(),
                row.get(1).as_str().unwrap_or("").to_string(),
            )
        }))
    }
}


fn row_to_object<'ctx>(
    ctx: &'ctx LookupContext,
    row: Option<&ccm_store::Row>,
) -> Option<Object<'ctx>> {
    row.map(|row| {
        let id = ObjectId(row.get(0).as_i64().expect("compver.id is an integer"));
        let cvtype = CvType::from_str(row.get(1).as_str().unwrap_or(""));
        Object::new(ctx, id, cvtype)
    })
}
