#![forbid(unsafe_code)]

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Transaction};
use tm_core::{hier, TagId};
use tracing::debug;

use super::tags::{tag_row_tx, TxParentSource};
use super::{SqliteStore, StoreError};

/// How a set of tag ids relates to the stored closure.
///
/// Stored taggings always contain the full ancestor closure of whatever
/// was requested. `All` reads or writes that closure verbatim; `Leafs`
/// works in terms of the explicitly chosen tags, expanding them on write
/// and collapsing the closure back to its deepest members on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaggingMode {
    All,
    Leafs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaggableType {
    Bookmark,
}

impl TaggableType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaggableType::Bookmark => "bookmark",
        }
    }
}

impl SqliteStore {
    pub fn get_taggings(
        &mut self,
        taggable_id: i64,
        mode: TaggingMode,
    ) -> Result<Vec<TagId>, StoreError> {
        let tx = self.conn.transaction()?;
        let ids = get_taggings_tx(&tx, taggable_id, mode)?;
        tx.commit()?;
        Ok(ids)
    }

    /// Replaces a taggable's taggings with `tag_ids`, touching only the
    /// rows that actually change.
    pub fn set_taggings(
        &mut self,
        taggable_id: i64,
        tag_ids: &[TagId],
        mode: TaggingMode,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        set_taggings_tx(&tx, taggable_id, tag_ids, mode)?;
        tx.commit()?;
        Ok(())
    }

    /// Ids of taggables tagged with every tag in `tag_ids`. An empty
    /// `tag_ids` selects untagged taggables instead.
    pub fn tagged_taggable_ids(
        &mut self,
        owner_id: Option<i64>,
        tag_ids: &[TagId],
        taggable_type: Option<TaggableType>,
    ) -> Result<Vec<i64>, StoreError> {
        let tx = self.conn.transaction()?;
        let ids = tagged_taggable_ids_tx(&tx, owner_id, tag_ids, taggable_type)?;
        tx.commit()?;
        Ok(ids)
    }
}

pub(crate) fn get_taggings_tx(
    tx: &Transaction<'_>,
    taggable_id: i64,
    mode: TaggingMode,
) -> Result<Vec<TagId>, StoreError> {
    taggable_owner_tx(tx, taggable_id)?;

    let mut stmt =
        tx.prepare("SELECT tag_id FROM taggings WHERE taggable_id = ?1 ORDER BY tag_id")?;
    let stored = stmt
        .query_map(params![taggable_id], |row| row.get::<_, TagId>(0))?
        .collect::<Result<Vec<TagId>, _>>()?;
    drop(stmt);

    match mode {
        TaggingMode::All => Ok(stored),
        TaggingMode::Leafs => {
            let mut hier = hier::TagHier::new();
            let mut source = TxParentSource { tx };
            for id in stored {
                hier.add(&mut source, id)?;
            }
            Ok(hier.leafs())
        }
    }
}

pub(crate) fn set_taggings_tx(
    tx: &Transaction<'_>,
    taggable_id: i64,
    tag_ids: &[TagId],
    mode: TaggingMode,
) -> Result<(), StoreError> {
    let owner_id = taggable_owner_tx(tx, taggable_id)?;

    for &tag_id in tag_ids {
        let (tag_owner, _) = tag_row_tx(tx, tag_id)?;
        if tag_owner != owner_id {
            return Err(StoreError::InvalidInput("tag belongs to another user"));
        }
    }

    let desired = match mode {
        TaggingMode::All => tag_ids.to_vec(),
        TaggingMode::Leafs => {
            let mut hier = hier::TagHier::new();
            let mut source = TxParentSource { tx };
            for &id in tag_ids {
                hier.add(&mut source, id)?;
            }
            if hier.roots().len() > 1 {
                return Err(StoreError::Internal(format!(
                    "taggings for taggable {taggable_id} span more than one tag tree"
                )));
            }
            hier.all()
        }
    };

    let current = get_taggings_tx(tx, taggable_id, TaggingMode::All)?;
    let diff = hier::diff(&current, &desired);
    if diff.is_empty() {
        return Ok(());
    }
    debug!(
        taggable_id,
        add = diff.add.len(),
        remove = diff.remove.len(),
        "updating taggings"
    );

    for tag_id in &diff.remove {
        tx.execute(
            "DELETE FROM taggings WHERE taggable_id = ?1 AND tag_id = ?2",
            params![taggable_id, tag_id],
        )?;
    }
    for tag_id in &diff.add {
        tx.execute(
            "INSERT INTO taggings(taggable_id, tag_id) VALUES (?1, ?2)",
            params![taggable_id, tag_id],
        )?;
    }
    Ok(())
}

pub(crate) fn tagged_taggable_ids_tx(
    tx: &Transaction<'_>,
    owner_id: Option<i64>,
    tag_ids: &[TagId],
    taggable_type: Option<TaggableType>,
) -> Result<Vec<i64>, StoreError> {
    let mut sql = String::from("SELECT taggables.id FROM taggables");
    let mut values: Vec<Value> = Vec::new();
    let mut conditions: Vec<String> = Vec::new();

    if tag_ids.is_empty() {
        // No required tags means "untagged": taggables with no taggings
        // at all.
        sql.push_str(" LEFT JOIN taggings tg ON tg.taggable_id = taggables.id");
        conditions.push("tg.taggable_id IS NULL".to_owned());
    } else {
        for (k, &tag_id) in tag_ids.iter().enumerate() {
            values.push(Value::from(tag_id));
            let n = values.len();
            sql.push_str(&format!(
                " JOIN taggings tg{k} ON tg{k}.taggable_id = taggables.id AND tg{k}.tag_id = ?{n}"
            ));
        }
    }

    if let Some(owner_id) = owner_id {
        values.push(Value::from(owner_id));
        conditions.push(format!("taggables.owner_id = ?{}", values.len()));
    }
    if let Some(taggable_type) = taggable_type {
        values.push(Value::from(taggable_type.as_str().to_owned()));
        conditions.push(format!("taggables.type = ?{}", values.len()));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY taggables.id");

    let mut stmt = tx.prepare(&sql)?;
    let ids = stmt
        .query_map(params_from_iter(values), |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

pub(crate) fn taggable_owner_tx(
    tx: &Transaction<'_>,
    taggable_id: i64,
) -> Result<i64, StoreError> {
    tx.query_row(
        "SELECT owner_id FROM taggables WHERE id = ?1",
        params![taggable_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(StoreError::TaggableNotFound)
}
