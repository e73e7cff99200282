//! Values the server reads from the world tables.
//!
//! The column positions are fixed by the client build the tables come from.

use indexmap::IndexMap;
use mangos_dbc::{error::Result, DbcTable, Row};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// File name of the map table
pub const MAP_TABLE: &str = "Map.dbc";
/// File name of the area table
pub const AREA_TABLE: &str = "AreaTable.dbc";
/// File name of the liquid type table
pub const LIQUID_TYPE_TABLE: &str = "LiquidType.dbc";

const MAP_ID: usize = 0;
const MAP_NAME: usize = 1;
const AREA_ID: usize = 0;
const AREA_FLAGS: usize = 3;
const LIQUID_TYPE_ID: usize = 0;
const LIQUID_TYPE_FLAGS: usize = 3;

/// Accumulates the map, area and liquid type tables.
///
/// Loading a table adds to what is already there. A table that fails to decode leaves the
/// accumulator untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct WorldTables {
    /// Map id to map name
    pub maps: IndexMap<i32, String>,
    /// Area id to area flags
    pub areas: IndexMap<i32, i32>,
    /// Highest area id seen
    pub max_area_id: Option<i32>,
    /// Liquid type id to liquid flags
    pub liquid_types: IndexMap<i32, i32>,
}

/// Outcome of loading one table file
pub type TableOutcome = (&'static str, Result<usize>);

impl WorldTables {
    /// Read the map names from a map table
    pub fn load_maps(&mut self, table: &DbcTable) -> Result<usize> {
        let maps = collect(table, MAP_TABLE, |row| {
            Ok((row.read_int(MAP_ID)?, row.read_string(MAP_NAME)?.to_owned()))
        })?;
        self.maps.extend(maps);
        Ok(table.len())
    }

    /// Read the area flags from an area table
    pub fn load_areas(&mut self, table: &DbcTable) -> Result<usize> {
        let areas = collect(table, AREA_TABLE, |row| {
            Ok((row.read_int(AREA_ID)?, row.read_int(AREA_FLAGS)?))
        })?;
        if let Some(max) = areas.keys().copied().max() {
            self.max_area_id = Some(self.max_area_id.map_or(max, |current| current.max(max)));
        }
        self.areas.extend(areas);
        Ok(table.len())
    }

    /// Read the liquid flags from a liquid type table
    pub fn load_liquid_types(&mut self, table: &DbcTable) -> Result<usize> {
        let liquid_types = collect(table, LIQUID_TYPE_TABLE, |row| {
            Ok((row.read_int(LIQUID_TYPE_ID)?, row.read_int(LIQUID_TYPE_FLAGS)?))
        })?;
        self.liquid_types.extend(liquid_types);
        Ok(table.len())
    }

    /// Load the three tables from a folder of extracted tables.
    ///
    /// Every table is attempted, the outcome of each is returned in load order.
    pub fn load_dir(&mut self, dir: &Path) -> Vec<TableOutcome> {
        let loaders: [(&'static str, fn(&mut Self, &DbcTable) -> Result<usize>); 3] = [
            (MAP_TABLE, Self::load_maps),
            (AREA_TABLE, Self::load_areas),
            (LIQUID_TYPE_TABLE, Self::load_liquid_types),
        ];

        loaders
            .into_iter()
            .map(|(name, load)| {
                let outcome = DbcTable::open(dir.join(name)).and_then(|table| load(self, &table));
                (name, outcome)
            })
            .collect()
    }
}

fn collect<T>(
    table: &DbcTable,
    name: &str,
    read: impl Fn(&Row<'_>) -> Result<(i32, T)>,
) -> Result<IndexMap<i32, T>> {
    let mut values = IndexMap::new();
    for row in table.rows() {
        let (id, value) = read(&row)?;
        if values.insert(id, value).is_some() {
            warn!(table = name, id, "duplicate id, keeping the later row");
        }
    }
    debug!(table = name, rows = table.len(), unique = values.len(), "read table");
    Ok(values)
}
