//! The G-NAF tables cleared by `truncate-tables`, in truncation order

use crate::error::{LoaderError, Result};
use gnaf_common::types::TableName;

pub const GNAF_TABLES: [&str; 34] = [
    "public.address",
    "public.address_alias",
    "public.address_alias_type_aut",
    "public.address_default_geocode",
    "public.address_detail",
    "public.address_mesh_block_2011",
    "public.address_mesh_block_2016",
    "public.address_site",
    "public.address_site_geocode",
    "public.address_type_aut",
    "public.flat_type_aut",
    "public.geocode_reliability_aut",
    "public.geocode_type_aut",
    "public.geocoded_level_type_aut",
    "public.level_type_aut",
    "public.locality",
    "public.locality_alias",
    "public.locality_alias_type_aut",
    "public.locality_class_aut",
    "public.locality_neighbour",
    "public.locality_point",
    "public.mb_2011",
    "public.mb_2016",
    "public.mb_match_code_aut",
    "public.primary_secondary",
    "public.ps_join_type_aut",
    "public.state",
    "public.street_class_aut",
    "public.street_locality",
    "public.street_locality_alias",
    "public.street_locality_alias_type_aut",
    "public.street_locality_point",
    "public.street_suffix_aut",
    "public.street_type_aut",
];

/// The fixed table list as validated table names
pub fn gnaf_tables() -> Result<Vec<TableName>> {
    GNAF_TABLES
        .iter()
        .map(|name| name.parse::<TableName>().map_err(LoaderError::from))
        .collect()
}
