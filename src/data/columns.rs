//! Column catalogue
//! Canonical keys for the cleaned table and the fixed header mapping of the source export.

pub const NO: &str = "no";
pub const TYPE: &str = "type";
pub const REGION: &str = "region";
pub const CITY_CODE: &str = "city_town_ward_village_code";
pub const PREFECTURE: &str = "prefecture";
pub const CITY_NAME: &str = "city_town_ward_village_name";
pub const AREA_NAME: &str = "area_name";
pub const STATION_NAME: &str = "nearest_station_name";
pub const STATION_DISTANCE: &str = "nearest_station_distance_minute";
pub const PRICE_TOTAL: &str = "transaction_price_total";
pub const LAYOUT: &str = "layout";
pub const AREA_M2: &str = "area_m2";
pub const UNIT_PRICE: &str = "unit_price_per_area";
pub const LAND_SHAPE: &str = "land_shape";
pub const FRONTAGE: &str = "frontage";
pub const TOTAL_FLOOR_AREA: &str = "total_floor_area_m2";
pub const YEAR_OF_CONSTRUCTION: &str = "year_of_construction";
pub const BUILDING_STRUCTURE: &str = "building_structure";
pub const USE: &str = "use";
pub const PURPOSE_OF_USE: &str = "purpose_of_use";
pub const ROAD_DIRECTION: &str = "frontage_road_direction";
pub const ROAD_CLASSIFICATION: &str = "frontage_road_classification";
pub const ROAD_BREADTH: &str = "frontage_road_breadth_m";
pub const CITY_PLANNING: &str = "city_planning";
pub const COVERAGE_RATIO: &str = "maximum_building_coverage_ratio_pct";
pub const FLOOR_AREA_RATIO: &str = "maximum_floor_area_ratio_pct";
pub const TRANSACTION_PERIOD: &str = "transaction_period";
pub const RENOVATION: &str = "renovation";
pub const TRANSACTIONAL_FACTORS: &str = "transactional_factors";

/// Derived and joined columns.
pub const TOTAL_AREA: &str = "total_area";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

/// Raw towns reference headers.
pub const TOWN_CITY_CODE: &str = "cityCode";
pub const TOWN_AREA_NAME: &str = "townAlphabet";

/// Sentinel for missing categorical values.
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for a missing area name (also the normalized form of an empty name).
pub const MISSING_AREA: &str = "nan";

/// Source header -> canonical key, in export order.
pub const COLUMN_MAPPING: [(&str, &str); 29] = [
    ("No", NO),
    ("Type", TYPE),
    ("Region", REGION),
    ("City,Town,Ward,Village code", CITY_CODE),
    ("Prefecture", PREFECTURE),
    ("City,Town,Ward,Village", CITY_NAME),
    ("Area", AREA_NAME),
    ("Nearest station：Name", STATION_NAME),
    ("Nearest station：Distance(minute)", STATION_DISTANCE),
    ("Transaction-price(total)", PRICE_TOTAL),
    ("Layout", LAYOUT),
    ("Area(m^2)", AREA_M2),
    ("Transaction-price(Unit price m^2)", UNIT_PRICE),
    ("Land shape", LAND_SHAPE),
    ("Frontage", FRONTAGE),
    ("Total floor area(m^2)", TOTAL_FLOOR_AREA),
    ("Year of construction", YEAR_OF_CONSTRUCTION),
    ("Building structure", BUILDING_STRUCTURE),
    ("Use", USE),
    ("Purpose of Use", PURPOSE_OF_USE),
    ("Frontage road：Direction", ROAD_DIRECTION),
    ("Frontage road：Classification", ROAD_CLASSIFICATION),
    ("Frontage road：Breadth(m)", ROAD_BREADTH),
    ("City Planning", CITY_PLANNING),
    ("Maximus Building Coverage Ratio(%)", COVERAGE_RATIO),
    ("Maximus Floor-area Ratio(%)", FLOOR_AREA_RATIO),
    ("Transaction period", TRANSACTION_PERIOD),
    ("Renovation", RENOVATION),
    ("Transactional factors", TRANSACTIONAL_FACTORS),
];

/// Categorical columns whose nulls become [`UNKNOWN`].
pub const CATEGORICAL_COLUMNS: [&str; 22] = [
    TYPE,
    REGION,
    PREFECTURE,
    CITY_NAME,
    STATION_NAME,
    STATION_DISTANCE,
    LAYOUT,
    LAND_SHAPE,
    FRONTAGE,
    TOTAL_FLOOR_AREA,
    YEAR_OF_CONSTRUCTION,
    BUILDING_STRUCTURE,
    USE,
    PURPOSE_OF_USE,
    ROAD_DIRECTION,
    ROAD_CLASSIFICATION,
    ROAD_BREADTH,
    CITY_PLANNING,
    COVERAGE_RATIO,
    FLOOR_AREA_RATIO,
    RENOVATION,
    TRANSACTIONAL_FACTORS,
];

/// Canonical key for a source header, if the header is known.
pub fn canonical_key(header: &str) -> Option<&'static str> {
    let header = header.trim();
    COLUMN_MAPPING
        .iter()
        .find(|(raw, _)| *raw == header)
        .map(|(_, key)| *key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn mapping_is_one_to_one() {
        let raw: HashSet<_> = COLUMN_MAPPING.iter().map(|(r, _)| *r).collect();
        let keys: HashSet<_> = COLUMN_MAPPING.iter().map(|(_, k)| *k).collect();
        assert_eq!(raw.len(), COLUMN_MAPPING.len());
        assert_eq!(keys.len(), COLUMN_MAPPING.len());
    }

    #[test]
    fn categorical_columns_are_canonical_keys() {
        let keys: HashSet<_> = COLUMN_MAPPING.iter().map(|(_, k)| *k).collect();
        for column in CATEGORICAL_COLUMNS {
            assert!(keys.contains(column), "{column} is not a mapped key");
        }
    }

    #[test]
    fn canonical_key_trims_header_whitespace() {
        assert_eq!(canonical_key(" Purpose of Use "), Some(PURPOSE_OF_USE));
        assert_eq!(canonical_key("Nearest station：Name"), Some(STATION_NAME));
        assert_eq!(canonical_key("Nearest station:Name"), None);
    }
}
