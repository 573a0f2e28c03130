//! Declared record schemas for every stream

use super::types::{JsonSchema, SchemaProperty};
use std::collections::BTreeMap;

fn string_list() -> SchemaProperty {
    SchemaProperty::array(SchemaProperty::string())
}

/// Orders listing records
pub fn orders_schema() -> JsonSchema {
    let custom_field_value = SchemaProperty::object(BTreeMap::from([
        ("customField".to_string(), SchemaProperty::string()),
        ("value".to_string(), SchemaProperty::string()),
    ]));

    JsonSchema::new()
        .property("orderId", SchemaProperty::string())
        .property("displayName", SchemaProperty::string())
        .property("startTime", SchemaProperty::date_time())
        .property("endTime", SchemaProperty::date_time())
        .property("updateTime", SchemaProperty::date_time())
        .property("archived", SchemaProperty::boolean())
        .property("programmatic", SchemaProperty::boolean())
        .property("trafficker", SchemaProperty::string())
        .property("advertiser", SchemaProperty::string())
        .property("agency", SchemaProperty::string())
        .property("currencyCode", SchemaProperty::string())
        .property("notes", SchemaProperty::string())
        .property("poNumber", SchemaProperty::string())
        .property("status", SchemaProperty::string())
        .property("salesperson", SchemaProperty::string())
        .property("secondarySalespeople", string_list())
        .property("secondaryTraffickers", string_list())
        .property("appliedLabels", string_list())
        .property("effectiveTeams", string_list())
        .property("customFieldValues", SchemaProperty::array(custom_field_value))
}

/// Placements listing records
pub fn placements_schema() -> JsonSchema {
    JsonSchema::new()
        .property("name", SchemaProperty::string())
        .property("placementId", SchemaProperty::string())
        .property("displayName", SchemaProperty::string())
        .property("description", SchemaProperty::string())
        .property("targetingDescription", SchemaProperty::string())
        .property("adUnits", string_list())
        .property("status", SchemaProperty::string())
        .property("appliedTeams", string_list())
        .property("updateTime", SchemaProperty::date_time())
}

/// Report definition listing records
pub fn reports_schema() -> JsonSchema {
    JsonSchema::new()
        .property("name", SchemaProperty::string())
        .property("reportId", SchemaProperty::string())
        .property("displayName", SchemaProperty::string())
        .property("description", SchemaProperty::string())
        .property("dimensions", string_list())
        .property("metrics", string_list())
        .property(
            "filters",
            SchemaProperty::array(SchemaProperty::object(BTreeMap::new())),
        )
        .property("updateTime", SchemaProperty::date_time())
}

/// One record per completed report run
pub fn report_results_schema() -> JsonSchema {
    JsonSchema::new()
        .property("result_name", SchemaProperty::string())
        .property("report_id", SchemaProperty::string())
        .property("report_name", SchemaProperty::string())
        .property("run_time", SchemaProperty::date_time())
        .property(
            "rows",
            SchemaProperty::array(SchemaProperty::object(BTreeMap::new())),
        )
}
