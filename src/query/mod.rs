use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::model::RecordMetadata;

mod eval;
mod fetch;

pub use eval::sort_by_orders;
pub use fetch::render_fetch_xml;

pub const NOTE_ENTITY: &str = "annotation";
pub const REMOTE_ENTITY: &str = "sharepointdocument";

/// Attribute binding an annotation to its owning record.
pub const NOTE_OWNER_ATTRIBUTE: &str = "objectid";
pub const NOTE_CREATED_ATTRIBUTE: &str = "createdon";

pub const REMOTE_PATH_ATTRIBUTE: &str = "relativelocation";
pub const REMOTE_LOCATION_ID_ATTRIBUTE: &str = "locationid";
pub const REMOTE_LOCATION_NAME_ATTRIBUTE: &str = "locationname";
pub const REMOTE_SERVICE_TYPE_ATTRIBUTE: &str = "servicetype";
pub const REMOTE_RECURSIVE_ATTRIBUTE: &str = "isrecursivefetch";

pub const DIRECT_SERVICE_TYPE: i64 = 0;

const ACTIVITY_ENTITY: &str = "activitypointer";
const ACTIVITY_ID_ATTRIBUTE: &str = "activityid";
const ACTIVITY_COLLECTION: &str = "activitypointers";

const NOTE_ATTRIBUTES: &[&str] = &[
    "annotationid",
    "filename",
    "filesize",
    "mimetype",
    "documentbody",
    "createdon",
    "subject",
    "notetext",
];

const REMOTE_ATTRIBUTES: &[&str] = &[
    "sharepointdocumentid",
    "fullname",
    "relativelocation",
    "isfolder",
    "filesize",
    "filetype",
    "sharepointcreatedon",
    "modified",
    "sharepointmodifiedby",
    "author",
    "absoluteurl",
    "readurl",
    "editurl",
    "locationid",
    "locationname",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ConditionValue {
    pub fn text(value: impl Into<String>) -> Self {
        ConditionValue::Text(value.into())
    }

    pub fn as_text(&self) -> String {
        match self {
            ConditionValue::Bool(value) => value.to_string(),
            ConditionValue::Int(value) => value.to_string(),
            ConditionValue::Text(value) => value.clone(),
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            ConditionValue::Bool(value) => Some(i64::from(*value)),
            ConditionValue::Int(value) => Some(*value),
            ConditionValue::Text(_) => None,
        }
    }

    pub fn loosely_eq(&self, other: &ConditionValue) -> bool {
        match (self, other) {
            (ConditionValue::Text(a), ConditionValue::Text(b)) => a.eq_ignore_ascii_case(b),
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    pub fn loose_cmp(&self, other: &ConditionValue) -> Ordering {
        match (self, other) {
            (ConditionValue::Text(a), ConditionValue::Text(b)) => {
                a.to_lowercase().cmp(&b.to_lowercase())
            }
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => a.as_text().cmp(&b.as_text()),
            },
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Text(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        ConditionValue::Text(value)
    }
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        ConditionValue::Bool(value)
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        ConditionValue::Int(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operator {
    Eq,
    Ne,
    Like,
    Null,
    NotNull,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Like => "like",
            Operator::Null => "null",
            Operator::NotNull => "not-null",
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<ConditionValue>,
}

impl Condition {
    pub fn eq(attribute: impl Into<String>, value: impl Into<ConditionValue>) -> Self {
        Self {
            attribute: attribute.into(),
            operator: Operator::Eq,
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterNode {
    Condition(Condition),
    Filter(FilterGroup),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default, rename = "type")]
    pub kind: FilterKind,
    #[serde(default)]
    pub children: Vec<FilterNode>,
}

impl FilterGroup {
    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self {
            kind: FilterKind::And,
            children: conditions.into_iter().map(FilterNode::Condition).collect(),
        }
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.children.iter().filter_map(|node| match node {
            FilterNode::Condition(condition) => Some(condition),
            FilterNode::Filter(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub attribute: String,
    #[serde(default)]
    pub descending: bool,
}

impl OrderBy {
    pub fn ascending(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: false,
        }
    }

    pub fn descending(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: true,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryTemplate {
    pub entity: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub filter: Option<FilterGroup>,
    #[serde(default)]
    pub orders: Vec<OrderBy>,
}

impl QueryTemplate {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|attr| attr.to_string()).collect();
        self
    }

    pub fn top_conditions(&self) -> Vec<&Condition> {
        self.filter
            .as_ref()
            .map(|filter| filter.conditions().collect())
            .unwrap_or_default()
    }

    pub fn condition_for(&self, attribute: &str) -> Option<&Condition> {
        self.top_conditions()
            .into_iter()
            .find(|condition| condition.attribute == attribute)
    }

    /// Binds the template to a record: the condition becomes the first child
    /// of the existing filter group, or the only child of a new one.
    pub fn inject_condition(&mut self, condition: Condition) {
        match self.filter.as_mut() {
            Some(group) => group.children.insert(0, FilterNode::Condition(condition)),
            None => self.filter = Some(FilterGroup::and([condition])),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteQuery {
    pub location_id: String,
    pub path: String,
    pub template: QueryTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLink {
    pub entity: String,
    pub id_attribute: String,
    pub collection_name: String,
    pub record_id: String,
}

impl RecordLink {
    pub fn bind_key(&self) -> String {
        format!("{NOTE_OWNER_ATTRIBUTE}_{}@odata.bind", self.entity)
    }

    pub fn bind_value(&self) -> String {
        format!("/{}({})", self.collection_name, self.record_id)
    }
}

pub fn record_link(record: &RecordMetadata) -> RecordLink {
    if record.is_activity() {
        RecordLink {
            entity: ACTIVITY_ENTITY.to_string(),
            id_attribute: ACTIVITY_ID_ATTRIBUTE.to_string(),
            collection_name: ACTIVITY_COLLECTION.to_string(),
            record_id: record.record_id.clone(),
        }
    } else {
        RecordLink {
            entity: record.record_type.clone(),
            id_attribute: format!("{}id", record.record_type),
            collection_name: record.collection_name.clone(),
            record_id: record.record_id.clone(),
        }
    }
}

pub fn build_remote_query(
    path: &str,
    location_id: &str,
    location_name: &str,
    is_default_site: bool,
) -> RemoteQuery {
    let mut conditions = vec![Condition::eq(REMOTE_RECURSIVE_ATTRIBUTE, false)];
    if is_default_site {
        conditions.push(Condition::eq(REMOTE_LOCATION_ID_ATTRIBUTE, location_id));
        conditions.push(Condition::eq(REMOTE_LOCATION_NAME_ATTRIBUTE, location_name));
        conditions.push(Condition::eq(
            REMOTE_SERVICE_TYPE_ATTRIBUTE,
            DIRECT_SERVICE_TYPE,
        ));
    }
    if !path.is_empty() {
        conditions.push(Condition::eq(REMOTE_PATH_ATTRIBUTE, path));
    }

    let mut template = QueryTemplate::new(REMOTE_ENTITY).with_attributes(REMOTE_ATTRIBUTES);
    template.filter = Some(FilterGroup::and(conditions));
    template.orders = vec![OrderBy::ascending(REMOTE_PATH_ATTRIBUTE)];

    RemoteQuery {
        location_id: location_id.to_string(),
        path: path.to_string(),
        template,
    }
}

pub fn build_note_query(record_id: &str, view: Option<&QueryTemplate>) -> QueryTemplate {
    let owner = Condition::eq(NOTE_OWNER_ATTRIBUTE, record_id);
    match view {
        Some(template) => {
            let mut template = template.clone();
            template.inject_condition(owner);
            template
        }
        None => {
            let mut template = QueryTemplate::new(NOTE_ENTITY).with_attributes(NOTE_ATTRIBUTES);
            template.filter = Some(FilterGroup::and([owner]));
            template.orders = vec![OrderBy::descending(NOTE_CREATED_ATTRIBUTE)];
            template
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(record_type: &str) -> RecordMetadata {
        RecordMetadata {
            record_type: record_type.into(),
            collection_name: format!("{record_type}s"),
            record_id: "rec-1".into(),
            base_url: "https://org.example".into(),
        }
    }

    #[test]
    fn custom_location_query_only_scopes_by_path() {
        let query = build_remote_query("Reports", "loc-1", "Docs", false);
        let attributes: Vec<_> = query
            .template
            .top_conditions()
            .into_iter()
            .map(|c| c.attribute.as_str())
            .collect();
        assert_eq!(attributes, vec![REMOTE_RECURSIVE_ATTRIBUTE, REMOTE_PATH_ATTRIBUTE]);
        assert_eq!(query.location_id, "loc-1");
    }

    #[test]
    fn custom_location_root_query_has_only_recursive_flag() {
        let query = build_remote_query("", "loc-1", "Docs", false);
        let conditions = query.template.top_conditions();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].attribute, REMOTE_RECURSIVE_ATTRIBUTE);
        assert_eq!(conditions[0].value, Some(ConditionValue::Bool(false)));
    }

    #[test]
    fn default_site_query_scopes_by_location_and_service_type() {
        let query = build_remote_query("Reports", "loc-1", "Docs", true);
        let template = &query.template;
        assert_eq!(
            template.condition_for(REMOTE_LOCATION_ID_ATTRIBUTE).unwrap().value,
            Some(ConditionValue::text("loc-1"))
        );
        assert_eq!(
            template.condition_for(REMOTE_LOCATION_NAME_ATTRIBUTE).unwrap().value,
            Some(ConditionValue::text("Docs"))
        );
        assert_eq!(
            template.condition_for(REMOTE_SERVICE_TYPE_ATTRIBUTE).unwrap().value,
            Some(ConditionValue::Int(DIRECT_SERVICE_TYPE))
        );
        assert_eq!(
            template.condition_for(REMOTE_PATH_ATTRIBUTE).unwrap().value,
            Some(ConditionValue::text("Reports"))
        );
        assert_eq!(template.orders, vec![OrderBy::ascending(REMOTE_PATH_ATTRIBUTE)]);
    }

    #[test]
    fn view_without_filter_gets_single_owner_group() {
        let view = QueryTemplate::new(NOTE_ENTITY);
        let query = build_note_query("rec-1", Some(&view));
        let filter = query.filter.expect("filter group");
        assert_eq!(filter.children.len(), 1);
        assert_eq!(
            filter.children[0],
            FilterNode::Condition(Condition::eq(NOTE_OWNER_ATTRIBUTE, "rec-1"))
        );
    }

    #[test]
    fn view_with_filter_gets_owner_as_first_child() {
        let mut view = QueryTemplate::new(NOTE_ENTITY);
        view.filter = Some(FilterGroup {
            kind: FilterKind::Or,
            children: vec![
                FilterNode::Condition(Condition::eq("mimetype", "application/pdf")),
                FilterNode::Condition(Condition::eq("mimetype", "image/png")),
            ],
        });
        let query = build_note_query("rec-1", Some(&view));
        let filter = query.filter.expect("filter group");
        assert_eq!(filter.kind, FilterKind::Or);
        assert_eq!(filter.children.len(), 3);
        assert_eq!(
            filter.children[0],
            FilterNode::Condition(Condition::eq(NOTE_OWNER_ATTRIBUTE, "rec-1"))
        );
    }

    #[test]
    fn default_note_query_orders_newest_first() {
        let query = build_note_query("rec-1", None);
        assert_eq!(query.entity, NOTE_ENTITY);
        assert_eq!(query.orders, vec![OrderBy::descending(NOTE_CREATED_ATTRIBUTE)]);
        assert!(query.attributes.iter().any(|attr| attr == "documentbody"));
        assert_eq!(query.top_conditions().len(), 1);
    }

    #[test]
    fn activity_records_link_through_activity_id() {
        let link = record_link(&record("email"));
        assert_eq!(link.id_attribute, "activityid");
        assert_eq!(link.bind_key(), "objectid_activitypointer@odata.bind");
        assert_eq!(link.bind_value(), "/activitypointers(rec-1)");

        let link = record_link(&record("account"));
        assert_eq!(link.id_attribute, "accountid");
        assert_eq!(link.bind_key(), "objectid_account@odata.bind");
        assert_eq!(link.bind_value(), "/accounts(rec-1)");
    }

    #[test]
    fn view_templates_deserialize_from_json() {
        let raw = r#"{
            "entity": "annotation",
            "attributes": ["filename"],
            "filter": {"type": "and", "children": [
                {"condition": {"attribute": "isdocument", "operator": "eq", "value": true}}
            ]},
            "orders": [{"attribute": "filename"}]
        }"#;
        let template: QueryTemplate = serde_json::from_str(raw).unwrap();
        assert_eq!(template.top_conditions().len(), 1);
        assert!(!template.orders[0].descending);
    }
}
