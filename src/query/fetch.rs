use std::fmt::Write as _;

use super::{FilterGroup, FilterKind, FilterNode, QueryTemplate};

/// Renders a template as a single-line FetchXML document.
pub fn render_fetch_xml(template: &QueryTemplate) -> String {
    let mut out = String::with_capacity(256);
    let _ = write!(out, r#"<fetch><entity name="{}">"#, escape(&template.entity));
    for attribute in &template.attributes {
        let _ = write!(out, r#"<attribute name="{}"/>"#, escape(attribute));
    }
    for order in &template.orders {
        let _ = write!(
            out,
            r#"<order attribute="{}" descending="{}"/>"#,
            escape(&order.attribute),
            order.descending
        );
    }
    if let Some(filter) = &template.filter {
        write_filter(&mut out, filter);
    }
    out.push_str("</entity></fetch>");
    out
}

fn write_filter(out: &mut String, group: &FilterGroup) {
    let kind = match group.kind {
        FilterKind::And => "and",
        FilterKind::Or => "or",
    };
    let _ = write!(out, r#"<filter type="{kind}">"#);
    for node in &group.children {
        match node {
            FilterNode::Condition(condition) => {
                let _ = write!(
                    out,
                    r#"<condition attribute="{}" operator="{}""#,
                    escape(&condition.attribute),
                    condition.operator.as_str()
                );
                if let Some(value) = &condition.value {
                    let _ = write!(out, r#" value="{}""#, escape(&value.as_text()));
                }
                out.push_str("/>");
            }
            FilterNode::Filter(nested) => write_filter(out, nested),
        }
    }
    out.push_str("</filter>");
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{build_note_query, build_remote_query, Condition, OrderBy};

    #[test]
    fn renders_custom_location_listing() {
        let mut query = build_remote_query("Reports", "loc-1", "Docs", false).template;
        query.attributes.truncate(2);
        insta::assert_snapshot!(render_fetch_xml(&query), @r#"<fetch><entity name="sharepointdocument"><attribute name="sharepointdocumentid"/><attribute name="fullname"/><order attribute="relativelocation" descending="false"/><filter type="and"><condition attribute="isrecursivefetch" operator="eq" value="false"/><condition attribute="relativelocation" operator="eq" value="Reports"/></filter></entity></fetch>"#);
    }

    #[test]
    fn renders_view_with_injected_owner() {
        let mut view = QueryTemplate::new("annotation");
        view.attributes = vec!["filename".into()];
        view.orders = vec![OrderBy::ascending("filename")];
        view.filter = Some(FilterGroup::and([Condition::eq("mimetype", "a&b")]));
        let query = build_note_query("rec-1", Some(&view));
        insta::assert_snapshot!(render_fetch_xml(&query), @r#"<fetch><entity name="annotation"><attribute name="filename"/><order attribute="filename" descending="false"/><filter type="and"><condition attribute="objectid" operator="eq" value="rec-1"/><condition attribute="mimetype" operator="eq" value="a&amp;b"/></filter></entity></fetch>"#);
    }
}
