use std::borrow::Cow;

use comfy_table::{Table, presets::ASCII_BORDERS_ONLY_CONDENSED};

use crate::aggregate::{Item, NamespaceTree, Response};
use crate::kubernetes::ApplicationMeta;

/// Maximum width for name columns
const MAX_NAME_WIDTH: usize = 60;

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(response: Option<&Response>) -> String {
        let (header, rows): (&[&str], Vec<Vec<String>>) = match response {
            None => return "(no resources)".to_string(),
            Some(Response::Items(items)) => (ITEM_HEADER, items.iter().map(item_row).collect()),
            Some(Response::Item(item)) => (ITEM_HEADER, vec![item_row(item)]),
            Some(Response::Applications(metas)) => {
                (APPLICATION_HEADER, metas.iter().map(application_row).collect())
            }
            Some(Response::Application(meta)) => (APPLICATION_HEADER, vec![application_row(meta)]),
            Some(Response::Trees(trees)) => (TREE_HEADER, trees.iter().flat_map(tree_rows).collect()),
            Some(Response::Tree(tree)) => (TREE_HEADER, tree_rows(tree)),
        };

        if rows.is_empty() {
            return "(0 rows)".to_string();
        }

        let mut table = Table::new();
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);
        table.set_header(header);
        let count = rows.len();
        for row in rows {
            table.add_row(row);
        }

        format!("{}\n({} rows)", table, count)
    }
}

const ITEM_HEADER: &[&str] = &["NAME", "NAMESPACE", "KIND", "CREATED", "DEVELOPING"];
const APPLICATION_HEADER: &[&str] = &["NAME", "NAMESPACE", "TYPE", "STATE"];
const TREE_HEADER: &[&str] = &["NAMESPACE", "APPLICATION", "GROUP", "RESOURCE", "COUNT"];

fn item_row(item: &Item) -> Vec<String> {
    let obj = &item.metadata;
    vec![
        truncate_value(obj.name(), MAX_NAME_WIDTH).into_owned(),
        obj.namespace().unwrap_or("-").to_string(),
        obj.kind().to_string(),
        obj.creation_timestamp()
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string()),
        match &item.description {
            Some(profile) if profile.developing => "yes".to_string(),
            Some(_) => "no".to_string(),
            None => "-".to_string(),
        },
    ]
}

fn application_row(meta: &ApplicationMeta) -> Vec<String> {
    vec![
        truncate_value(&meta.application, MAX_NAME_WIDTH).into_owned(),
        meta.namespace.clone(),
        meta.application_type.clone(),
        format!("{:?}", meta.application_state),
    ]
}

fn tree_rows(tree: &NamespaceTree) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for app in &tree.applications {
        for group in &app.groups {
            for resource in &group.resources {
                rows.push(vec![
                    tree.namespace.clone(),
                    app.name.clone(),
                    group.name.clone(),
                    resource.name.clone(),
                    resource.items.len().to_string(),
                ]);
            }
        }
    }
    rows
}
