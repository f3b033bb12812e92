// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Response data model
//!
//! Tree shape: namespace → application → group → resource kind → items.
//! JSON keys match what existing clients of the inspection API read.

use serde::Serialize;

use crate::kubernetes::{ApplicationMeta, ClusterObject};
use crate::profile::ServiceProfile;

/// All applications of one namespace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceTree {
    pub namespace: String,
    #[serde(rename = "application")]
    pub applications: Vec<App>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct App {
    pub name: String,
    #[serde(rename = "group")]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(rename = "resource")]
    pub resources: Vec<Resource>,
}

/// Objects of one kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "list")]
    pub items: Vec<Item>,
}

/// A cluster object with its local service profile, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    #[serde(rename = "data")]
    pub metadata: ClusterObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<ServiceProfile>,
}

/// Every shape an inspection request can produce
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Trees(Vec<NamespaceTree>),
    Tree(NamespaceTree),
    Applications(Vec<ApplicationMeta>),
    Application(ApplicationMeta),
    Items(Vec<Item>),
    Item(Item),
}

impl Response {
    /// Short name of the variant, for logs
    pub fn shape(&self) -> &'static str {
        match self {
            Response::Trees(_) => "trees",
            Response::Tree(_) => "tree",
            Response::Applications(_) => "applications",
            Response::Application(_) => "application",
            Response::Items(_) => "items",
            Response::Item(_) => "item",
        }
    }
}
