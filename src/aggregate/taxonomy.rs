// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Display taxonomy of resource kinds
//!
//! A fixed partition of resource kinds into four groups. Every application
//! tree shows exactly these groups, in this order. Changing the partition is
//! a change to this table only.

/// One display group and the kinds it contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceGroup {
    pub name: &'static str,
    pub kinds: &'static [&'static str],
}

pub const RESOURCE_GROUPS: &[ResourceGroup] = &[
    ResourceGroup {
        name: "Workloads",
        kinds: &[
            "deployments",
            "statefulsets",
            "daemonsets",
            "jobs",
            "cronjobs",
            "pods",
        ],
    },
    ResourceGroup {
        name: "Networks",
        kinds: &["services", "endpoints", "ingresses", "networkpolicies"],
    },
    ResourceGroup {
        name: "Configurations",
        kinds: &[
            "configmaps",
            "secrets",
            "horizontalpodautoscalers",
            "resourcequotas",
            "poddisruptionbudgets",
        ],
    },
    ResourceGroup {
        name: "Storages",
        kinds: &[
            "persistentvolumes",
            "persistentvolumeclaims",
            "storageclasses",
        ],
    },
];

/// All kinds of the taxonomy, in display order
pub fn all_kinds() -> impl Iterator<Item = &'static str> {
    RESOURCE_GROUPS
        .iter()
        .flat_map(|group| group.kinds.iter().copied())
}
