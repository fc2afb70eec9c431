//! Module dependency resolution
//!
//! Cascades disablement through missing or disabled dependencies until
//! nothing changes, then orders the survivors so every module comes after
//! all of its dependencies. Modules caught in a dependency cycle are
//! disabled rather than failing startup.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use crate::module::registry::discovery::{DiscoveredModule, DiscoveredSet};

/// Why a module ended up disabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisableReason {
    /// `enabled = false` in the module's own manifest
    DisabledInManifest,
    /// Turned off by host configuration
    DisabledByConfig,
    /// A declared dependency does not exist
    MissingDependency(String),
    /// A declared dependency exists but is disabled
    DisabledDependency(String),
    /// The module sits on a dependency cycle with the listed modules
    DependencyCycle(Vec<String>),
}

impl fmt::Display for DisableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisableReason::DisabledInManifest => f.write_str("disabled in manifest"),
            DisableReason::DisabledByConfig => f.write_str("disabled by configuration"),
            DisableReason::MissingDependency(dep) => {
                write!(f, "depends on module '{}', which does not exist", dep)
            }
            DisableReason::DisabledDependency(dep) => {
                write!(f, "depends on module '{}', which is disabled", dep)
            }
            DisableReason::DependencyCycle(members) => {
                write!(f, "dependency cycle between {}", members.join(", "))
            }
        }
    }
}

/// A node in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub enabled: bool,
    pub depends: Vec<String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, depends: &[&str]) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            depends: depends.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Outcome of resolving a [`DependencyGraph`], expressed as node indices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphResolution {
    /// Enabled nodes in load order
    pub order: Vec<usize>,
    /// Disabled nodes, in discovery order, with the reason
    pub disabled: Vec<(usize, DisableReason)>,
}

/// Dependency graph over discovered modules
///
/// Node indices are discovery positions; ties in the load order are broken
/// by discovery position so unrelated modules keep their relative order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<GraphNode>,
    force_disabled: HashMap<usize, DisableReason>,
}

impl DependencyGraph {
    pub fn new(nodes: Vec<GraphNode>) -> Self {
        Self {
            nodes,
            force_disabled: HashMap::new(),
        }
    }

    /// Disable a node up front with the given reason
    pub fn force_disable(&mut self, index: usize, reason: DisableReason) {
        self.force_disabled.insert(index, reason);
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Resolve the graph
    pub fn resolve(&self) -> GraphResolution {
        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut reasons: Vec<Option<DisableReason>> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                if let Some(reason) = self.force_disabled.get(&i) {
                    Some(reason.clone())
                } else if !node.enabled {
                    Some(DisableReason::DisabledInManifest)
                } else {
                    None
                }
            })
            .collect();

        self.cascade(&index, &mut reasons);

        let (order, leftover) = self.topological_order(&index, &reasons);

        if !leftover.is_empty() {
            self.disable_cycles(&index, &leftover, &mut reasons);
        }

        let disabled = reasons
            .into_iter()
            .enumerate()
            .filter_map(|(i, r)| r.map(|r| (i, r)))
            .collect();

        GraphResolution { order, disabled }
    }

    /// Disable every module with an unavailable dependency, repeating until
    /// a full pass changes nothing
    fn cascade(&self, index: &HashMap<&str, usize>, reasons: &mut [Option<DisableReason>]) {
        let mut changed = true;
        let mut passes = 0usize;
        while changed {
            changed = false;
            passes += 1;
            for (i, node) in self.nodes.iter().enumerate() {
                if reasons[i].is_some() {
                    continue;
                }
                for dep in &node.depends {
                    let reason = match index.get(dep.as_str()) {
                        None => Some(DisableReason::MissingDependency(dep.clone())),
                        Some(&j) if reasons[j].is_some() => {
                            Some(DisableReason::DisabledDependency(dep.clone()))
                        }
                        Some(_) => None,
                    };
                    if let Some(reason) = reason {
                        warn!(
                            "Module '{}' depends on module '{}', which is not available. Disabling module.",
                            node.id, dep
                        );
                        reasons[i] = Some(reason);
                        changed = true;
                        break;
                    }
                }
            }
        }
        debug!("Dependency cascade settled after {} passes", passes);
    }

    /// Kahn's algorithm over enabled nodes; returns the order and the nodes
    /// that could not be placed
    fn topological_order(
        &self,
        index: &HashMap<&str, usize>,
        reasons: &[Option<DisableReason>],
    ) -> (Vec<usize>, Vec<usize>) {
        let enabled: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| reasons[i].is_none())
            .collect();

        let mut in_degree: HashMap<usize, usize> = HashMap::new();
        let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();

        for &i in &enabled {
            let deps: BTreeSet<usize> = self.nodes[i]
                .depends
                .iter()
                .filter_map(|d| index.get(d.as_str()).copied())
                .collect();
            in_degree.insert(i, deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(i);
            }
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(enabled.len());

        while let Some(next) = ready.pop_first() {
            order.push(next);
            if let Some(children) = dependents.get(&next) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(*child);
                        }
                    }
                }
            }
        }

        let placed: HashSet<usize> = order.iter().copied().collect();
        let leftover = enabled.into_iter().filter(|i| !placed.contains(i)).collect();
        (order, leftover)
    }

    /// Disable nodes left over by the topological sort. Nodes that can reach
    /// themselves are cycle members; the rest only depend on one.
    fn disable_cycles(
        &self,
        index: &HashMap<&str, usize>,
        leftover: &[usize],
        reasons: &mut [Option<DisableReason>],
    ) {
        let pending: HashSet<usize> = leftover.iter().copied().collect();
        let members: Vec<usize> = leftover
            .iter()
            .copied()
            .filter(|&i| self.reaches(index, &pending, i, i))
            .collect();
        let member_ids: Vec<String> = members.iter().map(|&i| self.nodes[i].id.clone()).collect();

        if !members.is_empty() {
            warn!(
                "Dependency cycle detected between modules {:?}. Disabling them.",
                member_ids
            );
        }

        for &i in leftover {
            let reason = if members.contains(&i) {
                DisableReason::DependencyCycle(member_ids.clone())
            } else {
                let dep = self.nodes[i]
                    .depends
                    .iter()
                    .find(|d| {
                        index
                            .get(d.as_str())
                            .map_or(false, |j| pending.contains(j))
                    })
                    .cloned()
                    .unwrap_or_default();
                warn!(
                    "Module '{}' depends on module '{}', which is not available. Disabling module.",
                    self.nodes[i].id, dep
                );
                DisableReason::DisabledDependency(dep)
            };
            reasons[i] = Some(reason);
        }
    }

    /// Whether `target` is reachable from `from` through dependency edges
    /// restricted to `within`
    fn reaches(
        &self,
        index: &HashMap<&str, usize>,
        within: &HashSet<usize>,
        from: usize,
        target: usize,
    ) -> bool {
        let mut stack: Vec<usize> = vec![from];
        let mut seen: HashSet<usize> = HashSet::new();
        while let Some(current) = stack.pop() {
            for dep in &self.nodes[current].depends {
                let Some(&j) = index.get(dep.as_str()) else {
                    continue;
                };
                if !within.contains(&j) {
                    continue;
                }
                if j == target {
                    return true;
                }
                if seen.insert(j) {
                    stack.push(j);
                }
            }
        }
        false
    }
}

/// A module that did not make it into the load order
#[derive(Debug)]
pub struct DisabledModule {
    pub module: DiscoveredModule,
    pub reason: DisableReason,
}

impl DisabledModule {
    pub fn id(&self) -> &str {
        self.module.id()
    }
}

/// Dependency resolution result
#[derive(Debug, Default)]
pub struct DependencyResolution {
    /// Enabled modules in load order (dependencies first)
    pub modules: Vec<DiscoveredModule>,
    /// Disabled modules with `enabled` cleared, in discovery order
    pub disabled: Vec<DisabledModule>,
}

impl DependencyResolution {
    /// Ids in load order
    pub fn load_order(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id()).collect()
    }

    /// Reason a module was disabled, if it was
    pub fn disabled_reason(&self, id: &str) -> Option<&DisableReason> {
        self.disabled
            .iter()
            .find(|d| d.id() == id)
            .map(|d| &d.reason)
    }
}

/// Up-front overrides applied before the cascade
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Ids to disable regardless of their manifest
    pub force_disabled: HashSet<String>,
    /// When set, only these ids may stay enabled
    pub only: Option<HashSet<String>>,
}

/// Dependency resolver
pub struct ModuleDependencies;

impl ModuleDependencies {
    /// Resolve module dependencies and determine load order
    pub fn resolve(discovered: DiscoveredSet) -> DependencyResolution {
        Self::resolve_with(discovered, &ResolveOptions::default())
    }

    /// Resolve with configuration overrides
    pub fn resolve_with(discovered: DiscoveredSet, options: &ResolveOptions) -> DependencyResolution {
        let nodes: Vec<GraphNode> = discovered
            .modules
            .iter()
            .map(|m| GraphNode {
                id: m.id().to_string(),
                enabled: m.descriptor.enabled(),
                depends: m.descriptor.depends().to_vec(),
            })
            .collect();

        let mut graph = DependencyGraph::new(nodes);
        for (i, node) in graph.nodes().to_vec().iter().enumerate() {
            let excluded = options
                .only
                .as_ref()
                .map_or(false, |only| !only.contains(&node.id));
            if options.force_disabled.contains(&node.id) || excluded {
                info!("Module '{}' disabled by configuration", node.id);
                graph.force_disable(i, DisableReason::DisabledByConfig);
            }
        }

        let plan = graph.resolve();

        let mut slots: Vec<Option<DiscoveredModule>> =
            discovered.modules.into_iter().map(Some).collect();

        let modules: Vec<DiscoveredModule> = plan
            .order
            .iter()
            .filter_map(|&i| slots[i].take())
            .collect();

        let disabled: Vec<DisabledModule> = plan
            .disabled
            .into_iter()
            .filter_map(|(i, reason)| {
                slots[i].take().map(|mut module| {
                    module.descriptor.manifest.enabled = false;
                    DisabledModule { module, reason }
                })
            })
            .collect();

        let resolution = DependencyResolution { modules, disabled };
        info!(
            "Dependency resolution complete: load order {:?}, {} disabled",
            resolution.load_order(),
            resolution.disabled.len()
        );
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(graph: &DependencyGraph, indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| graph.nodes()[i].id.clone()).collect()
    }

    #[test]
    fn missing_dependency_disables_dependent() {
        let graph = DependencyGraph::new(vec![
            GraphNode::new("a", &[]),
            GraphNode::new("b", &["a"]),
            GraphNode::new("c", &["z"]),
        ]);
        let plan = graph.resolve();

        assert_eq!(ids(&graph, &plan.order), vec!["a", "b"]);
        assert_eq!(
            plan.disabled,
            vec![(2, DisableReason::MissingDependency("z".to_string()))]
        );
    }

    #[test]
    fn cascade_reaches_fixpoint() {
        // d is listed before the module it depends on, so a single pass in
        // discovery order would miss it
        let graph = DependencyGraph::new(vec![
            GraphNode::new("d", &["c"]),
            GraphNode::new("c", &["b"]),
            GraphNode::new("b", &["missing"]),
            GraphNode::new("a", &[]),
        ]);
        let plan = graph.resolve();

        assert_eq!(ids(&graph, &plan.order), vec!["a"]);
        let disabled: Vec<&str> = plan
            .disabled
            .iter()
            .map(|(i, _)| graph.nodes()[*i].id.as_str())
            .collect();
        assert_eq!(disabled, vec!["d", "c", "b"]);
    }

    #[test]
    fn transitive_chain_is_ordered() {
        let graph = DependencyGraph::new(vec![
            GraphNode::new("top", &["mid"]),
            GraphNode::new("mid", &["base"]),
            GraphNode::new("base", &[]),
        ]);
        let plan = graph.resolve();
        assert_eq!(ids(&graph, &plan.order), vec!["base", "mid", "top"]);
    }

    #[test]
    fn unrelated_modules_keep_discovery_order() {
        let graph = DependencyGraph::new(vec![
            GraphNode::new("x", &[]),
            GraphNode::new("y", &[]),
            GraphNode::new("z", &[]),
        ]);
        assert_eq!(ids(&graph, &graph.resolve().order), vec!["x", "y", "z"]);
    }

    #[test]
    fn cycle_members_and_dependents_are_disabled() {
        let graph = DependencyGraph::new(vec![
            GraphNode::new("a", &["b"]),
            GraphNode::new("b", &["a"]),
            GraphNode::new("c", &["a"]),
            GraphNode::new("d", &[]),
        ]);
        let plan = graph.resolve();

        assert_eq!(ids(&graph, &plan.order), vec!["d"]);
        let cycle = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            plan.disabled,
            vec![
                (0, DisableReason::DependencyCycle(cycle.clone())),
                (1, DisableReason::DependencyCycle(cycle)),
                (2, DisableReason::DisabledDependency("a".to_string())),
            ]
        );
    }

    #[test]
    fn manifest_and_forced_disablement_cascade() {
        let mut graph = DependencyGraph::new(vec![
            GraphNode {
                id: "off".to_string(),
                enabled: false,
                depends: vec![],
            },
            GraphNode::new("needs-off", &["off"]),
            GraphNode::new("forced", &[]),
            GraphNode::new("needs-forced", &["forced"]),
        ]);
        graph.force_disable(2, DisableReason::DisabledByConfig);
        let plan = graph.resolve();

        assert!(plan.order.is_empty());
        assert_eq!(plan.disabled[0].1, DisableReason::DisabledInManifest);
        assert_eq!(
            plan.disabled[1].1,
            DisableReason::DisabledDependency("off".to_string())
        );
        assert_eq!(plan.disabled[2].1, DisableReason::DisabledByConfig);
        assert_eq!(
            plan.disabled[3].1,
            DisableReason::DisabledDependency("forced".to_string())
        );
    }

    #[test]
    fn duplicate_dependency_entries_count_once() {
        let graph = DependencyGraph::new(vec![
            GraphNode::new("app", &["base", "base"]),
            GraphNode::new("base", &[]),
        ]);
        assert_eq!(ids(&graph, &graph.resolve().order), vec!["base", "app"]);
    }
}
