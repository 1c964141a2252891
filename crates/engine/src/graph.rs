//! Dependency graph operations layered over [`IssueStore`]: edges live on
//! each [`Issue`], so this module is a second `impl IssueStore` block
//! rather than a separate owning type.

use crate::error::{Error, Result, ValidationKind};
use crate::store::IssueStore;
use beads_core::{Dependency, DependencyType, Status};
use rustc_hash::{FxHashMap, FxHashSet};

/// One chain of dependent issues reachable (directly or transitively)
/// from a given issue, in traversal order.
pub type Chain = Vec<String>;

impl IssueStore {
    /// Add a dependency edge. Rejects self-dependencies; for
    /// [`DependencyType::Blocks`]/[`DependencyType::ParentChild`],
    /// rejects an edge that would create a cycle in that subgraph.
    pub fn add_dependency(&mut self, dep: Dependency, now: i64) -> Result<()> {
        if dep.issue_id == dep.depends_on_id {
            return Err(Error::Validation(ValidationKind::Core(
                beads_core::ValidationKind::SelfDependency,
            )));
        }
        self.get(&dep.issue_id)?;
        self.get(&dep.depends_on_id)?;

        if dep.dep_type.participates_in_cycle_check()
            && self.would_create_cycle(&dep.issue_id, &dep.depends_on_id)
        {
            return Err(Error::CycleDetected {
                from: dep.issue_id,
                to: dep.depends_on_id,
                dep_type: dep.dep_type,
            });
        }

        let issue_id = dep.issue_id.clone();
        let issue = self.get_mut(&issue_id)?;
        issue.dependencies.push(dep);
        issue.updated_at = now;
        self.mark_dirty(&issue_id);
        Ok(())
    }

    /// Remove edges from `issue_id` to `depends_on_id`: every edge
    /// between the pair if `dep_type` is `None`, or only edges of that
    /// type. Returns the number of edges removed.
    pub fn remove_dependency(
        &mut self,
        issue_id: &str,
        depends_on_id: &str,
        dep_type: Option<DependencyType>,
        now: i64,
    ) -> Result<usize> {
        let issue = self.get_mut(issue_id)?;
        let before = issue.dependencies.len();
        issue.dependencies.retain(|d| {
            if d.depends_on_id != depends_on_id {
                return true;
            }
            match &dep_type {
                Some(t) => &d.dep_type != t,
                None => false,
            }
        });
        let removed = before - issue.dependencies.len();
        if removed > 0 {
            issue.updated_at = now;
            self.mark_dirty(issue_id);
        }
        Ok(removed)
    }

    /// Outgoing edges of `id`.
    pub fn dependencies_of(&self, id: &str) -> Result<&[Dependency]> {
        Ok(&self.get(id)?.dependencies)
    }

    /// Incoming edges naming `id` as their target, across every issue.
    pub fn dependents_of(&self, id: &str) -> Vec<&Dependency> {
        self.all()
            .iter()
            .flat_map(|i| i.dependencies.iter())
            .filter(|d| d.depends_on_id == id)
            .collect()
    }

    /// `true` if adding an edge `from -> to` would close a cycle in the
    /// `blocks`/`parent_child` subgraph — i.e. `to` can already reach
    /// `from`.
    pub fn would_create_cycle(&self, from: &str, to: &str) -> bool {
        self.reaches_via_cycle_edges(to, from)
    }

    fn reaches_via_cycle_edges(&self, start: &str, target: &str) -> bool {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Ok(deps) = self.dependencies_of(id) {
                for dep in deps.iter().filter(|d| d.dep_type.participates_in_cycle_check()) {
                    stack.push(dep.depends_on_id.as_str());
                }
            }
        }
        false
    }

    /// Detect cycles in the `blocks`/`parent_child` subgraph via a
    /// three-colour DFS. Returns at least one simple cycle per strongly
    /// connected component of size greater than one; it is not a
    /// complete enumeration of every simple cycle.
    pub fn detect_cycles(&self) -> Vec<Chain> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: FxHashMap<&str, Color> =
            self.all().iter().map(|i| (i.id.as_str(), Color::White)).collect();
        let mut path: Vec<&str> = Vec::new();
        let mut cycles = Vec::new();

        fn visit<'a>(
            store: &'a IssueStore,
            id: &'a str,
            color: &mut FxHashMap<&'a str, Color>,
            path: &mut Vec<&'a str>,
            cycles: &mut Vec<Chain>,
        ) {
            color.insert(id, Color::Gray);
            path.push(id);
            if let Ok(deps) = store.dependencies_of(id) {
                for dep in deps.iter().filter(|d| d.dep_type.participates_in_cycle_check()) {
                    let next = dep.depends_on_id.as_str();
                    match color.get(next).copied() {
                        Some(Color::White) => visit(store, next, color, path, cycles),
                        Some(Color::Gray) => {
                            if let Some(start) = path.iter().position(|&n| n == next) {
                                let mut cycle: Chain =
                                    path[start..].iter().map(|s| s.to_string()).collect();
                                cycle.push(next.to_string());
                                cycles.push(cycle);
                            }
                        }
                        _ => {}
                    }
                }
            }
            path.pop();
            color.insert(id, Color::Black);
        }

        let mut ids: Vec<&str> = self.all().iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        for id in ids {
            if color.get(id).copied() == Some(Color::White) {
                visit(self, id, &mut color, &mut path, &mut cycles);
            }
        }
        cycles
    }

    /// Open, non-tombstoned, non-deferred issues with no outstanding
    /// blocking dependency, ordered by priority ascending, then
    /// transitive-dependent count descending, then `created_at`
    /// ascending.
    pub fn ready_issues(&self, now: i64) -> Vec<&beads_core::Issue> {
        let mut ready: Vec<&beads_core::Issue> = self
            .all()
            .iter()
            .filter(|i| i.status.is_open())
            .filter(|i| i.defer_until.map_or(true, |t| t <= now))
            .filter(|i| !self.has_outstanding_dependency(i))
            .collect();

        ready.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| self.impact(&b.id).1.cmp(&self.impact(&a.id).1))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        ready
    }

    /// Open issues with at least one outstanding blocking dependency.
    pub fn blocked_issues(&self) -> Vec<&beads_core::Issue> {
        self.all()
            .iter()
            .filter(|i| i.status.is_open())
            .filter(|i| self.has_outstanding_dependency(i))
            .collect()
    }

    fn has_outstanding_dependency(&self, issue: &beads_core::Issue) -> bool {
        issue.dependencies.iter().any(|dep| {
            if !dep.dep_type.is_blocking() {
                return false;
            }
            match self.get(&dep.depends_on_id) {
                Ok(target) => !target.status.is_terminal(),
                Err(_) => false,
            }
        })
    }

    /// Longest chain in the DAG induced by `blocks`/`parent_child` edges
    /// restricted to open issues. Undefined (may loop or return an
    /// arbitrary chain) if that induced graph is not acyclic — callers
    /// must confirm acyclicity with [`IssueStore::detect_cycles`] first.
    pub fn critical_path(&self) -> Chain {
        let mut open_ids: Vec<String> = self
            .all()
            .iter()
            .filter(|i| i.status.is_open())
            .map(|i| i.id.clone())
            .collect();
        open_ids.sort();
        let open_set: FxHashSet<&str> = open_ids.iter().map(|s| s.as_str()).collect();

        let mut adj: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for id in &open_ids {
            let mut targets: Vec<String> = self
                .dependencies_of(id)
                .map(|deps| {
                    deps.iter()
                        .filter(|d| d.dep_type.participates_in_cycle_check())
                        .map(|d| d.depends_on_id.clone())
                        .filter(|t| open_set.contains(t.as_str()))
                        .collect()
                })
                .unwrap_or_default();
            targets.sort();
            adj.insert(id.clone(), targets);
        }

        fn dfs_postorder(
            id: &str,
            adj: &FxHashMap<String, Vec<String>>,
            visited: &mut FxHashSet<String>,
            order: &mut Vec<String>,
        ) {
            if !visited.insert(id.to_string()) {
                return;
            }
            for next in &adj[id] {
                dfs_postorder(next, adj, visited, order);
            }
            order.push(id.to_string());
        }

        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut order: Vec<String> = Vec::new();
        for id in &open_ids {
            dfs_postorder(id, &adj, &mut visited, &mut order);
        }

        // `order` visits every dependency before its dependents, so the
        // longest chain from each node is known by the time we reach it.
        let mut longest_from: FxHashMap<String, Chain> = FxHashMap::default();
        for id in &order {
            let mut best: Chain = vec![id.clone()];
            for next in &adj[id] {
                let mut candidate = vec![id.clone()];
                candidate.extend(longest_from[next].clone());
                if candidate.len() > best.len() || (candidate.len() == best.len() && candidate < best) {
                    best = candidate;
                }
            }
            longest_from.insert(id.clone(), best);
        }

        longest_from
            .into_values()
            .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .unwrap_or_default()
    }

    /// Kahn-style layering of the DAG induced by `blocks`/`parent_child`
    /// edges on open issues into parallel execution phases. Ties within
    /// a phase are broken by ascending id.
    pub fn phases(&self) -> Vec<Vec<String>> {
        let open_ids: Vec<String> = {
            let mut v: Vec<String> = self
                .all()
                .iter()
                .filter(|i| i.status.is_open())
                .map(|i| i.id.clone())
                .collect();
            v.sort();
            v
        };
        let open_set: FxHashSet<&str> = open_ids.iter().map(|s| s.as_str()).collect();

        // edge direction for layering: a node's phase must come after
        // every node it depends on, so in-degree counts dependencies
        // (outgoing `blocks`/`parent_child` edges), not dependents.
        let mut remaining_deps: FxHashMap<&str, FxHashSet<&str>> = FxHashMap::default();
        for id in &open_ids {
            let deps: FxHashSet<&str> = self
                .dependencies_of(id)
                .map(|deps| {
                    deps.iter()
                        .filter(|d| d.dep_type.participates_in_cycle_check())
                        .map(|d| d.depends_on_id.as_str())
                        .filter(|t| open_set.contains(t))
                        .collect()
                })
                .unwrap_or_default();
            remaining_deps.insert(id.as_str(), deps);
        }

        let mut placed: FxHashSet<&str> = FxHashSet::default();
        let mut phases = Vec::new();
        while placed.len() < open_ids.len() {
            let mut layer: Vec<&str> = open_ids
                .iter()
                .map(|s| s.as_str())
                .filter(|id| !placed.contains(id))
                .filter(|id| remaining_deps[id].iter().all(|d| placed.contains(d)))
                .collect();
            if layer.is_empty() {
                // A cycle slipped through; emit everything left as one
                // final phase rather than looping forever.
                layer = open_ids.iter().map(|s| s.as_str()).filter(|id| !placed.contains(id)).collect();
            }
            layer.sort_unstable();
            for id in &layer {
                placed.insert(id);
            }
            phases.push(layer.into_iter().map(|s| s.to_string()).collect());
        }
        phases
    }

    /// Direct dependent count and transitive reachable dependent count
    /// of `id`.
    pub fn impact(&self, id: &str) -> (usize, usize) {
        let direct = self.dependents_of(id).len();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut stack: Vec<String> = self.dependents_of(id).into_iter().map(|d| d.issue_id.clone()).collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next.clone()) {
                stack.extend(self.dependents_of(&next).into_iter().map(|d| d.issue_id.clone()));
            }
        }
        (direct, seen.len())
    }

    fn mark_dirty(&mut self, id: &str) {
        self.touch_dirty(id);
    }
}
