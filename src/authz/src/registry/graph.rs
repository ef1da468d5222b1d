//! Role inheritance graph with Kahn's algorithm for topological ordering
//!
//! Used once, while the registry is built, to:
//! 1. Reject references to undefined parent roles
//! 2. Detect inheritance cycles and report the full cycle path
//! 3. Provide a parents-before-children ordering of the catalog

use super::types::Role;
use crate::error::ConfigError;
use std::collections::{HashMap, VecDeque};

/// DFS colouring for cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Inheritance graph keyed by role id
///
/// Edges point from a role to the parents it inherits from.
#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    /// role -> parents, in declared order
    parents: HashMap<String, Vec<String>>,

    /// Role ids in catalog order, for deterministic traversal
    order: Vec<String>,
}

impl InheritanceGraph {
    /// Build and validate the graph for a catalog
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicateRole`] when two roles share an id
    /// - [`ConfigError::UndefinedParent`] for a dangling `inherits_from`
    /// - [`ConfigError::CircularInheritance`] when the graph has a cycle
    pub fn build(roles: &[Role]) -> Result<Self, ConfigError> {
        let mut graph = Self::default();

        for role in roles {
            if graph.parents.contains_key(&role.id) {
                return Err(ConfigError::DuplicateRole(role.id.clone()));
            }
            graph.parents.insert(role.id.clone(), role.inherits_from.clone());
            graph.order.push(role.id.clone());
        }

        for role in roles {
            for parent in &role.inherits_from {
                if !graph.parents.contains_key(parent) {
                    return Err(ConfigError::UndefinedParent {
                        role: role.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        graph.detect_cycle()?;

        Ok(graph)
    }

    /// Parents-before-children ordering (Kahn's algorithm)
    ///
    /// 1. In-degree of a role = number of parents
    /// 2. Seed the queue with roles that inherit nothing
    /// 3. Pop a role, emit it, decrement each child's in-degree
    /// 4. Fewer emitted roles than nodes means a cycle
    pub fn topological_order(&self) -> Result<Vec<String>, ConfigError> {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();

        for id in &self.order {
            let parents = &self.parents[id];
            in_degree.insert(id, parents.len());
            for parent in parents {
                children.entry(parent.as_str()).or_default().push(id);
            }
        }

        let mut queue: VecDeque<&str> = self
            .order
            .iter()
            .map(String::as_str)
            .filter(|id| in_degree[id] == 0)
            .collect();

        let mut sorted = Vec::with_capacity(self.order.len());

        while let Some(current) = queue.pop_front() {
            sorted.push(current.to_string());

            if let Some(dependents) = children.get(current) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        if sorted.len() != self.order.len() {
            self.detect_cycle()?;
            return Err(ConfigError::CircularInheritance(
                "Unknown cycle detected".to_string(),
            ));
        }

        Ok(sorted)
    }

    /// Depth-first search for the first cycle
    ///
    /// A cycle exists when the search reaches a role that is still on the
    /// current DFS path.
    pub fn detect_cycle(&self) -> Result<(), ConfigError> {
        let mut state: HashMap<&str, Visit> = self
            .order
            .iter()
            .map(|id| (id.as_str(), Visit::Unvisited))
            .collect();

        for start in &self.order {
            if state[start.as_str()] == Visit::Unvisited {
                let mut path = Vec::new();
                self.visit(start, &mut state, &mut path)?;
            }
        }

        Ok(())
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        state: &mut HashMap<&'a str, Visit>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), ConfigError> {
        match state.get(node) {
            Some(Visit::InProgress) => {
                let start = path.iter().position(|n| *n == node).unwrap_or(0);
                let cycle: Vec<&str> = path[start..]
                    .iter()
                    .copied()
                    .chain(std::iter::once(node))
                    .collect();
                return Err(ConfigError::CircularInheritance(cycle.join(" -> ")));
            }
            Some(Visit::Done) => return Ok(()),
            _ => {}
        }

        state.insert(node, Visit::InProgress);
        path.push(node);

        if let Some(parents) = self.parents.get(node) {
            for parent in parents {
                self.visit(parent, state, path)?;
            }
        }

        state.insert(node, Visit::Done);
        path.pop();

        Ok(())
    }
}
