// Copyright (c) 2025 - Cowboy AI, Inc.
//! Dependency Resolution
//!
//! Orders stacks so that every stack comes after the stacks it depends on.
//!
//! # Algorithm
//!
//! Depth-first visit with two per-call marks: a *visiting* set (nodes on the
//! current recursion path) and a *done* set. Reaching a visiting node is a
//! cycle; reaching a done node is a no-op. A node is appended after all of
//! its dependencies, so the output is already in deployment order. Deletion
//! uses the reverse.
//!
//! The graph itself is never mutated by resolution, so a resolved graph can
//! be resolved again with the same result.

use std::collections::{HashMap, HashSet};

use crate::domain::StackDefinition;
use crate::errors::{DeployError, DeployResult};

/// Stack identifiers and their declared dependencies
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Declaration order, used to make resolution deterministic
    order: Vec<String>,
    depends_on: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from stack definitions
    ///
    /// Unlike [`DependencyGraph::add`], a repeated stack name is an error here
    /// since two definitions cannot both be deployed under one name.
    pub fn from_stacks<'a, I>(stacks: I) -> DeployResult<Self>
    where
        I: IntoIterator<Item = &'a StackDefinition>,
    {
        let mut graph = Self::new();
        for stack in stacks {
            if graph.contains(&stack.name) {
                return Err(DeployError::DuplicateStack(stack.name.clone()));
            }
            graph.add(stack.name.clone(), stack.depends_on.iter().cloned());
        }
        Ok(graph)
    }

    /// Register `id` with its dependencies
    ///
    /// Registering an id again replaces its dependency list; other nodes'
    /// references to it are unaffected.
    pub fn add<I>(&mut self, id: impl Into<String>, depends_on: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let id = id.into();
        if !self.depends_on.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.depends_on
            .insert(id, depends_on.into_iter().map(Into::into).collect());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.depends_on.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identifiers that directly depend on `id`
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|node| self.depends_on[*node].iter().any(|d| d == id))
            .map(String::as_str)
            .collect()
    }

    /// Dependency-first ordering of every registered id
    pub fn resolve(&self) -> DeployResult<Vec<String>> {
        self.check_references()?;

        let mut visiting = Vec::new();
        let mut done = HashSet::new();
        let mut resolved = Vec::with_capacity(self.order.len());

        for id in &self.order {
            self.visit(id, &mut visiting, &mut done, &mut resolved)?;
        }
        Ok(resolved)
    }

    /// Undeclared dependencies are a configuration error
    fn check_references(&self) -> DeployResult<()> {
        for id in &self.order {
            if let Some(missing) = self.depends_on[id].iter().find(|d| !self.contains(d)) {
                return Err(DeployError::UnknownDependency {
                    stack: id.clone(),
                    dependency: missing.clone(),
                });
            }
        }
        Ok(())
    }

    fn visit<'g>(
        &'g self,
        id: &'g str,
        visiting: &mut Vec<&'g str>,
        done: &mut HashSet<&'g str>,
        resolved: &mut Vec<String>,
    ) -> DeployResult<()> {
        if done.contains(id) {
            return Ok(());
        }
        if let Some(start) = visiting.iter().position(|v| *v == id) {
            let mut cycle: Vec<String> = visiting[start..].iter().map(|v| v.to_string()).collect();
            cycle.push(id.to_string());
            return Err(DeployError::CyclicDependency { cycle });
        }

        visiting.push(id);
        for dependency in &self.depends_on[id] {
            self.visit(dependency, visiting, done, resolved)?;
        }
        visiting.pop();

        done.insert(id);
        resolved.push(id.to_string());
        Ok(())
    }
}

/// Resolve a map of `id → dependencies` in one call
pub fn resolve<'a, I, D>(nodes: I) -> DeployResult<Vec<String>>
where
    I: IntoIterator<Item = (&'a str, D)>,
    D: IntoIterator<Item = &'a str>,
{
    let mut graph = DependencyGraph::new();
    for (id, depends_on) in nodes {
        graph.add(id, depends_on);
    }
    graph.resolve()
}
