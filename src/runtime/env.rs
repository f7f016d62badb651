//! Environment arena.
//!
//! Environments form a parent chain rooted at the global environment, which
//! always has id 0. Slots are write-once: the loader fills every top-level
//! slot before the scheduler takes its first step, and environments created
//! during reduction (one per application, one per `let`) are fully populated
//! at creation. The only slots that can still be empty at run time are
//! global holes, which is why a stuck lookup always parks on the global
//! environment.

use std::collections::HashMap;

use crate::runtime::graph::NodeId;
use crate::runtime::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(u32);

impl EnvId {
    pub const GLOBAL: EnvId = EnvId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a name is bound to.
#[derive(Debug, Clone)]
pub enum Slot {
    /// Declared or referenced, but not yet given content. Waiters are the
    /// nodes parked on this name; they are only ever released by a deadlock
    /// report, since holes cannot be filled once evaluation has started.
    Hole { waiters: Vec<NodeId> },
    /// A top-level cut: this name is the same binding as `target`. After
    /// [`EnvArena::compress_aliases`] the target is never itself an alias.
    Alias(String),
    /// Bound to a graph node; the node's result is the binding's value.
    Node(NodeId),
    /// Bound directly to a settled value.
    Value(Value),
}

/// Outcome of resolving a name through an environment chain.
#[derive(Debug, Clone)]
pub enum Resolution {
    Value(Value),
    Node(NodeId),
    /// Nothing bound under this (global) name; park on it.
    Unbound(String),
}

#[derive(Debug)]
struct Env {
    parent: Option<EnvId>,
    slots: HashMap<String, Slot>,
}

#[derive(Debug)]
pub struct EnvArena {
    envs: Vec<Env>,
}

impl EnvArena {
    pub fn new() -> Self {
        EnvArena {
            envs: vec![Env {
                parent: None,
                slots: HashMap::new(),
            }],
        }
    }

    pub fn alloc(&mut self, parent: EnvId) -> EnvId {
        let id = EnvId(self.envs.len() as u32);
        self.envs.push(Env {
            parent: Some(parent),
            slots: HashMap::new(),
        });
        id
    }

    pub fn declare_hole(&mut self, env: EnvId, name: &str) {
        self.envs[env.index()]
            .slots
            .entry(name.to_string())
            .or_insert(Slot::Hole {
                waiters: Vec::new(),
            });
    }

    pub fn declare_alias(&mut self, env: EnvId, name: &str, target: &str) {
        self.envs[env.index()]
            .slots
            .insert(name.to_string(), Slot::Alias(target.to_string()));
    }

    pub fn bind_node(&mut self, env: EnvId, name: &str, node: NodeId) {
        let slot = self.envs[env.index()]
            .slots
            .insert(name.to_string(), Slot::Node(node));
        debug_assert!(
            !matches!(slot, Some(Slot::Hole { ref waiters }) if !waiters.is_empty()),
            "bound over a hole that already had waiters"
        );
    }

    pub fn bind_value(&mut self, env: EnvId, name: &str, value: Value) {
        let slot = self.envs[env.index()]
            .slots
            .insert(name.to_string(), Slot::Value(value));
        debug_assert!(
            !matches!(slot, Some(Slot::Hole { ref waiters }) if !waiters.is_empty()),
            "bound over a hole that already had waiters"
        );
    }

    /// Walk the chain from `env` looking for `name`, following alias hops
    /// inside the global environment. Read-only; safe to call from the
    /// parallel planning pass.
    pub fn resolve(&self, env: EnvId, name: &str) -> Resolution {
        let mut current = Some(env);
        while let Some(id) = current {
            if let Some(slot) = self.envs[id.index()].slots.get(name) {
                return self.resolve_slot(name, slot);
            }
            current = self.envs[id.index()].parent;
        }
        Resolution::Unbound(name.to_string())
    }

    fn resolve_slot(&self, name: &str, slot: &Slot) -> Resolution {
        let mut name = name;
        let mut slot = slot;
        let mut seen: Vec<&str> = Vec::new();
        loop {
            match slot {
                Slot::Value(value) => return Resolution::Value(value.clone()),
                Slot::Node(node) => return Resolution::Node(*node),
                Slot::Hole { .. } => return Resolution::Unbound(name.to_string()),
                Slot::Alias(target) => {
                    if seen.contains(&name) {
                        return Resolution::Unbound(name.to_string());
                    }
                    seen.push(name);
                    name = target;
                    match self.envs[EnvId::GLOBAL.index()].slots.get(name) {
                        Some(next) => slot = next,
                        None => return Resolution::Unbound(name.to_string()),
                    }
                }
            }
        }
    }

    /// Park `waiter` on a global hole, creating the slot if the name was
    /// never declared at all.
    pub fn park(&mut self, name: &str, waiter: NodeId) {
        let slot = self.envs[EnvId::GLOBAL.index()]
            .slots
            .entry(name.to_string())
            .or_insert(Slot::Hole {
                waiters: Vec::new(),
            });
        match slot {
            Slot::Hole { waiters } => {
                if !waiters.contains(&waiter) {
                    waiters.push(waiter);
                }
            }
            _ => debug_assert!(false, "parked on a bound slot"),
        }
    }

    /// Flatten alias chains in the global environment so every alias points
    /// directly at a non-alias slot. Chains that loop back on themselves
    /// become holes; the names surface later as unresolved bindings if
    /// anything waits on them.
    pub fn compress_aliases(&mut self) {
        let global = &self.envs[EnvId::GLOBAL.index()].slots;
        let alias_names: Vec<String> = global
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Alias(_) => Some(name.clone()),
                _ => None,
            })
            .collect();

        let mut rewrites: Vec<(String, Slot)> = Vec::new();
        for name in &alias_names {
            let mut path = vec![name.clone()];
            let mut current = name.clone();
            let target = loop {
                match self.envs[EnvId::GLOBAL.index()].slots.get(&current) {
                    Some(Slot::Alias(next)) => {
                        if path.contains(next) {
                            break None;
                        }
                        path.push(next.clone());
                        current = next.clone();
                    }
                    _ => break Some(current),
                }
            };
            match target {
                Some(target) => rewrites.push((name.clone(), Slot::Alias(target))),
                None => {
                    for member in path {
                        rewrites.push((
                            member,
                            Slot::Hole {
                                waiters: Vec::new(),
                            },
                        ));
                    }
                }
            }
        }

        for (name, slot) in rewrites {
            self.envs[EnvId::GLOBAL.index()].slots.insert(name, slot);
        }
    }

    /// Global names that are still holes and have at least one waiter,
    /// sorted for stable reports.
    pub fn unresolved_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.envs[EnvId::GLOBAL.index()]
            .slots
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Hole { waiters } if !waiters.is_empty() => Some(name.clone()),
                _ => None,
            })
            .collect();
        names.sort();
        names
    }

    pub fn global_slots(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.envs[EnvId::GLOBAL.index()]
            .slots
            .iter()
            .map(|(name, slot)| (name.as_str(), slot))
    }
}

impl Default for EnvArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_walks_parent_chain() {
        let mut arena = EnvArena::new();
        arena.bind_value(EnvId::GLOBAL, "x", Value::Int(1));
        let child = arena.alloc(EnvId::GLOBAL);
        arena.bind_value(child, "y", Value::Int(2));
        let grandchild = arena.alloc(child);

        assert!(matches!(
            arena.resolve(grandchild, "x"),
            Resolution::Value(Value::Int(1))
        ));
        assert!(matches!(
            arena.resolve(grandchild, "y"),
            Resolution::Value(Value::Int(2))
        ));
        assert!(matches!(
            arena.resolve(grandchild, "z"),
            Resolution::Unbound(name) if name == "z"
        ));
    }

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut arena = EnvArena::new();
        arena.bind_value(EnvId::GLOBAL, "x", Value::Int(1));
        let child = arena.alloc(EnvId::GLOBAL);
        arena.bind_value(child, "x", Value::Int(2));

        assert!(matches!(
            arena.resolve(child, "x"),
            Resolution::Value(Value::Int(2))
        ));
        assert!(matches!(
            arena.resolve(EnvId::GLOBAL, "x"),
            Resolution::Value(Value::Int(1))
        ));
    }

    #[test]
    fn test_alias_resolves_to_target() {
        let mut arena = EnvArena::new();
        arena.declare_alias(EnvId::GLOBAL, "speed", "velocity");
        arena.bind_value(EnvId::GLOBAL, "velocity", Value::Int(88));

        assert!(matches!(
            arena.resolve(EnvId::GLOBAL, "speed"),
            Resolution::Value(Value::Int(88))
        ));
    }

    #[test]
    fn test_alias_chain_compresses_to_one_hop() {
        let mut arena = EnvArena::new();
        arena.declare_alias(EnvId::GLOBAL, "a", "b");
        arena.declare_alias(EnvId::GLOBAL, "b", "c");
        arena.bind_value(EnvId::GLOBAL, "c", Value::Int(3));
        arena.compress_aliases();

        let slot = arena
            .global_slots()
            .find(|(name, _)| *name == "a")
            .map(|(_, slot)| slot.clone());
        assert!(matches!(slot, Some(Slot::Alias(target)) if target == "c"));
        assert!(matches!(
            arena.resolve(EnvId::GLOBAL, "a"),
            Resolution::Value(Value::Int(3))
        ));
    }

    #[test]
    fn test_alias_cycle_becomes_holes() {
        let mut arena = EnvArena::new();
        arena.declare_alias(EnvId::GLOBAL, "a", "b");
        arena.declare_alias(EnvId::GLOBAL, "b", "a");
        arena.compress_aliases();

        assert!(matches!(
            arena.resolve(EnvId::GLOBAL, "a"),
            Resolution::Unbound(_)
        ));
        arena.park("a", NodeId::new(0));
        arena.park("b", NodeId::new(1));
        assert_eq!(arena.unresolved_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_park_creates_missing_global_hole() {
        let mut arena = EnvArena::new();
        arena.park("ghost", NodeId::new(4));
        arena.park("ghost", NodeId::new(4));

        assert_eq!(arena.unresolved_names(), vec!["ghost"]);
        let slot = arena
            .global_slots()
            .find(|(name, _)| *name == "ghost")
            .map(|(_, slot)| slot.clone());
        assert!(matches!(slot, Some(Slot::Hole { waiters }) if waiters.len() == 1));
    }
}
