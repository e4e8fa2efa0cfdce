/*
    Gyre, flight dynamics executive
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::node::{Binding, Getter, PropertyNode, Setter};
use super::{PropertyError, PropertyType, PropertyValue, Shared};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The nodes of a tree at one point in time, see [`PropertyManager::restore`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Path of every node and whether it was tied
    nodes: BTreeMap<String, bool>,
}

impl TreeSnapshot {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }
}

/// Owns the root of a property tree and provides path based access to it.
///
/// The `get_*`/`set_*` shortcuts look the path up on every call and are meant for configuration
/// time. Models resolve their nodes once with [`PropertyManager::get_node`] and keep the handle.
#[derive(Clone)]
pub struct PropertyManager {
    root: PropertyNode,
}

impl Default for PropertyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyManager {
    pub fn new() -> Self {
        Self {
            root: PropertyNode::root(),
        }
    }

    pub fn root(&self) -> &PropertyNode {
        &self.root
    }

    pub fn get_node(&self, path: &str, create: bool) -> Result<PropertyNode, PropertyError> {
        self.root.get_node(path, create)
    }

    pub fn has_node(&self, path: &str) -> bool {
        self.root.get_node(path, false).is_ok()
    }

    fn tie_binding(&self, path: &str, binding: Binding) -> Result<PropertyNode, PropertyError> {
        let node = self.get_node(path, true)?;
        node.tie(binding)?;
        trace!("tied {path}");
        Ok(node)
    }

    /// Binds `path` to a read/write accessor pair.
    pub fn tie<T, G, S>(&self, path: &str, getter: G, setter: S) -> Result<PropertyNode, PropertyError>
    where
        T: PropertyType,
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        self.tie_binding(
            path,
            Binding {
                kind: T::KIND,
                getter: Box::new(move || getter().into_value()),
                setter: Some(Box::new(move |v: PropertyValue| {
                    if let Some(v) = T::from_value(v) {
                        setter(v)
                    }
                })),
            },
        )
    }

    /// Binds `path` to a getter only, writes to it will fail with `ReadOnly`.
    pub fn tie_ro<T, G>(&self, path: &str, getter: G) -> Result<PropertyNode, PropertyError>
    where
        T: PropertyType,
        G: Fn() -> T + Send + Sync + 'static,
    {
        self.tie_binding(
            path,
            Binding {
                kind: T::KIND,
                getter: Box::new(move || getter().into_value()),
                setter: None,
            },
        )
    }

    /// Binds `path` to a field of some shared state.
    pub fn tie_shared<S, T>(
        &self,
        path: &str,
        state: &Shared<S>,
        get: fn(&S) -> T,
        set: Option<fn(&mut S, T)>,
    ) -> Result<PropertyNode, PropertyError>
    where
        S: Send + Sync + 'static,
        T: PropertyType,
    {
        let reader = state.clone();
        let getter: Getter = Box::new(move || get(&reader.read()).into_value());
        let setter = set.map(|set| {
            let writer = state.clone();
            Box::new(move |v: PropertyValue| {
                if let Some(v) = T::from_value(v) {
                    set(&mut writer.write(), v)
                }
            }) as Setter
        });
        self.tie_binding(
            path,
            Binding {
                kind: T::KIND,
                getter,
                setter,
            },
        )
    }

    /// Exposes a vector-like set of values: creates `path[0]` to `path[count - 1]`, each bound to
    /// the same delegates called with the index of the node.
    pub fn tie_indexed<T, G, S>(
        &self,
        path: &str,
        count: usize,
        getter: G,
        setter: Option<S>,
    ) -> Result<Vec<PropertyNode>, PropertyError>
    where
        T: PropertyType,
        G: Fn(usize) -> T + Send + Sync + 'static,
        S: Fn(usize, T) + Send + Sync + 'static,
    {
        let getter = Arc::new(getter);
        let setter = setter.map(Arc::new);
        (0..count)
            .map(|idx| {
                let get = Arc::clone(&getter);
                let set = setter.as_ref().map(|s| {
                    let s = Arc::clone(s);
                    Box::new(move |v: PropertyValue| {
                        if let Some(v) = T::from_value(v) {
                            s(idx, v)
                        }
                    }) as Setter
                });
                self.tie_binding(
                    &format!("{path}[{idx}]"),
                    Binding {
                        kind: T::KIND,
                        getter: Box::new(move || get(idx).into_value()),
                        setter: set,
                    },
                )
            })
            .collect()
    }

    /// Indexed binding over some shared state, see [`PropertyManager::tie_indexed`].
    pub fn tie_indexed_shared<S, T>(
        &self,
        path: &str,
        count: usize,
        state: &Shared<S>,
        get: fn(&S, usize) -> T,
        set: Option<fn(&mut S, usize, T)>,
    ) -> Result<Vec<PropertyNode>, PropertyError>
    where
        S: Send + Sync + 'static,
        T: PropertyType,
    {
        let reader = state.clone();
        let writer = state.clone();
        self.tie_indexed(
            path,
            count,
            move |idx: usize| get(&reader.read(), idx),
            set.map(|set| move |idx: usize, v: T| set(&mut writer.write(), idx, v)),
        )
    }

    /// Detaches the accessor pair of `path`, returns whether it was tied.
    pub fn untie(&self, path: &str) -> Result<bool, PropertyError> {
        Ok(self.get_node(path, false)?.untie())
    }

    pub fn get<T: PropertyType>(&self, path: &str) -> Result<T, PropertyError> {
        self.get_node(path, false)?.get()
    }

    /// Writes `value` to `path`, creating the node if needed.
    pub fn set<T: PropertyType>(&self, path: &str, value: T) -> Result<(), PropertyError> {
        self.get_node(path, true)?.set(value)
    }

    pub fn get_f64(&self, path: &str) -> Result<f64, PropertyError> {
        self.get::<f64>(path)
    }

    pub fn set_f64(&self, path: &str, value: f64) -> Result<(), PropertyError> {
        self.set(path, value)
    }

    pub fn get_bool(&self, path: &str) -> Result<bool, PropertyError> {
        self.get::<bool>(path)
    }

    pub fn set_bool(&self, path: &str, value: bool) -> Result<(), PropertyError> {
        self.set(path, value)
    }

    pub fn get_i64(&self, path: &str) -> Result<i64, PropertyError> {
        self.get::<i64>(path)
    }

    pub fn set_i64(&self, path: &str, value: i64) -> Result<(), PropertyError> {
        self.set(path, value)
    }

    pub fn get_string(&self, path: &str) -> Result<String, PropertyError> {
        self.get::<String>(path)
    }

    pub fn set_string(&self, path: &str, value: &str) -> Result<(), PropertyError> {
        self.set(path, value.to_string())
    }

    /// Lists every node holding a value, with its access mode: `(RW)` or `(R)`.
    pub fn catalog(&self) -> Vec<String> {
        let mut entries = Vec::new();
        self.root.walk(&mut |node| {
            if node.has_value() {
                let mode = if node.is_writable() { "RW" } else { "R" };
                entries.push(format!("{} ({mode})", node.path()));
            }
        });
        entries
    }

    /// Returns the catalog entries containing `pattern`.
    pub fn query(&self, pattern: &str) -> Vec<String> {
        self.catalog()
            .into_iter()
            .filter(|entry| entry.contains(pattern))
            .collect()
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        let mut nodes = BTreeMap::new();
        self.root.walk(&mut |node| {
            nodes.insert(node.path(), node.is_tied());
        });
        TreeSnapshot { nodes }
    }

    /// Removes the nodes created since `snapshot` was taken and unties the nodes tied since then.
    /// Removed nodes are emptied, a handle still held on one of them no longer reaches its owner.
    /// Returns the number of nodes removed.
    pub fn restore(&self, snapshot: &TreeSnapshot) -> usize {
        restore_children(&self.root, snapshot)
    }
}

fn restore_children(node: &PropertyNode, snapshot: &TreeSnapshot) -> usize {
    let mut removed = 0;
    for child in node.children() {
        match snapshot.nodes.get(&child.path()) {
            None => removed += node.remove_child(&child),
            Some(was_tied) => {
                if !was_tied && child.untie() {
                    debug!("untied {}", child.path());
                }
                removed += restore_children(&child, snapshot);
            }
        }
    }
    removed
}

impl fmt::Debug for PropertyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyManager({} entries)", self.catalog().len())
    }
}
