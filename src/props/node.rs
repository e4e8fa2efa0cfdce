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

use super::path::{parse_path, PathStep};
use super::{PropertyError, PropertyKind, PropertyType, PropertyValue};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

pub(crate) type Getter = Box<dyn Fn() -> PropertyValue + Send + Sync>;
pub(crate) type Setter = Box<dyn Fn(PropertyValue) + Send + Sync>;

/// An accessor pair over some external scalar.
pub(crate) struct Binding {
    pub(crate) kind: PropertyKind,
    pub(crate) getter: Getter,
    pub(crate) setter: Option<Setter>,
}

enum Slot {
    Empty,
    Owned(PropertyValue),
    Tied(Binding),
}

struct NodeInner {
    name: String,
    index: usize,
    parent: Weak<NodeInner>,
    children: RwLock<Vec<PropertyNode>>,
    slot: RwLock<Slot>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// A handle on a node of the property tree.
///
/// Handles are cheap to clone: holding on to one is the efficient way of reading or writing a
/// property at every step since it avoids walking the tree again.
#[derive(Clone)]
pub struct PropertyNode(Arc<NodeInner>);

impl PropertyNode {
    pub(crate) fn root() -> Self {
        Self(Arc::new(NodeInner {
            name: String::new(),
            index: 0,
            parent: Weak::new(),
            children: RwLock::new(Vec::new()),
            slot: RwLock::new(Slot::Empty),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn index(&self) -> usize {
        self.0.index
    }

    pub fn parent(&self) -> Option<PropertyNode> {
        self.0.parent.upgrade().map(PropertyNode)
    }

    /// Returns the root of the tree this node belongs to.
    pub fn root_node(&self) -> PropertyNode {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// The full path of this node, with the `[index]` suffix on every component whose index is not zero.
    pub fn path(&self) -> String {
        let mut components = Vec::new();
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            components.push(node.display_name());
            node = parent;
        }
        components.reverse();
        format!("/{}", components.join("/"))
    }

    /// The name of this node including its index if not zero.
    pub fn display_name(&self) -> String {
        if self.0.index > 0 {
            format!("{}[{}]", self.0.name, self.0.index)
        } else {
            self.0.name.clone()
        }
    }

    pub fn children(&self) -> Vec<PropertyNode> {
        read(&self.0.children).clone()
    }

    pub fn n_children(&self) -> usize {
        read(&self.0.children).len()
    }

    pub fn child(&self, name: &str, index: usize) -> Option<PropertyNode> {
        read(&self.0.children)
            .iter()
            .find(|c| c.0.name == name && c.0.index == index)
            .cloned()
    }

    fn child_or_create(&self, name: &str, index: usize) -> PropertyNode {
        if let Some(child) = self.child(name, index) {
            return child;
        }
        let mut children = write(&self.0.children);
        // Another handle may have created it between the two locks.
        if let Some(child) = children
            .iter()
            .find(|c| c.0.name == name && c.0.index == index)
        {
            return child.clone();
        }
        let child = PropertyNode(Arc::new(NodeInner {
            name: name.to_string(),
            index,
            parent: Arc::downgrade(&self.0),
            children: RwLock::new(Vec::new()),
            slot: RwLock::new(Slot::Empty),
        }));
        children.push(child.clone());
        child
    }

    /// Navigates to `path` relative to this node, creating the missing nodes if `create` is set.
    pub fn get_node(&self, path: &str, create: bool) -> Result<PropertyNode, PropertyError> {
        let mut node = self.clone();
        for step in parse_path(path)? {
            node = match step {
                PathStep::Root => node.root_node(),
                PathStep::Current => node,
                PathStep::Parent => node.parent().ok_or_else(|| PropertyError::InvalidPath {
                    path: path.to_string(),
                    reason: "`..` above the root".to_string(),
                })?,
                PathStep::Child { name, index } => match node.child(&name, index) {
                    Some(child) => child,
                    None if create => node.child_or_create(&name, index),
                    None => {
                        return Err(PropertyError::NotFound {
                            path: path.to_string(),
                        })
                    }
                },
            };
        }
        Ok(node)
    }

    pub fn is_tied(&self) -> bool {
        matches!(*read(&self.0.slot), Slot::Tied(_))
    }

    pub fn has_value(&self) -> bool {
        !matches!(*read(&self.0.slot), Slot::Empty)
    }

    /// Returns whether a value may be written to this node.
    pub fn is_writable(&self) -> bool {
        match &*read(&self.0.slot) {
            Slot::Tied(binding) => binding.setter.is_some(),
            _ => true,
        }
    }

    /// The kind of value held by this node, if any.
    pub fn kind(&self) -> Option<PropertyKind> {
        match &*read(&self.0.slot) {
            Slot::Empty => None,
            Slot::Owned(v) => Some(v.kind()),
            Slot::Tied(binding) => Some(binding.kind),
        }
    }

    pub fn value(&self) -> Result<PropertyValue, PropertyError> {
        match &*read(&self.0.slot) {
            Slot::Empty => Err(PropertyError::NoValue { path: self.path() }),
            Slot::Owned(v) => Ok(v.clone()),
            Slot::Tied(binding) => Ok((binding.getter)()),
        }
    }

    /// Writes a value, which must widen to the kind already held by this node.
    /// An empty node takes the kind of the first value written to it.
    pub fn set_value(&self, value: PropertyValue) -> Result<(), PropertyError> {
        let mut slot = write(&self.0.slot);
        match &mut *slot {
            Slot::Empty => {
                *slot = Slot::Owned(value);
                Ok(())
            }
            Slot::Owned(current) => {
                let actual = current.kind();
                let requested = value.kind();
                match value.widen_to(actual) {
                    Some(v) => {
                        *current = v;
                        Ok(())
                    }
                    None => Err(PropertyError::TypeMismatch {
                        path: self.path(),
                        actual,
                        requested,
                    }),
                }
            }
            Slot::Tied(binding) => {
                let requested = value.kind();
                let setter = binding
                    .setter
                    .as_ref()
                    .ok_or_else(|| PropertyError::ReadOnly { path: self.path() })?;
                match value.widen_to(binding.kind) {
                    Some(v) => {
                        setter(v);
                        Ok(())
                    }
                    None => Err(PropertyError::TypeMismatch {
                        path: self.path(),
                        actual: binding.kind,
                        requested,
                    }),
                }
            }
        }
    }

    pub fn get<T: PropertyType>(&self) -> Result<T, PropertyError> {
        let value = self.value()?;
        let actual = value.kind();
        T::from_value(value).ok_or_else(|| PropertyError::TypeMismatch {
            path: self.path(),
            actual,
            requested: T::KIND,
        })
    }

    pub fn set<T: PropertyType>(&self, value: T) -> Result<(), PropertyError> {
        self.set_value(value.into_value())
    }

    pub fn get_f64(&self) -> Result<f64, PropertyError> {
        self.get::<f64>()
    }

    pub fn set_f64(&self, value: f64) -> Result<(), PropertyError> {
        self.set(value)
    }

    pub fn get_bool(&self) -> Result<bool, PropertyError> {
        self.get::<bool>()
    }

    pub fn set_bool(&self, value: bool) -> Result<(), PropertyError> {
        self.set(value)
    }

    pub fn get_i64(&self) -> Result<i64, PropertyError> {
        self.get::<i64>()
    }

    pub fn set_i64(&self, value: i64) -> Result<(), PropertyError> {
        self.set(value)
    }

    pub fn get_string(&self) -> Result<String, PropertyError> {
        self.get::<String>()
    }

    pub(crate) fn tie(&self, binding: Binding) -> Result<(), PropertyError> {
        if self.n_children() > 0 {
            return Err(PropertyError::NotALeaf { path: self.path() });
        }
        let mut slot = write(&self.0.slot);
        if matches!(*slot, Slot::Tied(_)) {
            let path = self.path();
            warn!("{path} is already tied, ignoring the new binding");
            return Err(PropertyError::AlreadyTied { path });
        }
        *slot = Slot::Tied(binding);
        Ok(())
    }

    /// Detaches the accessor pair, the node keeps a copy of the last value.
    /// Returns whether the node was tied.
    pub fn untie(&self) -> bool {
        let mut slot = write(&self.0.slot);
        let last = match &*slot {
            Slot::Tied(binding) => (binding.getter)(),
            _ => return false,
        };
        *slot = Slot::Owned(last);
        true
    }

    /// Detaches `child` and its descendants from this node and drops their values without reading
    /// them. Returns the number of nodes removed.
    pub(crate) fn remove_child(&self, child: &PropertyNode) -> usize {
        {
            let mut children = write(&self.0.children);
            let before = children.len();
            children.retain(|c| c != child);
            if children.len() == before {
                return 0;
            }
        }
        let mut removed = 0;
        child.walk(&mut |node| {
            *write(&node.0.slot) = Slot::Empty;
            removed += 1;
        });
        removed
    }

    /// Calls `f` on this node and all of its descendants, depth first.
    pub fn walk<F: FnMut(&PropertyNode)>(&self, f: &mut F) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }
}

impl PartialEq for PropertyNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PropertyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyNode({})", self.path())
    }
}

impl fmt::Display for PropertyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Ok(v) => write!(f, "{} = {v}", self.path()),
            Err(_) => write!(f, "{}", self.path()),
        }
    }
}
