//! Offsets of scalarised symbols within flat numeric vectors.
//!
//! Every symbol has a variable type, and every type maps each of six roles
//! to a target vector or to nothing. A role whose vector drives itself
//! reserves fresh offsets; a role whose vector is driven by another reuses
//! the start the driver reserved for the same symbol.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use anyhow::Result;
use log::{debug, log_enabled, Level};
use ndarray::Array1;

use super::backend::Context;
use super::error::GenerationError;

pub type Shape = Array1<usize>;
pub type Index = Array1<usize>;

/// Row-major position of `index` within `shape`.
pub fn ravel_index(index: &Index, shape: &Shape) -> usize {
    let mut res = 0;
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        res += index[i] * stride;
        stride *= shape[i];
    }
    res
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    LhsLag,
    LhsCur,
    LhsLead,
    RhsLag,
    RhsCur,
    RhsLead,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::LhsLag,
        Role::LhsCur,
        Role::LhsLead,
        Role::RhsLag,
        Role::RhsCur,
        Role::RhsLead,
    ];

    pub fn from_context(ctx: Context) -> Result<Role> {
        let shift = match ctx.dt {
            -1 => 0,
            0 => 1,
            1 => 2,
            dt if dt < 0 => {
                return Err(GenerationError::UnrenderableContext(
                    "lag(lag(var)) cannot be used with flat vectors".to_string(),
                )
                .into())
            }
            _ => {
                return Err(GenerationError::UnrenderableContext(
                    "lead(lead(var)) cannot be used with flat vectors".to_string(),
                )
                .into())
            }
        };
        let side = if ctx.lhs { 0 } else { 3 };
        Ok(Role::ALL[side + shift])
    }

    pub fn context(&self) -> Context {
        let i = *self as usize;
        Context {
            lhs: i < 3,
            dt: (i % 3) as i32 - 1,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Role::LhsLag => "LHS in lag()",
            Role::LhsCur => "LHS without lag() or lead()",
            Role::LhsLead => "LHS in lead()",
            Role::RhsLag => "RHS in lag()",
            Role::RhsCur => "RHS without lag() or lead()",
            Role::RhsLead => "RHS in lead()",
        }
    }
}

/// A named target vector.
pub trait VectorKind: Copy + Eq + Ord + Hash + fmt::Debug {
    /// The vector whose offsets this one shares, if it does not drive
    /// itself.
    fn driver(&self) -> Option<Self>;

    fn name(&self) -> &'static str;
}

/// Which vector each role of a variable type targets.
#[derive(Debug, Clone, Copy)]
pub struct VarType<V> {
    pub name: &'static str,
    pub roles: [Option<V>; 6],
}

impl<V: Copy> VarType<V> {
    pub fn vector(&self, role: Role) -> Option<V> {
        self.roles[role as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<V> {
    pub vector: V,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct Allocation<V> {
    pub var_type: &'static str,
    pub count: usize,
    pub slots: [Option<Slot<V>>; 6],
}

impl<V: Copy> Allocation<V> {
    pub fn slot(&self, role: Role) -> Option<Slot<V>> {
        self.slots[role as usize]
    }
}

/// Pass-scoped offset bookkeeping for a family of vectors.
#[derive(Debug)]
pub struct VectorAllocator<V: VectorKind> {
    counters: BTreeMap<V, usize>,
    sizes: BTreeMap<V, usize>,
    symbols: HashMap<String, Allocation<V>>,
}

impl<V: VectorKind> Default for VectorAllocator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: VectorKind> VectorAllocator<V> {
    pub fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
            sizes: BTreeMap::new(),
            symbols: HashMap::new(),
        }
    }

    /// Reserve offsets for `count` scalar instances of `name`. Symbols must
    /// be allocated in a fixed order for offsets to be reproducible.
    pub fn allocate(&mut self, name: &str, var_type: &VarType<V>, count: usize) -> Result<&Allocation<V>> {
        let mut starts: HashMap<V, usize> = HashMap::new();
        let mut slots = [None; 6];
        for role in Role::ALL {
            let Some(vector) = var_type.vector(role) else {
                continue;
            };
            let offset = match vector.driver() {
                Some(driver) => *starts.get(&driver).ok_or_else(|| {
                    GenerationError::OrderingViolation(format!(
                        "{} of {} reached before its driver {}",
                        vector.name(),
                        name,
                        driver.name()
                    ))
                })?,
                None => {
                    let counter = self.counters.entry(vector).or_insert(0);
                    let start = *counter;
                    *counter += count;
                    starts.insert(vector, start);
                    start
                }
            };
            let size = self.sizes.entry(vector).or_insert(0);
            *size = (*size).max(offset + count);
            slots[role as usize] = Some(Slot { vector, offset });
        }

        if log_enabled!(Level::Debug) {
            let placed: Vec<String> = slots
                .iter()
                .map(|s| match s {
                    Some(s) => format!("{}[{}]", s.vector.name(), s.offset),
                    None => "--".to_string(),
                })
                .collect();
            debug!("{}: type {}, {} elements -> {}", name, var_type.name, count, placed.join(" "));
        }

        let allocation = Allocation {
            var_type: var_type.name,
            count,
            slots,
        };
        self.symbols.insert(name.to_string(), allocation);
        Ok(&self.symbols[name])
    }

    pub fn allocation(&self, name: &str) -> Option<&Allocation<V>> {
        self.symbols.get(name)
    }

    /// The slot `name` occupies when referenced in `role`.
    pub fn lookup(&self, name: &str, role: Role) -> Result<Slot<V>> {
        let allocation = self.symbols.get(name).ok_or_else(|| {
            GenerationError::InvariantViolation(format!("{} was never allocated", name))
        })?;
        allocation.slot(role).ok_or_else(|| {
            GenerationError::UnrenderableContext(format!(
                "invalid context for variable {}: type '{}' on {}",
                name,
                allocation.var_type,
                role.describe()
            ))
            .into()
        })
    }

    /// Number of elements in `vector` once every symbol is allocated.
    pub fn size(&self, vector: V) -> usize {
        self.sizes.get(&vector).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    enum Vec3 {
        State,
        Shadow,
        Free,
    }

    impl VectorKind for Vec3 {
        fn driver(&self) -> Option<Self> {
            match self {
                Vec3::Shadow => Some(Vec3::State),
                _ => None,
            }
        }

        fn name(&self) -> &'static str {
            match self {
                Vec3::State => "state",
                Vec3::Shadow => "shadow",
                Vec3::Free => "free",
            }
        }
    }

    const SHARED: VarType<Vec3> = VarType {
        name: "shared",
        roles: [None, None, Some(Vec3::State), None, Some(Vec3::Shadow), None],
    };

    const FREE: VarType<Vec3> = VarType {
        name: "free",
        roles: [None, None, None, None, Some(Vec3::Free), None],
    };

    const BACKWARDS: VarType<Vec3> = VarType {
        name: "backwards",
        roles: [None, Some(Vec3::Shadow), Some(Vec3::State), None, None, None],
    };

    #[test]
    fn dependent_roles_share_the_driver_offset() {
        let mut alloc = VectorAllocator::new();
        alloc.allocate("a", &SHARED, 3).unwrap();
        alloc.allocate("f", &FREE, 2).unwrap();
        alloc.allocate("b", &SHARED, 4).unwrap();
        for name in ["a", "b"] {
            let lead = alloc.lookup(name, Role::LhsLead).unwrap();
            let cur = alloc.lookup(name, Role::RhsCur).unwrap();
            assert_eq!(lead.offset, cur.offset);
            assert_eq!(cur.vector, Vec3::Shadow);
        }
        assert_eq!(alloc.lookup("b", Role::LhsLead).unwrap().offset, 3);
        assert_eq!(alloc.size(Vec3::State), 7);
        assert_eq!(alloc.size(Vec3::Shadow), 7);
        assert_eq!(alloc.size(Vec3::Free), 2);
    }

    #[test]
    fn dependent_before_driver_is_an_ordering_violation() {
        let mut alloc = VectorAllocator::new();
        let err = alloc.allocate("x", &BACKWARDS, 1).unwrap_err();
        assert!(err.to_string().starts_with("ordering violation"));
    }

    #[test]
    fn forbidden_roles_name_the_context() {
        let mut alloc = VectorAllocator::new();
        alloc.allocate("f", &FREE, 1).unwrap();
        let err = alloc.lookup("f", Role::RhsLead).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("unrenderable context"));
        assert!(msg.contains("RHS in lead()"));
    }

    #[test]
    fn roles_follow_context() {
        let role = Role::from_context(Context { lhs: false, dt: 1 }).unwrap();
        assert_eq!(role, Role::RhsLead);
        assert_eq!(role.context(), Context { lhs: false, dt: 1 });
        assert_eq!(Role::from_context(Context { lhs: true, dt: -1 }).unwrap(), Role::LhsLag);
        assert!(Role::from_context(Context { lhs: true, dt: 2 }).is_err());
    }

    #[test]
    fn ravel_is_row_major() {
        let shape: Shape = array![2, 3];
        assert_eq!(ravel_index(&array![0, 0], &shape), 0);
        assert_eq!(ravel_index(&array![0, 2], &shape), 2);
        assert_eq!(ravel_index(&array![1, 0], &shape), 3);
        assert_eq!(ravel_index(&array![1, 2], &shape), 5);
    }
}
