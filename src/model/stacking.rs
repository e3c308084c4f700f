//! Stacking nodes and the two orders they live in.
//!
//! Every managed child has one [`StackingNode`]. Each node is linked into
//! two intrusive lists stored in the same arena:
//!
//! * the management list of its owning group, in insertion order;
//! * the stacking order of its parent window (bottom to top), which is
//!   shared with every other group that places children in that window.
//!
//! Nodes carry an owner tag, so a group's view of the shared order is the
//! shared list filtered by owner.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use static_assertions::const_assert;

use crate::common::collections::HashMap;
use crate::model::region::RegionId;
use crate::model::size_policy::SizePolicy;
use crate::sys::display::WindowId;

slotmap::new_key_type! {
    pub struct StackingId;

    /// Identifies a group. Stale ids read as absent everywhere.
    pub struct GroupId;
}

/// Priority tier. Higher tiers always stack above lower ones.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct StackingLevel(pub u32);

impl StackingLevel {
    pub const BOTTOM: StackingLevel = StackingLevel(0);
    pub const NORMAL: StackingLevel = StackingLevel(1);
    pub const ON_TOP: StackingLevel = StackingLevel(2);
    pub const MODAL1: StackingLevel = StackingLevel(1024);
    pub const MODAL2: StackingLevel = StackingLevel(1025);

    /// Modal tiers change how focus is picked.
    pub fn is_modal(self) -> bool { self >= Self::MODAL1 }
}

const_assert!(StackingLevel::MODAL1.0 > StackingLevel::ON_TOP.0);
const_assert!(StackingLevel::ON_TOP.0 > StackingLevel::NORMAL.0);

impl Default for StackingLevel {
    fn default() -> Self { StackingLevel::NORMAL }
}

const LEVEL_NAMES: &[(&str, StackingLevel)] = &[
    ("bottom", StackingLevel::BOTTOM),
    ("normal", StackingLevel::NORMAL),
    ("on_top", StackingLevel::ON_TOP),
    ("modal", StackingLevel::MODAL1),
    ("modal2", StackingLevel::MODAL2),
];

impl fmt::Display for StackingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match LEVEL_NAMES.iter().find(|(_, level)| level == self) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for StackingLevel {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match LEVEL_NAMES.iter().find(|(name, _)| name.eq_ignore_ascii_case(s.trim())) {
            Some((_, level)) => Ok(*level),
            None => s.trim().parse().map(StackingLevel),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Links {
    prev: Option<StackingId>,
    next: Option<StackingId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ListEnds {
    first: Option<StackingId>,
    last: Option<StackingId>,
}

#[derive(Clone, Copy, Debug)]
enum Chain {
    Managed,
    Stack,
}

/// One child's membership in a group.
#[derive(Debug, Clone)]
pub struct StackingNode {
    pub region: RegionId,
    pub level: StackingLevel,
    pub size_policy: SizePolicy,
    pub owner: GroupId,
    /// The window whose stacking order this node is in.
    pub parent: WindowId,
    managed: Links,
    stack: Links,
}

impl StackingNode {
    fn links_mut(&mut self, chain: Chain) -> &mut Links {
        match chain {
            Chain::Managed => &mut self.managed,
            Chain::Stack => &mut self.stack,
        }
    }
}

type Nodes = SlotMap<StackingId, StackingNode>;

fn link_after(
    nodes: &mut Nodes,
    ends: &mut ListEnds,
    chain: Chain,
    id: StackingId,
    prev: Option<StackingId>,
) {
    let next = match prev {
        Some(prev) => nodes[prev].links_mut(chain).next,
        None => ends.first,
    };
    *nodes[id].links_mut(chain) = Links { prev, next };
    match prev {
        Some(prev) => nodes[prev].links_mut(chain).next = Some(id),
        None => ends.first = Some(id),
    }
    match next {
        Some(next) => nodes[next].links_mut(chain).prev = Some(id),
        None => ends.last = Some(id),
    }
}

fn unlink(nodes: &mut Nodes, ends: &mut ListEnds, chain: Chain, id: StackingId) {
    let Links { prev, next } = std::mem::take(nodes[id].links_mut(chain));
    match prev {
        Some(prev) => nodes[prev].links_mut(chain).next = next,
        None => ends.first = next,
    }
    match next {
        Some(next) => nodes[next].links_mut(chain).prev = prev,
        None => ends.last = prev,
    }
}

/// Nodes lifted out of a parent's stacking order, bottom to top.
///
/// Must be woven into a new parent with [`StackingMap::weave`].
#[must_use = "unweaved nodes must be woven back into a stacking order"]
#[derive(Debug)]
pub struct Unweaved {
    ids: Vec<StackingId>,
}

impl Unweaved {
    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
}

/// The arena of stacking nodes plus the list heads of both orders.
#[derive(Default, Debug)]
pub struct StackingMap {
    nodes: Nodes,
    orders: HashMap<WindowId, ListEnds>,
    managed: HashMap<GroupId, ListEnds>,
}

impl StackingMap {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, id: StackingId) -> Option<&StackingNode> { self.nodes.get(id) }

    pub fn get_mut(&mut self, id: StackingId) -> Option<&mut StackingNode> {
        self.nodes.get_mut(id)
    }

    /// The owner of `id`, if it still exists.
    pub fn owner(&self, id: StackingId) -> Option<GroupId> { self.nodes.get(id).map(|n| n.owner) }

    /// Creates a node for `region`, linked at the front of `owner`'s
    /// management list (or at position `index`) and at the bottom of
    /// `parent`'s stacking order.
    pub fn insert(
        &mut self,
        owner: GroupId,
        parent: WindowId,
        region: RegionId,
        level: StackingLevel,
        size_policy: SizePolicy,
        index: Option<usize>,
    ) -> StackingId {
        let id = self.nodes.insert(StackingNode {
            region,
            level,
            size_policy,
            owner,
            parent,
            managed: Links::default(),
            stack: Links::default(),
        });
        let after = index.and_then(|index| index.checked_sub(1)).and_then(|before| {
            let mut iter = self.managed(owner);
            let mut last = None;
            for _ in 0..=before {
                match iter.next() {
                    Some(id) => last = Some(id),
                    None => break,
                }
            }
            last
        });
        let ends = self.managed.entry(owner).or_default();
        link_after(&mut self.nodes, ends, Chain::Managed, id, after);
        let ends = self.orders.entry(parent).or_default();
        link_after(&mut self.nodes, ends, Chain::Stack, id, None);
        id
    }

    /// Finds the node `owner` holds for `region`.
    pub fn find(&self, owner: GroupId, region: RegionId) -> Option<StackingId> {
        self.managed(owner).find(|&id| self.nodes[id].region == region)
    }

    /// Removes `id` from both orders and frees it.
    ///
    /// Also returns the node that was adjacent in the stacking order: the
    /// nearest node of the same owner below it, else the nearest above.
    pub fn remove(&mut self, id: StackingId) -> Option<(StackingNode, Option<StackingId>)> {
        let adjacent = self.unstack(id)?;
        let owner = self.nodes[id].owner;
        if let Some(ends) = self.managed.get_mut(&owner) {
            unlink(&mut self.nodes, ends, Chain::Managed, id);
            if ends.first.is_none() {
                self.managed.remove(&owner);
            }
        }
        let node = self.nodes.remove(id)?;
        Some((node, adjacent))
    }

    fn unstack(&mut self, id: StackingId) -> Option<Option<StackingId>> {
        let node = self.nodes.get(id)?;
        let (owner, parent) = (node.owner, node.parent);
        let same_owner = |n: &StackingId| self.nodes[*n].owner == owner;
        let below = StackIter::new(&self.nodes, node.stack.prev, false).find(same_owner);
        let adjacent =
            below.or_else(|| StackIter::new(&self.nodes, node.stack.next, true).find(same_owner));
        if let Some(ends) = self.orders.get_mut(&parent) {
            unlink(&mut self.nodes, ends, Chain::Stack, id);
        }
        Some(adjacent)
    }

    /// `owner`'s nodes in management order.
    pub fn managed(&self, owner: GroupId) -> ManagedIter<'_> {
        ManagedIter {
            nodes: &self.nodes,
            cur: self.managed.get(&owner).and_then(|e| e.first),
        }
    }

    /// `parent`'s stacking order, bottom to top.
    pub fn stack(&self, parent: WindowId) -> StackIter<'_> {
        StackIter::new(&self.nodes, self.orders.get(&parent).and_then(|e| e.first), true)
    }

    /// `parent`'s stacking order, top to bottom.
    pub fn stack_rev(&self, parent: WindowId) -> StackIter<'_> {
        StackIter::new(&self.nodes, self.orders.get(&parent).and_then(|e| e.last), false)
    }

    pub fn above(&self, id: StackingId) -> Option<StackingId> { self.nodes.get(id)?.stack.next }

    pub fn below(&self, id: StackingId) -> Option<StackingId> { self.nodes.get(id)?.stack.prev }

    /// Moves `id` to the top of its tier.
    ///
    /// An initial raise goes above this owner's nodes of the same tier but
    /// stays below same-tier nodes of other owners.
    pub fn raise(&mut self, id: StackingId, initial: bool) {
        let Some(node) = self.nodes.get(id) else { return };
        let (owner, level, parent) = (node.owner, node.level, node.parent);
        let Some(ends) = self.orders.get_mut(&parent) else { return };
        unlink(&mut self.nodes, ends, Chain::Stack, id);
        let after = StackIter::new(&self.nodes, ends.last, false).find(|&n| {
            let other = &self.nodes[n];
            other.level < level || (other.level == level && (!initial || other.owner == owner))
        });
        link_after(&mut self.nodes, ends, Chain::Stack, id, after);
    }

    /// Moves `id` to the bottom of its tier, but never below `floor` when
    /// `floor` is at the same or a lower tier.
    pub fn lower(&mut self, id: StackingId, floor: Option<StackingId>) {
        let Some(node) = self.nodes.get(id) else { return };
        let (level, parent) = (node.level, node.parent);
        let floor = floor
            .filter(|&f| f != id)
            .filter(|&f| self.nodes.get(f).is_some_and(|n| n.parent == parent && n.level <= level));
        let Some(ends) = self.orders.get_mut(&parent) else { return };
        unlink(&mut self.nodes, ends, Chain::Stack, id);
        let mut after = None;
        let mut passed_floor = floor.is_none();
        for n in StackIter::new(&self.nodes, ends.first, true) {
            if passed_floor && self.nodes[n].level >= level {
                break;
            }
            passed_floor |= Some(n) == floor;
            after = Some(n);
        }
        link_after(&mut self.nodes, ends, Chain::Stack, id, after);
    }

    /// Lifts all of `owner`'s nodes out of `parent`'s stacking order,
    /// keeping their relative order. Other owners' nodes are untouched.
    pub fn unweave(&mut self, parent: WindowId, owner: GroupId) -> Unweaved {
        let ids: Vec<_> = self.stack(parent).filter(|&n| self.nodes[n].owner == owner).collect();
        if let Some(ends) = self.orders.get_mut(&parent) {
            for &id in &ids {
                unlink(&mut self.nodes, ends, Chain::Stack, id);
            }
        }
        Unweaved { ids }
    }

    /// Splices previously unweaved nodes into `parent`'s stacking order.
    ///
    /// Each node goes above the topmost node of the same or a lower tier,
    /// so relative order among the woven nodes is kept.
    pub fn weave(&mut self, unweaved: Unweaved, parent: WindowId) {
        let ends = self.orders.entry(parent).or_default();
        for id in unweaved.ids {
            let Some(node) = self.nodes.get_mut(id) else { continue };
            node.parent = parent;
            let level = node.level;
            let after =
                StackIter::new(&self.nodes, ends.last, false).find(|&n| self.nodes[n].level <= level);
            link_after(&mut self.nodes, ends, Chain::Stack, id, after);
        }
    }

    /// Checks that the management list of `owner` and its filtered view of
    /// `parent`'s stacking order hold the same nodes.
    #[cfg(test)]
    pub fn check_invariants(&self, owner: GroupId, parent: WindowId) {
        use crate::common::collections::BTreeSet;
        let managed: BTreeSet<_> = self.managed(owner).map(|id| self.nodes[id].region).collect();
        let stacked: BTreeSet<_> = self
            .stack(parent)
            .filter(|&id| self.nodes[id].owner == owner)
            .map(|id| self.nodes[id].region)
            .collect();
        assert_eq!(managed, stacked, "management list and stacking order disagree");
        for id in self.stack(parent) {
            assert_eq!(self.nodes[id].parent, parent);
        }
        let levels: Vec<_> = self.stack(parent).map(|id| self.nodes[id].level).collect();
        assert!(levels.is_sorted(), "stacking order breaks tiers: {levels:?}");
    }
}

pub struct ManagedIter<'a> {
    nodes: &'a Nodes,
    cur: Option<StackingId>,
}

impl<'a> Iterator for ManagedIter<'a> {
    type Item = StackingId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        self.cur = self.nodes.get(id).and_then(|n| n.managed.next);
        Some(id)
    }
}

pub struct StackIter<'a> {
    nodes: &'a Nodes,
    cur: Option<StackingId>,
    upward: bool,
}

impl<'a> StackIter<'a> {
    fn new(nodes: &'a Nodes, cur: Option<StackingId>, upward: bool) -> Self {
        StackIter { nodes, cur, upward }
    }
}

impl<'a> Iterator for StackIter<'a> {
    type Item = StackingId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let links = self.nodes.get(id).map(|n| n.stack);
        self.cur = links.and_then(|l| if self.upward { l.next } else { l.prev });
        Some(id)
    }
}
