//! Focus history: a doubly linked ledger of visits, oldest at `head`.
//!
//! Every scope (a node, or a desktop for desktop-level visits) has at most one
//! entry flagged `latest`. The `needle` is the browsing cursor used when
//! stepping through history without recording.

use slotmap::SlotMap;
use tracing::trace;

use super::desktop::DesktopId;
use super::monitor::MonitorId;
use super::selector::Coordinates;
use super::tree::{NodeId, NodeMap};
use crate::layout_engine::HistoryDir;

slotmap::new_key_type! {
    pub struct HistoryId;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryEntry {
    pub monitor: MonitorId,
    pub desktop: DesktopId,
    pub node: Option<NodeId>,
    pub latest: bool,
    prev: Option<HistoryId>,
    next: Option<HistoryId>,
}

impl HistoryEntry {
    pub fn loc(&self) -> Coordinates { Coordinates::new(self.monitor, self.desktop, self.node) }

    fn same_scope(&self, desktop: DesktopId, node: Option<NodeId>) -> bool {
        match node {
            Some(n) => self.node == Some(n),
            None => self.node.is_none() && self.desktop == desktop,
        }
    }
}

pub struct History {
    entries: SlotMap<HistoryId, HistoryEntry>,
    head: Option<HistoryId>,
    tail: Option<HistoryId>,
    needle: Option<HistoryId>,
    pub record: bool,
}

impl Default for History {
    fn default() -> Self { History::new(true) }
}

impl History {
    pub fn new(record: bool) -> History {
        History {
            entries: SlotMap::default(),
            head: None,
            tail: None,
            needle: None,
            record,
        }
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            let e = &self.entries[cur?];
            cur = e.next;
            Some(e)
        })
    }

    /// Entries from newest to oldest.
    pub fn iter_rev(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        let mut cur = self.tail;
        std::iter::from_fn(move || {
            let e = &self.entries[cur?];
            cur = e.prev;
            Some(e)
        })
    }

    pub fn needle(&self) -> Option<&HistoryEntry> { self.needle.and_then(|h| self.entries.get(h)) }

    /// Records a visit. Focused visits land at the tail; others are slotted
    /// next to the most recent entry of the same desktop (or monitor).
    pub fn add(&mut self, m: MonitorId, d: DesktopId, n: Option<NodeId>, focused: bool) {
        if !self.record {
            return;
        }
        if focused {
            self.needle = None;
        }

        let Some(tail) = self.tail else {
            let h = self.entries.insert(Self::entry(m, d, n));
            self.head = Some(h);
            self.tail = Some(h);
            return;
        };

        if self.entries[tail].same_scope(d, n) {
            return;
        }

        let mut ip = if focused { Some(tail) } else { None };
        let mut cur = Some(tail);
        while let Some(hh) = cur {
            let e = &mut self.entries[hh];
            if e.same_scope(d, n) {
                e.latest = false;
            }
            if ip.is_none() && ((n.is_some() && e.desktop == d) || (n.is_none() && e.monitor == m)) {
                ip = Some(hh);
            }
            cur = e.prev;
        }

        let h = self.entries.insert(Self::entry(m, d, n));
        match ip {
            Some(ip) => self.insert_after(h, ip),
            None => {
                let before = self
                    .iter_ids()
                    .find(|&hh| self.entries[hh].latest && self.entries[hh].monitor == m)
                    .or(self.head);
                if let Some(before) = before {
                    self.insert_before(h, before);
                }
            }
        }
        trace!(len = self.entries.len(), "history add");
    }

    fn entry(m: MonitorId, d: DesktopId, n: Option<NodeId>) -> HistoryEntry {
        HistoryEntry {
            monitor: m,
            desktop: d,
            node: n,
            latest: true,
            prev: None,
            next: None,
        }
    }

    fn iter_ids(&self) -> impl Iterator<Item = HistoryId> + '_ {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            let h = cur?;
            cur = self.entries[h].next;
            Some(h)
        })
    }

    fn insert_after(&mut self, a: HistoryId, b: HistoryId) {
        let b_next = self.entries[b].next;
        self.entries[a].next = b_next;
        if let Some(bn) = b_next {
            self.entries[bn].prev = Some(a);
        }
        self.entries[b].next = Some(a);
        self.entries[a].prev = Some(b);
        if self.tail == Some(b) {
            self.tail = Some(a);
        }
    }

    fn insert_before(&mut self, a: HistoryId, b: HistoryId) {
        let b_prev = self.entries[b].prev;
        self.entries[a].prev = b_prev;
        if let Some(bp) = b_prev {
            self.entries[bp].next = Some(a);
        }
        self.entries[b].prev = Some(a);
        self.entries[a].next = Some(b);
        if self.head == Some(b) {
            self.head = Some(a);
        }
    }

    /// Drops the entries referring to node `n` (its whole subtree when `deep`).
    pub fn remove_node(&mut self, n: NodeId, deep: bool, map: &NodeMap) {
        self.remove_where(|e| match e.node {
            Some(en) if deep => en.is_descendant_of(n, map),
            Some(en) => en == n,
            None => false,
        });
    }

    /// Drops every entry referring to desktop `d`.
    pub fn remove_desktop(&mut self, d: DesktopId) { self.remove_where(|e| e.desktop == d); }

    /// Files the entries of desktop `d` under monitor `m` after the desktop moved.
    pub fn retarget_desktop(&mut self, d: DesktopId, m: MonitorId) {
        for e in self.entries.values_mut().filter(|e| e.desktop == d) {
            e.monitor = m;
        }
    }

    /// Walks from newest to oldest so that `latest` flags stay consistent,
    /// collapsing neighbours that become duplicates.
    fn remove_where(&mut self, doomed: impl Fn(&HistoryEntry) -> bool) {
        let mut b = self.tail;
        while let Some(bid) = b {
            if !doomed(&self.entries[bid]) {
                b = self.entries[bid].prev;
                continue;
            }
            let a = self.entries[bid].next;
            let mut c = self.entries[bid].prev;

            if let Some(aid) = a {
                let (ad, an) = (self.entries[aid].desktop, self.entries[aid].node);
                while let Some(cid) = c {
                    if !self.entries[cid].same_scope(ad, an) {
                        break;
                    }
                    let p = self.entries[cid].prev;
                    if self.head == Some(cid) {
                        self.head = Some(aid);
                    }
                    if self.needle == Some(cid) {
                        self.needle = self.tail;
                    }
                    self.entries.remove(cid);
                    c = p;
                }
                self.entries[aid].prev = c;
            }

            if let Some(cid) = c {
                self.entries[cid].next = a;
            }
            if self.tail == Some(bid) {
                self.tail = c;
            }
            if self.head == Some(bid) {
                self.head = a;
            }
            if self.needle == Some(bid) {
                self.needle = c;
            }
            self.entries.remove(bid);
            b = c;
        }
        if self.head.is_none() || self.tail.is_none() {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.head = None;
        self.tail = None;
        self.needle = None;
    }

    /// Most recently visited visible node of `d` outside the subtree `exclude`.
    pub fn last_node(&self, d: DesktopId, exclude: Option<NodeId>, map: &NodeMap) -> Option<NodeId> {
        self.iter_rev().find_map(|e| {
            let n = e.node?;
            let visible = map.get(n).is_some_and(|node| !node.hidden);
            let excluded = exclude.is_some_and(|x| n.is_descendant_of(x, map));
            (e.latest && visible && !excluded && e.desktop == d).then_some(n)
        })
    }

    /// Most recently visited desktop of monitor `m` other than `d`.
    pub fn last_desktop(&self, m: MonitorId, d: Option<DesktopId>) -> Option<DesktopId> {
        self.iter_rev()
            .find(|e| e.latest && Some(e.desktop) != d && e.monitor == m)
            .map(|e| e.desktop)
    }

    /// Most recently visited monitor other than `m`.
    pub fn last_monitor(&self, m: Option<MonitorId>) -> Option<MonitorId> {
        self.iter_rev().find(|e| e.latest && Some(e.monitor) != m).map(|e| e.monitor)
    }

    /// Steps from the needle in `dir` to the next `latest` entry accepted by
    /// `accept`. The needle only moves while recording is disabled.
    pub fn find(
        &mut self,
        dir: HistoryDir,
        mut accept: impl FnMut(&HistoryEntry) -> bool,
    ) -> Option<Coordinates> {
        if self.record || self.needle.is_none_or(|h| !self.entries.contains_key(h)) {
            self.needle = self.tail;
        }
        let mut cur = self.needle;
        while let Some(h) = cur {
            let e = &self.entries[h];
            if e.latest && accept(e) {
                let loc = e.loc();
                if !self.record {
                    self.needle = Some(h);
                }
                return Some(loc);
            }
            cur = match dir {
                HistoryDir::Older => e.prev,
                HistoryDir::Newer => e.next,
            };
        }
        None
    }

    /// Newest entry accepted by `accept`, ignoring the needle.
    pub fn find_newest(&self, mut accept: impl FnMut(&HistoryEntry) -> bool) -> Option<Coordinates> {
        self.iter_rev().find(|e| accept(e)).map(|e| e.loc())
    }

    /// Number of entries newer than the latest visit of `n`, or `u32::MAX`.
    pub fn rank(&self, n: NodeId) -> u32 {
        self.iter_rev()
            .position(|e| e.latest && e.node == Some(n))
            .map_or(u32::MAX, |r| r as u32)
    }
}
