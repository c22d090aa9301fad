use pretty_assertions::assert_eq;
use test_log::test;

use crate::common::config::Settings;
use crate::layout_engine::{
    AutomaticScheme, CycleDir, Direction, Flip, HistoryDir, Layout, Output, Rotation, SplitMode, SplitType,
    Tightness,
};
use crate::model::client::ClientState;
use crate::model::error::LayoutError;
use crate::model::selector::{DesktopDescriptor, MonitorDescriptor, MonitorSelect, NodeDescriptor, NodeSelect};
use crate::model::tree::Constraints;
use crate::model::{Coordinates, DesktopId, MonitorId, NodeId, Rect, Selector, World};

struct Fixture {
    world: World,
    m: MonitorId,
    d: DesktopId,
}

fn settings() -> Settings {
    Settings {
        window_gap: 0,
        ..Settings::default()
    }
}

fn screen() -> Rect { Rect::new(0, 0, 1000, 600) }

fn fixture_with(settings: Settings) -> Fixture {
    let mut world = World::new(settings);
    let m = world.add_monitor("HDMI-1", screen());
    let d = world.add_desktop(m, "one").unwrap();
    world.focus_node(None, None, None).unwrap();
    Fixture { world, m, d }
}

fn fixture() -> Fixture { fixture_with(settings()) }

impl Fixture {
    fn window(&mut self, id: u32) -> NodeId {
        let client = self.world.make_client();
        self.world.manage_window(self.d, id, client).unwrap()
    }

    fn windows(&mut self, count: u32) -> Vec<NodeId> { (1..=count).map(|i| self.window(i)).collect() }

    fn root(&self) -> NodeId { self.world.desktops[self.d].root.unwrap() }

    fn focus(&self) -> Option<NodeId> { self.world.desktops[self.d].focus }

    fn leaves(&self) -> Vec<NodeId> { self.root().leaves(&self.world.nodes).collect() }

    fn arrange(&mut self) -> Vec<(NodeId, Rect)> {
        self.world
            .arrange(self.m, self.d)
            .unwrap()
            .into_iter()
            .map(|p| (p.node, p.rectangle))
            .collect()
    }
}

/// Structural invariants every world must satisfy between operations.
fn assert_invariants(world: &World) {
    for (d, desktop) in world.desktops.iter() {
        let Some(root) = desktop.root else {
            assert_eq!(desktop.focus, None);
            continue;
        };
        assert_eq!(world.nodes[root].parent, None);
        for n in root.traverse_preorder(&world.nodes) {
            let node = &world.nodes[n];
            match (node.first_child, node.second_child) {
                (Some(a), Some(b)) => {
                    assert!(node.client.is_none(), "internal node holds a client");
                    assert_eq!(world.nodes[a].parent, Some(n));
                    assert_eq!(world.nodes[b].parent, Some(n));
                    assert!(node.split_ratio > 0.0 && node.split_ratio < 1.0);
                    assert_eq!(
                        node.constraints,
                        Constraints::combine(
                            node.split_type,
                            world.nodes[a].constraints,
                            world.nodes[b].constraints
                        )
                    );
                    assert_eq!(node.vacant, world.nodes[a].vacant && world.nodes[b].vacant);
                }
                (None, None) => {}
                _ => panic!("node {n:?} has a single child"),
            }
        }
        if let Some(f) = desktop.focus {
            assert_eq!(world.desktop_of(f), Some(d));
        }
    }
    assert_history_invariants(world);
}

/// Every history entry points at live records, node entries at a node of
/// their desktop, and each scope has a single latest entry.
fn assert_history_invariants(world: &World) {
    let mut latest = Vec::new();
    for e in world.history.iter() {
        let desktop = world.desktops.get(e.desktop).expect("history entry outlived its desktop");
        assert_eq!(desktop.monitor, e.monitor);
        if let Some(n) = e.node {
            assert!(world.nodes.contains(n), "history entry outlived its node");
            assert_eq!(world.desktop_of(n), Some(e.desktop));
        }
        if e.latest {
            let scope = (e.node, e.node.is_none().then_some(e.desktop));
            assert!(!latest.contains(&scope), "two latest entries for {scope:?}");
            latest.push(scope);
        }
    }
}

mod insertion {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn two_windows_split_the_longest_side() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };

        let root = f.root();
        assert_eq!(f.world.nodes[root].split_type, SplitType::Vertical);
        assert_eq!(f.world.nodes[root].split_ratio, 0.5);
        assert_eq!(f.leaves(), vec![w1, w2]);

        f.arrange();
        assert_eq!(f.world.nodes[w1].rectangle, Rect::new(0, 0, 500, 600));
        assert_eq!(f.world.nodes[w2].rectangle, Rect::new(500, 0, 500, 600));
        assert_invariants(&f.world);
    }

    #[test]
    fn arrange_reports_window_rectangles_without_borders() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };

        let placements = f.world.arrange(f.m, f.d).unwrap();
        assert_eq!(placements.len(), 2);
        assert_eq!((placements[0].node, placements[0].rectangle), (w1, Rect::new(0, 0, 498, 598)));
        assert_eq!((placements[1].node, placements[1].rectangle), (w2, Rect::new(500, 0, 498, 598)));
        assert!(placements.iter().all(|p| p.border_width == 1 && p.changed));

        let again = f.world.arrange(f.m, f.d).unwrap();
        assert!(again.iter().all(|p| !p.changed));
    }

    #[test]
    fn newest_window_takes_focus() {
        let mut f = fixture();
        let ws = f.windows(3);
        assert_eq!(f.focus(), Some(ws[2]));
        assert_eq!(f.world.focused_node(), Some(ws[2]));
        assert_eq!(f.world.clients_count, 3);
    }

    #[test]
    fn first_child_polarity_puts_new_window_first() {
        let mut f = fixture_with(Settings {
            initial_polarity: crate::layout_engine::ChildPolarity::FirstChild,
            ..settings()
        });
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        assert_eq!(f.leaves(), vec![w2, w1]);
    }

    #[test]
    fn spiral_rotates_the_anchor_parent() {
        let mut f = fixture_with(Settings {
            automatic_scheme: AutomaticScheme::Spiral,
            ..settings()
        });
        let [w1, w2, w3] = f.windows(3)[..] else { unreachable!() };

        let root = f.root();
        let inner = f.world.nodes[root].first_child.unwrap();
        assert_eq!(f.world.nodes[root].split_type, SplitType::Vertical);
        assert_eq!(f.world.nodes[root].second_child, Some(w3));
        assert_eq!(f.world.nodes[inner].split_type, SplitType::Horizontal);
        assert_eq!(f.leaves(), vec![w2, w1, w3]);
        assert_invariants(&f.world);
    }

    #[test]
    fn alternate_scheme_flips_the_parent_split() {
        let mut f = fixture_with(Settings {
            automatic_scheme: AutomaticScheme::Alternate,
            ..settings()
        });
        let [_, w2, _] = f.windows(3)[..] else { unreachable!() };
        let parent = w2.parent(&f.world.nodes).unwrap();
        assert_eq!(f.world.nodes[parent].split_type, SplitType::Horizontal);
        assert_eq!(f.world.nodes[f.root()].split_type, SplitType::Vertical);
    }

    #[test]
    fn preselection_directs_the_next_insertion() {
        let mut f = fixture();
        let w1 = f.window(1);
        f.world.presel_dir(w1, Direction::North).unwrap();
        f.world.presel_ratio(w1, 0.25).unwrap();
        let w2 = f.window(2);

        let root = f.root();
        let node = &f.world.nodes[root];
        assert_eq!(node.split_type, SplitType::Horizontal);
        assert_eq!(node.split_mode, SplitMode::Manual);
        assert_eq!(node.split_ratio, 0.25);
        assert_eq!(f.leaves(), vec![w2, w1]);
        assert_eq!(f.world.nodes[w1].presel, None);
    }

    #[test]
    fn presel_ratio_outside_unit_interval_is_rejected() {
        let mut f = fixture();
        let w1 = f.window(1);
        assert_eq!(f.world.presel_ratio(w1, 1.5), Err(LayoutError::InvalidRatio(1.5)));
        assert_eq!(f.world.nodes[w1].presel, None);
    }

    #[test]
    fn private_anchor_is_bypassed() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        f.arrange();
        f.world.set_private(w2, true).unwrap();
        let w3 = f.window(3);
        assert_eq!(w3.brother(&f.world.nodes), Some(w1));
    }

    #[test]
    fn receptacle_is_replaced_by_the_next_window() {
        let mut f = fixture();
        let r = f.world.insert_receptacle(f.d, None).unwrap();
        assert!(f.world.nodes[r].is_receptacle());
        let w = f.window(1);
        assert_eq!(f.root(), w);
        assert!(!f.world.nodes.contains(r));
        assert_eq!(f.world.nodes.len(), 1);
    }

    #[test]
    fn anchor_from_another_desktop_is_rejected() {
        let mut f = fixture();
        let w1 = f.window(1);
        let d2 = f.world.add_desktop(f.m, "two").unwrap();
        let n = f.world.make_node(None);
        assert_eq!(f.world.insert_node(d2, n, Some(w1)), Err(LayoutError::NotInDesktop(w1, d2)));
    }
}

mod removal {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn removing_from_two_leaves_promotes_the_sibling() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        f.arrange();

        f.world.remove_node(f.d, w2).unwrap();
        assert_eq!(f.root(), w1);
        assert_eq!(f.focus(), Some(w1));
        assert_eq!(f.world.nodes.len(), 1);
        assert_eq!(f.world.clients_count, 1);

        f.arrange();
        assert_eq!(f.world.nodes[w1].rectangle, Rect::new(0, 0, 1000, 600));
        assert_eq!(f.world.nodes[w1].constraints, Constraints::default());
        assert_invariants(&f.world);
    }

    #[test]
    fn removal_purges_history() {
        let mut f = fixture();
        let [_, w2] = f.windows(2)[..] else { unreachable!() };
        f.world.remove_node(f.d, w2).unwrap();
        assert!(f.world.history.iter().all(|e| e.node != Some(w2)));
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut f = fixture();
        let [_, w2] = f.windows(2)[..] else { unreachable!() };
        f.world.remove_node(f.d, w2).unwrap();
        assert_eq!(f.world.remove_node(f.d, w2), Err(LayoutError::StaleNode(w2)));
        assert_eq!(f.world.set_ratio(w2, 0.3), Err(LayoutError::StaleNode(w2)));
    }

    #[test]
    fn removing_the_last_window_empties_the_desktop() {
        let mut f = fixture();
        let w1 = f.window(1);
        f.world.remove_node(f.d, w1).unwrap();
        assert_eq!(f.world.desktops[f.d].root, None);
        assert_eq!(f.focus(), None);
        assert!(f.world.nodes.is_empty());
    }

    #[test]
    fn single_monocle_follows_the_tiled_count() {
        let mut f = fixture_with(Settings {
            single_monocle: true,
            ..settings()
        });
        let [_, w2] = f.windows(2)[..] else { unreachable!() };
        assert_eq!(f.world.desktops[f.d].layout, Layout::Tiled);
        f.world.remove_node(f.d, w2).unwrap();
        assert_eq!(f.world.desktops[f.d].layout, Layout::Monocle);
        f.window(3);
        assert_eq!(f.world.desktops[f.d].layout, Layout::Tiled);
    }
}

mod surgery {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn double_half_turn_restores_the_tree() {
        let mut f = fixture();
        f.windows(4);
        let root = f.root();
        f.world.set_ratio(root, 0.25).unwrap();
        let before = f.world.node_state(root);
        let leaves = f.leaves();

        f.world.rotate_tree(root, Rotation::Deg180).unwrap();
        let mut reversed = leaves.clone();
        reversed.reverse();
        assert_eq!(f.leaves(), reversed);
        assert_eq!(f.world.nodes[root].split_ratio, 0.75);

        f.world.rotate_tree(root, Rotation::Deg180).unwrap();
        assert_eq!(f.world.node_state(root), before);
        assert_invariants(&f.world);
    }

    #[test]
    fn three_quarter_turn_toggles_splits() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        let root = f.root();
        f.world.rotate_tree(root, Rotation::Deg270).unwrap();
        assert_eq!(f.world.nodes[root].split_type, SplitType::Horizontal);
        assert_eq!(f.leaves(), vec![w2, w1]);
        assert_invariants(&f.world);
    }

    #[test]
    fn flip_twice_is_identity() {
        let mut f = fixture();
        f.windows(4);
        let root = f.root();
        f.world.set_ratio(root, 0.25).unwrap();
        let before = f.world.node_state(root);
        f.world.flip_tree(root, Flip::Vertical).unwrap();
        assert_eq!(f.world.nodes[root].split_ratio, 0.75);
        f.world.flip_tree(root, Flip::Vertical).unwrap();
        assert_eq!(f.world.node_state(root), before);
    }

    #[test]
    fn flip_skips_other_axis() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        f.world.flip_tree(f.root(), Flip::Horizontal).unwrap();
        assert_eq!(f.leaves(), vec![w1, w2]);
    }

    #[test]
    fn equalize_splits_evenly_whatever_the_default_ratio() {
        let mut f = fixture_with(Settings {
            split_ratio: 0.7,
            ..settings()
        });
        f.windows(3);
        let root = f.root();
        let inner = f.world.nodes[root].second_child.unwrap();
        assert_eq!(f.world.nodes[inner].split_ratio, 0.7);
        f.world.set_ratio(root, 0.2).unwrap();
        f.world.equalize_tree(root).unwrap();
        assert_eq!(f.world.nodes[root].split_ratio, 0.5);
        assert_eq!(f.world.nodes[inner].split_ratio, 0.5);
    }

    #[test]
    fn equalize_is_idempotent() {
        let mut f = fixture();
        f.windows(4);
        let root = f.root();
        f.world.set_ratio(root, 0.25).unwrap();
        f.world.equalize_tree(root).unwrap();
        let once = f.world.node_state(root);
        f.world.equalize_tree(root).unwrap();
        assert_eq!(f.world.node_state(root), once);
        assert_eq!(f.world.nodes[root].split_ratio, 0.5);
    }

    #[test]
    fn balance_weighs_leaves() {
        let mut f = fixture();
        f.windows(3);
        let root = f.root();
        f.world.balance_tree(root).unwrap();
        assert_eq!(f.world.nodes[root].split_ratio, 1.0 / 3.0);
        let inner = f.world.nodes[root].second_child.unwrap();
        assert_eq!(f.world.nodes[inner].split_ratio, 0.5);
    }

    #[test]
    fn balance_leaves_vacant_subtrees_alone() {
        let mut f = fixture();
        let [_, w2, w3] = f.windows(3)[..] else { unreachable!() };
        let root = f.root();
        let inner = f.world.nodes[root].second_child.unwrap();
        f.world.set_ratio(inner, 0.3).unwrap();
        f.world.set_state(f.d, w2, ClientState::Floating).unwrap();
        f.world.set_state(f.d, w3, ClientState::Floating).unwrap();
        assert!(f.world.nodes[inner].vacant);

        f.world.balance_tree(root).unwrap();
        assert_eq!(f.world.nodes[root].split_ratio, 0.5);
        assert_eq!(f.world.nodes[inner].split_ratio, 0.3);
    }

    #[test]
    fn circulate_moves_windows_one_leaf() {
        let mut f = fixture();
        let [w1, w2, w3] = f.windows(3)[..] else { unreachable!() };
        f.world.set_marked(w1, true).unwrap();
        let ids = |f: &Fixture| f.leaves().iter().map(|&n| f.world.nodes[n].id).collect::<Vec<_>>();
        assert_eq!(ids(&f), vec![1, 2, 3]);

        f.world.circulate_leaves(f.d, f.root(), CycleDir::Next).unwrap();
        assert_eq!(f.leaves(), vec![w1, w2, w3]);
        assert_eq!(ids(&f), vec![3, 1, 2]);
        assert!(f.world.nodes[w1].marked);
        assert_eq!(f.focus(), Some(w3));

        f.world.circulate_leaves(f.d, f.root(), CycleDir::Prev).unwrap();
        assert_eq!(ids(&f), vec![1, 2, 3]);
        assert_invariants(&f.world);
    }

    #[test]
    fn set_ratio_rejects_the_bounds() {
        let mut f = fixture();
        f.windows(2);
        let root = f.root();
        assert_eq!(f.world.set_ratio(root, 1.0), Err(LayoutError::InvalidRatio(1.0)));
        assert_eq!(f.world.set_ratio(root, 0.0), Err(LayoutError::InvalidRatio(0.0)));
        assert_eq!(f.world.nodes[root].split_ratio, 0.5);
    }

    #[test]
    fn resize_moves_the_fence() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        f.arrange();
        let root = f.root();

        assert_eq!(f.world.find_fence(w1, Direction::East), Some(root));
        assert_eq!(f.world.find_fence(w1, Direction::West), None);
        f.world.resize_fence(w1, Direction::East, 100).unwrap();
        assert_eq!(f.world.nodes[root].split_ratio, 0.6);

        f.arrange();
        f.world.resize_fence(w2, Direction::West, 100).unwrap();
        assert_eq!(f.world.nodes[root].split_ratio, 0.5);
    }

    #[test]
    fn resize_below_minimum_is_rejected() {
        let mut f = fixture();
        let [w1, _] = f.windows(2)[..] else { unreachable!() };
        f.arrange();
        assert_eq!(f.world.resize_fence(w1, Direction::East, 470), Err(LayoutError::ConstraintViolation));
        assert_eq!(f.world.resize_fence(w1, Direction::North, 10), Err(LayoutError::NoFence));
        assert_eq!(f.world.nodes[f.root()].split_ratio, 0.5);
    }

    #[test]
    fn arrange_clamps_to_constraints() {
        let mut f = fixture();
        f.windows(2);
        let root = f.root();
        f.world.set_ratio(root, 0.01).unwrap();
        let rects = f.arrange();
        assert_eq!(rects[0].1.width, 32 - 2);
        assert_eq!(f.world.nodes[root].split_ratio, 32.0 / 1000.0);
    }
}

mod states {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn floating_window_leaves_the_tiling() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        f.arrange();

        assert!(f.world.set_state(f.d, w2, ClientState::Floating).unwrap());
        assert!(f.world.nodes[w2].vacant);
        let rects = f.arrange();
        assert_eq!(rects, vec![(w1, Rect::new(0, 0, 998, 598)), (w2, Rect::new(500, 0, 498, 598))]);
        assert_invariants(&f.world);
    }

    #[test]
    fn fullscreen_covers_the_monitor_without_border() {
        let mut f = fixture();
        let [_, w2] = f.windows(2)[..] else { unreachable!() };
        f.world.set_state(f.d, w2, ClientState::Fullscreen).unwrap();
        let placements = f.world.arrange(f.m, f.d).unwrap();
        let p = placements.iter().find(|p| p.node == w2).unwrap();
        assert_eq!((p.rectangle, p.border_width), (screen(), 0));
        assert_eq!(f.world.nodes[w2].client.as_ref().unwrap().last_state, ClientState::Tiled);
    }

    #[test]
    fn pseudo_tiled_window_is_centred() {
        let mut f = fixture();
        let w1 = f.window(1);
        f.world.nodes[w1].client.as_mut().unwrap().floating_rectangle = Rect::new(0, 0, 200, 100);
        f.world.set_state(f.d, w1, ClientState::PseudoTiled).unwrap();
        let rects = f.arrange();
        assert_eq!(rects, vec![(w1, Rect::new(399, 249, 200, 100))]);
    }

    #[test]
    fn hiding_the_focus_hands_it_over() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        assert!(f.world.set_hidden(f.d, w2, true).unwrap());
        assert_eq!(f.focus(), Some(w1));
        assert_eq!(f.arrange(), vec![(w1, Rect::new(0, 0, 998, 598))]);

        f.world.set_hidden(f.d, w2, false).unwrap();
        assert_eq!(f.arrange().len(), 2);
        assert_invariants(&f.world);
    }

    #[test]
    fn monocle_gives_everyone_the_full_area() {
        let mut f = fixture();
        f.windows(2);
        f.world.set_layout(f.d, Layout::Monocle, true).unwrap();
        let rects = f.arrange();
        assert!(rects.iter().all(|(_, r)| *r == Rect::new(0, 0, 998, 598)));
    }

    #[test]
    fn floating_windows_honor_size_hints() {
        let mut f = fixture_with(Settings {
            honor_size_hints: true,
            ..settings()
        });
        let mut client = f.world.make_client().with_floating_rectangle(Rect::new(10, 10, 100, 100));
        client.size_hints.min_size = Some((300, 300));
        let w = f.world.manage_window(f.d, 1, client).unwrap();
        f.world.set_state(f.d, w, ClientState::Floating).unwrap();
        assert_eq!(f.arrange(), vec![(w, Rect::new(10, 10, 300, 300))]);
    }

    #[test]
    fn focused_window_never_turns_urgent() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        assert!(!f.world.set_urgent(w2, true).unwrap());
        assert!(f.world.set_urgent(w1, true).unwrap());
        assert!(f.world.is_urgent(f.d));
        f.world.focus_node(None, None, Some(w1)).unwrap();
        assert!(!f.world.nodes[w1].client.as_ref().unwrap().urgent);
    }
}

mod transfer {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn node_moves_between_desktops() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        let d2 = f.world.add_desktop(f.m, "two").unwrap();

        assert!(f.world.transfer_node(f.d, w2, d2, None, false).unwrap());
        assert_eq!(f.root(), w1);
        assert_eq!(f.focus(), Some(w1));
        assert_eq!(f.world.desktops[d2].root, Some(w2));
        assert_eq!(f.world.desktops[d2].focus, Some(w2));
        assert_invariants(&f.world);
    }

    #[test]
    fn transfer_next_to_own_parent_is_rejected() {
        let mut f = fixture();
        let [w1, _] = f.windows(2)[..] else { unreachable!() };
        let root = f.root();
        assert!(matches!(
            f.world.transfer_node(f.d, w1, f.d, Some(root), false),
            Err(LayoutError::InvalidTransfer(_))
        ));
    }

    #[test]
    fn sticky_window_follows_the_desktop_switch() {
        let mut f = fixture();
        let w1 = f.window(1);
        let d2 = f.world.add_desktop(f.m, "two").unwrap();
        f.world.set_sticky(f.d, w1, true).unwrap();
        assert_eq!(f.world.monitors[f.m].sticky_count, 1);

        f.world.focus_node(Some(f.m), Some(d2), None).unwrap();
        assert_eq!(f.world.desktops[d2].root, Some(w1));
        assert_eq!(f.world.desktops[f.d].root, None);
        assert_eq!(f.world.focused_node(), Some(w1));
        assert_eq!(f.world.monitors[f.m].sticky_count, 1);
    }

    #[test]
    fn merging_desktops_moves_the_whole_tree() {
        let mut f = fixture();
        f.windows(3);
        let d2 = f.world.add_desktop(f.m, "two").unwrap();
        f.world.merge_desktops(f.d, d2).unwrap();
        assert_eq!(f.world.desktops[f.d].root, None);
        assert_eq!(f.world.tiled_count(f.world.desktops[d2].root, false), 3);
        assert_invariants(&f.world);
    }
}

mod containment {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn two_monitors() -> (World, MonitorId, MonitorId) {
        let mut world = World::new(settings());
        let b = world.add_monitor("B", Rect::new(1000, 0, 1000, 600));
        let a = world.add_monitor("A", Rect::new(0, 0, 1000, 600));
        world.add_desktop(a, "a1").unwrap();
        world.add_desktop(b, "b1").unwrap();
        (world, a, b)
    }

    #[test]
    fn monitors_are_kept_in_reading_order() {
        let (world, a, b) = two_monitors();
        assert_eq!(world.monitor_order, vec![a, b]);
    }

    #[test]
    fn last_desktop_cannot_leave() {
        let (mut world, a, b) = two_monitors();
        let a1 = world.monitors[a].desktops[0];
        assert_eq!(world.remove_desktop(a1), Err(LayoutError::LastDesktop(a)));
        assert_eq!(world.transfer_desktop(a1, b, false), Err(LayoutError::LastDesktop(a)));
        assert_eq!(world.monitors[a].desktops, vec![a1]);
    }

    #[test]
    fn removing_a_desktop_keeps_its_windows() {
        let mut f = fixture();
        let d2 = f.world.add_desktop(f.m, "two").unwrap();
        let w = f.window(1);
        f.world.remove_desktop(f.d).unwrap();
        assert!(!f.world.desktops.contains_key(f.d));
        assert_eq!(f.world.desktops[d2].root, Some(w));
        assert_eq!(f.world.focused_desktop(), Some(d2));
    }

    #[test]
    fn merging_monitors_moves_every_desktop() {
        let (mut world, a, b) = two_monitors();
        world.add_desktop(b, "b2").unwrap();
        world.merge_monitors(b, a).unwrap();
        assert!(!world.monitors.contains_key(b));
        assert_eq!(world.monitors[a].desktops.len(), 3);
        assert_eq!(world.monitor_order, vec![a]);
    }

    #[test]
    fn swapping_desktops_across_monitors() {
        let (mut world, a, b) = two_monitors();
        let (a1, b1) = (world.monitors[a].desktops[0], world.monitors[b].desktops[0]);
        world.swap_desktops(a1, b1, false).unwrap();
        assert_eq!(world.monitors[a].desktops, vec![b1]);
        assert_eq!(world.monitors[b].desktops, vec![a1]);
        assert_eq!(world.monitors[a].desk, Some(b1));
        assert_eq!(world.desktops[a1].monitor, b);
    }

    #[test]
    fn topology_update_merges_unplugged_monitors() {
        let (mut world, a, b) = two_monitors();
        world.settings.remove_unplugged_monitors = true;
        let outputs = [
            Output { name: "A".into(), rect: Some(Rect::new(0, 0, 1000, 600)), connected: true, primary: true },
            Output { name: "B".into(), rect: None, connected: false, primary: false },
            Output { name: "C".into(), rect: Some(Rect::new(0, 600, 1000, 600)), connected: true, primary: false },
        ];
        world.update_monitors(&outputs).unwrap();

        assert!(!world.monitors.contains_key(b));
        assert_eq!(world.monitors[a].desktops.len(), 2);
        assert_eq!(world.primary, Some(a));
        let c = world.monitor_order[1];
        assert_eq!(world.monitors[c].name, "C");
        assert_eq!(world.desktops[world.monitors[c].desk.unwrap()].name, "Desktop");
    }

    #[test]
    fn topology_update_merges_covered_monitors() {
        let mut world = World::new(settings());
        world.settings.merge_overlapping_monitors = true;
        let a = world.add_monitor("A", Rect::new(0, 0, 1000, 600));
        let b = world.add_monitor("B", Rect::new(100, 100, 400, 300));
        world.add_desktop(a, "a1").unwrap();
        world.add_desktop(b, "b1").unwrap();
        let outputs = [
            Output { name: "A".into(), rect: Some(Rect::new(0, 0, 1000, 600)), connected: true, primary: false },
            Output { name: "B".into(), rect: Some(Rect::new(100, 100, 400, 300)), connected: true, primary: true },
        ];
        world.update_monitors(&outputs).unwrap();

        assert!(!world.monitors.contains_key(b));
        assert_eq!(world.monitor_order, vec![a]);
        assert_eq!(world.monitors[a].desktops.len(), 2);
        assert_eq!(world.primary, Some(a));
        assert_invariants(&world);
    }

    #[test]
    fn resizing_a_monitor_carries_floating_windows() {
        let mut f = fixture();
        let client = f.world.make_client().with_floating_rectangle(Rect::new(450, 250, 100, 100));
        let w = f.world.manage_window(f.d, 1, client).unwrap();
        f.world.set_state(f.d, w, ClientState::Floating).unwrap();
        f.world.update_root(f.m, Rect::new(0, 0, 2000, 1200)).unwrap();
        assert_eq!(f.world.nodes[w].client.as_ref().unwrap().floating_rectangle, Rect::new(950, 550, 100, 100));
    }

    #[test]
    fn managed_windows_are_pulled_onto_their_monitor() {
        let mut f = fixture();
        let client = f.world.make_client().with_floating_rectangle(Rect::new(1200, 700, 100, 100));
        let w = f.world.manage_window(f.d, 1, client).unwrap();
        assert_eq!(f.world.nodes[w].client.as_ref().unwrap().floating_rectangle, Rect::new(900, 500, 100, 100));
    }

    #[test]
    fn monitor_lookup_by_point_and_client() {
        let (world, a, b) = two_monitors();
        assert_eq!(world.monitor_from_point(crate::model::Point::new(1500, 10)), Some(b));
        let client = world.make_client().with_floating_rectangle(Rect::new(-500, 0, 100, 100));
        assert_eq!(world.monitor_from_client(&client), Some(a));
    }
}

mod history {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn revisits_keep_a_single_latest_entry() {
        let mut f = fixture();
        let [a, b] = f.windows(2)[..] else { unreachable!() };
        f.world.focus_node(None, None, Some(a)).unwrap();
        f.world.focus_node(None, None, Some(b)).unwrap();
        f.world.focus_node(None, None, Some(a)).unwrap();
        for n in [a, b] {
            let latest = f.world.history.iter().filter(|e| e.latest && e.node == Some(n)).count();
            assert_eq!(latest, 1);
        }
        assert_eq!(f.world.history.rank(a), 0);
        assert_eq!(f.world.history.rank(b), 1);
        assert_invariants(&f.world);
    }

    #[test]
    fn removals_keep_history_consistent() {
        let mut f = fixture();
        let [a, b, c] = f.windows(3)[..] else { unreachable!() };
        let d2 = f.world.add_desktop(f.m, "two").unwrap();
        f.world.transfer_node(f.d, c, d2, None, false).unwrap();
        f.world.focus_node(Some(f.m), Some(d2), Some(c)).unwrap();
        f.world.focus_node(Some(f.m), Some(f.d), Some(a)).unwrap();
        f.world.focus_node(None, None, Some(b)).unwrap();
        assert_invariants(&f.world);

        f.world.remove_node(f.d, b).unwrap();
        assert!(f.world.history.iter().all(|e| e.node != Some(b)));
        assert_invariants(&f.world);

        f.world.remove_desktop(d2).unwrap();
        assert!(f.world.history.iter().all(|e| e.desktop != d2));
        assert_eq!(f.world.desktop_of(c), Some(f.d));
        assert_invariants(&f.world);
    }

    #[test]
    fn merging_monitors_keeps_history_consistent() {
        let mut world = World::new(settings());
        let a = world.add_monitor("A", Rect::new(0, 0, 1000, 600));
        let b = world.add_monitor("B", Rect::new(1000, 0, 1000, 600));
        let a1 = world.add_desktop(a, "a1").unwrap();
        let b1 = world.add_desktop(b, "b1").unwrap();
        let wa = world.manage_window(a1, 1, world.make_client()).unwrap();
        let wb = world.manage_window(b1, 2, world.make_client()).unwrap();
        world.focus_node(Some(b), Some(b1), Some(wb)).unwrap();
        world.focus_node(Some(a), Some(a1), Some(wa)).unwrap();
        assert_invariants(&world);

        world.merge_monitors(b, a).unwrap();
        assert!(world.history.iter().all(|e| e.monitor == a));
        assert_eq!(world.desktop_of(wb), Some(b1));
        assert_invariants(&world);
    }

    #[test]
    fn older_from_a_after_a_b_a_is_b() {
        let mut f = fixture();
        let [a, b] = f.windows(2)[..] else { unreachable!() };
        f.world.focus_node(None, None, Some(a)).unwrap();
        f.world.focus_node(None, None, Some(b)).unwrap();
        f.world.focus_node(None, None, Some(a)).unwrap();

        let reference = f.world.focused();
        let found = f.world.history_find_node(HistoryDir::Older, &reference, &NodeSelect::any());
        assert_eq!(found.and_then(|c| c.node), Some(b));
        assert_eq!(f.world.last_node(f.d, Some(a)), Some(b));
    }
}

mod selectors {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn directional_search_finds_the_neighbour() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        f.arrange();
        let from = Coordinates::new(f.m, f.d, Some(w1));
        let east = f.world.find_nearest_neighbor(&from, Direction::East, &NodeSelect::any());
        assert_eq!(east.and_then(|c| c.node), Some(w2));
        for dir in [Direction::West, Direction::North, Direction::South] {
            assert_eq!(f.world.find_nearest_neighbor(&from, dir, &NodeSelect::any()), None);
        }
    }

    #[test]
    fn directional_results_lie_on_the_requested_side() {
        let mut f = fixture();
        let ws = f.windows(5);
        f.arrange();
        let tightness = f.world.settings.directional_focus_tightness;
        for &n in &ws {
            let from = Coordinates::new(f.m, f.d, Some(n));
            let rect = f.world.get_rectangle(Some(f.m), Some(f.d), Some(n));
            for dir in [Direction::North, Direction::West, Direction::South, Direction::East] {
                if let Some(found) = f.world.find_nearest_neighbor(&from, dir, &NodeSelect::any()) {
                    let other = f.world.get_rectangle(Some(f.m), Some(f.d), found.node);
                    assert!(rect.on_dir_side(&other, dir, tightness));
                    assert_ne!(found.node, Some(n));
                }
            }
        }
    }

    #[test]
    fn strict_tightness_skips_windows_inside_the_span() {
        let mut f = fixture();
        let client = f.world.make_client().with_floating_rectangle(Rect::new(100, 100, 200, 200));
        let w1 = f.window(1);
        let w2 = f.world.manage_window(f.d, 2, client).unwrap();
        f.world.set_state(f.d, w2, ClientState::Floating).unwrap();
        f.arrange();

        let from = Coordinates::new(f.m, f.d, Some(w1));
        let east = |world: &World| world.find_nearest_neighbor(&from, Direction::East, &NodeSelect::any());
        assert_eq!(f.world.settings.directional_focus_tightness, Tightness::High);
        assert_eq!(east(&f.world), None);
        f.world.settings.directional_focus_tightness = Tightness::Low;
        assert_eq!(east(&f.world).and_then(|c| c.node), Some(w2));
    }

    #[test]
    fn cycling_wraps_around() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        let windows = NodeSelect::windows();
        let sel = Selector::Node(NodeDescriptor::Cycle(CycleDir::Next), windows);
        let from = |n| Coordinates::new(f.m, f.d, Some(n));
        let (r1, r2) = (from(w1), from(w2));
        assert_eq!(f.world.resolve(&sel, &r1).and_then(|c| c.node), Some(w2));
        assert_eq!(f.world.resolve(&sel, &r2).and_then(|c| c.node), Some(w1));
    }

    #[test]
    fn membership_flags_filter_candidates() {
        let mut f = fixture();
        let [w1, w2] = f.windows(2)[..] else { unreachable!() };
        let reference = f.world.focused();
        let focused = Selector::Node(NodeDescriptor::Focused, NodeSelect::any());
        assert_eq!(f.world.resolve(&focused, &reference).and_then(|c| c.node), Some(w2));

        let unfocused_window = NodeSelect {
            focused: Some(false),
            ..NodeSelect::windows()
        };
        let any = Selector::Node(NodeDescriptor::Any, unfocused_window);
        assert_eq!(f.world.resolve(&any, &reference).and_then(|c| c.node), Some(w1));

        let floating = NodeSelect {
            floating: Some(true),
            ..NodeSelect::any()
        };
        assert_eq!(f.world.resolve(&Selector::Node(NodeDescriptor::Any, floating), &reference), None);
    }

    #[test]
    fn desktops_by_index_and_name() {
        let mut f = fixture();
        let d2 = f.world.add_desktop(f.m, "two").unwrap();
        let reference = f.world.focused();
        let by_index = Selector::Desktop(DesktopDescriptor::Index(2), Default::default());
        let by_name = Selector::Desktop(DesktopDescriptor::Name("two".into()), Default::default());
        assert_eq!(f.world.resolve(&by_index, &reference).and_then(|c| c.desktop), Some(d2));
        assert_eq!(f.world.resolve(&by_name, &reference).and_then(|c| c.desktop), Some(d2));
        let next = Selector::Desktop(DesktopDescriptor::Cycle(CycleDir::Next), Default::default());
        assert_eq!(f.world.resolve(&next, &reference).and_then(|c| c.desktop), Some(d2));
    }

    #[test]
    fn monitors_by_direction() {
        let mut world = World::new(settings());
        let a = world.add_monitor("A", Rect::new(0, 0, 1000, 600));
        let b = world.add_monitor("B", Rect::new(1000, 0, 1000, 600));
        assert_eq!(world.nearest_monitor(a, Direction::East, &MonitorSelect::default()), Some(b));
        assert_eq!(world.nearest_monitor(a, Direction::West, &MonitorSelect::default()), None);
        let sel = Selector::Monitor(MonitorDescriptor::Name("B".into()), MonitorSelect::default());
        assert_eq!(world.resolve(&sel, &Coordinates::monitor(a)).and_then(|c| c.monitor), Some(b));
    }

    #[test]
    fn biggest_and_smallest_leaves() {
        let mut f = fixture();
        let [w1, _, w3] = f.windows(3)[..] else { unreachable!() };
        f.arrange();
        let reference = f.world.focused();
        let biggest = Selector::Node(NodeDescriptor::Biggest, NodeSelect::any());
        let smallest = Selector::Node(NodeDescriptor::Smallest, NodeSelect::any());
        assert_eq!(f.world.resolve(&biggest, &reference).and_then(|c| c.node), Some(w1));
        assert_ne!(f.world.resolve(&smallest, &reference).and_then(|c| c.node), Some(w1));
        let by_id = Selector::Node(NodeDescriptor::Id(3), NodeSelect::any());
        assert_eq!(f.world.resolve(&by_id, &reference).and_then(|c| c.node), Some(w3));
    }

    #[test]
    fn window_ids_never_collide_with_internal_ids() {
        let mut f = fixture();
        let ws = f.windows(4);
        let mut ids: Vec<u32> = f.root().traverse_preorder(&f.world.nodes).map(|n| f.world.nodes[n].id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), f.world.nodes.len());

        let reference = f.world.focused();
        for (&w, id) in ws.iter().zip(1..) {
            assert_eq!(f.world.nodes.find_id(id), Some(w));
            let by_id = Selector::Node(NodeDescriptor::Id(id), NodeSelect::any());
            assert_eq!(f.world.resolve(&by_id, &reference).and_then(|c| c.node), Some(w));
        }

        let client = f.world.make_client();
        assert_eq!(f.world.manage_window(f.d, 2, client), Err(LayoutError::DuplicateWindow(2)));
        assert_eq!(f.leaves(), ws);
        assert_eq!(f.world.clients_count, 4);
    }
}

mod sequences {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    /// Deterministic generator so a failing sequence replays exactly.
    struct Lcg(u64);

    impl Lcg {
        fn below(&mut self, bound: usize) -> usize {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 33) as usize % bound.max(1)
        }
    }

    const ROTATIONS: [Rotation; 3] = [Rotation::Deg90, Rotation::Deg180, Rotation::Deg270];
    const STATES: [ClientState; 4] =
        [ClientState::Tiled, ClientState::PseudoTiled, ClientState::Floating, ClientState::Fullscreen];

    fn run(scheme: AutomaticScheme, seed: u64) {
        let mut f = fixture_with(Settings {
            automatic_scheme: scheme,
            ..settings()
        });
        let d2 = f.world.add_desktop(f.m, "two").unwrap();
        let desktops = [f.d, d2];
        let mut rng = Lcg(seed);
        let mut window = 1;

        for _ in 0..150 {
            let d = desktops[rng.below(2)];
            let nodes: Vec<NodeId> = f.world.desktops[d]
                .root
                .map(|r| r.traverse_preorder(&f.world.nodes).collect())
                .unwrap_or_default();
            let pick = (!nodes.is_empty()).then(|| nodes[rng.below(nodes.len())]);
            match (rng.below(10), pick) {
                (0 | 1, _) | (_, None) => {
                    let client = f.world.make_client();
                    f.world.manage_window(d, window, client).unwrap();
                    window += 1;
                }
                (2, Some(n)) => f.world.remove_node(d, n).unwrap(),
                (3, Some(n)) => f.world.rotate_tree(n, ROTATIONS[rng.below(3)]).unwrap(),
                (4, Some(n)) => {
                    let flip = if rng.below(2) == 0 { Flip::Horizontal } else { Flip::Vertical };
                    f.world.flip_tree(n, flip).unwrap();
                }
                (5, Some(n)) => {
                    if rng.below(2) == 0 {
                        f.world.equalize_tree(n).unwrap();
                    } else {
                        f.world.balance_tree(n).unwrap();
                    }
                }
                (6, Some(n)) => {
                    let dir = if rng.below(2) == 0 { CycleDir::Next } else { CycleDir::Prev };
                    f.world.circulate_leaves(d, n, dir).unwrap();
                }
                (7, Some(n)) => {
                    let dd = desktops[rng.below(2)];
                    let _ = f.world.transfer_node(d, n, dd, None, rng.below(2) == 0);
                }
                (8, Some(n)) => {
                    let _ = f.world.set_state(d, n, STATES[rng.below(4)]);
                }
                (_, Some(n)) => {
                    f.world.focus_node(Some(f.m), Some(d), Some(n)).unwrap();
                }
            }
            for d in desktops {
                f.world.arrange(f.m, d).unwrap();
            }
            assert_invariants(&f.world);
        }
    }

    #[test]
    fn random_edits_keep_the_world_consistent() {
        for scheme in [AutomaticScheme::LongestSide, AutomaticScheme::Alternate, AutomaticScheme::Spiral] {
            for seed in 0..8 {
                run(scheme, seed);
            }
        }
    }
}

mod snapshots {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn state_dump_uses_camel_case() {
        let mut f = fixture();
        f.windows(2);
        let json = f.world.query_state_json().unwrap();
        assert!(json.contains("\"focusedMonitorId\""));
        assert!(json.contains("\"splitRatio\": 0.5"));
    }

    #[test]
    fn tree_drawing_marks_the_focus() {
        let mut f = fixture();
        f.windows(2);
        let drawn = f.world.draw_tree(f.d).unwrap();
        assert_eq!(drawn.matches('☒').count(), 1);
        assert_eq!(drawn.lines().count(), 3);
    }
}
