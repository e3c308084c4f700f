use super::*;
use crate::model::region::{Orientation, RegionConfig, StatusDisplay};
use crate::model::size_policy::{Corner, Placement, RqGeomFlags, SizePolicy};
use crate::model::stacking::StackingLevel;
use crate::sys::display::DisplayError;
use crate::sys::geometry::{Point, Size};
use crate::sys::headless::HeadlessDisplay;

type Cx = Context<HeadlessDisplay>;

fn screen() -> Rect { Rect::new(0, 0, 1000, 800) }

fn setup() -> (Cx, WindowId, Group) {
    let mut display = HeadlessDisplay::new();
    let root = display.add_root(Size::new(1000, 800));
    let mut cx = Context::new(display, Settings::default());
    let group = Group::create(&mut cx, root, &FitParams::exact(screen()), "ws").unwrap();
    (cx, root, group)
}

fn frame(g: &mut Group, cx: &mut Cx, name: &str, params: AttachParams) -> RegionId {
    let spec = AttachSpec { region: RegionConfig::Frame { name: name.into() }, params };
    g.attach_new(cx, &spec).unwrap()
}

fn status_display(cx: &mut Cx, root: WindowId) -> RegionId {
    let bar = StatusDisplay::create(
        &mut cx.display,
        root,
        &FitParams::default(),
        "bar",
        Orientation::Horizontal,
        Size::new(200, 20),
    )
    .unwrap();
    cx.regions.insert(bar)
}

fn window(cx: &Cx, region: RegionId) -> WindowId {
    cx.regions.get(region).and_then(|r| r.window()).unwrap()
}

fn geometry(cx: &Cx, region: RegionId) -> Rect { cx.regions.get(region).unwrap().geometry() }

fn names(cx: &Cx, regions: impl Iterator<Item = RegionId>) -> Vec<String> {
    regions.map(|r| cx.regions.name(r).to_string()).collect()
}

/// Child windows of `parent` that belong to regions, bottom to top.
fn display_order(cx: &Cx, parent: WindowId) -> Vec<String> {
    cx.display
        .stacking(parent)
        .iter()
        .filter_map(|&w| cx.regions.ids().find(|&r| cx.regions.get(r).and_then(|r| r.window()) == Some(w)))
        .map(|r| cx.regions.name(r).to_string())
        .collect()
}

mod lifecycle {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn create_makes_anchor_under_parent() {
        let (mut cx, root, g) = setup();
        let anchor = g.anchor(&cx).unwrap();
        assert_eq!(cx.display.window(anchor).unwrap().parent, Some(root));
        assert!(cx.display.window(anchor).unwrap().input_only);
        assert!(cx.is_live(g.id()));
        let id = g.id();
        g.destroy(&mut cx);
        assert!(!cx.is_live(id));
        assert!(!cx.display.exists(anchor));
    }

    #[test]
    fn destroy_releases_status_display_and_destroys_children() {
        let (mut cx, root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::TopLeft, false).unwrap();
        let a_window = window(&cx, a);

        g.destroy(&mut cx);
        assert!(!cx.regions.contains(a));
        assert!(!cx.display.exists(a_window));
        assert!(cx.regions.contains(bar));
        assert_eq!(cx.regions.manager(bar), None);
    }

    #[test]
    fn rescued_client_windows_outlive_the_group() {
        let (mut cx, root, mut g) = setup();
        let mut keeper = Group::create(&mut cx, root, &FitParams::exact(screen()), "keeper").unwrap();
        let spec = AttachSpec {
            region: RegionConfig::ClientWindow { name: "term".into(), min_size: None, deferred_focus: false },
            params: AttachParams::default(),
        };
        let term = g.attach_new(&mut cx, &spec).unwrap();
        let f = frame(&mut g, &mut cx, "f", AttachParams::default());
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::TopLeft, false).unwrap();

        assert!(g.rescue_clientwins(&mut cx, &mut keeper).is_empty());
        assert_eq!(cx.regions.manager(term), Some(keeper.id()));
        assert_eq!(names(&cx, g.managed(&cx, ManagedFilter::All)), ["bar", "f"]);
        assert_eq!(g.current(&cx), Some(f));
        assert_eq!(keeper.current(&cx), None);

        let f_window = window(&cx, f);
        g.destroy(&mut cx);
        assert!(!cx.display.exists(f_window));
        assert!(cx.display.exists(window(&cx, term)));
        assert_eq!(names(&cx, keeper.managed(&cx, ManagedFilter::All)), ["term"]);
        cx.stacking.check_invariants(keeper.id(), root);
        keeper.destroy(&mut cx);
        cx.regions.destroy(bar, &mut cx.display);
    }

    #[test]
    fn may_destroy_only_when_just_status_display_left() {
        let (mut cx, root, mut g) = setup();
        assert!(g.may_destroy(&cx));
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::TopLeft, false).unwrap();
        assert!(g.may_destroy(&cx));
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        assert!(!g.may_destroy(&cx));
        g.remove_managed(&mut cx, a);
        assert!(g.may_destroy(&cx));
        g.destroy(&mut cx);
    }

    #[test]
    fn map_maps_anchor_and_children() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        assert!(!cx.display.is_mapped(window(&cx, a)));
        g.map(&mut cx);
        assert!(cx.display.is_mapped(g.anchor(&cx).unwrap()));
        assert!(cx.display.is_mapped(window(&cx, a)));

        let b = frame(&mut g, &mut cx, "b", AttachParams::default());
        assert!(cx.display.is_mapped(window(&cx, b)));

        g.unmap(&mut cx);
        assert!(!g.is_mapped(&cx));
        assert!(!cx.display.is_mapped(window(&cx, a)));
        assert!(!cx.display.is_mapped(window(&cx, b)));
        g.destroy(&mut cx);
    }

    #[test]
    fn render_tree_lists_children() {
        let (mut cx, _root, mut g) = setup();
        frame(&mut g, &mut cx, "editor", AttachParams::default());
        let tree = g.draw_tree(&cx);
        assert!(tree.contains("editor"));
        assert!(tree.contains("*current"));
        g.destroy(&mut cx);
    }
}

mod attach {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn attach_then_detach_round_trip() {
        let (mut cx, root, mut g) = setup();
        frame(&mut g, &mut cx, "a", AttachParams { bottom: true, ..Default::default() });
        frame(&mut g, &mut cx, "b", AttachParams::default());
        let before = (
            g.managed(&cx, ManagedFilter::All).collect::<Vec<_>>(),
            g.current(&cx),
            g.bottom(&cx),
        );

        let c = frame(&mut g, &mut cx, "c", AttachParams::default());
        assert_eq!(g.current(&cx), Some(c));
        assert!(g.remove_managed(&mut cx, c));

        let after = (
            g.managed(&cx, ManagedFilter::All).collect::<Vec<_>>(),
            g.current(&cx),
            g.bottom(&cx),
        );
        assert_eq!(before, after);
        cx.stacking.check_invariants(g.id(), root);
        g.destroy(&mut cx);
    }

    #[test]
    fn remove_of_non_member_is_noop() {
        let (mut cx, root, mut g) = setup();
        let bar = status_display(&mut cx, root);
        assert!(!g.remove_managed(&mut cx, bar));
        g.destroy(&mut cx);
    }

    #[test]
    fn management_list_and_stacking_order_agree() {
        let (mut cx, root, mut g) = setup();
        let mut attached = Vec::new();
        for i in 0..6 {
            let level = if i % 3 == 0 { StackingLevel::ON_TOP } else { StackingLevel::NORMAL };
            attached.push(frame(&mut g, &mut cx, &format!("f{i}"), AttachParams::default().with_level(level)));
            cx.stacking.check_invariants(g.id(), root);
        }
        for region in attached.iter().step_by(2) {
            g.remove_managed(&mut cx, *region);
            cx.stacking.check_invariants(g.id(), root);
        }
        assert_eq!(g.managed(&cx, ManagedFilter::All).count(), 3);
        g.destroy(&mut cx);
    }

    #[test]
    fn explicit_geometry_is_relative_to_group() {
        let (mut cx, root, ws) = setup();
        let mut g =
            Group::create(&mut cx, root, &FitParams::exact(Rect::new(100, 50, 800, 600)), "inner")
                .unwrap();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default().with_geom(Rect::new(10, 20, 0, 30)));
        assert_eq!(geometry(&cx, a), Rect::new(110, 70, 1, 30));
        g.destroy(&mut cx);
        ws.destroy(&mut cx);
    }

    #[test]
    fn size_policy_is_applied_on_attach() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(
            &mut g,
            &mut cx,
            "a",
            AttachParams::default()
                .with_geom(Rect::new(5, 5, 10, 10))
                .with_size_policy(SizePolicy::new(Placement::Full)),
        );
        assert_eq!(geometry(&cx, a), screen());
        g.destroy(&mut cx);
    }

    #[test]
    fn duplicate_bottom_is_a_structural_conflict() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams { bottom: true, ..Default::default() });
        let regions = cx.regions.ids().count();

        let spec = AttachSpec {
            region: RegionConfig::Frame { name: "b".into() },
            params: AttachParams { bottom: true, ..Default::default() },
        };
        assert_eq!(g.attach_new(&mut cx, &spec), Err(AttachError::StructuralConflict));
        assert_eq!(g.bottom(&cx), Some(a));
        assert_eq!(cx.regions.ids().count(), regions);
        g.destroy(&mut cx);
    }

    #[test]
    fn failed_factory_changes_nothing() {
        let (mut cx, _root, mut g) = setup();
        let result = g.attach_with(&mut cx, &AttachParams::default(), |_, _, _| None);
        assert_eq!(result, Err(AttachError::FactoryFailed));
        assert_eq!(g.managed(&cx, ManagedFilter::All).count(), 0);
        assert_eq!(g.current(&cx), None);
        g.destroy(&mut cx);
    }

    #[test]
    fn attaching_existing_region_evicts_previous_manager() {
        let (mut cx, root, mut g1) = setup();
        let mut g2 = Group::create(&mut cx, root, &FitParams::exact(screen()), "other").unwrap();
        let a = frame(&mut g1, &mut cx, "a", AttachParams { bottom: true, ..Default::default() });
        assert_eq!(g1.current(&cx), Some(a));

        g2.attach(&mut cx, a, &AttachParams::default()).unwrap();
        assert_eq!(cx.regions.manager(a), Some(g2.id()));
        assert_eq!(g1.current(&cx), None);
        assert_eq!(g1.bottom(&cx), None);
        assert_eq!(g1.managed(&cx, ManagedFilter::All).count(), 0);
        cx.stacking.check_invariants(g1.id(), root);
        cx.stacking.check_invariants(g2.id(), root);
        g1.destroy(&mut cx);
        g2.destroy(&mut cx);
    }

    #[test]
    fn losing_focused_region_to_another_group_refocuses() {
        let (mut cx, root, mut g1) = setup();
        let mut g2 = Group::create(&mut cx, root, &FitParams::exact(screen()), "other").unwrap();
        let a = frame(&mut g1, &mut cx, "a", AttachParams::default());
        let b = frame(&mut g1, &mut cx, "b", AttachParams::default());
        g1.do_set_focus(&mut cx, false);
        assert_eq!(g1.current(&cx), Some(b));

        g2.attach(&mut cx, b, &AttachParams::default()).unwrap();
        assert_eq!(g1.current(&cx), Some(a));
        assert_eq!(cx.display.focused(), Some(window(&cx, a)));
        assert_eq!(g2.current(&cx), Some(b));
        assert_eq!(names(&cx, g1.managed(&cx, ManagedFilter::All)), ["a"]);
        g1.destroy(&mut cx);
        g2.destroy(&mut cx);
    }

    #[test]
    fn reattach_to_same_group_keeps_one_node() {
        let (mut cx, root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        g.attach(&mut cx, a, &AttachParams::default().with_level(StackingLevel::ON_TOP)).unwrap();
        assert_eq!(g.managed(&cx, ManagedFilter::All).collect::<Vec<_>>(), vec![a]);
        assert_eq!(g.current(&cx), Some(a));
        cx.stacking.check_invariants(g.id(), root);
        g.destroy(&mut cx);
    }

    #[test]
    fn factory_region_is_owned_and_destroyed_with_group() {
        let (mut cx, _root, mut g) = setup();
        let bar = g
            .attach_with(&mut cx, &AttachParams::default(), |cx, parent, fp| {
                let bar = StatusDisplay::create(
                    &mut cx.display,
                    parent,
                    fp,
                    "bar",
                    Orientation::Vertical,
                    Size::new(10, 10),
                )
                .ok()?;
                Some(cx.regions.insert(bar))
            })
            .unwrap();
        assert_eq!(geometry(&cx, bar), Rect::new(0, 0, 10, 10));
        assert_eq!(cx.regions.manager(bar), Some(g.id()));

        g.destroy(&mut cx);
        assert!(!cx.regions.contains(bar));
        assert_eq!(cx.display.window_count(), 1);
    }

    #[test]
    fn size_hints_come_from_bottom() {
        let (mut cx, _root, mut g) = setup();
        assert_eq!(g.size_hints(&cx), SizeHints::default());
        let spec = AttachSpec {
            region: RegionConfig::ClientWindow {
                name: "desktop".into(),
                min_size: Some(Size::new(300, 200)),
                deferred_focus: false,
            },
            params: AttachParams { bottom: true, ..Default::default() },
        };
        g.attach_new(&mut cx, &spec).unwrap();
        assert_eq!(g.size_hints(&cx).min, Some(Size::new(300, 200)));
        g.destroy(&mut cx);
    }
}

mod stacking {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn raise_and_lower_within_tier() {
        let (mut cx, root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        let b = frame(&mut g, &mut cx, "b", AttachParams::default());
        frame(&mut g, &mut cx, "top", AttachParams::default().with_level(StackingLevel::ON_TOP));
        assert_eq!(names(&cx, g.stacking_order(&cx)), ["a", "b", "top"]);

        g.raise(&mut cx, a).unwrap();
        assert_eq!(names(&cx, g.stacking_order(&cx)), ["b", "a", "top"]);
        g.lower(&mut cx, a).unwrap();
        assert_eq!(names(&cx, g.stacking_order(&cx)), ["a", "b", "top"]);
        assert_eq!(display_order(&cx, root), ["a", "b", "top"]);

        g.remove_managed(&mut cx, b);
        assert_eq!(g.raise(&mut cx, b), Err(GroupError::NotMember(b)));
        assert_eq!(g.lower(&mut cx, b), Err(GroupError::NotMember(b)));
        g.destroy(&mut cx);
        cx.regions.destroy(b, &mut cx.display);
    }

    #[test]
    fn bottom_region_stays_at_the_floor() {
        let (mut cx, root, mut g) = setup();
        frame(&mut g, &mut cx, "a", AttachParams::default());
        let desk = frame(&mut g, &mut cx, "desk", AttachParams { bottom: true, ..Default::default() });
        let c = frame(&mut g, &mut cx, "c", AttachParams::default());
        assert_eq!(names(&cx, g.stacking_order(&cx)), ["desk", "a", "c"]);

        g.lower(&mut cx, c).unwrap();
        assert_eq!(names(&cx, g.stacking_order(&cx)), ["desk", "c", "a"]);
        g.raise(&mut cx, desk).unwrap();
        assert_eq!(names(&cx, g.stacking_order(&cx)), ["desk", "c", "a"]);
        assert_eq!(display_order(&cx, root), ["desk", "c", "a"]);

        let anchor = g.anchor(&cx).unwrap();
        let desk_window = window(&cx, desk);
        let stack = cx.display.stacking(root);
        let pos = |w| stack.iter().position(|&x| x == w);
        assert!(pos(anchor) < pos(desk_window));
        g.destroy(&mut cx);
    }

    #[test]
    fn new_regions_stay_below_other_groups_in_the_same_tier() {
        let (mut cx, root, mut g1) = setup();
        let mut g2 = Group::create(&mut cx, root, &FitParams::exact(screen()), "other").unwrap();
        frame(&mut g2, &mut cx, "theirs", AttachParams::default());
        let mine = frame(&mut g1, &mut cx, "mine", AttachParams::default());
        assert_eq!(display_order(&cx, root), ["mine", "theirs"]);
        g1.raise(&mut cx, mine).unwrap();
        assert_eq!(display_order(&cx, root), ["theirs", "mine"]);
        g1.destroy(&mut cx);
        g2.destroy(&mut cx);
    }

    #[test]
    fn restack_moves_anchor_and_children() {
        let (mut cx, root, mut g) = setup();
        let other = cx.display.create_window(root, Rect::new(0, 0, 10, 10)).unwrap();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        g.restack(&mut cx, Some(other), StackMode::Above);
        let stack = cx.display.stacking(root);
        assert_eq!(stack[stack.len() - 3..], [other, g.anchor(&cx).unwrap(), window(&cx, a)]);
        g.destroy(&mut cx);
    }
}

mod focus {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::group::focus::Direction;

    #[test]
    fn focus_is_recorded_until_group_controls_it() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        assert_eq!(g.current(&cx), Some(a));
        assert_eq!(cx.display.focused(), None);

        g.do_set_focus(&mut cx, false);
        assert!(g.controls_focus(&cx));
        assert_eq!(cx.display.focused(), Some(window(&cx, a)));

        let b = frame(&mut g, &mut cx, "b", AttachParams::default());
        assert_eq!(cx.display.focused(), Some(window(&cx, b)));
        assert_eq!(g.current(&cx), Some(b));
        g.destroy(&mut cx);
    }

    #[test]
    fn switch_to_false_leaves_focus() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        frame(&mut g, &mut cx, "b", AttachParams { switch_to: Some(false), ..Default::default() });
        assert_eq!(g.current(&cx), Some(a));
        g.destroy(&mut cx);
    }

    #[test]
    fn global_switch_to_setting_applies() {
        let (mut cx, _root, mut g) = setup();
        cx.settings.switch_to_new = false;
        frame(&mut g, &mut cx, "a", AttachParams::default());
        assert_eq!(g.current(&cx), None);
        g.destroy(&mut cx);
    }

    #[test]
    fn detaching_focused_region_focuses_adjacent() {
        let (mut cx, _root, mut g) = setup();
        let _b = frame(&mut g, &mut cx, "b", AttachParams::default());
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        let c = frame(&mut g, &mut cx, "c", AttachParams::default());
        g.do_set_focus(&mut cx, false);
        assert_eq!(g.current(&cx), Some(c));

        g.remove_managed(&mut cx, c);
        assert_eq!(g.current(&cx), Some(a));
        assert_eq!(cx.display.focused(), Some(window(&cx, a)));
        g.destroy(&mut cx);
        cx.regions.destroy(c, &mut cx.display);
    }

    #[test]
    fn status_display_next_to_removed_region_is_passed_over() {
        let (mut cx, root, mut g) = setup();
        let c = frame(&mut g, &mut cx, "c", AttachParams::default());
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::TopLeft, false).unwrap();
        let top = frame(
            &mut g,
            &mut cx,
            "top",
            AttachParams { switch_to: Some(false), ..AttachParams::default().with_level(StackingLevel::ON_TOP) },
        );
        assert_eq!(names(&cx, g.stacking_order(&cx)), ["c", "bar", "top"]);
        g.do_set_focus(&mut cx, false);
        assert_eq!(g.current(&cx), Some(c));

        g.remove_managed(&mut cx, c);
        assert_eq!(g.current(&cx), Some(top));
        assert_eq!(cx.display.focused(), Some(window(&cx, top)));
        g.destroy(&mut cx);
        cx.regions.destroy(c, &mut cx.display);
        cx.regions.destroy(bar, &mut cx.display);
    }

    #[test]
    fn modal_tier_only_honors_same_tier_hint() {
        let (mut cx, _root, mut g) = setup();
        let dialog = frame(&mut g, &mut cx, "dialog", AttachParams { modal: true, ..Default::default() });
        let editor = frame(&mut g, &mut cx, "editor", AttachParams::default());
        assert_eq!(names(&cx, g.stacking_order(&cx)), ["editor", "dialog"]);
        assert_eq!(g.current(&cx), Some(dialog));
        assert_eq!(g.prepare_focus(&cx, editor), Some(dialog));
        assert_eq!(g.prepare_focus(&cx, dialog), Some(dialog));

        let second = frame(&mut g, &mut cx, "second", AttachParams { modal: true, ..Default::default() });
        assert_eq!(g.current(&cx), Some(second));
        assert_eq!(g.prepare_focus(&cx, dialog), Some(dialog));
        assert_eq!(g.prepare_focus(&cx, editor), Some(second));
        g.destroy(&mut cx);
    }

    #[test]
    fn modal_attach_takes_focus_even_without_switch_to() {
        let (mut cx, _root, mut g) = setup();
        frame(&mut g, &mut cx, "a", AttachParams::default());
        let dialog = frame(
            &mut g,
            &mut cx,
            "dialog",
            AttachParams { modal: true, switch_to: Some(false), ..Default::default() },
        );
        assert_eq!(g.current(&cx), Some(dialog));
        g.destroy(&mut cx);
    }

    #[test]
    fn fallback_focus_goes_to_anchor() {
        let (mut cx, root, mut g) = setup();
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::BottomLeft, false).unwrap();
        g.do_set_focus(&mut cx, true);
        assert_eq!(cx.display.focused(), g.anchor(&cx));
        assert_eq!(cx.display.pointer(), screen().center());

        cx.settings.warp_enabled = false;
        cx.display.warp_pointer(Point::new(1, 1));
        g.do_set_focus(&mut cx, true);
        assert_eq!(cx.display.pointer(), Point::new(1, 1));
        g.destroy(&mut cx);
    }

    #[test]
    fn deferred_focus_completes_on_activation() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        g.do_set_focus(&mut cx, false);
        let spec = AttachSpec {
            region: RegionConfig::ClientWindow {
                name: "slow".into(),
                min_size: None,
                deferred_focus: true,
            },
            params: AttachParams::default(),
        };
        let slow = g.attach_new(&mut cx, &spec).unwrap();
        assert_eq!(g.current(&cx), Some(a));
        g.managed_activated(&mut cx, slow);
        assert_eq!(g.current(&cx), Some(slow));
        g.destroy(&mut cx);
    }

    #[test]
    fn circulate_returns_to_start_after_full_cycle() {
        let (mut cx, root, mut g) = setup();
        for name in ["a", "b", "c"] {
            frame(&mut g, &mut cx, name, AttachParams::default());
        }
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::TopRight, false).unwrap();
        let start = g.current(&cx);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let region = g.circulate(&mut cx, Direction::Forward).unwrap();
            assert_ne!(region, bar);
            seen.push(cx.regions.name(region).to_string());
        }
        assert_eq!(seen, ["a", "b", "c"]);
        assert_eq!(g.current(&cx), start);

        for _ in 0..3 {
            g.circulate(&mut cx, Direction::Backward).unwrap();
        }
        assert_eq!(g.current(&cx), start);
        g.destroy(&mut cx);
    }

    #[test]
    fn circulate_with_focus_control_moves_focus() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        frame(&mut g, &mut cx, "b", AttachParams::default());
        g.do_set_focus(&mut cx, false);
        assert_eq!(g.circulate(&mut cx, Direction::Backward), Some(a));
        assert_eq!(cx.display.focused(), Some(window(&cx, a)));
        g.destroy(&mut cx);
    }

    #[test]
    fn circulate_without_alternatives_is_none() {
        let (mut cx, root, mut g) = setup();
        assert_eq!(g.circulate(&mut cx, Direction::Forward), None);
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::TopRight, false).unwrap();
        assert_eq!(g.circulate(&mut cx, Direction::Forward), None);
        frame(&mut g, &mut cx, "only", AttachParams::default());
        assert_eq!(g.circulate(&mut cx, Direction::Forward), None);
        assert_eq!(g.circulate(&mut cx, Direction::Backward), None);
        g.destroy(&mut cx);
    }
}

mod reflow {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn move_shifts_children_by_delta() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default().with_geom(Rect::new(10, 10, 100, 100)));
        let b = frame(&mut g, &mut cx, "b", AttachParams::default().with_geom(Rect::new(-50, 700, 30, 300)));
        let full = frame(
            &mut g,
            &mut cx,
            "full",
            AttachParams::default().with_size_policy(SizePolicy::new(Placement::Full)),
        );

        let report = g.fitrep(&mut cx, None, &FitParams::exact(Rect::new(50, 20, 900, 700))).unwrap();
        assert!(report.rejected.is_empty());
        assert_eq!(g.geometry(&cx), Rect::new(50, 20, 900, 700));
        assert_eq!(geometry(&cx, a), Rect::new(60, 30, 100, 100));
        assert_eq!(geometry(&cx, b), Rect::new(0, 720, 30, 300));
        assert_eq!(geometry(&cx, full), Rect::new(50, 20, 900, 700));
        g.destroy(&mut cx);
    }

    #[test]
    fn reparent_moves_everything_to_new_parent() {
        let (mut cx, root, mut g) = setup();
        let pane = cx.display.create_window(root, Rect::new(0, 0, 1000, 800)).unwrap();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        let b = frame(&mut g, &mut cx, "b", AttachParams::default());
        g.raise(&mut cx, a).unwrap();
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::TopLeft, true).unwrap();

        g.fitrep(&mut cx, Some(pane), &FitParams::exact(screen())).unwrap();
        assert_eq!(g.parent(&cx), pane);
        assert_eq!(cx.display.window(g.anchor(&cx).unwrap()).unwrap().parent, Some(pane));
        assert_eq!(cx.display.window(window(&cx, a)).unwrap().parent, Some(pane));
        assert_eq!(cx.display.window(window(&cx, b)).unwrap().parent, Some(pane));
        assert_eq!(g.status_display(&cx), None);
        assert_eq!(cx.regions.manager(bar), None);
        assert_eq!(names(&cx, g.stacking_order(&cx)), ["b", "a"]);
        assert_eq!(display_order(&cx, pane), ["b", "a"]);
        cx.stacking.check_invariants(g.id(), pane);
        assert_eq!(cx.stacking.stack(root).count(), 0);
        g.destroy(&mut cx);
    }

    #[test]
    fn reparent_across_surfaces_fails_untouched() {
        let (mut cx, root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        let elsewhere = cx.display.add_root(Size::new(640, 480));

        let err = g.fitrep(&mut cx, Some(elsewhere), &FitParams::exact(Rect::new(0, 0, 640, 480)));
        assert_eq!(err, Err(GroupError::CrossSurfaceReparent { from: root, to: elsewhere }));
        assert_eq!(g.parent(&cx), root);
        assert_eq!(g.geometry(&cx), screen());
        assert_eq!(cx.display.window(window(&cx, a)).unwrap().parent, Some(root));
        assert!(g.is_managed(&cx, a));
        g.destroy(&mut cx);
    }

    #[test]
    fn failed_reparent_keeps_status_display_docked() {
        let (mut cx, root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default());
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::TopLeft, false).unwrap();
        let anchor = g.anchor(&cx).unwrap();

        let err = g.fitrep(&mut cx, Some(anchor), &FitParams::exact(screen()));
        assert_eq!(
            err,
            Err(GroupError::Display(DisplayError::BadParent { window: anchor, parent: anchor }))
        );
        assert_eq!(g.status_display(&cx), Some(bar));
        assert_eq!(cx.regions.manager(bar), Some(g.id()));
        assert_eq!(g.parent(&cx), root);
        assert_eq!(cx.display.window(window(&cx, a)).unwrap().parent, Some(root));
        g.destroy(&mut cx);
        cx.regions.destroy(bar, &mut cx.display);
    }

    #[test]
    fn child_rejecting_fit_is_detached() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(&mut g, &mut cx, "a", AttachParams::default().with_geom(Rect::new(0, 0, 10, 10)));
        let spec = AttachSpec {
            region: RegionConfig::ClientWindow { name: "gone".into(), min_size: None, deferred_focus: false },
            params: AttachParams::default(),
        };
        let gone = g.attach_new(&mut cx, &spec).unwrap();
        cx.regions.get_mut(gone).and_then(|r| r.as_client_mut()).unwrap().mark_defunct();

        let report = g.fitrep(&mut cx, None, &FitParams::exact(Rect::new(5, 5, 990, 790))).unwrap();
        assert_eq!(report.rejected, vec![gone]);
        assert!(!g.is_managed(&cx, gone));
        assert_eq!(g.current(&cx), Some(a));
        assert_eq!(geometry(&cx, a), Rect::new(5, 5, 10, 10));
        g.destroy(&mut cx);
    }

    #[test]
    fn child_geometry_requests_go_through_policy() {
        let (mut cx, _root, mut g) = setup();
        let a = frame(
            &mut g,
            &mut cx,
            "a",
            AttachParams::default()
                .with_geom(Rect::new(0, 0, 100, 100))
                .with_size_policy(SizePolicy::new(Placement::Free)),
        );
        let flags = RqGeomFlags::WEAK_ALL | RqGeomFlags::TRY_ONLY;
        let tried = g.managed_rqgeom(&mut cx, a, flags, Rect::new(950, 10, 100, 100));
        assert_eq!(tried, Some(Rect::new(900, 10, 100, 100)));
        assert_eq!(geometry(&cx, a), Rect::new(0, 0, 100, 100));

        let applied = g.managed_rqgeom(&mut cx, a, RqGeomFlags::empty(), Rect::new(950, 10, 100, 100));
        assert_eq!(applied, Some(Rect::new(950, 10, 100, 100)));
        assert_eq!(geometry(&cx, a), Rect::new(950, 10, 100, 100));
        g.destroy(&mut cx);
    }
}

mod status_display {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn docking_places_and_redocks() {
        let (mut cx, root, mut g) = setup();
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::BottomRight, false).unwrap();
        assert_eq!(g.status_display(&cx), Some(bar));
        assert_eq!(geometry(&cx, bar), Rect::new(800, 780, 200, 20));
        assert!(g.managed(&cx, ManagedFilter::NoStatusDisplay).next().is_none());
        assert_eq!(g.managed(&cx, ManagedFilter::All).collect::<Vec<_>>(), vec![bar]);

        g.manage_stdisp(&mut cx, bar, Corner::BottomRight, false).unwrap();
        assert_eq!(g.managed(&cx, ManagedFilter::All).count(), 1);

        g.manage_stdisp(&mut cx, bar, Corner::BottomRight, true).unwrap();
        assert_eq!(geometry(&cx, bar), Rect::new(0, 780, 1000, 20));

        assert_eq!(g.unmanage_stdisp(&mut cx), Some(bar));
        assert_eq!(g.status_display(&cx), None);
        assert_eq!(cx.regions.manager(bar), None);
        g.destroy(&mut cx);
    }

    #[test]
    fn docking_a_managed_region_takes_it_over() {
        let (mut cx, root, mut g) = setup();
        let mut other = Group::create(&mut cx, root, &FitParams::exact(screen()), "other").unwrap();
        let bar = status_display(&mut cx, root);
        other.attach(&mut cx, bar, &AttachParams::default()).unwrap();

        g.manage_stdisp(&mut cx, bar, Corner::TopLeft, false).unwrap();
        assert_eq!(cx.regions.manager(bar), Some(g.id()));
        assert_eq!(other.managed(&cx, ManagedFilter::All).count(), 0);
        g.destroy(&mut cx);
        other.destroy(&mut cx);
    }
}

mod config {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn export_then_import_restores_children() {
        let (mut cx, root, mut g) = setup();
        frame(
            &mut g,
            &mut cx,
            "desk",
            AttachParams { bottom: true, ..Default::default() }.with_geom(Rect::new(0, 0, 1000, 800)),
        );
        let b = frame(&mut g, &mut cx, "b", AttachParams::default().with_geom(Rect::new(10, 20, 300, 200)));
        frame(
            &mut g,
            &mut cx,
            "top",
            AttachParams::default()
                .with_level(StackingLevel::ON_TOP)
                .with_size_policy("northeast".parse().unwrap())
                .with_geom(Rect::new(0, 0, 50, 50)),
        );
        frame(&mut g, &mut cx, "c", AttachParams::default().with_geom(Rect::new(40, 40, 100, 100)));
        g.raise(&mut cx, b).unwrap();

        let config = g.configuration(&cx, ManagedFilter::All);
        assert_eq!(config.managed.len(), 4);
        assert!(config.managed.iter().any(|e| e.bottom));
        let text = config.serialize_to_string().unwrap();
        let parsed: GroupConfig = ron::from_str(&text).unwrap();
        assert_eq!(parsed, config);

        let order_before = names(&cx, g.stacking_order(&cx));
        let managed_before = names(&cx, g.managed(&cx, ManagedFilter::All));
        g.destroy(&mut cx);

        let mut restored = Group::load(&mut cx, root, &FitParams::exact(screen()), &parsed).unwrap();
        assert_eq!(names(&cx, restored.stacking_order(&cx)), order_before);
        assert_eq!(names(&cx, restored.managed(&cx, ManagedFilter::All)), managed_before);
        assert_eq!(restored.bottom(&cx).map(|r| cx.regions.name(r).to_string()), Some("desk".into()));

        let tuples = |config: &GroupConfig| {
            let mut t: Vec<_> = config
                .managed
                .iter()
                .map(|e| (e.level, e.size_policy.to_string(), e.geom))
                .collect();
            t.sort_by_key(|(level, policy, geom)| (*level, policy.clone(), geom.x, geom.y));
            t
        };
        assert_eq!(tuples(&restored.configuration(&cx, ManagedFilter::All)), tuples(&config));
        restored.destroy(&mut cx);
    }

    #[test]
    fn docked_status_display_is_docked_again_on_load() {
        let (mut cx, root, mut g) = setup();
        frame(&mut g, &mut cx, "a", AttachParams::default());
        let bar = status_display(&mut cx, root);
        g.manage_stdisp(&mut cx, bar, Corner::BottomRight, true).unwrap();

        let config = g.configuration(&cx, ManagedFilter::All);
        let docks: Vec<_> = config.managed.iter().filter_map(|e| e.status_display).collect();
        assert_eq!(docks, [StatusDock { corner: Corner::BottomRight, fullsize: true }]);
        assert_eq!(g.configuration(&cx, ManagedFilter::NoStatusDisplay).managed.len(), 1);
        g.destroy(&mut cx);
        cx.regions.destroy(bar, &mut cx.display);

        let parsed: GroupConfig = ron::from_str(&config.serialize_to_string().unwrap()).unwrap();
        let mut restored = Group::load(&mut cx, root, &FitParams::exact(screen()), &parsed).unwrap();
        let restored_bar = restored.status_display(&cx).unwrap();
        assert_eq!(cx.regions.name(restored_bar), "bar");
        assert_eq!(geometry(&cx, restored_bar), Rect::new(0, 780, 1000, 20));
        assert_eq!(names(&cx, restored.managed(&cx, ManagedFilter::NoStatusDisplay)), ["a"]);
        assert_eq!(restored.status_dock(&cx), Some(StatusDock { corner: Corner::BottomRight, fullsize: true }));
        restored.destroy(&mut cx);
    }

    #[test]
    fn layout_file_round_trip() {
        let (mut cx, _root, mut g) = setup();
        frame(&mut g, &mut cx, "a", AttachParams::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.ron");
        let config = g.configuration(&cx, ManagedFilter::All);
        config.save(&path).unwrap();
        assert_eq!(GroupConfig::load(&path).unwrap(), config);
        g.destroy(&mut cx);
    }
}
