//! Property-based tests for the undo/redo inverse law.
//!
//! For any sequence of live edits, structural ones included (add, delete,
//! rename, connect, disconnect, paste):
//!
//! 1. Undoing everything restores the starting graph
//! 2. Redoing everything restores the edited graph
//! 3. One undo followed by one redo is a no-op
//! 4. Each undo restores the state before the matching edit
//!
//! Entities and connectors are picked by index into the live graph, so an
//! edit can target something created earlier in the same sequence. Edits
//! the graph rejects (self connections, taken single ports, missing lines)
//! record nothing and are simply part of the input space.

use proptest::prelude::*;
use sd_core::*;
use sd_editor::*;

// ── Strategies ──────────────────────────────────────────────────────────

const TYPES: [&str; 4] = ["Valve", "Tank", "Gain", "Orifice"];
const NAMES: [&str; 4] = ["A", "Tank", "Gain_2", "x y"];
const VALUES: [&str; 5] = ["0", "2.5", "1e-05", "p_sys", "p_sys\n+1"];

#[derive(Debug, Clone)]
enum Op {
    Add(usize, usize, i32, i32),
    Delete(usize, usize),
    Rename(usize, usize),
    Connect(usize, usize, usize, usize),
    Disconnect(usize),
    CopyPaste(usize, usize, i32, i32),
    Move(usize, i32, i32),
    MoveAll(i32, i32),
    Rotate(usize),
    FlipHorizontal(usize),
    FlipVertical(usize),
    SetParameter(usize, usize, usize),
    NameVisible(usize, bool),
    AlwaysVisible(usize, bool),
    DragConnectorLine(usize, usize, i32, i32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let pick = 0usize..8;
    let step = -50i32..50;
    prop_oneof![
        (0..TYPES.len(), 0..NAMES.len(), step.clone(), step.clone()).prop_map(|(t, n, x, y)| Op::Add(t, n, x, y)),
        (pick.clone(), pick.clone()).prop_map(|(a, b)| Op::Delete(a, b)),
        (pick.clone(), 0..NAMES.len()).prop_map(|(e, n)| Op::Rename(e, n)),
        (pick.clone(), 0usize..4, pick.clone(), 0usize..4).prop_map(|(a, pa, b, pb)| Op::Connect(a, pa, b, pb)),
        pick.clone().prop_map(Op::Disconnect),
        (pick.clone(), pick.clone(), step.clone(), step.clone())
            .prop_map(|(a, b, dx, dy)| Op::CopyPaste(a, b, dx, dy)),
        (pick.clone(), step.clone(), step.clone()).prop_map(|(e, dx, dy)| Op::Move(e, dx, dy)),
        (step.clone(), step.clone()).prop_map(|(dx, dy)| Op::MoveAll(dx, dy)),
        pick.clone().prop_map(Op::Rotate),
        pick.clone().prop_map(Op::FlipHorizontal),
        pick.clone().prop_map(Op::FlipVertical),
        (pick.clone(), 0usize..4, 0..VALUES.len()).prop_map(|(e, p, v)| Op::SetParameter(e, p, v)),
        (pick.clone(), any::<bool>()).prop_map(|(e, v)| Op::NameVisible(e, v)),
        (pick.clone(), any::<bool>()).prop_map(|(e, v)| Op::AlwaysVisible(e, v)),
        (pick, 0usize..3, step.clone(), step).prop_map(|(c, l, dx, dy)| Op::DragConnectorLine(c, l, dx, dy)),
    ]
}

/// A session whose starting entities are not part of the history: valve
/// A connected to tank B, plus a gain C.
fn fresh_session() -> EditorSession {
    let mut graph = ObjectGraph::default();
    for (ty, name) in [("Valve", "A"), ("Tank", "B"), ("Gain", "C")] {
        graph.create_entity(ty, name, Point::default(), Rotation::Deg0).unwrap();
    }
    graph
        .connect(&PortRef::new("A", "PA"), &PortRef::new("B", "P1"))
        .unwrap();
    graph
        .set_waypoints(
            &PortRef::new("A", "PA"),
            &PortRef::new("B", "P1"),
            &[Point::new(20.0, 0.0), Point::new(20.0, 30.0)],
        )
        .unwrap();
    EditorSession::new(graph, &HistoryConfig::default())
}

fn entity_at(session: &EditorSession, i: usize) -> Option<EntityName> {
    let names = session.graph.entity_names();
    (!names.is_empty()).then(|| names[i % names.len()])
}

fn port_at(session: &EditorSession, entity: EntityName, i: usize) -> Option<PortRef> {
    let ports = &session.graph.entity(entity)?.ports;
    (!ports.is_empty()).then(|| PortRef::new(entity, ports[i % ports.len()].name.clone()))
}

fn connector_at(session: &EditorSession, i: usize) -> Option<ConnectorSpec> {
    let connectors = session.graph.connectors();
    (!connectors.is_empty()).then(|| connectors[i % connectors.len()].clone())
}

fn delta(dx: i32, dy: i32) -> Point {
    Point::new(f64::from(dx), f64::from(dy))
}

/// Apply one edit. Rejected edits leave graph and history untouched, so
/// their errors are ignored.
fn apply(session: &mut EditorSession, op: &Op) {
    match *op {
        Op::Add(t, n, x, y) => {
            let _ = session.add_entity(TYPES[t], NAMES[n], delta(x, y));
        }
        Op::Delete(a, b) => {
            if let (Some(a), Some(b)) = (entity_at(session, a), entity_at(session, b)) {
                let _ = session.delete_selection(&[a, b]);
            }
        }
        Op::Rename(e, n) => {
            if let Some(e) = entity_at(session, e) {
                let _ = session.rename(e, NAMES[n]);
            }
        }
        Op::Connect(a, pa, b, pb) => {
            let start = entity_at(session, a).and_then(|a| port_at(session, a, pa));
            let end = entity_at(session, b).and_then(|b| port_at(session, b, pb));
            if let (Some(start), Some(end)) = (start, end) {
                let _ = session.connect(&start, &end);
            }
        }
        Op::Disconnect(c) => {
            if let Some(spec) = connector_at(session, c) {
                let _ = session.disconnect(&spec.start, &spec.end);
            }
        }
        Op::CopyPaste(a, b, dx, dy) => {
            if let (Some(a), Some(b)) = (entity_at(session, a), entity_at(session, b)) {
                if session.copy(&[a, b]).is_ok() {
                    let _ = session.paste(delta(dx, dy));
                }
            }
        }
        Op::Move(e, dx, dy) => {
            if let Some(e) = entity_at(session, e) {
                let _ = session.move_selection(&[e], f64::from(dx), f64::from(dy));
            }
        }
        Op::MoveAll(dx, dy) => {
            let names = session.graph.entity_names();
            let _ = session.move_selection(&names, f64::from(dx), f64::from(dy));
        }
        Op::Rotate(e) => {
            if let Some(e) = entity_at(session, e) {
                let _ = session.rotate_selection(&[e]);
            }
        }
        Op::FlipHorizontal(e) => {
            if let Some(e) = entity_at(session, e) {
                let _ = session.flip_horizontal(&[e]);
            }
        }
        Op::FlipVertical(e) => {
            if let Some(e) = entity_at(session, e) {
                let _ = session.flip_vertical(&[e]);
            }
        }
        Op::SetParameter(e, p, v) => {
            let Some(e) = entity_at(session, e) else {
                return;
            };
            let parameter = session
                .graph
                .entity(e)
                .filter(|entity| !entity.parameters.is_empty())
                .map(|entity| entity.parameters[p % entity.parameters.len()].name.clone());
            if let Some(parameter) = parameter {
                let _ = session.set_parameter(e, &parameter, VALUES[v]);
            }
        }
        Op::NameVisible(e, v) => {
            if let Some(e) = entity_at(session, e) {
                let _ = session.set_name_visible(e, v);
            }
        }
        Op::AlwaysVisible(e, v) => {
            if let Some(e) = entity_at(session, e) {
                let _ = session.set_always_visible(e, v);
            }
        }
        Op::DragConnectorLine(c, line, dx, dy) => {
            if let Some(spec) = connector_at(session, c) {
                let _ = session.move_connector_line(&spec.start, &spec.end, line, Point::default(), delta(dx, dy));
            }
        }
    }
}

fn undo_steps(session: &EditorSession) -> usize {
    session.undo.posts().iter().filter(|p| !p.is_empty()).count()
}

// ═══════════════════════════════════════════════════════════════════════
// Inverse law
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_all_then_redo_all(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut session = fresh_session();
        let start = session.graph.state();
        for op in &ops {
            apply(&mut session, op);
        }
        let end = session.graph.state();

        while session.undo.can_undo() {
            session.undo().unwrap();
        }
        prop_assert_eq!(session.graph.state(), start.clone(), "undo-all must restore the start");

        while session.undo.can_redo() {
            session.redo().unwrap();
        }
        prop_assert_eq!(session.graph.state(), end, "redo-all must restore the end");
    }

    #[test]
    fn undo_then_redo_is_identity(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let mut session = fresh_session();
        for op in &ops {
            apply(&mut session, op);
        }
        let end = session.graph.state();
        let position = session.undo.current_position();

        if session.undo().unwrap().is_some() {
            session.redo().unwrap();
        }
        prop_assert_eq!(session.graph.state(), end);
        prop_assert!(session.undo.current_position() <= position);
    }

    #[test]
    fn each_undo_restores_previous_state(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let mut session = fresh_session();
        // States after each edit that recorded something.
        let mut checkpoints = vec![session.graph.state()];
        for op in &ops {
            let before = undo_steps(&session);
            apply(&mut session, op);
            if undo_steps(&session) > before {
                checkpoints.push(session.graph.state());
            }
        }

        checkpoints.pop();
        while let Some(expected) = checkpoints.pop() {
            prop_assert!(session.undo().unwrap().is_some());
            prop_assert_eq!(session.graph.state(), expected);
        }
        prop_assert!(!session.undo.can_undo());
    }
}
