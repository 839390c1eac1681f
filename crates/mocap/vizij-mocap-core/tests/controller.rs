use std::sync::Arc;

use approx::assert_relative_eq;
use vizij_mocap_core::{
    blend_poses, AnimController, AnimState, BlendTree1D, BoneMask, Clip, Config,
    ControllerError, ControllerEvent, Easing, Inputs, JointTransform, LayeredController,
    MotionSource, Pose, ProceduralFn, RetargetSettings, Retargeter, SkeletonMap,
    TargetSkeleton, Transition, TransitionCondition, UnitQuaternion, Vector3,
};

const BONES: usize = 3;

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

/// Every bone translated to `x` and turned `deg` degrees about Y.
fn static_pose(x: f32, deg: f32) -> MotionSource {
    let t = JointTransform::new(
        Vector3::new(x, 0.0, 0.0),
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), deg.to_radians()),
    );
    MotionSource::pose(Pose::from(vec![t; BONES]))
}

/// Non-looping clip-like source of the given length.
fn timed(duration: f32) -> MotionSource {
    MotionSource::procedural(ProceduralFn::new(BONES, Some(duration), |t, out| {
        for bone in out.iter_mut() {
            bone.translation.y = t;
        }
    }))
}

fn assert_pose_eq(a: &Pose, b: &Pose) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_relative_eq!(x.translation, y.translation, epsilon = 1e-5);
        assert_relative_eq!(x.rotation, y.rotation, epsilon = 1e-5);
    }
}

fn idle_walk() -> AnimController {
    AnimController::builder("Idle", BONES)
        .state(AnimState::new("Idle", static_pose(0.0, 0.0)))
        .state(AnimState::new("Walk", static_pose(1.0, 90.0)))
        .transition(Transition::new(
            "Idle",
            "Walk",
            0.2,
            TransitionCondition::parameter_at_least("speed", 0.5),
        ))
        .transition(Transition::new(
            "Walk",
            "Idle",
            0.2,
            TransitionCondition::parameter_below("speed", 0.5),
        ))
        .build()
        .expect("valid controller")
}

fn count_started(events: &[ControllerEvent], to_state: &str) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ControllerEvent::TransitionStarted { to, .. } if to == to_state))
        .count()
}

/// it should blend Idle into Walk at eased progress on the tick the threshold is crossed
#[test]
fn parameter_threshold_starts_blend() {
    let mut ctl = idle_walk();
    let out = ctl.update(0.1, &Inputs::new());
    assert!(out.events.is_empty());
    assert_eq!(ctl.current_state(), "Idle");

    let out = ctl.update(0.1, &Inputs::new().with_parameter("speed", 1.0));
    assert_eq!(count_started(&out.events, "Walk"), 1);
    let pose = out.pose.clone();

    let blend = ctl.blend().expect("blend in flight");
    approx(blend.progress, 0.5, 1e-6);
    assert_eq!(ctl.blend_target(), Some("Walk"));
    assert_eq!(ctl.current_state(), "Idle");

    let idle = Pose::from(vec![JointTransform::identity(); BONES]);
    let walk = Pose::from(vec![
        JointTransform::new(
            Vector3::new(1.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 90f32.to_radians()),
        );
        BONES
    ]);
    let w = Easing::Smoothstep.apply(0.5);
    assert_pose_eq(&pose, &blend_poses(&idle, &walk, w));
    approx(pose[0].translation.x, 0.5, 1e-6);
    approx(pose[0].rotation.angle(), 45f32.to_radians(), 1e-3);

    let out = ctl.update(0.1, &Inputs::new());
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, ControllerEvent::TransitionCompleted { to, .. } if to == "Walk")));
    assert_eq!(ctl.current_state(), "Walk");
    assert!(ctl.blend().is_none());
    assert_pose_eq(ctl.pose(), &walk);
}

/// it should hold an in-flight blend even when another transition becomes valid
#[test]
fn running_blend_is_not_interrupted() {
    let mut ctl = idle_walk();
    ctl.update(0.05, &Inputs::new().with_parameter("speed", 1.0));
    let out = ctl.update(0.05, &Inputs::new().with_parameter("speed", 0.0));
    assert_eq!(count_started(&out.events, "Idle"), 0);
    assert_eq!(ctl.blend_target(), Some("Walk"));
    approx(ctl.blend().map(|b| b.progress).unwrap_or(0.0), 0.5, 1e-6);

    // Once committed, the reverse transition starts on the following tick.
    ctl.update(0.1, &Inputs::new());
    assert_eq!(ctl.current_state(), "Walk");
    let out = ctl.update(0.05, &Inputs::new());
    assert_eq!(count_started(&out.events, "Idle"), 1);
}

/// it should fire a trigger transition once, however many ticks pass before it is consumed
#[test]
fn trigger_fires_exactly_once() {
    let mut ctl = AnimController::builder("Idle", BONES)
        .state(AnimState::new("Idle", static_pose(0.0, 0.0)))
        .state(AnimState::new("Walk", static_pose(1.0, 0.0)))
        .state(AnimState::new("Jump", timed(0.3)).non_looping())
        .transition(Transition::new(
            "Idle",
            "Walk",
            0.1,
            TransitionCondition::parameter_at_least("speed", 0.5),
        ))
        .transition(Transition::new(
            "Walk",
            "Jump",
            0.1,
            TransitionCondition::trigger("jump"),
        ))
        .transition(Transition::new(
            "Jump",
            "Walk",
            0.1,
            TransitionCondition::OnComplete,
        ))
        .build()
        .unwrap();

    let mut started = 0;
    ctl.set_trigger("jump");
    for _ in 0..3 {
        started += count_started(&ctl.update(0.1, &Inputs::new()).events, "Jump");
    }
    // No transition out of Idle reads the trigger, so it is still pending.
    assert!(ctl.is_trigger_set("jump"));
    assert_eq!(started, 0);

    ctl.set_parameter("speed", 1.0);
    for _ in 0..30 {
        started += count_started(&ctl.update(0.05, &Inputs::new()).events, "Jump");
    }
    assert_eq!(started, 1);
    assert!(!ctl.is_trigger_set("jump"));
    assert_eq!(ctl.current_state(), "Walk");

    // A fresh trigger fires again.
    for i in 0..30 {
        let inputs = if i == 0 {
            Inputs::new().with_trigger("jump")
        } else {
            Inputs::new()
        };
        started += count_started(&ctl.update(0.05, &inputs).events, "Jump");
    }
    assert_eq!(started, 2);
}

/// it should leave a non-looping state when it completes
#[test]
fn on_complete_follows_state_end() {
    let mut ctl = AnimController::builder("Jump", BONES)
        .state(AnimState::new("Jump", timed(0.3)).non_looping())
        .state(AnimState::new("Land", static_pose(0.0, 0.0)))
        .transition(Transition::new("Jump", "Land", 0.0, TransitionCondition::OnComplete))
        .build()
        .unwrap();

    let out = ctl.update(0.2, &Inputs::new());
    assert!(out.events.is_empty());
    approx(out.pose[0].translation.y, 0.2, 1e-6);

    let out = ctl.update(0.2, &Inputs::new());
    assert_eq!(
        out.events,
        vec![
            ControllerEvent::StateCompleted {
                state: "Jump".into()
            },
            ControllerEvent::TransitionStarted {
                from: "Jump".into(),
                to: "Land".into(),
                duration: 0.0
            },
            ControllerEvent::TransitionCompleted {
                from: "Jump".into(),
                to: "Land".into()
            },
        ]
    );
    assert_eq!(ctl.current_state(), "Land");
    assert_eq!(ctl.state("Jump").map(|s| s.is_complete()), Some(true));
}

/// it should switch immediately on force_state and report it on the next tick
#[test]
fn force_state_reports_on_next_update() {
    let mut ctl = idle_walk();
    ctl.update(0.1, &Inputs::new().with_parameter("speed", 1.0));
    assert!(ctl.blend().is_some());

    ctl.force_state("Idle").unwrap();
    assert!(ctl.blend().is_none());
    assert_eq!(ctl.current_state(), "Idle");

    let out = ctl.update(0.0, &Inputs::new().with_parameter("speed", 0.0));
    assert_eq!(
        out.events[0],
        ControllerEvent::StateForced {
            from: "Idle".into(),
            to: "Idle".into()
        }
    );
    assert!(matches!(
        ctl.force_state("Swim"),
        Err(ControllerError::UnknownState { .. })
    ));
}

/// it should treat invalid time steps as zero
#[test]
fn invalid_dt_does_not_advance() {
    let mut ctl = AnimController::builder("Jump", BONES)
        .state(AnimState::new("Jump", timed(1.0)).non_looping())
        .build()
        .unwrap();
    ctl.update(0.25, &Inputs::new());
    for dt in [f32::NAN, f32::INFINITY, -1.0] {
        ctl.update(dt, &Inputs::new());
    }
    approx(ctl.state("Jump").unwrap().time, 0.25, 1e-6);
}

/// it should reject inconsistent definitions at build time
#[test]
fn build_validation() {
    let err = AnimController::builder("Missing", BONES)
        .state(AnimState::new("Idle", static_pose(0.0, 0.0)))
        .build()
        .unwrap_err();
    assert!(matches!(err, ControllerError::UnknownInitialState { .. }));

    let err = AnimController::builder("Idle", BONES)
        .state(AnimState::new("Idle", static_pose(0.0, 0.0)))
        .state(AnimState::new("Idle", static_pose(1.0, 0.0)))
        .build()
        .unwrap_err();
    assert!(matches!(err, ControllerError::DuplicateState { .. }));

    let err = AnimController::builder("Idle", BONES + 1)
        .state(AnimState::new("Idle", static_pose(0.0, 0.0)))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ControllerError::BoneCountMismatch { expected: 4, found: 3, .. }
    ));

    let err = AnimController::builder("Idle", BONES)
        .state(AnimState::new("Idle", static_pose(0.0, 0.0)))
        .transition(Transition::new("Idle", "Run", 0.1, TransitionCondition::Immediate))
        .build()
        .unwrap_err();
    assert!(matches!(err, ControllerError::UnknownState { .. }));

    let err = AnimController::builder("Idle", BONES)
        .state(AnimState::new("Idle", static_pose(0.0, 0.0)))
        .state(AnimState::new("Walk", static_pose(1.0, 0.0)))
        .transition(Transition::new("Idle", "Walk", -0.1, TransitionCondition::Immediate))
        .build()
        .unwrap_err();
    assert!(matches!(err, ControllerError::InvalidBlendDuration { .. }));
}

/// it should reject blend trees whose entries disagree on bone count or that are empty
#[test]
fn blend_tree_validation() {
    let wide = MotionSource::pose(Pose::identity(BONES + 2));
    let tree = BlendTree1D::new("speed", vec![(static_pose(0.0, 0.0), 0.0), (wide, 1.0)]);
    let err = AnimController::builder("Move", BONES)
        .state(AnimState::new("Move", MotionSource::BlendTree(tree)))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ControllerError::BoneCountMismatch {
            state: "Move".into(),
            expected: BONES,
            found: BONES + 2,
        }
    );

    // Nested trees are checked too.
    let inner = BlendTree1D::new("lean", vec![(MotionSource::pose(Pose::identity(1)), 0.0)]);
    let outer = BlendTree1D::new(
        "speed",
        vec![(static_pose(0.0, 0.0), 0.0), (MotionSource::BlendTree(inner), 1.0)],
    );
    let err = AnimController::builder("Move", BONES)
        .state(AnimState::new("Move", MotionSource::BlendTree(outer)))
        .build()
        .unwrap_err();
    assert!(matches!(err, ControllerError::BoneCountMismatch { found: 1, .. }));

    let empty = BlendTree1D::new("speed", Vec::new());
    let err = AnimController::builder("Move", BONES)
        .state(AnimState::new("Move", MotionSource::BlendTree(empty)))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ControllerError::EmptyBlendTree {
            state: "Move".into()
        }
    );
}

/// it should drop events past the per-tick limit
#[test]
fn event_cap_is_enforced() {
    let mut ctl = AnimController::builder("A", BONES)
        .state(AnimState::new("A", static_pose(0.0, 0.0)))
        .state(AnimState::new("B", static_pose(1.0, 0.0)))
        .transition(Transition::new("A", "B", 0.0, TransitionCondition::Immediate))
        .config(Config {
            max_events_per_tick: 1,
            ..Config::default()
        })
        .build()
        .unwrap();
    let out = ctl.update(0.1, &Inputs::new());
    assert_eq!(out.events.len(), 1);
    assert_eq!(ctl.current_state(), "B");
}

/// it should sample a blend tree from the live parameter value
#[test]
fn blend_tree_state_follows_parameter() {
    let tree = BlendTree1D::new(
        "speed",
        vec![(static_pose(0.0, 0.0), 0.0), (static_pose(2.0, 0.0), 1.0)],
    );
    let mut ctl = AnimController::builder("Move", BONES)
        .state(AnimState::new("Move", MotionSource::BlendTree(tree)))
        .build()
        .unwrap();

    let out = ctl.update(0.1, &Inputs::new().with_parameter("speed", 0.25));
    approx(out.pose[0].translation.x, 0.5, 1e-6);
    let out = ctl.update(0.1, &Inputs::new().with_parameter("speed", 3.0));
    approx(out.pose[2].translation.x, 2.0, 1e-6);
}

/// it should drive states from retargeted mocap
#[test]
fn retargeted_clip_state() {
    let text = vizij_test_fixtures::clips::text("cmu-walk-short").unwrap();
    let clip = Arc::new(Clip::parse(&text).unwrap());
    let skeleton = TargetSkeleton::humanoid();
    let (rt, diagnostics) = Retargeter::new(
        Arc::new(SkeletonMap::cmu_to_humanoid()),
        clip,
        skeleton.rest_pose(),
        RetargetSettings::with_unit_scale(0.01),
    );
    assert!(diagnostics.is_empty());
    let rt = Arc::new(rt);
    let duration = rt.duration();

    let mut ctl = AnimController::builder("Idle", skeleton.bone_count())
        .state(AnimState::new(
            "Idle",
            MotionSource::pose(skeleton.rest_pose()),
        ))
        .state(AnimState::new("Walk", MotionSource::Clip(rt.clone())))
        .transition(Transition::new(
            "Idle",
            "Walk",
            0.2,
            TransitionCondition::parameter_at_least("speed", 0.5),
        ))
        .build()
        .unwrap();

    let out = ctl.update(0.1, &Inputs::new().with_parameter("speed", 1.0));
    let expected = blend_poses(&skeleton.rest_pose(), &rt.sample(0.1), 0.5);
    assert_pose_eq(&out.pose, &expected);

    // Looping playback wraps back into the clip.
    for _ in 0..4 {
        ctl.update(0.05, &Inputs::new());
    }
    assert_eq!(ctl.current_state(), "Walk");
    let time = ctl.state("Walk").unwrap().time;
    assert!(time >= 0.0 && time < duration);
    assert_pose_eq(ctl.pose(), &rt.sample(time));
}

/// it should composite masked layers over the base controller
#[test]
fn layered_controller_masks_overlay() {
    let base = AnimController::builder("Idle", BONES)
        .state(AnimState::new("Idle", static_pose(0.0, 0.0)))
        .build()
        .unwrap();
    let wave = AnimController::builder("Wave", BONES)
        .state(AnimState::new("Wave", static_pose(1.0, 0.0)))
        .build()
        .unwrap();

    let mut layered = LayeredController::new(base);
    let id = layered
        .add_layer("upper", wave, BoneMask::only([1, 2]), 0.5)
        .unwrap();
    assert_eq!(layered.layers()[0].id, id);

    let pose = layered.update(0.1, &Inputs::new()).clone();
    approx(pose[0].translation.x, 0.0, 1e-6);
    approx(pose[1].translation.x, 0.5, 1e-6);
    approx(pose[2].translation.x, 0.5, 1e-6);

    layered.set_layer_weight("upper", 4.0).unwrap();
    assert_eq!(layered.layer_weight("upper"), Some(1.0));
    let pose = layered.update(0.1, &Inputs::new()).clone();
    approx(pose[1].translation.x, 1.0, 1e-6);

    layered.set_layer_weight("upper", 0.0).unwrap();
    let pose = layered.update(0.1, &Inputs::new()).clone();
    approx(pose[1].translation.x, 0.0, 1e-6);

    let extra = AnimController::builder("Wave", BONES)
        .state(AnimState::new("Wave", static_pose(1.0, 0.0)))
        .build()
        .unwrap();
    assert!(matches!(
        layered.add_layer("upper", extra, BoneMask::All, 1.0),
        Err(ControllerError::DuplicateLayer { .. })
    ));
    assert!(matches!(
        layered.set_layer_weight("legs", 1.0),
        Err(ControllerError::UnknownLayer { .. })
    ));
}
