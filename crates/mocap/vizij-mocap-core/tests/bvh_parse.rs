use vizij_mocap_core::{
    sampling::{frame_position, sample_pose},
    Channel, Clip, LoadError, ParseErrorKind, RotationOrder,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn fixture(name: &str) -> Clip {
    let text = vizij_test_fixtures::clips::text(name).expect("load clip fixture");
    Clip::parse(&text).expect("parse clip fixture")
}

#[test]
fn two_joint_first_frame_values() {
    let clip = fixture("two-joint");
    assert_eq!(clip.joint_count(), 2);
    assert_eq!(clip.frame_count(), 2);
    assert_eq!(clip.total_channels(), 9);

    let hips = clip.sample(0, 0);
    assert_eq!(hips.translation, vizij_mocap_core::Vector3::zeros());
    approx(hips.rotation.angle(), 0.0, 1e-6);

    let spine = clip.sample(1, 0);
    let [x, y, z] = spine.euler_degrees(RotationOrder::Xyz);
    approx(x, 10.0, 1e-3);
    approx(y, 20.0, 1e-3);
    approx(z, 30.0, 1e-3);
    assert_eq!(clip.sample_channels(1, 0), &[10.0, 20.0, 30.0]);

    // Spine has no position channels, so it keeps its rest offset.
    approx(spine.translation.y, 10.0, 1e-6);
    assert_eq!(
        clip.joints()[1].end_site,
        Some(vizij_mocap_core::Vector3::new(0.0, 5.0, 0.0))
    );
}

#[test]
fn cmu_clip_layout_invariants() {
    let clip = fixture("cmu-walk-short");
    assert_eq!(clip.joint_count(), 21);
    assert_eq!(clip.total_channels(), 66);
    assert_eq!(clip.motion().len(), clip.frame_count() * clip.total_channels());
    approx(clip.duration(), 4.0 * 0.033333, 1e-6);

    let mut offset = 0;
    for (i, joint) in clip.joints().iter().enumerate() {
        assert_eq!(joint.channel_offset, offset, "joint {}", joint.name);
        offset += joint.channels.len();
        if let Some(parent) = joint.parent {
            assert!(parent < i, "parent of {} must precede it", joint.name);
        } else {
            assert_eq!(i, 0);
        }
    }
    assert_eq!(
        clip.joints()[0].channels[..3],
        [Channel::Xposition, Channel::Yposition, Channel::Zposition]
    );

    let head = clip.joint_index("Head").expect("Head joint");
    assert_eq!(clip.joints()[head].parent, clip.joint_index("Neck"));
    assert_eq!(clip.depth(head), 4);
    let children: Vec<_> = clip.children(0).collect();
    assert_eq!(children.len(), 3);
    assert!(clip.describe_hierarchy().contains("LeftToeBase"));
}

#[test]
fn interpolates_between_frames() {
    let clip = fixture("two-joint");
    let half = clip.frame_time() * 0.5;
    let (f0, f1, t) = frame_position(&clip, half);
    assert_eq!((f0, f1), (0, 1));
    approx(t, 0.5, 1e-4);

    let hips = clip.sample_interpolated(0, half);
    approx(hips.translation.x, 0.5, 1e-4);
    approx(hips.translation.y, 1.0, 1e-4);
    approx(hips.translation.z, 1.5, 1e-4);

    // Past the end clamps to the last frame verbatim.
    let last = clip.sample_interpolated(0, 100.0);
    assert_eq!(last.translation, clip.sample(0, 1).translation);

    let pose = sample_pose(&clip, 0.0);
    assert_eq!(pose.len(), 2);
}

#[test]
fn parse_is_deterministic() {
    let text = vizij_test_fixtures::clips::text("cmu-walk-short").unwrap();
    let a = Clip::parse(&text).unwrap();
    let b = Clip::parse(&text).unwrap();
    assert_eq!(a.motion(), b.motion());
    assert_eq!(a.joints(), b.joints());
}

#[test]
fn load_reads_from_disk() {
    let path = vizij_test_fixtures::clips::path("cmu-walk-no-head").unwrap();
    let clip = Clip::load(&path).expect("load from path");
    assert_eq!(clip.joint_count(), 20);
    assert!(clip.joint_index("Head").is_none());

    let err = Clip::load(path.with_file_name("does_not_exist.bvh")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn malformed_input_is_fatal() {
    let header = "HIERARCHY\nROOT Hips\n{\n  OFFSET 0 0 0\n  CHANNELS 3 Xposition Yposition Zposition\n}\nMOTION\n";

    let bad_number = format!("{header}Frames: 1\nFrame Time: 0.1\n0 abc 0\n");
    let err = Clip::parse(&bad_number).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
    assert_eq!(err.line, 10);

    let no_frames = format!("{header}Frames: 0\nFrame Time: 0.1\n");
    assert_eq!(
        Clip::parse(&no_frames).unwrap_err().kind,
        ParseErrorKind::EmptyMotion
    );

    let bad_time = format!("{header}Frames: 1\nFrame Time: 0\n0 0 0\n");
    assert!(matches!(
        Clip::parse(&bad_time).unwrap_err().kind,
        ParseErrorKind::InvalidFrameTime { .. }
    ));

    let bad_channel = header.replace("Zposition", "Wposition");
    let bad_channel = format!("{bad_channel}Frames: 1\nFrame Time: 0.1\n0 0 0\n");
    assert!(matches!(
        Clip::parse(&bad_channel).unwrap_err().kind,
        ParseErrorKind::UnknownChannel { .. }
    ));

    assert!(Clip::parse("").is_err());
    assert!(Clip::parse("HIERARCHY\nROOT Hips\n{\n").is_err());
}

#[test]
fn duplicate_joint_names_are_rejected() {
    let src = "HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 3 Xrotation Yrotation Zrotation
  JOINT Hips
  {
    OFFSET 0 1 0
    CHANNELS 3 Xrotation Yrotation Zrotation
  }
}
MOTION
Frames: 1
Frame Time: 0.1
0 0 0 0 0 0
";
    assert!(matches!(
        Clip::parse(src).unwrap_err().kind,
        ParseErrorKind::DuplicateJoint { .. }
    ));
}
