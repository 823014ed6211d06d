use super::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn fps(n: u32) -> Fps {
    Fps::integer(n).unwrap()
}

fn all_resolved(refs: &[&str]) -> AssetResolution {
    refs.iter()
        .map(|r| (r.to_string(), format!("/assets/{r}.png")))
        .collect()
}

fn ranges(s: &Schedule) -> Vec<(u64, u64, bool)> {
    s.slots
        .iter()
        .map(|slot| (slot.range.start.0, slot.range.end.0, slot.is_gap_fill()))
        .collect()
}

#[test]
fn contiguous_entries_map_to_exact_frames() {
    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 3.0, "red").unwrap(),
        StoryboardEntry::timed(3.0, 7.0, "green").unwrap(),
        StoryboardEntry::timed(7.0, 10.0, "blue").unwrap(),
    ]);
    let res = all_resolved(&["red", "green", "blue"]);
    let s = build_schedule(&sb, &res, &ScheduleOpts::new(fps(1))).unwrap();

    assert_eq!(s.total_frames, 10);
    assert_eq!(
        ranges(&s),
        vec![(0, 3, false), (3, 7, false), (7, 10, false)]
    );
    assert_eq!(s.slots[1].source, SlotSource::Entry(1));
    assert_eq!(
        s.slots[2].asset_path(),
        Some(Path::new("/assets/blue.png"))
    );
    assert_eq!(s.diagnostics, ScheduleDiagnostics::default());
}

#[test]
fn gaps_between_entries_become_gap_fill() {
    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 2.0, "a").unwrap(),
        StoryboardEntry::timed(5.0, 8.0, "b").unwrap(),
    ]);
    let s = build_schedule(&sb, &all_resolved(&["a", "b"]), &ScheduleOpts::new(fps(1))).unwrap();
    assert_eq!(
        ranges(&s),
        vec![(0, 2, false), (2, 5, true), (5, 8, false)]
    );
    assert_eq!(s.slots[1].source, SlotSource::Gap);
    assert_eq!(s.gap_fill_frames(), 3);
}

#[test]
fn leading_and_trailing_gaps_are_filled_to_declared_duration() {
    let sb = Storyboard::new(vec![StoryboardEntry::timed(1.0, 2.0, "a").unwrap()]).with_duration(4.0);
    let s = build_schedule(&sb, &all_resolved(&["a"]), &ScheduleOpts::new(fps(2))).unwrap();
    assert_eq!(s.total_frames, 8);
    assert_eq!(
        ranges(&s),
        vec![(0, 2, true), (2, 4, false), (4, 8, true)]
    );
}

#[test]
fn empty_storyboard_is_all_gap_fill() {
    let sb = Storyboard::default().with_duration(10.0);
    let s = build_schedule(&sb, &AssetResolution::new(), &ScheduleOpts::new(fps(1))).unwrap();
    assert_eq!(s.total_frames, 10);
    assert_eq!(ranges(&s), vec![(0, 10, true)]);
}

#[test]
fn empty_storyboard_without_duration_still_has_one_frame() {
    let s = build_schedule(
        &Storyboard::default(),
        &AssetResolution::new(),
        &ScheduleOpts::new(fps(24)),
    )
    .unwrap();
    assert_eq!(s.total_frames, 1);
    assert_eq!(ranges(&s), vec![(0, 1, true)]);
}

#[test]
fn unresolved_reference_is_kept_as_gap_fill_entry() {
    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 2.0, "a").unwrap(),
        StoryboardEntry::timed(2.0, 4.0, "https://cdn.example/missing.jpg").unwrap(),
    ]);
    let s = build_schedule(&sb, &all_resolved(&["a"]), &ScheduleOpts::new(fps(1))).unwrap();
    assert_eq!(ranges(&s), vec![(0, 2, false), (2, 4, true)]);
    assert_eq!(s.slots[1].source, SlotSource::Entry(1));
    assert_eq!(
        s.diagnostics.unresolved,
        vec!["https://cdn.example/missing.jpg".to_string()]
    );
}

#[test]
fn zero_and_inverted_durations_clamp_to_one_frame() {
    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 0.0, "a").unwrap(),
        StoryboardEntry::timed(3.0, 1.0, "b").unwrap(),
    ])
    .with_duration(5.0);
    let s = build_schedule(&sb, &all_resolved(&["a", "b"]), &ScheduleOpts::new(fps(1))).unwrap();
    assert_eq!(
        ranges(&s),
        vec![(0, 1, false), (1, 3, true), (3, 4, false), (4, 5, true)]
    );
    assert_eq!(s.diagnostics.clamped, vec![0, 1]);
}

#[test]
fn overlapping_entry_is_shifted_and_keeps_its_length() {
    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 4.0, "a").unwrap(),
        StoryboardEntry::timed(2.0, 5.0, "b").unwrap(),
    ])
    .with_duration(8.0);
    let s = build_schedule(&sb, &all_resolved(&["a", "b"]), &ScheduleOpts::new(fps(1))).unwrap();
    assert_eq!(
        ranges(&s),
        vec![(0, 4, false), (4, 7, false), (7, 8, true)]
    );
    assert_eq!(s.diagnostics.shifted, vec![1]);
}

#[test]
fn entries_past_the_declared_duration_are_truncated() {
    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 3.0, "a").unwrap(),
        StoryboardEntry::timed(3.0, 6.0, "b").unwrap(),
        StoryboardEntry::timed(6.0, 9.0, "c").unwrap(),
    ]);
    let mut opts = ScheduleOpts::new(fps(1));
    opts.duration_secs = Some(4.0);
    let s = build_schedule(&sb, &all_resolved(&["a", "b", "c"]), &opts).unwrap();
    assert_eq!(ranges(&s), vec![(0, 3, false), (3, 4, false)]);
    assert_eq!(s.diagnostics.truncated, vec![1, 2]);
}

#[test]
fn untimed_entries_split_evenly_with_remainder_on_last() {
    let sb = Storyboard::new(vec![
        StoryboardEntry::untimed("a"),
        StoryboardEntry::untimed("b"),
        StoryboardEntry::untimed("c"),
    ])
    .with_duration(10.0);
    let s = build_schedule(&sb, &all_resolved(&["a", "b", "c"]), &ScheduleOpts::new(fps(1))).unwrap();
    assert_eq!(
        ranges(&s),
        vec![(0, 3, false), (3, 6, false), (6, 10, false)]
    );
}

#[test]
fn untimed_entries_without_duration_use_default_clip_length() {
    let sb = Storyboard::new(vec![StoryboardEntry::untimed("a"), StoryboardEntry::untimed("b")]);
    let s = build_schedule(&sb, &all_resolved(&["a", "b"]), &ScheduleOpts::new(fps(24))).unwrap();
    assert_eq!(s.total_frames, 144);
    assert_eq!(ranges(&s), vec![(0, 72, false), (72, 144, false)]);
}

#[test]
fn fractional_durations_round_per_entry() {
    // 0.5 s at 5 fps is 2.5 frames, rounded to 3.
    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 0.5, "a").unwrap(),
        StoryboardEntry::timed(1.0, 1.3, "b").unwrap(),
    ]);
    let s = build_schedule(&sb, &all_resolved(&["a", "b"]), &ScheduleOpts::new(fps(5))).unwrap();
    assert_eq!(s.total_frames, 7);
    assert_eq!(
        ranges(&s),
        vec![(0, 3, false), (3, 5, true), (5, 7, false)]
    );
}

#[test]
fn slot_lookup_by_frame() {
    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 2.0, "a").unwrap(),
        StoryboardEntry::timed(5.0, 6.0, "b").unwrap(),
    ]);
    let s = build_schedule(&sb, &all_resolved(&["a", "b"]), &ScheduleOpts::new(fps(1))).unwrap();
    assert_eq!(s.slot_at(FrameIndex(0)).unwrap().source, SlotSource::Entry(0));
    assert_eq!(s.slot_at(FrameIndex(2)).unwrap().source, SlotSource::Gap);
    assert_eq!(s.slot_at(FrameIndex(4)).unwrap().source, SlotSource::Gap);
    assert_eq!(s.slot_at(FrameIndex(5)).unwrap().source, SlotSource::Entry(1));
    assert!(s.slot_at(FrameIndex(6)).is_none());
    assert!((s.duration_secs() - 6.0).abs() < 1e-9);
}

#[test]
fn invalid_options_are_rejected() {
    let sb = Storyboard::default();
    let res = AssetResolution::new();

    let mut opts = ScheduleOpts::new(fps(1));
    opts.duration_secs = Some(-1.0);
    assert!(build_schedule(&sb, &res, &opts).is_err());

    let mut opts = ScheduleOpts::new(fps(1));
    opts.default_clip_secs = 0.0;
    assert!(build_schedule(&sb, &res, &opts).is_err());

    let opts = ScheduleOpts::new(Fps { num: 0, den: 1 });
    assert!(build_schedule(&sb, &res, &opts).is_err());
}

#[test]
fn validate_detects_broken_coverage() {
    let s = Schedule {
        fps: fps(1),
        total_frames: 4,
        slots: vec![ScheduleSlot {
            range: FrameRange::new(FrameIndex(0), FrameIndex(3)).unwrap(),
            source: SlotSource::Gap,
            media_ref: None,
            asset: None,
        }],
        diagnostics: ScheduleDiagnostics::default(),
    };
    let err = s.validate().unwrap_err();
    assert!(err.to_string().contains("schedule error:"));
}

#[test]
fn slots_always_partition_the_timeline() {
    let mut rng = StdRng::seed_from_u64(7);
    for case in 0..300 {
        let n = rng.gen_range(0..6);
        let mut entries = Vec::new();
        let mut refs = Vec::new();
        for i in 0..n {
            let name = format!("m{i}");
            let entry = if rng.gen_range(0..4) == 0 {
                StoryboardEntry::untimed(name.clone())
            } else {
                let start = rng.gen_range(0..40) as f64 / 4.0;
                let end = rng.gen_range(0..40) as f64 / 4.0;
                StoryboardEntry::timed(start, end, name.clone()).unwrap()
            };
            entries.push(entry);
            if rng.gen_range(0..3) != 0 {
                refs.push(name);
            }
        }
        let mut sb = Storyboard::new(entries);
        if rng.gen_bool(0.5) {
            sb = sb.with_duration(rng.gen_range(0..12) as f64);
        }
        let res: AssetResolution = refs.iter().map(|r| (r.clone(), format!("{r}.png"))).collect();
        let f = fps(rng.gen_range(1..=30));

        let s = build_schedule(&sb, &res, &ScheduleOpts::new(f))
            .unwrap_or_else(|e| panic!("case {case}: {e}"));
        s.validate().unwrap_or_else(|e| panic!("case {case}: {e}"));

        let expected = f
            .secs_to_frames_round(sb.target_duration_secs(DEFAULT_CLIP_SECS))
            .max(1);
        assert_eq!(s.total_frames, expected, "case {case}");

        // Untruncated timed entries span their rounded endpoints, at least one frame.
        for slot in &s.slots {
            let SlotSource::Entry(i) = slot.source else {
                continue;
            };
            let e = &sb.entries[i];
            let (Some(start), Some(end)) = (e.start, e.end) else {
                continue;
            };
            if s.diagnostics.truncated.contains(&i) {
                continue;
            }
            let want = f
                .secs_to_frames_round(end.as_secs())
                .saturating_sub(f.secs_to_frames_round(start.as_secs()))
                .max(1);
            assert_eq!(slot.len_frames(), want, "case {case} entry {i}");
        }
    }
}

#[test]
fn touching_fractional_entries_leave_no_gap() {
    // Each boundary falls between frames; both sides must round to the same frame.
    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 2.02, "a").unwrap(),
        StoryboardEntry::timed(2.02, 4.04, "b").unwrap(),
        StoryboardEntry::timed(4.04, 6.06, "c").unwrap(),
    ]);
    let s = build_schedule(&sb, &all_resolved(&["a", "b", "c"]), &ScheduleOpts::new(fps(24))).unwrap();
    assert_eq!(s.total_frames, 145);
    assert_eq!(
        ranges(&s),
        vec![(0, 48, false), (48, 97, false), (97, 145, false)]
    );
    assert_eq!(s.gap_fill_frames(), 0);
    assert!(s.diagnostics.shifted.is_empty());

    let sb = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 1.4, "a").unwrap(),
        StoryboardEntry::timed(1.4, 2.6, "b").unwrap(),
        StoryboardEntry::timed(2.6, 4.0, "c").unwrap(),
    ]);
    let s = build_schedule(&sb, &all_resolved(&["a", "b", "c"]), &ScheduleOpts::new(fps(1))).unwrap();
    assert_eq!(
        ranges(&s),
        vec![(0, 1, false), (1, 3, false), (3, 4, false)]
    );
    assert_eq!(s.gap_fill_frames(), 0);
    assert!(s.diagnostics.shifted.is_empty());
}
