use super::*;

#[test]
fn pagination_enforces_cursor_and_size_bounds() {
    let (start, end, next) = paginate(10, None, None).unwrap();
    assert_eq!((start, end, next), (0, 10, None));

    let (start, end, next) = paginate(10, Some(4), Some(3)).unwrap();
    assert_eq!((start, end, next), (4, 7, Some(7)));

    let (_, end, _) = paginate(100_000, Some(0), Some(usize::MAX)).unwrap();
    assert_eq!(end, MAX_PAGE_SIZE);

    assert!(paginate(10, Some(11), None).is_err());
}

#[test]
fn run_lookup_rejects_mismatched_run_id() {
    let mut inner = ServerInner::default();
    assert!(require_run(&inner, "run-1").is_err());

    inner.engine = Some(EngineApi::from_setup(RunSetup {
        run_id: "run-1".to_string(),
        seed: 7,
        scenario: ScenarioConfig::default(),
    }));
    assert!(require_run(&inner, "run-1").is_ok());
    assert!(require_run(&inner, "run-2").is_err());
    assert!(require_run_mut(&mut inner, "run-2").is_err());
}
