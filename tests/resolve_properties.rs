use proptest::prelude::*;

use runtree::compose::func;
use runtree::run_in;
use runtree::types::normalize_dir;

fn dir_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}",
        "[a-z]{1,6}/[a-z]{1,6}",
        "\\./[a-z]{1,6}/",
        Just(".".to_string()),
    ]
}

proptest! {
    #[test]
    fn resolution_is_idempotent_sorted_and_unique(
        detected in proptest::collection::vec(dir_strategy(), 0..12),
        includes in proptest::collection::vec("[a-z]{1,6}", 0..4),
        excludes in proptest::collection::vec("[a-z]{1,3}", 0..2),
    ) {
        let detected_for_fn = detected.clone();
        let mut builder = run_in(func(|_ctx| async { Ok::<(), runtree::RuntreeError>(()) }))
            .detect(move || detected_for_fn.clone());
        for inc in &includes {
            builder = builder.include(inc.clone());
        }
        for exc in &excludes {
            builder = builder.exclude(exc.clone());
        }
        let filter = builder.build().unwrap();

        let first = filter.resolve();
        let second = filter.resolve();
        prop_assert_eq!(&first, &second);

        let mut sorted = first.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(&first, &sorted);

        for dir in &first {
            prop_assert_eq!(dir, &normalize_dir(dir));
            prop_assert!(filter.runs_in(dir));
        }
    }

    #[test]
    fn excluded_directories_never_resolve(
        detected in proptest::collection::vec("[a-z]{1,6}", 1..10),
    ) {
        let victim = detected[0].clone();
        let detected_for_fn = detected.clone();
        let filter = run_in(func(|_ctx| async { Ok::<(), runtree::RuntreeError>(()) }))
            .detect(move || detected_for_fn.clone())
            .exclude(format!("^{victim}$"))
            .build()
            .unwrap();

        prop_assert!(!filter.resolve().contains(&victim));
    }

    #[test]
    fn normalize_dir_is_idempotent(dir in dir_strategy()) {
        let once = normalize_dir(&dir);
        prop_assert_eq!(normalize_dir(&once), once.clone());
        prop_assert!(!once.ends_with('/') || once == "/");
    }
}
