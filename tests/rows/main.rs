//! Integration tests for boxed adapters (the default erasure strategy).


use std::thread;

use erased_rust::{AnyAdapter, EraseError, Shared, SyncShared};
use gauge::{AnyGauge, Gauge, Peak, Tally};
use rows::{
    log, AnyLabeled, AnyRow, File, FileRow, Folder, FolderRow, ImageRow, Labeled, LogRow, Row,
};

fn describe<R: Row<Model = File>>(row: &mut R, file: &File) -> String {
    format!("{} @ {}: {}", row.name(), row.height(), row.configure(file))
}

#[test]
fn adapter_forwards_every_operation_unchanged() {
    let log = log();
    let file = File::new("report.pdf", 2048);

    let mut direct = FileRow::new("reports", &log);
    let mut erased = AnyRow::new(FileRow::new("reports", &log));

    assert_eq!(erased.configure(&file), direct.configure(&file));
    assert_eq!(erased.name(), direct.name());
    assert_eq!(erased.height(), direct.height());

    let mut direct = ImageRow::new("photos", &log);
    let mut erased = AnyRow::new(ImageRow::new("photos", &log));

    assert_eq!(erased.configure(&file), direct.configure(&file));
    assert_eq!(erased.height(), 88.0);
    assert_eq!(erased.height(), direct.height());
}

#[test]
fn adapter_substitutes_for_any_implementation() {
    let log = log();
    let file = File::new("notes.txt", 12);

    let mut direct = FileRow::new("notes", &log);
    let mut erased = AnyRow::new(FileRow::new("notes", &log));

    assert_eq!(describe(&mut erased, &file), describe(&mut direct, &file));
    assert_eq!(describe(&mut erased, &file), "notes @ 44: notes.txt (12 bytes)");
}

#[test]
fn file_rows_of_different_types_share_one_sequence() {
    let log = log();

    let mut file_rows: Vec<AnyRow<File>> = vec![
        AnyRow::new(FileRow::new("listing", &log)),
        AnyRow::new(ImageRow::new("gallery", &log)),
    ];
    let mut folder_rows: Vec<AnyRow<Folder>> = vec![AnyRow::new(FolderRow::new("tree", &log))];

    let file = File::new("cat.png", 512);
    let rendered: Vec<String> = file_rows
        .iter_mut()
        .map(|row| row.configure(&file))
        .collect();
    assert_eq!(rendered, ["cat.png (512 bytes)", "[thumbnail] cat.png"]);

    let folder = Folder {
        name: "pets".to_string(),
        children: 3,
    };
    for row in folder_rows.iter_mut() {
        row.configure(&folder);
    }

    assert_eq!(
        *log.borrow(),
        [
            "file:listing <- cat.png",
            "image:gallery <- cat.png",
            "folder:tree <- pets",
        ]
    );
}

#[test]
fn each_wrapped_instance_is_called_separately() {
    let log = log();
    let mut rows = vec![
        AnyRow::new(FileRow::new("first", &log)),
        AnyRow::new(FileRow::new("second", &log)),
    ];

    let file = File::new("a.txt", 1);
    for row in rows.iter_mut() {
        row.configure(&file);
    }
    rows[1].configure(&file);

    assert_eq!(
        *log.borrow(),
        [
            "file:first <- a.txt",
            "file:second <- a.txt",
            "file:second <- a.txt",
        ]
    );
}

#[test]
fn set_through_adapter_is_visible_through_shared_handle() {
    let log = log();
    let shared = Shared::new(FileRow::new("draft", &log));
    let mut row = AnyRow::new(shared.clone());

    row.set_name("final".to_string());

    assert_eq!(shared.borrow().name(), "final");
    assert_eq!(row.name(), "final");
}

#[test]
fn set_through_shared_handle_is_visible_through_adapter() {
    let log = log();
    let shared = Shared::new(FileRow::new("draft", &log));
    let mut row = AnyRow::new(shared.clone());

    shared.borrow_mut().set_name("renamed".to_string());
    assert_eq!(row.name(), "renamed");

    row.configure(&File::new("x", 0));
    assert_eq!(shared.borrow().configured, 1);
}

#[test]
fn plain_values_are_moved_in_on_construction() {
    let log = log();
    let original = FileRow::new("original", &log);
    let mut row = AnyRow::new(original.clone());

    row.set_name("changed".to_string());

    assert_eq!(original.name(), "original");
    assert_eq!(row.name(), "changed");
}

#[test]
fn implementations_that_borrow_can_be_erased() {
    let mut entries = Vec::new();
    let log = log();
    {
        let mut rows: Vec<AnyRow<'_, File>> = vec![
            AnyRow::new(LogRow::new("borrowed", &mut entries)),
            AnyRow::new(FileRow::new("owned", &log)),
        ];
        for row in rows.iter_mut() {
            row.configure(&File::new("a.txt", 3));
        }
        rows[0].set_name("renamed".to_string());
        rows[0].configure(&File::new("b.txt", 4));
    }

    assert_eq!(entries, ["borrowed <- a.txt", "renamed <- b.txt"]);
    assert_eq!(*log.borrow(), ["file:owned <- a.txt"]);
}

#[test]
fn dropping_the_adapter_releases_its_reference() {
    let log = log();
    let shared = Shared::new(FileRow::new("held", &log));

    let row = AnyRow::new(shared.clone());
    assert_eq!(shared.strong_count(), 2);

    drop(row);
    assert_eq!(shared.strong_count(), 1);
    assert!(log.borrow().is_empty());
}

#[test]
fn borrowed_returns_forward_without_a_model() {
    let log = log();
    let labels = vec![
        AnyLabeled::new(FileRow::new("file-label", &log)),
        AnyLabeled::new(FolderRow::new("folder-label", &log)),
    ];

    let collected: Vec<&str> = labels.iter().map(|labeled| labeled.label()).collect();
    assert_eq!(collected, ["file-label", "folder-label"]);
}

#[test]
fn sync_adapters_cross_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AnyGauge<u32>>();

    let tally = SyncShared::new(Tally::default());
    let mut gauges = vec![AnyGauge::new(tally.clone()), AnyGauge::new(Peak::default())];

    let gauges = thread::spawn(move || {
        for reading in [3, 9, 4] {
            for gauge in gauges.iter_mut() {
                gauge.record(reading);
            }
        }
        gauges
    })
    .join()
    .unwrap();

    let totals: Vec<u64> = gauges.iter().map(|gauge| gauge.total()).collect();
    assert_eq!(totals, [16, 9]);
    assert_eq!(tally.read().samples, 3);
}

#[test]
fn adapters_over_different_models_share_a_runtime_checked_list() {
    let log = log();
    let erased = vec![
        AnyAdapter::new(AnyRow::new(FileRow::new("file", &log))),
        AnyAdapter::new(AnyRow::new(FolderRow::new("folder", &log))),
    ];

    let file_rows: Vec<&AnyRow<File>> = erased
        .iter()
        .filter_map(|adapter| adapter.downcast_ref::<AnyRow<File>>().ok())
        .collect();
    assert_eq!(file_rows.len(), 1);
    assert_eq!(file_rows[0].name(), "file");

    assert!(erased[1].binding().is_model::<Folder>());
    assert!(matches!(
        erased[1].downcast_ref::<AnyRow<File>>(),
        Err(EraseError::BindingMismatch { capability, .. }) if capability.ends_with("rows::Row")
    ));
    assert!(matches!(
        erased[0].downcast_ref::<AnyGauge<u32>>(),
        Err(EraseError::UnsupportedCapability { .. })
    ));
}

#[test]
fn debug_names_the_adapter_only() {
    let log = log();
    let row = AnyRow::new(FileRow::new("secret", &log));
    assert_eq!(format!("{:?}", row), "AnyRow { .. }");
}
